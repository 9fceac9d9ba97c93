//! Command line interface.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    LogFormat, ACCESS_LOG_TARGET, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_ROOT,
};

/// Single dash spellings accepted for the long certificate flags.
const SINGLE_DASH_ALIASES: &[(&str, &str)] = &[("-sc", "--sc"), ("-cd", "--cd")];

/// serve: deliver content of current directory via http/https
#[derive(Parser, Debug)]
#[command(name = "serve", version, about)]
pub struct Args {
    /// Enable gzip encoding
    #[arg(short, long)]
    pub gzip: bool,

    /// Specify port for listening
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Enable logging output
    #[arg(short, long)]
    pub logging: bool,

    /// Enable http2, this generates a self signed certificate, if one isn't
    /// already present; cert.pem, key.pem
    #[arg(short = '2', long)]
    pub http2: bool,

    /// Custom header(s) to add to the response (can be repeated multiple times)
    #[arg(short = 'H', long, value_name = "NAME: VALUE")]
    pub header: Vec<String>,

    /// Whether to save the generated self-signed certificates to disk
    #[arg(long, visible_alias = "sc")]
    pub cert_save: bool,

    /// Location to save certificate at if saving to disk [default: ~/.serve]
    #[arg(long, visible_alias = "cd", value_name = "DIR")]
    pub cert_dir: Option<PathBuf>,

    /// Log level filter (e.g., "serve=debug,tower_http=info"); with
    /// --logging, access lines stay enabled at info
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Directory to serve
    #[arg(default_value = DEFAULT_ROOT)]
    pub dir: PathBuf,
}

impl Args {
    /// Parse the process arguments, accepting `-sc` and `-cd`.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Tracing filter with priority: CLI > `env_filter` > default.
    ///
    /// With `--logging` the access log target is always enabled at info.
    pub fn log_filter(&self, env_filter: Option<String>) -> String {
        let filter = self
            .log_level
            .clone()
            .or(env_filter)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        if self.logging {
            format!("{filter},{ACCESS_LOG_TARGET}=info")
        } else {
            filter
        }
    }
}

/// Rewrite `-sc` and `-cd` to their `--` form, which clap can parse.
///
/// Arguments after `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut positional = false;
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            if positional {
                return arg;
            }
            if arg == "--" {
                positional = true;
                return arg;
            }
            SINGLE_DASH_ALIASES
                .iter()
                .find(|(short, _)| arg == *short)
                .map_or(arg, |(_, long)| OsString::from(*long))
        })
        .collect()
}
