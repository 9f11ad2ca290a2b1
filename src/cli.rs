//! Command-line interface for location-relay.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
///
/// Options left unset fall through to the environment, the config file
/// and finally the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// API key for gateway authentication.
    pub api_key: Option<String>,
    /// Disable authentication.
    pub no_auth: bool,
    /// Upper bound for one outbound send, in seconds.
    pub send_timeout_secs: Option<u64>,
    /// Web app URL for the `/menu` command.
    pub web_url: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('k') | Long("api-key") => {
                result.api_key = Some(parser.value()?.parse()?);
            }
            Long("no-auth") => {
                result.no_auth = true;
            }
            Short('t') | Long("send-timeout") => {
                let value: String = parser.value()?.parse()?;
                let secs: u64 = value
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ArgsError::InvalidValue("send-timeout", value))?;
                result.send_timeout_secs = Some(secs);
            }
            Short('w') | Long("web-url") => {
                result.web_url = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"location-relay {version}
Peer-to-peer location sharing relay for chat bots

USAGE:
    location-relay [OPTIONS]

OPTIONS:
    -H, --host <ADDR>          Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>          Port to listen on [default: 3000]
    -c, --config <FILE>        Path to configuration file (JSON)
    -k, --api-key <KEY>        API key required by the gateway
        --no-auth              Disable authentication
    -t, --send-timeout <SECS>  Timeout for each outbound send [default: 10]
    -w, --web-url <URL>        Web app opened by /menu [default: http://localhost:8000]
    -l, --log-level <LVL>      Log level (error, warn, info, debug, trace)
    -h, --help                 Print help
    -V, --version              Print version

ENVIRONMENT VARIABLES:
    LOCATION_RELAY_HOST          Host address (overrides config)
    LOCATION_RELAY_PORT          Port number (overrides config)
    LOCATION_RELAY_API_KEY       API key (overrides config)
    LOCATION_RELAY_SEND_TIMEOUT  Send timeout in seconds (overrides config)
    LOCATION_RELAY_LOG_LEVEL     Log level (overrides config)
    RUST_LOG                     Alternative log level setting
    WEB_URL                      Web app URL (overrides config)

EXAMPLES:
    # Start with defaults (localhost:3000, no auth)
    location-relay

    # Start on all interfaces with API key
    location-relay -H 0.0.0.0 -p 8080 -k my-secret-key

    # Start with config file
    location-relay -c /etc/location-relay/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("location-relay {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
