//! location-relay binary entry point.

use std::process::ExitCode;

use location_relay::api::serve_with_state;
use location_relay::cli::{self, Args};
use location_relay::config::Config;
use location_relay::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), String> {
    let config = Config::load(args).map_err(|e| e.to_string())?;

    if let Err(e) = logging::init_with_level(config.log_filter()) {
        eprintln!("warning: logging already initialized: {}", e);
    }

    info!("location-relay v{}", env!("CARGO_PKG_VERSION"));

    let server_config = config.to_server_config().map_err(|e| e.to_string())?;
    let state = config.to_app_state();
    info!(
        auth = state.auth.is_enabled(),
        send_timeout = ?config.send_timeout(),
        "Gateway state initialized"
    );

    serve_with_state(server_config, state)
        .await
        .map_err(|e| e.to_string())
}
