//! check_thecus_nas - monitoring plugin for Thecus NAS devices
//!
//! One invocation runs one check and:
//! - prints exactly one plugin line on stdout (logging goes to stderr)
//! - exits with the plugin status code (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN)
//! - keeps the device session in a per-account cookie file between runs

mod config;
mod output;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use config::{Cli, PluginConfig};
use thecus_core::{
    run_check, AggregateResult, Credentials, EndpointFallbackResolver, FileSessionStore,
    ReqwestTransport, SessionClient,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            let message = e.to_string();
            let first_line = message.lines().next().unwrap_or("Invalid arguments");
            let result = output::failure(first_line.trim_start_matches("error: "));
            println!("{}", output::render(&result));
            std::process::exit(result.severity.exit_code());
        }
    };

    init_logging(cli.verbose);

    let result = match run(&cli).await {
        Ok(result) => result,
        Err(e) => output::failure(e.to_string()),
    };

    println!("{}", output::render(&result));
    std::process::exit(result.severity.exit_code());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<AggregateResult> {
    let config = PluginConfig::from_cli(cli)?;
    info!(
        "Checking {} on {} as {}",
        config.check_type, config.hostname, config.username
    );

    let store = FileSessionStore::for_account(&config.cookie_dir, &config.hostname, &config.username);
    store
        .init()
        .with_context(|| format!("Can't create cookie file {}", store.path().display()))?;
    debug!("Session cookie file: {}", store.path().display());

    let transport = ReqwestTransport::new(config.timeout)?;
    let credentials = Credentials::new(
        config.hostname.as_str(),
        config.username.as_str(),
        config.password.as_str(),
    );
    let client = SessionClient::new(transport, credentials, Box::new(store)).with_scheme(config.scheme);
    let mut resolver = EndpointFallbackResolver::new(client);

    Ok(run_check(config.check_type, &mut resolver, &config.settings).await)
}
