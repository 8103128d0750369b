use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use paket_bootstrapper::bootstrap::{build_strategy, report, run};
use paket_bootstrapper::cli::Cli;
use paket_bootstrapper::config::{CONFIG_FILE_NAME, load_config};
use paket_bootstrapper::logging::{Diagnostics, init_logging};
use paket_bootstrapper::transport::proxy::{ConfiguredProxy, EnvProxy};
use paket_bootstrapper::transport::{HttpTransport, ProxyResolver};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(Path::new(CONFIG_FILE_NAME))?;

    let verbosity = cli.verbosity();
    let _guard = init_logging(verbosity, config.log_file.as_deref())?;

    let options = cli.into_options(&config, std::env::current_exe()?);

    let transport = Arc::new(HttpTransport::new(ProxyResolver::new(
        EnvProxy::from_env(),
        Box::new(ConfiguredProxy::new(config.proxy.as_deref())),
    )));
    let strategy = build_strategy(&options, transport, Diagnostics::new(verbosity))?;

    // Run failures are reported through the subscriber, which honours -s.
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(&options, strategy.as_ref()));

    Ok(if report(result) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
