use std::{process::ExitCode, sync::Arc, time::Duration};

use clap::Parser;

use metrix::{
    cli::Cli,
    config::MetrixConfig,
    scheduler::{self, Pipeline, Scheduler},
    Error, Registry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let rt = emit::setup().emit_to(emit_term::stdout()).init();

    let code = match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            emit::error!("metrix failed: {err}");

            ExitCode::FAILURE
        }
    };

    rt.blocking_flush(Duration::from_secs(5));

    code
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = MetrixConfig::load(cli.config.as_deref())?.merge(cli.overrides());
    config.validate()?;

    let exporter = metrix_otlp::http(config.otlp.endpoint.clone())
        .encoding(config.encoding())
        .headers(config.otlp.headers.clone())
        .dry_run(cli.dry_run)
        .debug(cli.debug)
        .build()?;

    let interval = config.interval;
    let endpoint = exporter.endpoint();
    let format = exporter.encoding();

    if exporter.is_dry_run() {
        emit::info!(
            "metrix starting in dry-run mode with an interval of {interval}s, metrics will be printed instead of exported"
        );
    } else {
        emit::info!(
            "metrix starting with an interval of {interval}s, exporting to {endpoint} as {format}",
            interval,
            endpoint,
            #[emit::as_display]
            format,
        );
    }

    if cli.debug {
        let replay_dir = exporter.replay_dir().to_owned();

        emit::info!(
            "debug mode is on, replay scripts will be written to {replay_dir}",
            #[emit::as_debug]
            replay_dir,
        );
    }

    let pipeline = Pipeline::new(
        Arc::new(metrix::device::detect()),
        Registry::system(),
        config.enabled_metrics(),
        exporter,
    );

    let scheduler = Scheduler::new(interval, pipeline)?;

    scheduler.start();

    scheduler::shutdown_on_signal(&scheduler).await
}
