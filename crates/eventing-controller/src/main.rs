use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{debug, info};

use eventing_controller::VERSION;
use eventing_controller::cli::ControllerOpt;
use eventing_controller::core::Context;
use eventing_controller::monitoring::HistogramStatsReporter;
use eventing_controller::start_main_loop;
use eventing_controller::store::{LocalManifest, MemoryClient};
use eventing_types::event::StickyEvent;
use eventing_types::print_cli_err;

fn main() {
    fluvio_future::subscriber::init_logger();

    let opt = ControllerOpt::parse();
    debug!("controller opt: {:#?}", opt);

    if let Err(err) = fluvio_future::task::run_block_on(run(opt)) {
        print_cli_err!(format!("{err:#}"));
        std::process::exit(-1);
    }
}

async fn run(opt: ControllerOpt) -> Result<()> {
    // exits on invalid configuration
    let config = opt.parse_cli_or_exit();

    println!("starting channel controller: {VERSION}");

    let client = MemoryClient::new_shared();
    if let Some(path) = opt.local_manifest() {
        let manifest = LocalManifest::load_from(path)?;
        manifest
            .seed(client.as_ref())
            .await
            .with_context(|| format!("unable to seed store from {}", path.display()))?;
        info!(path = %path.display(), "store seeded");
    }

    let stats = HistogramStatsReporter::shared();
    let ctx = Context::builder(config, client).stats(stats.clone()).build();
    let shutdown = StickyEvent::shared();

    let ctrlc_shutdown: Arc<StickyEvent> = shutdown.clone();
    ctrlc::set_handler(move || {
        debug!("detected control c, shutting down");
        ctrlc_shutdown.notify();
    })
    .context("CTRL-C handler can't be initialized")?;

    let _queue = start_main_loop(ctx, shutdown.clone()).await?;
    println!("Channel controller started successfully");

    shutdown.listen().await;
    stats.log_summary();
    info!("terminated");
    Ok(())
}
