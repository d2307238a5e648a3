use std::sync::Arc;

use anyhow::Context;
use scene_engine::{ensure_output_dir, AtomicFileWriter, HttpDownloader};
use scene_host::bridge::{pump_inbound, StdioPort};
use scene_host::config::{config_path_from, HostConfig, CONFIG_ENV_VAR};
use scene_host::persistence::RonStateStore;
use scene_host::wire::epoch_millis_now;
use scene_host::{logging, Coordinator, CoordinatorParts};
use scene_logging::{scene_error, scene_info};

fn main() -> anyhow::Result<()> {
    let config_path =
        config_path_from(std::env::args().skip(1), std::env::var_os(CONFIG_ENV_VAR));
    let config = HostConfig::load(config_path.as_deref()).context("loading host configuration")?;
    logging::initialize(&config.log);
    scene_info!(
        "scene-batch-host starting (config: {:?})",
        config_path.as_deref()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run(config));
    if let Err(err) = &result {
        scene_error!("Host exited with error: {:#}", err);
    }
    result
}

async fn run(config: HostConfig) -> anyhow::Result<()> {
    ensure_output_dir(&config.output_root).context("creating output root")?;
    ensure_output_dir(&config.state_dir).context("creating state directory")?;

    let downloader = HttpDownloader::new(
        config.download_settings(),
        AtomicFileWriter::new(config.output_root.clone()),
    )
    .context("building HTTP client")?;

    let coordinator = Coordinator::new(CoordinatorParts {
        store: Box::new(RonStateStore::new(config.state_dir.clone())),
        port: Arc::new(StdioPort::new(tokio::io::stdout())),
        downloader: Arc::new(downloader),
        clock: Arc::new(epoch_millis_now),
        deadlines: config.deadlines(),
        ack_timeout: config.submit_ack_timeout(),
    });

    tokio::spawn(pump_inbound(tokio::io::stdin(), coordinator.sender()));
    coordinator.run().await;
    Ok(())
}
