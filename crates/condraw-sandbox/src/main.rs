mod app;
mod cube;

use condraw_engine::device::GpuInit;
use condraw_engine::frame::SceneConfig;
use condraw_engine::logging::{init_logging, LoggingConfig};
use condraw_engine::window::{Runtime, RuntimeConfig};

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let gpu_init = GpuInit::default();
    log::info!("starting with {} frame slots", gpu_init.frame_count());

    Runtime::run(
        RuntimeConfig::default(),
        gpu_init,
        app::SceneApp::new(SceneConfig::default()),
    )
}
