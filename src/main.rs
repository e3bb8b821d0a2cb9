//! Application entry point — poetry camera.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (default on first run), apply environment
//!    overrides, validate.  Invalid settings are fatal.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the production [`Components`] and start the [`Appliance`]
//!    (status LED blinking until the printer service is ready, then the connectivity monitor).
//! 5. Spawn the shutter listener thread.
//! 6. Block until Ctrl-C, then shut the background tasks down.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use poetry_camera::{
    app::{Appliance, Components},
    config::{AppConfig, AppPaths, ConfigSource, FileConfigSource},
    shutter::{parse_key, ShutterListener},
};

fn load_config() -> Result<AppConfig> {
    let config = AppConfig::load()
        .context("failed to load settings")?
        .with_env_overrides();
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("poetry camera starting up");

    // 2. Configuration
    let config = load_config().inspect_err(|e| log::error!("{e:#}"))?;
    log::info!(
        "generation: {} via {:?}, printer at {}",
        config.generation.model,
        config.generation.strategy,
        config.printer.url
    );

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Appliance
    let source: Arc<dyn ConfigSource> = Arc::new(FileConfigSource::new(
        AppPaths::new().settings_file,
        config.clone(),
    ));
    let components = Components::from_config(&config, Arc::clone(&source));
    let appliance = Appliance::start(source, components, rt.handle().clone());

    // 5. Shutter listener thread
    let key = parse_key(&config.shutter.key)
        .ok_or_else(|| anyhow!("unknown shutter key {:?}", config.shutter.key))?;
    let _listener =
        ShutterListener::start(key, appliance.shutter()).context("failed to start shutter listener")?;
    log::info!("shutter: listening on {:?}", key);

    // 6. Run until interrupted
    rt.block_on(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to wait for Ctrl-C: {e}");
        }
        log::info!("shutting down");
        appliance.shutdown().await;
    });

    Ok(())
}
