//! lifx-land - LAN discovery daemon for LIFX devices
//!
//! Discovers devices on the local network, keeps their state fresh and
//! periodically logs the device table. `RUST_LOG` selects the log level
//! (debug, info, warn, error); an optional positional argument points at
//! a TOML configuration file.

use lifx_lan::{Config, Controller, Options};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEVICE_TABLE_PERIOD: Duration = Duration::from_secs(5);

fn main() -> lifx_lan::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("lifx-land v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut opts = Options::new();
    if let Some(config_path) = env::args().nth(1) {
        log::info!("Using config: {}", config_path);
        opts = opts.with_config(Config::load(&config_path)?);
    }

    let mut controller = Controller::new(opts)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| lifx_lan::Error::Config(format!("failed to set Ctrl-C handler: {}", e)))?;

    log::info!("Discovering devices. Press Ctrl-C to stop.");

    let mut last_table = std::time::Instant::now();
    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(200));

        if last_table.elapsed() >= DEVICE_TABLE_PERIOD {
            last_table = std::time::Instant::now();
            let devices = controller.get_devices();
            log::info!("{} device(s) known", devices.len());
            for d in &devices {
                log::info!(
                    "  {} label={:?} type={} light={} power={} color=[{}] wifi={}",
                    d.serial,
                    d.label,
                    d.device_type,
                    d.light_type,
                    if d.powered_on { "on" } else { "off" },
                    d.color,
                    d.wifi_rssi,
                );
            }
        }
    }

    controller.close();
    Ok(())
}
