//! Attach every supported HID controller and log what it reports.
//!
//! `RUST_LOG=hidmotion=debug cargo run --example monitor --features hid`

use std::time::{Duration, Instant};

use hidmotion::backends::hid::HidapiTransport;
use hidmotion::{InputEventBus, Manager, TracingListener};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let transport = HidapiTransport::new()?;
    let mgr = Manager::new(transport);
    #[cfg(windows)]
    let mgr = mgr.with_calibration(hidmotion::backends::windows::RegistryCalibrationStore::new());
    let mut mgr = mgr;

    let attached = mgr.discover_with(|_| InputEventBus::new().with(TracingListener::new()))?;
    println!("Devices:");
    for d in mgr.devices() {
        println!("- {} {} ({:?})", d.id(), d.identity(), d.class());
    }
    if attached.is_empty() {
        println!("no supported devices found");
        return Ok(());
    }
    println!("{}", mgr.device_report_json()?);

    let start = Instant::now();
    loop {
        let now = start.elapsed().as_millis() as u32;
        mgr.poll(now);
        // Sleep a touch to avoid pegging the CPU in the demo
        std::thread::sleep(Duration::from_millis(5));
    }
}
