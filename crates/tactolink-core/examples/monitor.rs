//! Stream auto-push samples from a sensor.
//!
//! Usage: `monitor <port> [seconds]`
//!
//! Reads the device version, arms auto-push, prints every clean sample for
//! the given number of seconds (default 10), then disables auto-push and
//! closes. Set `RUST_LOG=debug` to watch the frame traffic.

use std::time::Duration;

use tactolink_core::protocol::{serial, Session, SessionConfig, StopCondition};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let port_name = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: monitor <port> [seconds]"))?;
    let seconds: u64 = match args.next() {
        Some(raw) => raw.parse()?,
        None => 10,
    };

    let channel = serial::open_channel(&port_name, None)?;
    let mut session = Session::new(Box::new(channel), SessionConfig::default());

    println!("device version: {}", session.device_version()?);

    session.enable_auto_push()?;
    let stats = session.monitor(
        StopCondition::after(Duration::from_secs(seconds)),
        None,
        |sample| {
            let hex: String = sample
                .frame
                .data
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect();
            println!(
                "[{}] {:3} bytes, error {:#04x}: {}",
                sample.received_at.format("%H:%M:%S%.3f"),
                sample.frame.data.len(),
                sample.frame.error_code,
                hex
            );
        },
    )?;
    println!(
        "delivered {} samples, skipped {} in {:?}",
        stats.delivered, stats.skipped, stats.elapsed
    );

    session.close()?;
    Ok(())
}
