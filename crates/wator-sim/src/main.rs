//! Headless Wa-Tor runner.
//!
//! Usage: `wator-sim [CONFIG.json] [CHRONONS] [SEED]`. Set `WATOR_LOG_JSON=1`
//! for JSON log lines.

mod telemetry;

use anyhow::{Context, Result};
use std::fs;
use tracing::info;
use wator_core::WatorConfig;
use wator_world::Wator;

const DEFAULT_CHRONONS: u64 = 1000;

fn main() -> Result<()> {
    telemetry::init_telemetry(std::env::var_os("WATOR_LOG_JSON").is_some())?;

    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) if path != "-" => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path))?;
            WatorConfig::from_json(&text).with_context(|| format!("parsing {}", path))?
        }
        _ => WatorConfig::default(),
    };
    let chronons = match args.next() {
        Some(raw) => raw.parse().context("CHRONONS must be a non-negative integer")?,
        None => DEFAULT_CHRONONS,
    };
    let seed = match args.next() {
        Some(raw) => raw.parse().context("SEED must be an integer")?,
        None => 0,
    };

    info!(?config, chronons, seed, "Starting Wa-Tor run");

    let mut world = Wator::new(config, seed)?.with_log_interval(100);
    let report = world.run(chronons);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
