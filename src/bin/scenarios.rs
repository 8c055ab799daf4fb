//! Runs the built-in scenario suite against a freshly configured disk.

use log::{error, info};
use std::process::ExitCode;

use removable_disk::config::AppConfig;
use removable_disk::harness::builtin::{self, Geometry};
use removable_disk::harness::ScenarioHarness;
use removable_disk::storage::RemovalControl;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut disk = match config.disk.create_disk() {
        Ok(disk) => disk,
        Err(e) => {
            error!("Invalid disk configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    disk.attach();

    let geometry = Geometry {
        capacity: config.disk.capacity as i64,
        block_size: config.disk.block_size,
        dataport_size: config.disk.dataport_size as i64,
    };
    let mut harness = ScenarioHarness::new(&mut disk, config.disk.create_dataport());

    let mut failed = 0;
    for scenario in builtin::all(&geometry) {
        let report = harness.run(&scenario);
        if report.passed() {
            info!("{}() successful", report.name);
        } else {
            failed += 1;
            error!("{}() FAILED", report.name);
            for failure in &report.failures {
                error!("  step {} {:?}: {}", failure.index, failure.operation, failure.reason);
            }
        }
    }

    info!("All test scenarios completed");
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        error!("{} scenarios failed", failed);
        ExitCode::FAILURE
    }
}
