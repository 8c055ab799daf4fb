//! Built-in scenario suite for the removable disk

use crate::harness::{Expectation, Operation, Scenario};
use crate::storage::{StorageError, ERASE_PATTERN};

/// Data pattern written by the file-level tests
pub const FILE_DATA: [u8; 8] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];

/// Gated calls the medium survives in `removal_during_stream`
const STREAM_BUDGET: i64 = 4;

/// Geometry the suite is generated for
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub capacity: i64,
    pub block_size: u64,
    pub dataport_size: i64,
}

impl Geometry {
    /// Transfer unit used by the suite: one 4 KiB page where the medium allows it
    fn unit(&self) -> i64 {
        4096.min(self.dataport_size).min(self.capacity / 2).max(1)
    }
}

pub fn round_trip_through_removal() -> Scenario {
    use Expectation::*;
    Scenario::new("round_trip_through_removal")
        .trigger_removal(-1)
        .write(0, &FILE_DATA, Count(8))
        .read(0, 8, Data(FILE_DATA.to_vec()))
        .trigger_removal(0)
        .read(0, 8, Fails(StorageError::DeviceNotPresent))
        .trigger_removal(-1)
        .read(0, 8, Data(FILE_DATA.to_vec()))
}

pub fn erase_pattern(geometry: &Geometry) -> Scenario {
    use Expectation::*;
    let unit = geometry.unit();
    Scenario::new("erase_pattern")
        .erase(unit, unit, Count(unit as u64))
        .read(unit, unit, Filled(ERASE_PATTERN))
}

pub fn sticky_absence() -> Scenario {
    use Expectation::*;
    let not_present = || Fails(StorageError::DeviceNotPresent);
    Scenario::new("sticky_absence")
        .trigger_removal(0)
        .read(0, 8, not_present())
        .write(0, &FILE_DATA, not_present())
        .erase(0, 8, not_present())
        .step(Operation::Size, not_present())
        .step(Operation::State, not_present())
        .read(0, 8, not_present())
        .trigger_removal(-1)
        .read(0, 8, Success)
}

pub fn budgeted_absence() -> Scenario {
    use Expectation::*;
    Scenario::new("budgeted_absence")
        .trigger_removal(3)
        .write(0, &FILE_DATA, Count(8))
        .read(0, 8, Data(FILE_DATA.to_vec()))
        .step(Operation::Size, Success)
        .read(0, 8, Fails(StorageError::DeviceNotPresent))
        .read(0, 8, Fails(StorageError::DeviceNotPresent))
        .trigger_removal(-1)
}

pub fn bounds_rejection(geometry: &Geometry) -> Scenario {
    use Expectation::*;
    let out_of_bounds = || Fails(StorageError::OutOfBounds);
    let cap = geometry.capacity;
    Scenario::new("bounds_rejection")
        .checkpoint("before")
        .read(cap, 1, out_of_bounds())
        .read(-1, 1, out_of_bounds())
        .read(0, -1, out_of_bounds())
        .write(cap - 4, &FILE_DATA, out_of_bounds())
        .write(i64::MAX, &FILE_DATA, out_of_bounds())
        .erase(1, cap, out_of_bounds())
        .erase(i64::MAX, i64::MAX, out_of_bounds())
        .assert_unchanged("before")
}

pub fn absence_before_bounds(geometry: &Geometry) -> Scenario {
    use Expectation::*;
    let cap = geometry.capacity;
    Scenario::new("absence_before_bounds")
        .trigger_removal(0)
        .read(cap, 1, Fails(StorageError::DeviceNotPresent))
        .erase(-1, 1, Fails(StorageError::DeviceNotPresent))
        .trigger_removal(-1)
        .read(cap, 1, Fails(StorageError::OutOfBounds))
}

pub fn zero_length_transfers(geometry: &Geometry) -> Scenario {
    use Expectation::*;
    Scenario::new("zero_length_transfers")
        .checkpoint("before")
        .read(0, 0, Count(0))
        .read(geometry.capacity, 0, Count(0))
        .write(geometry.capacity, &[], Count(0))
        .erase(0, 0, Count(0))
        .assert_unchanged("before")
}

pub fn device_queries(geometry: &Geometry) -> Scenario {
    use Expectation::*;
    Scenario::new("device_queries")
        .step(Operation::Size, Count(geometry.capacity as u64))
        .step(Operation::BlockSize, Count(geometry.block_size))
        .step(Operation::State, Fails(StorageError::NotSupported))
        .trigger_removal(0)
        .step(Operation::BlockSize, Count(geometry.block_size))
        .step(Operation::Size, Fails(StorageError::DeviceNotPresent))
        .trigger_removal(-1)
}

/// Writes issued while the medium is gone, followed by reattachment, must
/// leave no trace on the medium.
pub fn no_mutation_on_failure(geometry: &Geometry) -> Scenario {
    use Expectation::*;
    let unit = geometry.unit();
    Scenario::new("no_mutation_on_failure")
        .write(0, &FILE_DATA, Count(8))
        .checkpoint("written")
        .trigger_removal(0)
        .write(0, &[0xEE; 8], Fails(StorageError::DeviceNotPresent))
        .erase(0, unit, Fails(StorageError::DeviceNotPresent))
        .trigger_removal(-1)
        .write(geometry.capacity, &FILE_DATA, Fails(StorageError::OutOfBounds))
        .assert_unchanged("written")
        .read(0, 8, Data(FILE_DATA.to_vec()))
}

/// Removal while a writer streams data: the first `STREAM_BUDGET` writes
/// land, every later one reports the missing medium, and after reattaching
/// the landed chunks read back intact.
pub fn removal_during_stream(geometry: &Geometry) -> Scenario {
    use Expectation::*;
    let chunk = FILE_DATA.len() as i64;
    let chunks = (geometry.capacity / chunk).min(16);
    let landed = STREAM_BUDGET.min(chunks);

    let mut scenario = Scenario::new("removal_during_stream").trigger_removal(STREAM_BUDGET);
    for i in 0..chunks {
        let expectation = if i < landed {
            Count(chunk as u64)
        } else {
            Fails(StorageError::DeviceNotPresent)
        };
        scenario = scenario.write(i * chunk, &FILE_DATA, expectation);
    }
    scenario = scenario.trigger_removal(-1);
    for i in 0..landed {
        scenario = scenario.read(i * chunk, chunk, Data(FILE_DATA.to_vec()));
    }
    scenario
}

pub fn all(geometry: &Geometry) -> Vec<Scenario> {
    vec![
        round_trip_through_removal(),
        erase_pattern(geometry),
        sticky_absence(),
        budgeted_absence(),
        bounds_rejection(geometry),
        absence_before_bounds(geometry),
        zero_length_transfers(geometry),
        device_queries(geometry),
        no_mutation_on_failure(geometry),
        removal_during_stream(geometry),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::ScenarioHarness;
    use crate::storage::{DataPort, RemovableDisk, RemovalControl};

    #[test]
    fn test_builtin_suite_passes() {
        let geometry = Geometry { capacity: 65536, block_size: 4096, dataport_size: 4096 };
        let mut disk = RemovableDisk::new(65536, 4096);
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));

        for scenario in all(&geometry) {
            let report = harness.run(&scenario);
            assert!(report.passed(), "{}: {:?}", report.name, report.failures);
        }
    }

    #[test]
    fn test_builtin_suite_small_geometry() {
        let geometry = Geometry { capacity: 64, block_size: 1, dataport_size: 16 };
        let mut disk = RemovableDisk::new(64, 1);
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(16));

        for scenario in all(&geometry) {
            let report = harness.run(&scenario);
            assert!(report.passed(), "{}: {:?}", report.name, report.failures);
        }
    }

    #[test]
    fn test_stream_stops_landing_after_budget() {
        let geometry = Geometry { capacity: 65536, block_size: 4096, dataport_size: 4096 };
        let scenario = removal_during_stream(&geometry);
        let outcomes: Vec<&Expectation> = scenario
            .steps
            .iter()
            .filter(|(op, _)| matches!(op, Operation::Write { .. }))
            .map(|(_, expectation)| expectation)
            .collect();
        assert_eq!(outcomes.len(), 16);
        assert!(outcomes[..4].iter().all(|e| **e == Expectation::Count(8)));
        assert!(outcomes[4..].iter().all(|e| **e == Expectation::Fails(StorageError::DeviceNotPresent)));

        // a disk whose absence is not sticky fails the scenario
        let mut disk = RemovableDisk::new(65536, 4096);
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let mut broken = scenario.clone();
        broken.steps.insert(6, (Operation::TriggerRemoval(-1), Expectation::Success));
        let report = harness.run(&broken);
        assert!(!report.passed());

        harness.device().attach();
        let report = harness.run(&scenario);
        assert!(report.passed(), "{:?}", report.failures);
    }

    #[test]
    fn test_unit_clamps_to_geometry() {
        let small = Geometry { capacity: 64, block_size: 1, dataport_size: 16 };
        assert_eq!(small.unit(), 16);
        let large = Geometry { capacity: 1 << 20, block_size: 512, dataport_size: 8192 };
        assert_eq!(large.unit(), 4096);
    }
}
