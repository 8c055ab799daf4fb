//! Scenario harness
//!
//! Drives a block device through a sequence of operations, each paired with
//! the outcome it must produce. Fingerprint checkpoints prove that steps
//! expected to fail left the medium unchanged.

pub mod builtin;

use crate::integrity::{Fingerprint, IntegrityVerifier};
use crate::storage::{check_transfer, BlockDevice, DataPort, RemovalControl, StorageError};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A single call issued against the device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operation {
    Write { offset: i64, data: Vec<u8> },
    Read { offset: i64, size: i64 },
    Erase { offset: i64, size: i64 },
    Size,
    BlockSize,
    State,
    TriggerRemoval(i64),
    /// Fingerprint the medium and remember it under a label
    Checkpoint(String),
    /// Fingerprint again and compare with a labelled checkpoint
    AssertUnchanged(String),
}

/// Outcome a step must produce
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expectation {
    Success,
    /// Success with exactly this count (bytes processed, size, block size)
    Count(u64),
    /// Successful read returning exactly these bytes
    Data(Vec<u8>),
    /// Successful read where every byte equals this value
    Filled(u8),
    Fails(StorageError),
    /// Either outcome is acceptable; used where a layer may buffer and not
    /// touch the medium at all
    SuccessOrNotPresent,
}

/// What an executed operation returned
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub count: u64,
    pub data: Option<Vec<u8>>,
}

impl Completed {
    fn count(count: u64) -> Self {
        Self { count, data: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub index: usize,
    pub operation: Operation,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub steps_run: usize,
    pub failures: Vec<StepFailure>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// Fingerprinting itself failed
    Storage(StorageError),
    /// A labelled checkpoint was never taken
    UnknownCheckpoint(String),
    /// The medium content changed across an operation expected to be inert
    SideEffect { before: Fingerprint, after: Fingerprint },
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Storage(e) => write!(f, "storage error: {}", e),
            HarnessError::UnknownCheckpoint(label) => write!(f, "unknown checkpoint '{}'", label),
            HarnessError::SideEffect { before, after } => {
                write!(f, "medium changed: {} -> {}", before, after)
            }
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<StorageError> for HarnessError {
    fn from(err: StorageError) -> Self {
        HarnessError::Storage(err)
    }
}

/// Named sequence of (operation, expectation) pairs
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<(Operation, Expectation)>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, operation: Operation, expectation: Expectation) -> Self {
        self.steps.push((operation, expectation));
        self
    }

    pub fn write(self, offset: i64, data: &[u8], expectation: Expectation) -> Self {
        self.step(Operation::Write { offset, data: data.to_vec() }, expectation)
    }

    pub fn read(self, offset: i64, size: i64, expectation: Expectation) -> Self {
        self.step(Operation::Read { offset, size }, expectation)
    }

    pub fn erase(self, offset: i64, size: i64, expectation: Expectation) -> Self {
        self.step(Operation::Erase { offset, size }, expectation)
    }

    pub fn trigger_removal(self, budget: i64) -> Self {
        self.step(Operation::TriggerRemoval(budget), Expectation::Success)
    }

    pub fn checkpoint(self, label: &str) -> Self {
        self.step(Operation::Checkpoint(label.to_string()), Expectation::Success)
    }

    pub fn assert_unchanged(self, label: &str) -> Self {
        self.step(Operation::AssertUnchanged(label.to_string()), Expectation::Success)
    }
}

pub struct ScenarioHarness<'a, D: BlockDevice + RemovalControl> {
    device: &'a mut D,
    port: DataPort,
    checkpoints: HashMap<String, Fingerprint>,
}

impl<'a, D: BlockDevice + RemovalControl> ScenarioHarness<'a, D> {
    pub fn new(device: &'a mut D, port: DataPort) -> Self {
        Self {
            device,
            port,
            checkpoints: HashMap::new(),
        }
    }

    pub fn device(&mut self) -> &mut D {
        &mut *self.device
    }

    pub fn fingerprint(&mut self) -> Result<Fingerprint, StorageError> {
        IntegrityVerifier::fingerprint(&mut *self.device, &mut self.port)
    }

    /// Run `attempt` between two fingerprints and require them to match.
    ///
    /// The medium must be present for both fingerprints; `attempt` may arm
    /// removal as long as it re-attaches before returning.
    pub fn expect_no_side_effects<R, F>(&mut self, label: &str, attempt: F) -> Result<R, HarnessError>
    where
        F: FnOnce(&mut D, &mut DataPort) -> R,
    {
        let before = self.fingerprint()?;
        debug!("[{}] fingerprint before: {}", label, before);
        let result = attempt(&mut *self.device, &mut self.port);
        let after = self.fingerprint()?;
        debug!("[{}] fingerprint after: {}", label, after);
        if before != after {
            error!("[{}] medium changed by an operation expected to be inert", label);
            return Err(HarnessError::SideEffect { before, after });
        }
        Ok(result)
    }

    fn execute(&mut self, operation: &Operation) -> Result<Completed, HarnessError> {
        match operation {
            Operation::Write { offset, data } => {
                // stage what fits; the device rejects the rest after its presence check
                let staged = &data[..data.len().min(self.port.capacity())];
                self.port.load(staged)?;
                let size = data.len() as i64;
                Ok(Completed::count(self.device.write(*offset, size, &self.port)?))
            }
            Operation::Read { offset, size } => {
                let read = self.device.read(*offset, *size, &mut self.port)?;
                Ok(Completed {
                    count: read,
                    data: Some(self.port.contents(read as usize).to_vec()),
                })
            }
            Operation::Erase { offset, size } => {
                Ok(Completed::count(self.device.erase(*offset, *size)?))
            }
            Operation::Size => Ok(Completed::count(self.device.size()?)),
            Operation::BlockSize => Ok(Completed::count(self.device.block_size()?)),
            Operation::State => Ok(Completed::count(self.device.state()? as u64)),
            Operation::TriggerRemoval(budget) => {
                self.device.trigger_removal(*budget);
                Ok(Completed::count(0))
            }
            Operation::Checkpoint(label) => {
                let fingerprint = self.fingerprint()?;
                self.checkpoints.insert(label.clone(), fingerprint);
                Ok(Completed::count(0))
            }
            Operation::AssertUnchanged(label) => {
                let before = *self
                    .checkpoints
                    .get(label)
                    .ok_or_else(|| HarnessError::UnknownCheckpoint(label.clone()))?;
                let after = self.fingerprint()?;
                if before != after {
                    return Err(HarnessError::SideEffect { before, after });
                }
                Ok(Completed::count(0))
            }
        }
    }

    fn requested_len(operation: &Operation) -> Option<i64> {
        match operation {
            Operation::Write { data, .. } => Some(data.len() as i64),
            Operation::Read { size, .. } | Operation::Erase { size, .. } => Some(*size),
            _ => None,
        }
    }

    fn judge(
        operation: &Operation,
        expectation: &Expectation,
        outcome: &Result<Completed, HarnessError>,
    ) -> Result<(), String> {
        // a short transfer is a broken engine, whatever the expectation
        if let (Ok(done), Some(requested)) = (outcome, Self::requested_len(operation)) {
            if let Err(e) = check_transfer(requested, done.count) {
                return Err(format!("{}: requested {} bytes, processed {}", e, requested, done.count));
            }
        }

        match (expectation, outcome) {
            (Expectation::Success, Ok(_)) => Ok(()),
            (Expectation::Count(n), Ok(done)) if done.count == *n => Ok(()),
            (Expectation::Count(n), Ok(done)) => Err(format!("expected count {}, got {}", n, done.count)),
            (Expectation::Data(expected), Ok(done)) => match &done.data {
                Some(data) if data == expected => Ok(()),
                Some(data) => Err(format!("expected data {:02x?}, got {:02x?}", expected, data)),
                None => Err("expected data from a read".to_string()),
            },
            (Expectation::Filled(value), Ok(done)) => match &done.data {
                Some(data) if data.iter().all(|b| b == value) => Ok(()),
                Some(_) => Err(format!("expected every byte to be {:#04x}", value)),
                None => Err("expected data from a read".to_string()),
            },
            (Expectation::Fails(expected), Err(HarnessError::Storage(actual))) if expected == actual => Ok(()),
            (Expectation::Fails(expected), Ok(_)) => Err(format!("expected {}, got success", expected)),
            (Expectation::SuccessOrNotPresent, Ok(_)) => Ok(()),
            (Expectation::SuccessOrNotPresent, Err(HarnessError::Storage(StorageError::DeviceNotPresent))) => Ok(()),
            (_, Err(e)) => Err(format!("unexpected failure: {}", e)),
        }
    }

    /// Execute every step, collecting failures instead of stopping at the first
    pub fn run(&mut self, scenario: &Scenario) -> ScenarioReport {
        let mut report = ScenarioReport {
            name: scenario.name.clone(),
            started_at: Utc::now(),
            steps_run: 0,
            failures: Vec::new(),
        };
        info!("Scenario {} started ({} steps)", scenario.name, scenario.steps.len());

        for (index, (operation, expectation)) in scenario.steps.iter().enumerate() {
            debug!("[{}] step {}: {:?} expecting {:?}", scenario.name, index, operation, expectation);
            let outcome = self.execute(operation);
            report.steps_run += 1;
            if let Err(reason) = Self::judge(operation, expectation, &outcome) {
                error!("[{}] step {} ({:?}) failed: {}", scenario.name, index, operation, reason);
                report.failures.push(StepFailure {
                    index,
                    operation: operation.clone(),
                    reason,
                });
            }
        }

        if report.passed() {
            info!("Scenario {} successful", scenario.name);
        } else {
            error!("Scenario {} FAILED with {} failing steps", scenario.name, report.failures.len());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RemovableDisk;

    fn new_disk() -> RemovableDisk {
        RemovableDisk::new(65536, 4096)
    }

    #[test]
    fn test_passing_scenario() {
        let mut disk = new_disk();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let scenario = Scenario::new("round_trip")
            .write(16, &[9, 8, 7], Expectation::Count(3))
            .read(16, 3, Expectation::Data(vec![9, 8, 7]))
            .step(Operation::Size, Expectation::Count(65536))
            .step(Operation::BlockSize, Expectation::Count(4096));

        let report = harness.run(&scenario);
        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.steps_run, 4);
    }

    #[test]
    fn test_failing_steps_are_reported() {
        let mut disk = new_disk();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let scenario = Scenario::new("wrong_expectations")
            .read(0, 4, Expectation::Data(vec![1, 2, 3, 4]))
            .read(70000, 4, Expectation::Success)
            .erase(0, 4, Expectation::Fails(StorageError::OutOfBounds));

        let report = harness.run(&scenario);
        assert!(!report.passed());
        let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![0, 1, 2]);
        assert_eq!(report.steps_run, 3);
    }

    #[test]
    fn test_success_or_not_present() {
        let mut disk = new_disk();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let scenario = Scenario::new("buffered_layer")
            .trigger_removal(1)
            .write(0, &[1], Expectation::SuccessOrNotPresent)
            .write(1, &[1], Expectation::SuccessOrNotPresent)
            .read(70000, 1, Expectation::SuccessOrNotPresent)
            .trigger_removal(-1)
            .read(70000, 1, Expectation::SuccessOrNotPresent);

        let report = harness.run(&scenario);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 5);
    }

    #[test]
    fn test_oversized_write_checks_presence_first() {
        let mut disk = new_disk();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let scenario = Scenario::new("oversized_write")
            .trigger_removal(0)
            .write(0, &[0xAB; 5000], Expectation::Fails(StorageError::DeviceNotPresent))
            .trigger_removal(-1)
            .write(0, &[0xAB; 5000], Expectation::Fails(StorageError::OutOfBounds))
            .read(0, 4, Expectation::Data(vec![0; 4]));

        let report = harness.run(&scenario);
        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(harness.device().presence().checks(), 3);
        assert_eq!(harness.device().presence().absences(), 1);
    }

    #[test]
    fn test_unknown_checkpoint() {
        let mut disk = new_disk();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let report = harness.run(&Scenario::new("missing").assert_unchanged("nope"));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("unknown checkpoint"));
    }

    #[test]
    fn test_checkpoint_detects_change() {
        let mut disk = new_disk();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let scenario = Scenario::new("mutating")
            .checkpoint("start")
            .erase(0, 1, Expectation::Count(1))
            .assert_unchanged("start");

        let report = harness.run(&scenario);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
        assert!(report.failures[0].reason.contains("medium changed"));
    }

    #[test]
    fn test_expect_no_side_effects() {
        let mut disk = new_disk();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));

        let rejected = harness.expect_no_side_effects("probe", |dev, port| {
            dev.read(0, 512, port)?;
            if port.contents(4) != b"LFS!" {
                return Err(StorageError::Generic);
            }
            Ok(())
        });
        assert_eq!(rejected, Ok(Err(StorageError::Generic)));

        let mutated = harness.expect_no_side_effects("format", |dev, _| dev.erase(0, 4096));
        assert!(matches!(mutated, Err(HarnessError::SideEffect { .. })));
    }

    #[test]
    fn test_expect_no_side_effects_needs_medium() {
        let mut disk = new_disk();
        disk.remove();
        let mut harness = ScenarioHarness::new(&mut disk, DataPort::new(4096));
        let result = harness.expect_no_side_effects("absent", |_, _| ());
        assert_eq!(result, Err(HarnessError::Storage(StorageError::DeviceNotPresent)));
    }
}
