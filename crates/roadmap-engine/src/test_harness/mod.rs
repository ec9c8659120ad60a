//! Test harness
//!
//! Seeded random-intent simulator over the bundled datasets

pub mod simulator;

pub use simulator::*;

use roadmap_dataset::{samples, Dataset};
use std::sync::Arc;

/// Runs the simulator over several seeds
pub struct TestHarness;

impl TestHarness {
    /// Simulate `operations` intents for each of `seeds` seeds on the career
    /// tracks dataset
    #[must_use]
    pub fn run_certification(seeds: u64, operations: u64) -> CertificationReport {
        let dataset = Arc::new(samples::career_tracks());
        Self::certify(&dataset, seeds, operations)
    }

    /// Same as [`TestHarness::run_certification`] on a caller-provided dataset
    #[must_use]
    pub fn certify(dataset: &Arc<Dataset>, seeds: u64, operations: u64) -> CertificationReport {
        let mut total_violations = 0;
        let mut failed_seeds = Vec::new();

        for seed in 0..seeds {
            let config = SimulatorConfig {
                seed,
                total_operations: operations,
                ..SimulatorConfig::default()
            };
            let report = run_simulator(config, Arc::clone(dataset));
            if !report.passed() {
                failed_seeds.push(seed);
            }
            total_violations += report.violations.len();
        }

        CertificationReport {
            passed: failed_seeds.is_empty(),
            total_violations,
            seeds_tested: seeds,
            failed_seeds,
        }
    }
}

/// Result of a multi-seed run
#[derive(Debug, Clone)]
pub struct CertificationReport {
    /// No seed produced a violation
    pub passed: bool,
    /// Violations across all seeds
    pub total_violations: usize,
    /// Seeds run
    pub seeds_tested: u64,
    /// Seeds with at least one violation
    pub failed_seeds: Vec<u64>,
}
