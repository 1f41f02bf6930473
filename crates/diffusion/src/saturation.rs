//! Saturation detection
//!
//! Evaluates the stopping conditions after each diffusion stage and produces
//! the human-readable reason the run ended.

use crate::types::DiffusionState;
use citeflow_common::QualitySettings;
use tracing::debug;

/// Multi-condition stopping rule for one diffusion run
pub struct SaturationController {
    max_stages: u32,
    max_papers: usize,
    saturation_threshold: f64,
}

impl SaturationController {
    pub fn new(settings: &QualitySettings) -> Self {
        Self {
            max_stages: settings.max_stages,
            max_papers: settings.max_papers,
            saturation_threshold: settings.saturation_threshold,
        }
    }

    /// Evaluate stopping conditions after a completed stage
    ///
    /// Updates the low-coverage streak and the saturation flag on `state`;
    /// returns the stop reason when any condition fires. The coverage
    /// condition requires two consecutive low stages, so a single sparse
    /// stage never ends a run on its own.
    pub fn evaluate(
        &self,
        state: &mut DiffusionState,
        corpus_size: usize,
        coverage_delta: f64,
    ) -> Option<String> {
        if coverage_delta < self.saturation_threshold {
            state.consecutive_low_coverage += 1;
        } else {
            state.consecutive_low_coverage = 0;
        }

        let completed_stages = state.current_stage + 1;
        debug!(
            stage = state.current_stage,
            coverage_delta,
            low_streak = state.consecutive_low_coverage,
            corpus_size,
            "Saturation check"
        );

        let reason = if completed_stages >= self.max_stages {
            Some(format!(
                "Reached maximum of {} diffusion stages",
                self.max_stages
            ))
        } else if corpus_size >= self.max_papers {
            Some(format!(
                "Corpus reached maximum size ({} papers)",
                self.max_papers
            ))
        } else if state.consecutive_low_coverage >= 2 {
            Some(format!(
                "Coverage delta below {:.2} for two consecutive stages",
                self.saturation_threshold
            ))
        } else {
            None
        };

        if reason.is_some() {
            state.is_saturated = true;
        }
        reason
    }
}
