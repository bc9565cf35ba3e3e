//! Stateless alarm rule evaluators.
//!
//! Each criterion is a capability (§9 of the specification): `evaluate`
//! reads a pre-captured [`StoreView`] and returns zero or more decisions. A
//! criterion must be pure — no global mutation, no I/O — so criteria are
//! plain `Send + Sync` trait objects registered in configuration-declared
//! order, the same "registry of tagged variants" shape the teacher uses for
//! its `SensorType`/`DeadlineComponent` enums, generalized to a trait object
//! since criteria differ in more than a tag.

mod ftir_peak_shift;
mod scalar_limit;
mod temp_diff;

pub use ftir_peak_shift::FtirPeakShiftCriterion;
pub use scalar_limit::ScalarLimitCriterion;
pub use temp_diff::TempDiffCriterion;

use crate::model::AlarmDecision;
use crate::store::StoreView;

pub trait Criterion: Send + Sync {
    fn evaluate(&self, view: &StoreView) -> Vec<AlarmDecision>;
}

/// Ordered collection of registered criteria, evaluated once per worker
/// tick against the same [`StoreView`].
pub struct CriteriaSet {
    criteria: Vec<Box<dyn Criterion>>,
}

impl CriteriaSet {
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
        }
    }

    pub fn register(&mut self, criterion: Box<dyn Criterion>) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    pub fn evaluate_all(&self, view: &StoreView) -> Vec<AlarmDecision> {
        self.criteria.iter().flat_map(|c| c.evaluate(view)).collect()
    }
}

impl Default for CriteriaSet {
    fn default() -> Self {
        Self::new()
    }
}
