//! Temperature differential criterion: §4.3.2 of the specification.

use crate::model::{AlarmDecision, AlarmKey, Severity};
use crate::store::StoreView;

use super::Criterion;

pub struct TempDiffCriterion {
    sensor_a: String,
    sensor_b: String,
    pair_name: String,
    delta: f64,
    severity: Severity,
}

impl TempDiffCriterion {
    pub fn new(sensor_a: impl Into<String>, sensor_b: impl Into<String>, delta: f64, severity: Severity) -> Self {
        let sensor_a = sensor_a.into();
        let sensor_b = sensor_b.into();
        let pair_name = format!("{sensor_a}_{sensor_b}");
        Self {
            sensor_a,
            sensor_b,
            pair_name,
            delta,
            severity,
        }
    }
}

impl Criterion for TempDiffCriterion {
    fn evaluate(&self, view: &StoreView) -> Vec<AlarmDecision> {
        let Some((a, _)) = view.get_scalar(&self.sensor_a) else {
            return Vec::new();
        };
        let Some((b, _)) = view.get_scalar(&self.sensor_b) else {
            return Vec::new();
        };

        let diff = (a - b).abs();
        let should_be_active = diff > self.delta;
        vec![AlarmDecision {
            key: AlarmKey::new(self.pair_name.clone(), "TEMP_DIFF"),
            should_be_active,
            severity: self.severity,
            message: format!(
                "{} vs {} differential: {:.2} > {:.2}",
                self.sensor_a, self.sensor_b, diff, self.delta
            ),
            value: Some(diff),
            details: None,
        }]
    }
}
