//! Scalar limit criterion: §4.3.1 of the specification.
//!
//! Two distinct alarm keys per configured sensor, `HIGH_LIMIT` and
//! `LOW_LIMIT`, each produced from the same `v < L or v > H` check. A limit
//! value exactly equal to a bound is never alarming (strict comparison).

use crate::config::ScalarSensorConfig;
use crate::model::{AlarmDecision, AlarmKey, Severity};
use crate::store::StoreView;

use super::Criterion;

pub struct ScalarLimitCriterion {
    configs: Vec<ScalarSensorConfig>,
    severity: Severity,
}

impl ScalarLimitCriterion {
    pub fn new(configs: Vec<ScalarSensorConfig>, severity: Severity) -> Self {
        Self { configs, severity }
    }
}

impl Criterion for ScalarLimitCriterion {
    fn evaluate(&self, view: &StoreView) -> Vec<AlarmDecision> {
        let mut decisions = Vec::new();
        for cfg in &self.configs {
            let Some((v, _ts)) = view.get_scalar(&cfg.name) else {
                continue;
            };

            let high_active = v > cfg.high_limit;
            decisions.push(AlarmDecision {
                key: AlarmKey::new(cfg.name.clone(), "HIGH_LIMIT"),
                should_be_active: high_active,
                severity: self.severity,
                message: format!(
                    "{} high: {} > {} {}",
                    cfg.name, v, cfg.high_limit, cfg.units
                ),
                value: Some(v),
                details: None,
            });

            let low_active = v < cfg.low_limit;
            decisions.push(AlarmDecision {
                key: AlarmKey::new(cfg.name.clone(), "LOW_LIMIT"),
                should_be_active: low_active,
                severity: self.severity,
                message: format!("{} low: {} < {} {}", cfg.name, v, cfg.low_limit, cfg.units),
                value: Some(v),
                details: None,
            });
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Reading, ReadingPayload};
    use crate::store::StateStore;
    use chrono::Utc;

    fn apply(store: &StateStore, name: &str, value: f64) {
        store.apply_reading(&Reading {
            sensor: name.to_string(),
            payload: ReadingPayload::Scalar(value),
            timestamp: Utc::now(),
            timestamp_synthesized: false,
        });
    }

    fn pressure_configs() -> Vec<ScalarSensorConfig> {
        vec![ScalarSensorConfig {
            name: "Pressure".into(),
            units: "psi".into(),
            low_limit: 1.0,
            high_limit: 2.0,
        }]
    }

    #[test]
    fn value_exactly_at_limit_is_not_alarming() {
        let store = StateStore::new();
        apply(&store, "Pressure", 2.0);
        let view = store.view_snapshot_for_tick();
        let criterion = ScalarLimitCriterion::new(pressure_configs(), Severity::Warning);
        let decisions = criterion.evaluate(&view);
        assert!(decisions.iter().all(|d| !d.should_be_active));
    }

    #[test]
    fn value_above_high_limit_raises_high_limit_only() {
        let store = StateStore::new();
        apply(&store, "Pressure", 2.3);
        let view = store.view_snapshot_for_tick();
        let criterion = ScalarLimitCriterion::new(pressure_configs(), Severity::Warning);
        let decisions = criterion.evaluate(&view);
        let high = decisions
            .iter()
            .find(|d| d.key.alarm_type == "HIGH_LIMIT")
            .unwrap();
        let low = decisions
            .iter()
            .find(|d| d.key.alarm_type == "LOW_LIMIT")
            .unwrap();
        assert!(high.should_be_active);
        assert!(!low.should_be_active);
    }

    #[test]
    fn missing_sensor_produces_no_decision() {
        let store = StateStore::new();
        let view = store.view_snapshot_for_tick();
        let criterion = ScalarLimitCriterion::new(pressure_configs(), Severity::Warning);
        assert!(criterion.evaluate(&view).is_empty());
    }
}
