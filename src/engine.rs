//! Alarm engine: §4.4 of the specification.
//!
//! The engine is the sole writer of alarm-state transitions. It is pure with
//! respect to its inputs plus the current store: given the same prior state
//! and the same decision, it always produces the same transition.

use chrono::{DateTime, Utc};

use crate::model::{AlarmDecision, AlarmEvent, AlarmKey, AlarmState, Transition};
use crate::store::StateStore;

pub struct AlarmEngine<'a> {
    store: &'a StateStore,
    /// Minimum numeric change required to emit an UPDATED event when
    /// severity/message/details are otherwise unchanged.
    value_eps: f64,
    stale_timeout: Option<chrono::Duration>,
}

impl<'a> AlarmEngine<'a> {
    pub fn new(store: &'a StateStore, value_eps: f64, stale_timeout_s: Option<u64>) -> Self {
        Self {
            store,
            value_eps,
            stale_timeout: stale_timeout_s.map(|s| chrono::Duration::seconds(s as i64)),
        }
    }

    /// Applies a batch of decisions from one worker tick, producing events in
    /// decision-input order (§4.4 ordering guarantee), then runs the
    /// staleness sweep if configured.
    pub fn ingest(&self, decisions: Vec<AlarmDecision>) -> Vec<AlarmEvent> {
        let now = Utc::now();
        let mut events = Vec::new();

        for decision in decisions {
            if let Some(event) = self.apply_decision(decision, now) {
                self.store.record_event_published(event.transition);
                events.push(event);
            }
        }

        if let Some(timeout) = self.stale_timeout {
            for key in self.store.stale_active_keys(timeout, now) {
                if let Some(event) = self.clear_for_staleness(&key, now) {
                    self.store.record_event_published(event.transition);
                    events.push(event);
                }
            }
        }

        events
    }

    fn apply_decision(&self, decision: AlarmDecision, now: DateTime<Utc>) -> Option<AlarmEvent> {
        let prior = self.store.alarm_state(&decision.key);

        if decision.should_be_active {
            match &prior {
                None => Some(self.raise(decision, now)),
                Some(p) if !p.active => Some(self.raise(decision, now)),
                Some(p) => self.update_or_noop(p.clone(), decision, now),
            }
        } else {
            match &prior {
                None => None,
                Some(p) if !p.active => None,
                Some(p) => Some(self.clear(p.clone(), now)),
            }
        }
    }

    fn raise(&self, decision: AlarmDecision, now: DateTime<Utc>) -> AlarmEvent {
        let state = AlarmState {
            key: decision.key.clone(),
            severity: decision.severity,
            active: true,
            first_seen: now,
            last_seen: now,
            message: decision.message.clone(),
            value: decision.value,
            details: decision.details.clone(),
        };
        self.store.upsert_alarm_state(state);
        AlarmEvent {
            key: decision.key,
            transition: Transition::Raised,
            severity: decision.severity,
            timestamp: now,
            message: decision.message,
            value: decision.value,
            details: decision.details,
        }
    }

    fn update_or_noop(
        &self,
        prior: AlarmState,
        decision: AlarmDecision,
        now: DateTime<Utc>,
    ) -> Option<AlarmEvent> {
        let value_changed = match (prior.value, decision.value) {
            (Some(p), Some(n)) => (p - n).abs() >= self.value_eps,
            (None, Some(_)) | (Some(_), None) => true,
            (None, None) => false,
        };
        let fields_changed = prior.severity != decision.severity
            || prior.message != decision.message
            || prior.details != decision.details;

        if !value_changed && !fields_changed {
            // hysteresis: no event, but refresh last_seen so the state isn't
            // mistaken for stale.
            self.store.upsert_alarm_state(AlarmState {
                last_seen: now,
                ..prior
            });
            return None;
        }

        let state = AlarmState {
            key: decision.key.clone(),
            severity: decision.severity,
            active: true,
            first_seen: prior.first_seen,
            last_seen: now,
            message: decision.message.clone(),
            value: decision.value,
            details: decision.details.clone(),
        };
        self.store.upsert_alarm_state(state);
        Some(AlarmEvent {
            key: decision.key,
            transition: Transition::Updated,
            severity: decision.severity,
            timestamp: now,
            message: decision.message,
            value: decision.value,
            details: decision.details,
        })
    }

    fn clear(&self, prior: AlarmState, now: DateTime<Utc>) -> AlarmEvent {
        self.store.clear_alarm(&prior.key, now);
        AlarmEvent {
            key: prior.key,
            transition: Transition::Cleared,
            severity: prior.severity,
            timestamp: now,
            message: prior.message,
            value: prior.value,
            details: prior.details,
        }
    }

    fn clear_for_staleness(&self, key: &AlarmKey, now: DateTime<Utc>) -> Option<AlarmEvent> {
        let prior = self.store.clear_alarm(key, now)?;
        Some(AlarmEvent {
            key: key.clone(),
            transition: Transition::Cleared,
            severity: prior.severity,
            timestamp: now,
            message: format!("{} auto-cleared: stale", key.alarm_type),
            value: prior.value,
            details: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlarmKey, Severity};

    fn decision(key: AlarmKey, active: bool, value: f64) -> AlarmDecision {
        AlarmDecision {
            key,
            should_be_active: active,
            severity: Severity::Warning,
            message: format!("value={value}"),
            value: Some(value),
            details: None,
        }
    }

    #[test]
    fn simple_raise_and_clear_with_zero_eps() {
        let store = StateStore::new();
        let engine = AlarmEngine::new(&store, 0.0, None);
        let key = AlarmKey::new("Pressure", "HIGH_LIMIT");

        assert!(engine.ingest(vec![decision(key.clone(), false, 1.5)]).is_empty());

        let events = engine.ingest(vec![decision(key.clone(), true, 2.3)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transition, Transition::Raised);

        let events = engine.ingest(vec![decision(key.clone(), true, 2.4)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transition, Transition::Updated);

        let events = engine.ingest(vec![decision(key.clone(), false, 1.8)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transition, Transition::Cleared);
    }

    #[test]
    fn hysteresis_suppresses_small_changes() {
        let store = StateStore::new();
        let engine = AlarmEngine::new(&store, 0.2, None);
        let key = AlarmKey::new("Pressure", "HIGH_LIMIT");

        let events = engine.ingest(vec![decision(key.clone(), true, 2.3)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transition, Transition::Raised);

        // 2.4 - 2.3 = 0.1 < eps(0.2) -> no event
        assert!(engine.ingest(vec![decision(key.clone(), true, 2.4)]).is_empty());

        let events = engine.ingest(vec![decision(key.clone(), false, 1.8)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transition, Transition::Cleared);
    }

    #[test]
    fn severity_only_change_still_emits_updated() {
        let store = StateStore::new();
        let engine = AlarmEngine::new(&store, 1.0, None);
        let key = AlarmKey::new("Pressure", "HIGH_LIMIT");

        engine.ingest(vec![decision(key.clone(), true, 2.3)]);

        let mut d = decision(key.clone(), true, 2.3);
        d.severity = Severity::Critical;
        let events = engine.ingest(vec![d]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transition, Transition::Updated);
        assert_eq!(events[0].severity, Severity::Critical);
    }

    #[test]
    fn missing_decision_does_not_auto_clear() {
        let store = StateStore::new();
        let engine = AlarmEngine::new(&store, 0.0, None);
        let key = AlarmKey::new("Pressure", "HIGH_LIMIT");
        engine.ingest(vec![decision(key.clone(), true, 2.3)]);

        // criterion produces no decision at all for this key this tick
        let events = engine.ingest(vec![]);
        assert!(events.is_empty());
        assert!(store.alarm_state(&key).unwrap().active);
    }

    #[test]
    fn transition_sequence_matches_regular_language() {
        let store = StateStore::new();
        let engine = AlarmEngine::new(&store, 0.0, None);
        let key = AlarmKey::new("Pressure", "HIGH_LIMIT");

        let mut transitions = Vec::new();
        let script = [
            (true, 2.3),
            (true, 2.4),
            (true, 2.5),
            (false, 1.0),
            (true, 3.0),
            (false, 1.0),
        ];
        for (active, value) in script {
            for e in engine.ingest(vec![decision(key.clone(), active, value)]) {
                transitions.push(e.transition);
            }
        }

        // (RAISED (UPDATED)* CLEARED)*
        let mut i = 0;
        while i < transitions.len() {
            assert_eq!(transitions[i], Transition::Raised);
            i += 1;
            while i < transitions.len() && transitions[i] == Transition::Updated {
                i += 1;
            }
            assert_eq!(transitions[i], Transition::Cleared);
            i += 1;
        }
    }

    #[test]
    fn stale_timeout_auto_clears() {
        let store = StateStore::new();
        let key = AlarmKey::new("Pressure", "HIGH_LIMIT");
        let old = Utc::now() - chrono::Duration::seconds(120);
        store.upsert_alarm_state(AlarmState {
            key: key.clone(),
            severity: Severity::Warning,
            active: true,
            first_seen: old,
            last_seen: old,
            message: "stale".into(),
            value: Some(2.3),
            details: None,
        });

        let engine = AlarmEngine::new(&store, 0.0, Some(60));
        let events = engine.ingest(vec![]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transition, Transition::Cleared);
    }
}
