//! The state store: the single authoritative, concurrency-safe home for
//! sensor-latest values, the alarm-state table, and the derived counters.
//!
//! Concurrency strategy (settled Open Question, see DESIGN.md): rather than
//! a re-entrant guard, the worker captures one immutable [`StoreView`] per
//! tick via [`StateStore::view_snapshot_for_tick`] and criteria evaluate
//! against that view. The engine then writes decisions back through the
//! store's single-acquisition methods. This still satisfies the
//! specification's requirement that sensor-latest, the alarm table and the
//! counters are captured under one lock acquisition for `snapshot()`.
//!
//! Locking follows the teacher's pattern throughout the corpus: one
//! `parking_lot::Mutex` guarding a plain struct, never held across I/O.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::model::{
    AlarmKey, AlarmState, Counters, ReadingPayload, Reading, SensorLatest, Severity, Snapshot,
    Transition,
};

struct Inner {
    sensors: HashMap<String, SensorLatest>,
    alarms: HashMap<AlarmKey, AlarmState>,
    counters: Counters,
}

pub struct StateStore {
    inner: Mutex<Inner>,
}

/// An immutable, point-in-time view of the sensor-latest map, captured once
/// per worker tick so criteria never need to reacquire the store's lock
/// mid-evaluation.
#[derive(Clone)]
pub struct StoreView {
    sensors: HashMap<String, SensorLatest>,
}

impl StoreView {
    pub fn get_scalar(&self, name: &str) -> Option<(f64, DateTime<Utc>)> {
        self.sensors
            .get(name)
            .and_then(|s| s.scalar)
            .filter(|(v, _)| v.is_finite())
    }

    pub fn get_spectrum(&self, name: &str) -> Option<(&[f64], DateTime<Utc>)> {
        self.sensors.get(name).and_then(|s| {
            s.spectrum
                .as_ref()
                .filter(|(values, _)| values.iter().all(|v| v.is_finite()))
                .map(|(values, ts)| (values.as_slice(), *ts))
        })
    }

    pub fn get_reference_spectrum(&self, name: &str) -> Option<&[f64]> {
        self.sensors
            .get(name)
            .and_then(|s| s.reference_spectrum.as_deref())
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sensors: HashMap::new(),
                alarms: HashMap::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Seed a spectral channel's reference spectrum from configuration,
    /// ahead of any readings arriving.
    pub fn set_reference_spectrum(&self, name: &str, reference: Vec<f64>) {
        let mut guard = self.inner.lock();
        guard
            .sensors
            .entry(name.to_string())
            .or_default()
            .reference_spectrum = Some(reference);
    }

    /// Applies one decoded reading to the store. NaN/Inf scalar values or
    /// spectra are stored as-is (§4.2/§7: "accept but criteria treat as no
    /// reading") — rejection for shape mismatch happens in the decoder, not
    /// here.
    pub fn apply_reading(&self, reading: &Reading) {
        let mut guard = self.inner.lock();
        let entry = guard.sensors.entry(reading.sensor.clone()).or_default();
        match &reading.payload {
            ReadingPayload::Scalar(v) => entry.scalar = Some((*v, reading.timestamp)),
            ReadingPayload::Spectrum(values) => {
                entry.spectrum = Some((values.clone(), reading.timestamp))
            }
        }
    }

    /// Captures the immutable view criteria evaluate against for one tick.
    pub fn view_snapshot_for_tick(&self) -> StoreView {
        let guard = self.inner.lock();
        StoreView {
            sensors: guard.sensors.clone(),
        }
    }

    pub fn alarm_state(&self, key: &AlarmKey) -> Option<AlarmState> {
        self.inner.lock().alarms.get(key).cloned()
    }

    /// Writes a new or updated alarm state, recomputing counters in the same
    /// critical section (§4.2 invariant).
    pub fn upsert_alarm_state(&self, state: AlarmState) -> Option<AlarmState> {
        let mut guard = self.inner.lock();
        let prior = guard.alarms.insert(state.key.clone(), state);
        recompute_counters(&mut guard);
        prior
    }

    /// Marks an alarm inactive, keeping it in the table for auditability, and
    /// returns the state as it stood before clearing (§4.2's named clear
    /// operation). `None` if the key has no stored state at all.
    pub fn clear_alarm(&self, key: &AlarmKey, now: DateTime<Utc>) -> Option<AlarmState> {
        let mut guard = self.inner.lock();
        let prior = guard.alarms.get(key)?.clone();
        guard.alarms.insert(
            key.clone(),
            AlarmState {
                active: false,
                last_seen: now,
                ..prior.clone()
            },
        );
        recompute_counters(&mut guard);
        Some(prior)
    }

    pub fn record_event_published(&self, transition: Transition) {
        let mut guard = self.inner.lock();
        guard.counters.alarm_events_total += 1;
        *guard
            .counters
            .event_counts_by_transition
            .entry(transition)
            .or_insert(0) += 1;
    }

    pub fn record_reading_dropped(&self) {
        self.inner.lock().counters.readings_dropped += 1;
    }

    pub fn record_reading_rejected(&self) {
        self.inner.lock().counters.readings_rejected += 1;
    }

    pub fn record_notification_dropped(&self) {
        self.inner.lock().counters.notifications_dropped += 1;
    }

    pub fn counters(&self) -> Counters {
        self.inner.lock().counters.clone()
    }

    /// Consistent, point-in-time copy of every alarm state plus counters.
    pub fn snapshot(&self) -> Snapshot {
        let guard = self.inner.lock();
        Snapshot {
            states: guard.alarms.values().cloned().collect(),
            counters: guard.counters.clone(),
        }
    }

    /// Keys whose `last_seen` exceeds `timeout` while still active, used by
    /// the engine's staleness sweep when `stale_timeout_s` is configured.
    pub fn stale_active_keys(&self, timeout: chrono::Duration, now: DateTime<Utc>) -> Vec<AlarmKey> {
        let guard = self.inner.lock();
        guard
            .alarms
            .values()
            .filter(|s| s.active && now.signed_duration_since(s.last_seen) > timeout)
            .map(|s| s.key.clone())
            .collect()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn recompute_counters(guard: &mut Inner) {
    let mut by_severity: HashMap<Severity, u64> = HashMap::new();
    let mut active = 0u64;
    for s in guard.alarms.values() {
        *by_severity.entry(s.severity).or_insert(0) += 1;
        if s.active {
            active += 1;
        }
    }
    guard.counters.alarm_states_total = guard.alarms.len() as u64;
    guard.counters.alarm_states_active = active;
    guard.counters.state_counts_by_severity = by_severity;
}
