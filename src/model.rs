//! Core data model: readings, store entries, alarm keys/states, decisions,
//! events, snapshots and counters.
//!
//! Every type that crosses a wire boundary (readings in from the transport
//! decoder, events out to notifications) derives `Serialize`/`Deserialize`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity ordering is significant: `INFO < WARNING < CRITICAL`, so the
/// engine can compare prior/new severities when deciding UPDATED vs no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Warning
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transition {
    Raised,
    Updated,
    Cleared,
}

/// Payload carried by a reading, discriminated by the wire `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingPayload {
    Scalar(f64),
    Spectrum(Vec<f64>),
}

/// One decoded record off the transport decoder.
#[derive(Debug, Clone)]
pub struct Reading {
    pub sensor: String,
    pub payload: ReadingPayload,
    pub timestamp: DateTime<Utc>,
    /// True when the decoder stamped `timestamp` itself because the wire
    /// record omitted or mangled it.
    pub timestamp_synthesized: bool,
}

/// Wire shape accepted from the transport. `timestamp` is optional and may
/// fail to parse; both cases fall back to wall-clock stamping per the
/// decoder's contract.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WireRecord {
    #[serde(rename = "sensor_reading")]
    Scalar {
        sensor: String,
        value: f64,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename = "ftir_spectrum")]
    Spectrum {
        sensor: String,
        values: Vec<f64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
}

/// Last known value (or spectrum) for one sensor, plus an optional reference
/// spectrum used by spectral criteria such as FTIR peak shift.
#[derive(Debug, Clone, Default)]
pub struct SensorLatest {
    pub scalar: Option<(f64, DateTime<Utc>)>,
    pub spectrum: Option<(Vec<f64>, DateTime<Utc>)>,
    pub reference_spectrum: Option<Vec<f64>>,
}

/// `(source, alarm_type)` composite key, unique per active alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlarmKey {
    pub source: String,
    pub alarm_type: String,
}

impl AlarmKey {
    pub fn new(source: impl Into<String>, alarm_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alarm_type: alarm_type.into(),
        }
    }
}

/// Persisted lifecycle state for one alarm key. Retained with `active =
/// false` after CLEARED for auditability (never deleted from the table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmState {
    pub key: AlarmKey,
    pub severity: Severity,
    pub active: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub message: String,
    pub value: Option<f64>,
    pub details: Option<String>,
}

/// Stateless criterion output: the desired active/inactive state for one key
/// this tick. Ephemeral — never stored.
#[derive(Debug, Clone)]
pub struct AlarmDecision {
    pub key: AlarmKey,
    pub should_be_active: bool,
    pub severity: Severity,
    pub message: String,
    pub value: Option<f64>,
    pub details: Option<String>,
}

/// Immutable record of one lifecycle transition, published on the event bus
/// exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub key: AlarmKey,
    pub transition: Transition,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub value: Option<f64>,
    pub details: Option<String>,
}

/// Per-severity / per-transition tallies alongside the scalar totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub alarm_states_total: u64,
    pub alarm_states_active: u64,
    pub alarm_events_total: u64,
    pub state_counts_by_severity: HashMap<Severity, u64>,
    pub event_counts_by_transition: HashMap<Transition, u64>,
    pub readings_dropped: u64,
    pub readings_rejected: u64,
    pub notifications_dropped: u64,
}

/// Point-in-time consistent copy of the store, handed out to the UI layer
/// and to the notification adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub states: Vec<AlarmState>,
    pub counters: Counters,
}
