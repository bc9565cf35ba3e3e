//! Alarm worker: §4.5 of the specification.
//!
//! Drives steps 2-4 of the pipeline: dequeue one reading, update the store,
//! invoke every registered criterion against a single per-tick view, feed
//! the engine, publish returned events on the bus.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::bus::EventBus;
use crate::criteria::CriteriaSet;
use crate::engine::AlarmEngine;
use crate::model::Reading;
use crate::queue::BoundedDropOldest;
use crate::shutdown::{Shutdown, POLL_INTERVAL};
use crate::store::StateStore;

pub struct AlarmWorker {
    readings: Arc<BoundedDropOldest<Reading>>,
    store: Arc<StateStore>,
    criteria: CriteriaSet,
    bus: Arc<EventBus>,
    value_eps: f64,
    stale_timeout_s: Option<u64>,
    shutdown: Shutdown,
    max_drain_on_shutdown: usize,
}

impl AlarmWorker {
    pub fn new(
        readings: Arc<BoundedDropOldest<Reading>>,
        store: Arc<StateStore>,
        criteria: CriteriaSet,
        bus: Arc<EventBus>,
        value_eps: f64,
        stale_timeout_s: Option<u64>,
        shutdown: Shutdown,
        max_drain_on_shutdown: usize,
    ) -> Self {
        Self {
            readings,
            store,
            criteria,
            bus,
            value_eps,
            stale_timeout_s,
            shutdown,
            max_drain_on_shutdown,
        }
    }

    pub fn run(&self) {
        while !self.shutdown.is_signaled() {
            match self.readings.pop_timeout(POLL_INTERVAL) {
                Some(reading) => self.tick(reading),
                None => continue,
            }
        }

        let mut drained = 0;
        while drained < self.max_drain_on_shutdown {
            match self.readings.try_pop() {
                Some(reading) => {
                    self.tick(reading);
                    drained += 1;
                }
                None => break,
            }
        }
        info!("alarm worker: shut down after draining {drained} readings");
    }

    fn tick(&self, reading: Reading) {
        self.store.apply_reading(&reading);
        let view = self.store.view_snapshot_for_tick();
        let decisions = self.criteria.evaluate_all(&view);

        let engine = AlarmEngine::new(&self.store, self.value_eps, self.stale_timeout_s);
        for event in engine.ingest(decisions) {
            self.bus.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::ScalarLimitCriterion;
    use crate::model::{ReadingPayload, Severity};
    use chrono::Utc;
    use std::thread;

    fn scalar_reading(sensor: &str, value: f64) -> Reading {
        Reading {
            sensor: sensor.to_string(),
            payload: ReadingPayload::Scalar(value),
            timestamp: Utc::now(),
            timestamp_synthesized: false,
        }
    }

    #[test]
    fn processes_readings_and_publishes_events() {
        let readings = Arc::new(BoundedDropOldest::new(16));
        let store = Arc::new(StateStore::new());
        let bus = Arc::new(EventBus::new());
        let sub = bus.subscribe();

        let mut criteria = CriteriaSet::new();
        criteria.register(Box::new(ScalarLimitCriterion::new(
            vec![crate::config::ScalarSensorConfig {
                name: "Pressure".into(),
                units: "psi".into(),
                low_limit: 1.0,
                high_limit: 2.0,
            }],
            Severity::Warning,
        )));

        let shutdown = Shutdown::new();
        let worker = AlarmWorker::new(
            readings.clone(),
            store,
            criteria,
            bus,
            0.0,
            None,
            shutdown.clone(),
            100,
        );

        readings.push(scalar_reading("Pressure", 2.3));

        let handle = thread::spawn(move || worker.run());
        let event = sub.recv_timeout(Duration::from_secs(1));
        shutdown.signal();
        handle.join().unwrap();

        let event = event.expect("expected a RAISED event");
        assert_eq!(event.key.alarm_type, "HIGH_LIMIT");
    }
}
