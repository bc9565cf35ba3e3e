//! Real-time alarm processing core for an industrial sensor monitoring
//! system: a framed-transport decoder feeding a concurrency-safe state
//! store, a set of stateless alarm criteria, a hysteresis-aware alarm
//! engine, an in-process event bus, and a notification pipeline with
//! retrying webhook delivery.
//!
//! The pipeline, leaves first: [`transport::Decoder`] decodes readings onto
//! a bounded queue; [`store::StateStore`] is the authoritative in-memory
//! model; [`criteria`] holds the stateless rule evaluators; [`engine`]
//! applies hysteresis and owns alarm-state transitions; [`worker`] drives
//! one tick at a time; [`bus`] fans events out; [`notifications`] joins
//! events with store snapshots and delivers them over HTTP.

pub mod bus;
pub mod config;
pub mod criteria;
pub mod engine;
pub mod error;
pub mod model;
pub mod notifications;
pub mod queue;
pub mod shutdown;
pub mod store;
pub mod transport;
pub mod worker;
