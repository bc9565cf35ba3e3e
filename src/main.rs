//! Entry point: wires the eight pipeline stages together and runs them as
//! four long-lived threads until a shutdown signal (Ctrl-C) arrives.
//!
//! Configuration *loading* (TOML/YAML/env) is out of scope per the
//! specification; this binary builds its [`Config`] from built-in defaults
//! suitable for local development against a co-located reading source, the
//! same way the teacher's `main.rs` hardcodes its simulation parameters
//! rather than reading a config file.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info};

use alarm_core::bus::EventBus;
use alarm_core::config::{
    AlarmsConfig, Config, NotificationsConfig, QueuesConfig, ReconnectBackoff,
    ScalarSensorConfig, SensorsConfig, TcpClientConfig, TransportConfig, WebhookConfig,
};
use alarm_core::criteria::{CriteriaSet, ScalarLimitCriterion, TempDiffCriterion};
use alarm_core::model::Severity;
use alarm_core::notifications::{NotificationAdapter, NotificationWorker};
use alarm_core::queue::BoundedDropOldest;
use alarm_core::shutdown::Shutdown;
use alarm_core::store::StateStore;
use alarm_core::transport::Decoder;
use alarm_core::worker::AlarmWorker;

fn default_config() -> Config {
    Config {
        transport: TransportConfig {
            tcp_client: TcpClientConfig {
                host: "127.0.0.1".into(),
                port: 9500,
                timeout_s: 10,
                max_line_bytes: 1024 * 1024,
                reconnect_backoff: ReconnectBackoff {
                    init_ms: 500,
                    cap_ms: 30_000,
                },
            },
        },
        sensors: SensorsConfig {
            scalar_configs: vec![
                ScalarSensorConfig {
                    name: "Pressure".into(),
                    units: "psi".into(),
                    low_limit: 1.0,
                    high_limit: 2.0,
                },
                ScalarSensorConfig {
                    name: "TempA".into(),
                    units: "C".into(),
                    low_limit: -20.0,
                    high_limit: 120.0,
                },
                ScalarSensorConfig {
                    name: "TempB".into(),
                    units: "C".into(),
                    low_limit: -20.0,
                    high_limit: 120.0,
                },
            ],
            spectral_configs: vec![],
        },
        alarms: AlarmsConfig {
            value_eps: 0.1,
            enable_scalar_limits: true,
            temp_diff: Some(alarm_core::config::TempDiffConfig {
                enabled: true,
                pair: ("TempA".into(), "TempB".into()),
                delta: 5.0,
                severity: Severity::Warning,
            }),
            ftir_peak_shift: None,
            stale_timeout_s: None,
        },
        notifications: NotificationsConfig {
            webhook: WebhookConfig {
                url: "http://127.0.0.1:9600/hook".into(),
                bearer_token: None,
                verify_tls: true,
                connect_timeout_s: 5,
                total_timeout_s: 10,
                retries: 3,
            },
        },
        queues: QueuesConfig::default(),
    }
}

fn build_criteria(config: &Config) -> CriteriaSet {
    let mut criteria = CriteriaSet::new();

    if config.alarms.enable_scalar_limits {
        criteria.register(Box::new(ScalarLimitCriterion::new(
            config.sensors.scalar_configs.clone(),
            Severity::Warning,
        )));
    }

    if let Some(td) = &config.alarms.temp_diff {
        if td.enabled {
            criteria.register(Box::new(TempDiffCriterion::new(
                td.pair.0.clone(),
                td.pair.1.clone(),
                td.delta,
                td.severity,
            )));
        }
    }

    if let Some(ftir) = &config.alarms.ftir_peak_shift {
        if ftir.enabled {
            criteria.register(Box::new(
                alarm_core::criteria::FtirPeakShiftCriterion::new(
                    ftir.channel.clone(),
                    ftir.tolerance_bins,
                    ftir.severity,
                ),
            ));
        }
    }

    criteria
}

fn main() {
    env_logger::init();
    info!("=== ALARM CORE START ===");

    let config = default_config();
    if let Err(e) = config.validate() {
        error!("configuration is invalid, refusing to start: {e}");
        std::process::exit(1);
    }

    let shutdown = Shutdown::new();
    let store = Arc::new(StateStore::new());
    let mut spectral_lengths = std::collections::HashMap::new();
    for spectral in &config.sensors.spectral_configs {
        spectral_lengths.insert(spectral.name.clone(), spectral.length);
        if let Some(peak) = spectral.reference_peak_index {
            let mut reference = vec![0.0; spectral.length];
            if peak < spectral.length {
                reference[peak] = 1.0;
            }
            store.set_reference_spectrum(&spectral.name, reference);
        }
    }

    let readings = Arc::new(BoundedDropOldest::new(config.queues.readings_capacity));
    let notification_queue = Arc::new(BoundedDropOldest::new(config.queues.notifications_capacity));
    let bus = Arc::new(EventBus::new());
    let criteria = build_criteria(&config);

    let decoder = Decoder::new(
        config.transport.tcp_client.clone(),
        spectral_lengths,
        readings.clone(),
        store.clone(),
        shutdown.clone(),
    );
    let decoder_handle = thread::Builder::new()
        .name("transport-decoder".into())
        .spawn(move || decoder.run())
        .expect("failed to spawn transport decoder thread");

    let worker = AlarmWorker::new(
        readings.clone(),
        store.clone(),
        criteria,
        bus.clone(),
        config.alarms.value_eps,
        config.alarms.stale_timeout_s,
        shutdown.clone(),
        10_000,
    );
    let worker_handle = thread::Builder::new()
        .name("alarm-worker".into())
        .spawn(move || worker.run())
        .expect("failed to spawn alarm worker thread");

    let subscription = bus.subscribe();
    let adapter = NotificationAdapter::new(
        subscription,
        store.clone(),
        notification_queue.clone(),
        shutdown.clone(),
    );
    let adapter_handle = thread::Builder::new()
        .name("notification-adapter".into())
        .spawn(move || adapter.run())
        .expect("failed to spawn notification adapter thread");

    let notify_worker = NotificationWorker::new(
        config.notifications.webhook.clone(),
        notification_queue.clone(),
        store.clone(),
        shutdown.clone(),
    );
    let notify_handle = thread::Builder::new()
        .name("notification-worker".into())
        .spawn(move || notify_worker.run())
        .expect("failed to spawn notification worker thread");

    let shutdown_for_ctrlc = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        shutdown_for_ctrlc.signal();
    }) {
        error!("failed to install Ctrl-C handler: {e}");
    }

    while !shutdown.is_signaled() {
        thread::sleep(Duration::from_millis(200));
    }

    readings.close();
    notification_queue.close();

    for (name, handle) in [
        ("transport-decoder", decoder_handle),
        ("alarm-worker", worker_handle),
        ("notification-adapter", adapter_handle),
        ("notification-worker", notify_handle),
    ] {
        if handle.join().is_err() {
            error!("{name} thread panicked");
        }
    }

    info!("=== ALARM CORE STOPPED ===");
}
