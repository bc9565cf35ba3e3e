//! Transport decoder: §4.1 of the specification.
//!
//! Maintains one outbound TCP connection to the reading source, frames the
//! byte stream as newline-delimited JSON, and pushes decoded readings onto
//! the bounded readings queue with drop-oldest backpressure. Reconnects
//! indefinitely on any socket error with exponential backoff, until the
//! shutdown signal is observed.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};

use crate::config::TcpClientConfig;
use crate::error::DecoderError;
use crate::model::{Reading, ReadingPayload, WireRecord};
use crate::queue::BoundedDropOldest;
use crate::shutdown::{Shutdown, POLL_INTERVAL};
use crate::store::StateStore;

use super::Backoff;

pub struct Decoder {
    config: TcpClientConfig,
    /// Configured length per spectral channel (§3/§4.1: a spectrum whose
    /// `values` length doesn't match its channel's declared length is
    /// rejected). Channels absent from this map are not length-checked.
    spectral_lengths: HashMap<String, usize>,
    readings: Arc<BoundedDropOldest<Reading>>,
    store: Arc<StateStore>,
    shutdown: Shutdown,
}

impl Decoder {
    pub fn new(
        config: TcpClientConfig,
        spectral_lengths: HashMap<String, usize>,
        readings: Arc<BoundedDropOldest<Reading>>,
        store: Arc<StateStore>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            config,
            spectral_lengths,
            readings,
            store,
            shutdown,
        }
    }

    /// Runs the reconnect-and-decode loop until shutdown. Intended to be the
    /// body of the transport decoder's long-lived thread.
    pub fn run(&self) {
        let mut backoff = Backoff::new(
            self.config.reconnect_backoff.init_ms,
            self.config.reconnect_backoff.cap_ms,
        );

        while !self.shutdown.is_signaled() {
            match self.connect_once() {
                Ok(stream) => {
                    backoff.reset();
                    self.read_stream(stream);
                }
                Err(e) => {
                    warn!(
                        "decoder: failed to connect to {}:{}: {e}",
                        self.config.host, self.config.port
                    );
                }
            }

            if self.shutdown.is_signaled() {
                break;
            }
            let delay = backoff.next_delay();
            self.sleep_unless_shutdown(delay);
        }
        debug!("decoder: shut down");
    }

    fn connect_once(&self) -> Result<TcpStream, DecoderError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = TcpStream::connect(&addr).map_err(DecoderError::Connect)?;
        stream
            .set_read_timeout(Some(Duration::from_secs(self.config.timeout_s)))
            .map_err(DecoderError::Io)?;
        Ok(stream)
    }

    fn sleep_unless_shutdown(&self, total: Duration) {
        let mut remaining = total;
        while remaining > Duration::ZERO && !self.shutdown.is_signaled() {
            let step = remaining.min(POLL_INTERVAL);
            std::thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }

    /// Reads lines until EOF, a read-timeout error, or any other socket
    /// error. Partial lines accumulated in the buffer are discarded on
    /// disconnect (implicit: `reader` and its buffer are dropped here).
    fn read_stream(&self, stream: TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        loop {
            if self.shutdown.is_signaled() {
                return;
            }
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    debug!("decoder: connection closed (EOF)");
                    return;
                }
                Ok(_) => {
                    self.handle_line(&line);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                    // read timeout: loop back to re-check shutdown, connection stays open
                    continue;
                }
                Err(e) => {
                    warn!("decoder: socket error, reconnecting: {e}");
                    return;
                }
            }
        }
    }

    fn handle_line(&self, raw: &str) {
        let trimmed = raw.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            return;
        }
        if trimmed.len() > self.config.max_line_bytes {
            warn!(
                "decoder: dropping oversized line ({} bytes > {} max)",
                trimmed.len(),
                self.config.max_line_bytes
            );
            self.store.record_reading_rejected();
            return;
        }

        let record: WireRecord = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                debug!("decoder: malformed or unknown record, skipping: {e}");
                self.store.record_reading_rejected();
                return;
            }
        };

        match self.to_reading(record) {
            Some(reading) => {
                if self.readings.push(reading) {
                    self.store.record_reading_dropped();
                }
            }
            None => self.store.record_reading_rejected(),
        }
    }

    fn to_reading(&self, record: WireRecord) -> Option<Reading> {
        let (sensor, payload, ts_raw) = match record {
            WireRecord::Scalar {
                sensor,
                value,
                timestamp,
            } => (sensor, ReadingPayload::Scalar(value), timestamp),
            WireRecord::Spectrum {
                sensor,
                values,
                timestamp,
            } => (sensor, ReadingPayload::Spectrum(values), timestamp),
        };

        if sensor.trim().is_empty() {
            return None;
        }

        if let ReadingPayload::Spectrum(values) = &payload {
            if let Some(&expected_len) = self.spectral_lengths.get(&sensor) {
                if values.len() != expected_len {
                    warn!(
                        "decoder: spectrum length mismatch for {sensor}: expected {expected_len}, got {}",
                        values.len()
                    );
                    return None;
                }
            }
        }

        let (timestamp, synthesized) = match ts_raw.as_deref().map(chrono::DateTime::parse_from_rfc3339) {
            Some(Ok(ts)) => (ts.with_timezone(&Utc), false),
            _ => (Utc::now(), true),
        };

        Some(Reading {
            sensor,
            payload,
            timestamp,
            timestamp_synthesized: synthesized,
        })
    }
}

/// Writes one reading to a writer in the wire's NDJSON shape. Used by tests
/// (and could back an outbound-mock helper); the production decoder only
/// ever reads.
#[cfg(test)]
pub(crate) fn write_sensor_line(writer: &mut impl Write, sensor: &str, value: f64) -> std::io::Result<()> {
    writeln!(
        writer,
        r#"{{"type":"sensor_reading","sensor":"{sensor}","value":{value},"timestamp":"{}"}}"#,
        Utc::now().to_rfc3339()
    )
}

#[cfg(test)]
pub(crate) fn write_spectrum_line(writer: &mut impl Write, sensor: &str, values: &[f64]) -> std::io::Result<()> {
    let values_json = serde_json::to_string(values).expect("f64 vec always serializes");
    writeln!(
        writer,
        r#"{{"type":"ftir_spectrum","sensor":"{sensor}","values":{values_json},"timestamp":"{}"}}"#,
        Utc::now().to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn spawn_decoder_against(listener_addr: std::net::SocketAddr) -> (Decoder, Arc<BoundedDropOldest<Reading>>, Shutdown) {
        let (decoder, readings, _store, shutdown) =
            spawn_decoder_with_spectral_lengths(listener_addr, HashMap::new());
        (decoder, readings, shutdown)
    }

    fn spawn_decoder_with_spectral_lengths(
        listener_addr: std::net::SocketAddr,
        spectral_lengths: HashMap<String, usize>,
    ) -> (Decoder, Arc<BoundedDropOldest<Reading>>, Arc<StateStore>, Shutdown) {
        let readings = Arc::new(BoundedDropOldest::new(64));
        let store = Arc::new(StateStore::new());
        let shutdown = Shutdown::new();
        let config = TcpClientConfig {
            host: listener_addr.ip().to_string(),
            port: listener_addr.port(),
            timeout_s: 1,
            max_line_bytes: 1024,
            reconnect_backoff: crate::config::ReconnectBackoff {
                init_ms: 20,
                cap_ms: 100,
            },
        };
        let decoder = Decoder::new(config, spectral_lengths, readings.clone(), store.clone(), shutdown.clone());
        (decoder, readings, store, shutdown)
    }

    #[test]
    fn decodes_sensor_reading_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (decoder, readings, shutdown) = spawn_decoder_against(addr);

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            write_sensor_line(&mut stream, "Pressure", 2.3).unwrap();
            thread::sleep(Duration::from_millis(50));
        });

        let handle = thread::spawn(move || decoder.run());
        thread::sleep(Duration::from_millis(200));
        shutdown.signal();
        server.join().unwrap();
        handle.join().unwrap();

        let reading = readings.try_pop().expect("expected a decoded reading");
        assert_eq!(reading.sensor, "Pressure");
        match reading.payload {
            ReadingPayload::Scalar(v) => assert_eq!(v, 2.3),
            _ => panic!("expected scalar payload"),
        }
    }

    #[test]
    fn reconnects_after_disconnect_and_resumes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (decoder, readings, shutdown) = spawn_decoder_against(addr);

        let server = thread::spawn(move || {
            {
                let (mut stream, _) = listener.accept().unwrap();
                write_sensor_line(&mut stream, "Pressure", 1.0).unwrap();
                // dropping the stream here simulates an abrupt disconnect
            }
            let (mut stream, _) = listener.accept().unwrap();
            write_sensor_line(&mut stream, "Pressure", 9.0).unwrap();
            thread::sleep(Duration::from_millis(50));
        });

        let handle = thread::spawn(move || decoder.run());
        thread::sleep(Duration::from_millis(400));
        shutdown.signal();
        server.join().unwrap();
        handle.join().unwrap();

        let mut values = Vec::new();
        while let Some(r) = readings.try_pop() {
            if let ReadingPayload::Scalar(v) = r.payload {
                values.push(v);
            }
        }
        assert!(values.contains(&1.0));
        assert!(values.contains(&9.0));
    }

    #[test]
    fn accepts_spectrum_matching_declared_length() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut lengths = HashMap::new();
        lengths.insert("IR1".to_string(), 4);
        let (decoder, readings, store, shutdown) = spawn_decoder_with_spectral_lengths(addr, lengths);

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            write_spectrum_line(&mut stream, "IR1", &[1.0, 2.0, 3.0, 4.0]).unwrap();
            thread::sleep(Duration::from_millis(50));
        });

        let handle = thread::spawn(move || decoder.run());
        thread::sleep(Duration::from_millis(200));
        shutdown.signal();
        server.join().unwrap();
        handle.join().unwrap();

        let reading = readings.try_pop().expect("expected a decoded spectrum reading");
        match reading.payload {
            ReadingPayload::Spectrum(values) => assert_eq!(values.len(), 4),
            _ => panic!("expected spectrum payload"),
        }
        assert_eq!(store.counters().readings_rejected, 0);
    }

    #[test]
    fn rejects_spectrum_with_wrong_length() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut lengths = HashMap::new();
        lengths.insert("IR1".to_string(), 4);
        let (decoder, readings, store, shutdown) = spawn_decoder_with_spectral_lengths(addr, lengths);

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            write_spectrum_line(&mut stream, "IR1", &[1.0, 2.0, 3.0]).unwrap();
            thread::sleep(Duration::from_millis(50));
        });

        let handle = thread::spawn(move || decoder.run());
        thread::sleep(Duration::from_millis(200));
        shutdown.signal();
        server.join().unwrap();
        handle.join().unwrap();

        assert!(
            readings.try_pop().is_none(),
            "mismatched-length spectrum must be rejected, not queued"
        );
        assert_eq!(store.counters().readings_rejected, 1);
    }
}
