//! # PMU Frame Sender
//!
//! Replays recorded PMU samples toward the switch as UDP telemetry frames, one datagram
//! per sample at a fixed pace. Selected sample indexes are diverted to the loopback
//! address instead of the switch to simulate measurement loss upstream of it.
//!
//! ## Key Components
//!
//! - `SenderConfig`: Destination, loopback target, pacing, packet limit and drop list.
//! - `load_drop_indexes`: Reads the drop list from a JSON array of sample indexes.
//! - `FrameSender`: Owns the UDP socket and sends a slice of samples.
//! - `SendReport`: Per-frame send times, writable as CSV.
use log::{debug, info};
use pmu_digest_core::batch::UTC_OFFSET;
use pmu_digest_core::pmu_digest::frame::TelemetrySample;

use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io;
use tokio::net::UdpSocket;
use tokio::time::{self, Duration};

/// Port the receiver listens on for telemetry frames.
pub const DEFAULT_PORT: u16 = 4712;

/// Pause before each frame, roughly one 60 Hz reporting period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(17);

#[derive(Debug, Error)]
pub enum DropIndexError {
    #[error("failed to read drop index file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("drop index file {path} is not a JSON array of indexes: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub destination: SocketAddr,
    /// Target for dropped samples, on the same port as `destination`.
    pub loopback: SocketAddr,
    pub interval: Duration,
    /// Maximum number of samples to send, 0 sends all of them.
    pub num_packets: usize,
    pub drop_indexes: HashSet<usize>,
}

impl SenderConfig {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        SenderConfig {
            destination: SocketAddr::new(ip, port),
            loopback: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
            interval: DEFAULT_INTERVAL,
            num_packets: 0,
            drop_indexes: HashSet::new(),
        }
    }

    /// Where sample `index` is sent.
    pub fn target_for(&self, index: usize) -> SocketAddr {
        if self.drop_indexes.contains(&index) {
            self.loopback
        } else {
            self.destination
        }
    }

    /// Number of samples sent out of `available`.
    pub fn packets_to_send(&self, available: usize) -> usize {
        if self.num_packets == 0 {
            available
        } else {
            self.num_packets.min(available)
        }
    }
}

/// Reads a JSON array of sample indexes, e.g. `[3, 17, 42]`.
pub fn load_drop_indexes(path: impl AsRef<Path>) -> Result<HashSet<usize>, DropIndexError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| DropIndexError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let indexes: Vec<usize> =
        serde_json::from_str(&content).map_err(|source| DropIndexError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(indexes.into_iter().collect())
}

/// One frame handed to the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentFrame {
    pub index: usize,
    pub target: SocketAddr,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SendReport {
    pub frames: Vec<SentFrame>,
}

impl SendReport {
    /// Frames that went to `loopback` instead of the destination.
    pub fn dropped(&self, loopback: SocketAddr) -> usize {
        self.frames.iter().filter(|f| f.target == loopback).count()
    }

    /// Builds an `index, sent_at, target` record batch.
    pub fn to_batch(&self) -> Result<RecordBatch, ArrowError> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("index", DataType::UInt64, false),
            Field::new(
                "sent_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some(UTC_OFFSET.into())),
                false,
            ),
            Field::new("target", DataType::Utf8, false),
        ]));

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(UInt64Array::from_iter_values(
                self.frames.iter().map(|f| f.index as u64),
            )),
            Arc::new(
                TimestampMicrosecondArray::from(
                    self.frames
                        .iter()
                        .map(|f| f.sent_at.timestamp_micros())
                        .collect::<Vec<_>>(),
                )
                .with_timezone(UTC_OFFSET),
            ),
            Arc::new(StringArray::from_iter_values(
                self.frames.iter().map(|f| f.target.to_string()),
            )),
        ];

        RecordBatch::try_new(schema, arrays)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ArrowError> {
        let mut writer = arrow::csv::Writer::new(writer);
        writer.write(&self.to_batch()?)
    }
}

pub struct FrameSender {
    socket: UdpSocket,
    config: SenderConfig,
}

impl FrameSender {
    /// Binds an ephemeral local socket matching the destination's address family.
    pub async fn bind(config: SenderConfig) -> io::Result<Self> {
        let local: SocketAddr = match config.destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(FrameSender { socket, config })
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sends samples in order, sleeping `interval` before each frame.
    ///
    /// # Returns
    ///
    /// * `Ok(SendReport)`: One entry per frame sent, in send order.
    /// * `Err(io::Error)`: The first socket error; frames before it were sent.
    pub async fn send_all(&self, samples: &[TelemetrySample]) -> io::Result<SendReport> {
        let count = self.config.packets_to_send(samples.len());
        let mut report = SendReport {
            frames: Vec::with_capacity(count),
        };

        for (index, sample) in samples.iter().take(count).enumerate() {
            if index == 0 {
                info!("Start transmission at: {}", Utc::now());
            }
            let target = self.config.target_for(index);
            time::sleep(self.config.interval).await;

            let frame = sample.to_frame();
            let sent_at = Utc::now();
            self.socket.send_to(&frame, target).await?;
            debug!("Sent frame {} ({} bytes) to {}", index, frame.len(), target);

            report.frames.push(SentFrame {
                index,
                target,
                sent_at,
            });
        }

        info!(
            "Sent {} frames to {} ({} diverted to {})",
            report.frames.len(),
            self.config.destination,
            report.dropped(self.config.loopback),
            self.config.loopback
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_for() {
        let mut config = SenderConfig::new("10.0.2.2".parse().unwrap(), DEFAULT_PORT);
        config.drop_indexes.insert(1);

        assert_eq!(config.target_for(0), "10.0.2.2:4712".parse().unwrap());
        assert_eq!(config.target_for(1), "127.0.0.1:4712".parse().unwrap());
    }

    #[test]
    fn test_packets_to_send() {
        let mut config = SenderConfig::new("10.0.2.2".parse().unwrap(), DEFAULT_PORT);
        assert_eq!(config.packets_to_send(250), 250);
        config.num_packets = 100;
        assert_eq!(config.packets_to_send(250), 100);
        assert_eq!(config.packets_to_send(20), 20);
    }

    #[test]
    fn test_load_drop_indexes() {
        let path = std::env::temp_dir().join(format!("drop_indexes_{}.json", std::process::id()));
        fs::write(&path, "[3, 17, 42, 3]").unwrap();
        let indexes = load_drop_indexes(&path).unwrap();
        assert_eq!(indexes, HashSet::from([3, 17, 42]));

        fs::write(&path, "{\"drop\": 1}").unwrap();
        let err = load_drop_indexes(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, DropIndexError::Json { .. }));
    }

    #[test]
    fn test_report_csv() {
        let loopback: SocketAddr = "127.0.0.1:4712".parse().unwrap();
        let report = SendReport {
            frames: vec![
                SentFrame {
                    index: 0,
                    target: "10.0.2.2:4712".parse().unwrap(),
                    sent_at: Utc::now(),
                },
                SentFrame {
                    index: 1,
                    target: loopback,
                    sent_at: Utc::now(),
                },
            ],
        };
        assert_eq!(report.dropped(loopback), 1);

        let mut out = Vec::new();
        report.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "index,sent_at,target");
        assert!(lines[2].starts_with("1,"));
        assert!(lines[2].ends_with(",127.0.0.1:4712"));
    }
}
