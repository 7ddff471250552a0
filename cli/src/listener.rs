//! # Digest Listener
//!
//! Receives digest buffers from the switch and appends every decoded record to a CSV
//! log. A receive task reads datagrams and queues them on a bounded channel; the task
//! that called `Listener::run` decodes them in arrival order and owns the log.
//!
//! ## Key Components
//!
//! - `ListenerConfig`: Bind address, queue depth and an optional digest limit.
//! - `DigestLog`: Decode-and-log sink. Owns the CSV writer and the record counters.
//! - `Listener`: Binds the UDP socket and drives the receive and decode loops.
//!
//! A digest that fails to decode is logged and dropped as a whole; the listener keeps
//! running.
use log::{debug, info, trace, warn};
use pmu_digest_core::batch::records_to_batch;
use pmu_digest_core::pmu_digest::common::DecodeError;
use pmu_digest_core::pmu_digest::digest::decode;

use anyhow::Context;
use arrow::error::ArrowError;
use std::io::Write;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};

/// Largest datagram the receive task accepts.
pub const MAX_DATAGRAM: usize = 65_536;

pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("dropping digest: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to write digest records: {0}")]
    Arrow(#[from] ArrowError),
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub bind: SocketAddr,
    pub queue_depth: usize,
    /// Stop after this many digests have been processed.
    pub max_digests: Option<usize>,
}

impl ListenerConfig {
    pub fn new(bind: SocketAddr) -> Self {
        ListenerConfig {
            bind,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            max_digests: None,
        }
    }
}

/// Appends decoded digest records to a CSV writer.
///
/// Rows follow `batch::telemetry_schema`; the header is written once, before the first
/// digest. Each digest is flushed as soon as it is written.
pub struct DigestLog<W: Write> {
    writer: arrow::csv::Writer<W>,
    records_logged: usize,
    digests_seen: usize,
    digests_rejected: usize,
}

impl<W: Write> DigestLog<W> {
    pub fn new(writer: W) -> Self {
        DigestLog {
            writer: arrow::csv::Writer::new(writer),
            records_logged: 0,
            digests_seen: 0,
            digests_rejected: 0,
        }
    }

    /// Decodes one digest buffer and logs all of its records.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)`: Number of records written.
    /// * `Err(IngestError::Decode)`: The buffer is malformed; nothing was written.
    /// * `Err(IngestError::Arrow)`: The records could not be converted or written.
    pub fn ingest(&mut self, buffer: &[u8]) -> Result<usize, IngestError> {
        self.digests_seen += 1;

        let records = match decode(buffer) {
            Ok(records) => records,
            Err(e) => {
                self.digests_rejected += 1;
                return Err(e.into());
            }
        };
        let header = *records.header();
        let records: Vec<_> = records.collect();

        let batch = records_to_batch(&records)?;
        self.writer.write(&batch)?;
        self.records_logged += records.len();

        debug!(
            "Digest buffer {} (list {}, context {}): {} records",
            header.buffer_id,
            header.list_id,
            header.context_id,
            records.len()
        );
        Ok(records.len())
    }

    /// Total records written so far.
    pub fn records_logged(&self) -> usize {
        self.records_logged
    }

    pub fn digests_seen(&self) -> usize {
        self.digests_seen
    }

    pub fn digests_rejected(&self) -> usize {
        self.digests_rejected
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

pub struct Listener {
    socket: UdpSocket,
    config: ListenerConfig,
}

impl Listener {
    pub async fn bind(config: ListenerConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(config.bind).await?;
        Ok(Listener { socket, config })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives and logs digests until `shutdown` fires or `max_digests` is reached.
    ///
    /// Dropping the `shutdown` sender also stops the listener. Digests still queued at
    /// that point are discarded.
    ///
    /// # Returns
    ///
    /// The log, so the caller can read its counters and flush the writer.
    pub async fn run<W: Write>(
        self,
        mut log: DigestLog<W>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> anyhow::Result<DigestLog<W>> {
        let Listener { socket, config } = self;
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(config.queue_depth.max(1));

        info!("Listening for digests on {}", socket.local_addr()?);

        let receiver = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                let (n, peer) = socket.recv_from(&mut buf).await?;
                trace!("Received {} bytes from {}", n, peer);
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    return Ok::<(), io::Error>(());
                }
            }
        });

        let mut processed = 0usize;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                message = rx.recv() => {
                    let Some(buffer) = message else {
                        break;
                    };
                    processed += 1;
                    match log.ingest(&buffer) {
                        Ok(count) => trace!("Logged {} records", count),
                        Err(e) => warn!("{}", e),
                    }
                    if config.max_digests.is_some_and(|max| processed >= max) {
                        info!("Reached digest limit of {}", processed);
                        break;
                    }
                }
            }
        }

        receiver.abort();
        match receiver.await {
            Ok(result) => result.context("digest receive loop failed")?,
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(e).context("digest receive task panicked"),
        }

        info!(
            "Processed {} digests ({} rejected), {} records logged",
            log.digests_seen(),
            log.digests_rejected(),
            log.records_logged()
        );
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmu_digest_core::pmu_digest::random::random_digest;

    #[test]
    fn test_digest_log_counts_records() {
        let mut log = DigestLog::new(Vec::new());
        let (first, _) = random_digest(3);
        let (second, _) = random_digest(2);

        assert_eq!(log.ingest(&first).unwrap(), 3);
        assert_eq!(log.ingest(&second).unwrap(), 2);
        assert_eq!(log.records_logged(), 5);
        assert_eq!(log.digests_seen(), 2);

        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Datetime,Phasor0Magnitude,Phasor0Angle"));
        assert!(lines[0].ends_with("SourceIP,DestIP"));
    }

    #[test]
    fn test_digest_log_rejects_whole_buffer() {
        let mut log = DigestLog::new(Vec::new());
        let (mut buffer, _) = random_digest(2);
        buffer.truncate(32 + 40 + 10);

        let err = log.ingest(&buffer).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Decode(DecodeError::TruncatedRecord(1))
        ));
        assert_eq!(log.records_logged(), 0);
        assert_eq!(log.digests_rejected(), 1);
        assert!(log.into_inner().is_empty());
    }
}
