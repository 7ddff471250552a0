use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use pmu_digest_cli::listener::{DigestLog, Listener, ListenerConfig, DEFAULT_QUEUE_DEPTH};
use pmu_digest_cli::sender::{load_drop_indexes, FrameSender, SenderConfig, DEFAULT_PORT};
use pmu_digest_core::pmu_digest::digest::decode;
use pmu_digest_core::samples::{read_samples_csv, SampleColumns};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tokio::sync::oneshot;
use tokio::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "pmu-digest")]
#[command(about = "Send PMU telemetry frames and log switch digests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a PMU sample CSV as UDP telemetry frames.
    #[command(arg_required_else_help = true)]
    Send {
        csv: PathBuf,
        #[arg(long, env = "PMU_DEST_IP", default_value = "10.0.2.2")]
        ip: IpAddr,
        #[arg(long, env = "PMU_DEST_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Number of samples to send, 0 for the whole file.
        #[arg(long, default_value_t = 100)]
        num_packets: usize,
        /// JSON array of sample indexes to divert to the loopback address.
        #[arg(long)]
        drop_indexes: Option<PathBuf>,
        #[arg(long, default_value_t = 17)]
        interval_ms: u64,
        /// Write `index, sent_at, target` for every frame to this CSV file.
        #[arg(long)]
        sent_log: Option<PathBuf>,
        #[arg(long, default_value = "TimeTag")]
        time_column: String,
    },
    /// Receive digests and append their records to a CSV file.
    Listen {
        #[arg(long, env = "DIGEST_BIND", default_value = "0.0.0.0:9090")]
        bind: SocketAddr,
        #[arg(long, default_value = "digests.csv")]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH)]
        queue_depth: usize,
        #[arg(long)]
        max_digests: Option<usize>,
    },
    /// Decode a captured digest buffer and print it as JSON.
    #[command(arg_required_else_help = true)]
    Inspect { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Cli::parse();

    match args.command {
        Commands::Send {
            csv,
            ip,
            port,
            num_packets,
            drop_indexes,
            interval_ms,
            sent_log,
            time_column,
        } => {
            let columns = SampleColumns {
                time: time_column,
                ..SampleColumns::default()
            };
            let samples = read_samples_csv(&csv, &columns)
                .with_context(|| format!("failed to read samples from {}", csv.display()))?;
            info!("Loaded {} samples from {}", samples.len(), csv.display());

            let mut config = SenderConfig::new(ip, port);
            config.num_packets = num_packets;
            config.interval = Duration::from_millis(interval_ms);
            if let Some(path) = drop_indexes {
                config.drop_indexes = load_drop_indexes(&path)?;
                info!("Dropping {} sample indexes", config.drop_indexes.len());
            }

            let sender = FrameSender::bind(config)
                .await
                .context("failed to bind UDP socket")?;
            let report = sender.send_all(&samples).await.context("failed to send frames")?;

            if let Some(path) = sent_log {
                let file = File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                report.write_csv(BufWriter::new(file))?;
                info!("Wrote send times to {}", path.display());
            }
        }
        Commands::Listen {
            bind,
            output,
            queue_depth,
            max_digests,
        } => {
            let file = File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            let log = DigestLog::new(BufWriter::new(file));

            let config = ListenerConfig {
                bind,
                queue_depth,
                max_digests,
            };
            let listener = Listener::bind(config)
                .await
                .with_context(|| format!("failed to bind {}", bind))?;

            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(());
                }
            });

            let log = listener.run(log, shutdown_rx).await?;
            println!(
                "{} records from {} digests written to {}",
                log.records_logged(),
                log.digests_seen() - log.digests_rejected(),
                output.display()
            );
            log.into_inner().flush()?;
        }
        Commands::Inspect { file } => {
            let buffer =
                fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let records = decode(&buffer)
                .with_context(|| format!("failed to decode {}", file.display()))?;

            let output = serde_json::json!({
                "header": records.header(),
                "records": records.clone().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
