use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use peermon_logging::{init_logging, LogConfig};
use peermon_monitor::{Exporter, FileExporter, LogExporter, Monitor, MonitorConfig};
use peermon_net_tcp::TcpHost;
use peermon_types::PeerId;
use tokio::sync::watch;

/// Peer telemetry monitor
#[derive(Parser, Debug)]
#[command(name = "peermon-monitor", version, about)]
struct Args {
    /// Seconds between successful telemetry collections on one peer
    #[arg(long, default_value_t = 120, env = "PEERMON_COLLECT_PERIOD")]
    collect_period: u64,

    /// Seconds between successful bandwidth collections on one peer
    #[arg(long, default_value_t = 600, env = "PEERMON_BANDWIDTH_PERIOD")]
    bandwidth_period: u64,

    /// Cumulative per-peer failure count past which the peer is removed
    #[arg(long, default_value_t = 3, env = "PEERMON_MAX_FAILED_ATTEMPTS")]
    max_failed_attempts: u32,

    /// Where collected telemetry goes
    #[arg(long, value_enum, default_value = "log", env = "PEERMON_EXPORTER")]
    exporter: ExporterKind,

    /// Output path for the file exporter
    #[arg(long, default_value = "./telemetry.jsonl", env = "PEERMON_EXPORT_PATH")]
    export_path: PathBuf,

    /// Seed peer as id@host:port; repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Log level filter
    #[arg(long, default_value = "info", env = "PEERMON_LOG_LEVEL")]
    log_level: String,

    /// Directory for log files; console-only when absent
    #[arg(long, env = "PEERMON_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExporterKind {
    Log,
    File,
}

fn parse_peer(spec: &str) -> anyhow::Result<(PeerId, SocketAddr)> {
    let (id, addr) = spec
        .split_once('@')
        .with_context(|| format!("peer must be id@host:port: {spec}"))?;
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("bad peer address in {spec}"))?;
    Ok((PeerId::new(id), addr))
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");
    tokio::select! {
        _ = ctrl_c => { tracing::info!("received CTRL+C"); }
        _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = init_logging(&LogConfig {
        level: args.log_level.clone(),
        log_dir: args.log_dir.clone(),
        ..LogConfig::default()
    });

    let exporter: Arc<dyn Exporter> = match args.exporter {
        ExporterKind::Log => Arc::new(LogExporter),
        ExporterKind::File => Arc::new(FileExporter::new(&args.export_path)),
    };

    let host = Arc::new(TcpHost::new());
    let mut seeds = Vec::new();
    for spec in &args.peers {
        let (id, addr) = parse_peer(spec)?;
        host.add_address(id.clone(), addr);
        seeds.push(id);
    }

    let config = MonitorConfig {
        collect_period: Duration::from_secs(args.collect_period),
        bandwidth_period: Duration::from_secs(args.bandwidth_period),
        max_failed_attempts: args.max_failed_attempts,
    };

    tracing::info!(peers = seeds.len(), "starting monitor");
    let monitor = Arc::new(Monitor::with_host(config, host, exporter));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.run(shutdown_rx).await })
    };

    for id in seeds {
        monitor.peer_discovered(id);
    }

    wait_for_shutdown_signal().await;
    tracing::info!("shutting down");
    monitor.close();
    let _ = shutdown_tx.send(true);
    let _ = run.await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_peer() {
        let (id, addr) = parse_peer("12D3KooWA@10.0.0.1:4640").unwrap();
        assert_eq!(id, PeerId::new("12D3KooWA"));
        assert_eq!(addr, "10.0.0.1:4640".parse().unwrap());
    }

    #[test]
    fn test_parse_peer_rejects_bad_specs() {
        assert!(parse_peer("missing-at-sign").is_err());
        assert!(parse_peer("id@not-an-addr").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["peermon-monitor"]);
        assert_eq!(args.collect_period, 120);
        assert_eq!(args.bandwidth_period, 600);
        assert_eq!(args.max_failed_attempts, 3);
        assert_eq!(args.exporter, ExporterKind::Log);
        assert!(args.peers.is_empty());
    }

    #[test]
    fn test_args_peers_repeatable() {
        let args = Args::parse_from([
            "peermon-monitor",
            "--peer",
            "a@127.0.0.1:1",
            "--peer",
            "b@127.0.0.1:2",
        ]);
        assert_eq!(args.peers.len(), 2);
    }
}
