//! BZTCP Stream Binary
//!
//! Connects to a BZTCP server and prints every STREAM record to stdout as one
//! JSON document per line. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! BZTCP_USER=bztest BZTCP_KEY=12345 cargo run --bin bztcp
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `BZTCP_USER`: account username
//! - `BZTCP_KEY`: API key
//!
//! ## Optional
//! - `BZTCP_ADDR`: server address (default: tcp-v1.benzinga.io:11337)
//! - `BZTCP_TLS`: wrap the connection in TLS (default: false)
//! - `BZTCP_CONNECT_TIMEOUT_SECS`: connect bound (default: 10)
//! - `BZTCP_AUTH_TIMEOUT_SECS`: handshake bound (default: 10)
//! - `BZTCP_PING_INTERVAL_SECS`: keep-alive period (default: 20)
//! - `BZTCP_VERBOSE`: debug logging (default: false)
//! - `BZTCP_METRICS_PORT`: Prometheus exporter port, 0 disables (default: 0)
//! - `RUST_LOG`: extra log filter directives

use std::io::{self, Write};
use std::time::Instant;

use anyhow::Context;
use bztcp_client::domain::news::StreamData;
use bztcp_client::infrastructure::telemetry::{self, TelemetryConfig};
use bztcp_client::{ClientConfig, RuntimeSettings, Session, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let settings = RuntimeSettings::from_env();
    telemetry::init(&TelemetryConfig {
        verbose: settings.verbose,
    });

    if settings.metrics_port != 0 {
        init_metrics(settings.metrics_port).context("failed to start metrics exporter")?;
    }

    let config = ClientConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        addr = %config.addr,
        tls = config.tls,
        user = config.credentials.username(),
        ping_interval_secs = config.ping_interval.as_secs(),
        "Configuration loaded"
    );

    let started = Instant::now();
    let session = Session::connect(&config)
        .await
        .with_context(|| format!("failed to connect to {}", config.addr))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(await_shutdown(shutdown.clone()));

    let mut stdout = io::stdout().lock();
    let mut write_error: Option<io::Error> = None;
    let sink_cancel = shutdown.clone();
    let result = session
        .stream(shutdown.clone(), |record: StreamData| {
            if write_error.is_some() {
                return;
            }
            if let Err(err) = write_record(&mut stdout, &record) {
                write_error = Some(err);
                sink_cancel.cancel();
            }
        })
        .await;

    tracing::info!(runtime = ?started.elapsed(), "Session finished");

    if let Some(err) = write_error {
        return Err(err).context("failed to write record to stdout");
    }
    result.context("stream failed")
}

fn write_record(out: &mut impl Write, record: &StreamData) -> io::Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
async fn await_shutdown(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(error = %err, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }

    shutdown.cancel();
}
