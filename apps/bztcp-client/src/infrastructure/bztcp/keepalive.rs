//! Keep-Alive Prober
//!
//! Sends `PING` on a fixed period while a session is streaming. The server
//! answers with `PONG`, which the read loop recognises and drops.
//!
//! The prober owns the shutdown of the outbound half: once its cancellation
//! token fires it stops scheduling pings and closes the writer as its last act.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::messages::{PingData, TIME_FORMAT, status};
use super::writer::FrameWriter;
use crate::application::ports::Clock;
use crate::infrastructure::metrics;

/// Default period between pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(20);

/// Configuration for the keep-alive prober.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Period between pings.
    pub ping_interval: Duration,
    /// chrono layout used for the `pingTime` field.
    pub timestamp_layout: String,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            timestamp_layout: TIME_FORMAT.to_string(),
        }
    }
}

/// Periodic PING task bound to one session.
pub struct KeepAlive<W> {
    config: KeepAliveConfig,
    writer: Arc<FrameWriter<W>>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl<W: AsyncWrite + Unpin> KeepAlive<W> {
    /// Create a prober writing through `writer`.
    #[must_use]
    pub fn new(
        config: KeepAliveConfig,
        writer: Arc<FrameWriter<W>>,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            writer,
            clock,
            cancel,
        }
    }

    /// Run until cancelled, then close the writer.
    ///
    /// Returns the number of pings written. A failed ping is logged and the
    /// prober keeps its schedule; the read loop is the one that surfaces
    /// transport failures.
    ///
    /// A zero period is replaced by [`DEFAULT_PING_INTERVAL`].
    pub async fn run(self) -> u64 {
        let period = if self.config.ping_interval.is_zero() {
            tracing::warn!(
                default = ?DEFAULT_PING_INTERVAL,
                "Zero ping interval, using the default"
            );
            DEFAULT_PING_INTERVAL
        } else {
            self.config.ping_interval
        };
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sent = 0;
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!(pings = sent, "Keep-alive cancelled");
                    break;
                }
                _ = interval.tick() => {
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        result = self.ping() => match result {
                            Ok(()) => sent += 1,
                            Err(err) => tracing::warn!(error = %err, "Failed to send ping"),
                        },
                    }
                }
            }
        }

        if let Err(err) = self.writer.close().await {
            tracing::debug!(error = %err, "Transport close reported an error");
        }
        sent
    }

    async fn ping(&self) -> super::error::Result<()> {
        let ping = PingData::at(&self.clock.now(), &self.config.timestamp_layout);
        self.writer.send_json(status::PING, &ping).await?;
        metrics::record_ping_sent();
        tracing::debug!(ping_time = %ping.ping_time, "Sent ping");
        Ok(())
    }
}
