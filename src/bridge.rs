//! Hand-off of work from the web runtime to the gateway runtime.
//!
//! The admin API never talks to the gateway directly. It queues a
//! [`GatewayTask`] and waits a bounded time for the gateway's dispatch loop
//! to answer on the task's oneshot.

use poise::serenity_prelude::GuildId;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::{BotError, Result};
use crate::publish::PublishReceipt;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const QUEUE_DEPTH: usize = 16;

#[derive(Debug)]
pub enum GatewayTask {
    Publish {
        guild_id: GuildId,
        reply: oneshot::Sender<Result<PublishReceipt>>,
    },
}

#[derive(Clone)]
pub struct GatewayBridge {
    tx: mpsc::Sender<GatewayTask>,
    timeout: Duration,
}

pub type TaskReceiver = mpsc::Receiver<GatewayTask>;

pub fn channel(timeout: Duration) -> (GatewayBridge, TaskReceiver) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    (GatewayBridge { tx, timeout }, rx)
}

impl GatewayBridge {
    /// Run the publish workflow on the gateway and wait for its result.
    ///
    /// On timeout the task is not cancelled; it may still complete later.
    pub async fn publish(&self, guild_id: GuildId) -> Result<PublishReceipt> {
        let (reply, rx) = oneshot::channel();
        let deadline = tokio::time::Instant::now() + self.timeout;

        // Queueing counts against the same deadline as the work itself.
        match tokio::time::timeout_at(deadline, self.tx.send(GatewayTask::Publish { guild_id, reply }))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(BotError::GatewayUnavailable),
            Err(_) => return Err(self.timed_out(guild_id)),
        }

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(result)) => result,
            // The dispatch loop dropped the task without answering.
            Ok(Err(_)) => Err(BotError::GatewayUnavailable),
            Err(_) => Err(self.timed_out(guild_id)),
        }
    }

    fn timed_out(&self, guild_id: GuildId) -> BotError {
        warn!(
            "Publish for guild {} did not finish within {:?}; it may still complete",
            guild_id, self.timeout
        );
        BotError::Timeout {
            seconds: self.timeout.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> PublishReceipt {
        PublishReceipt {
            message_id: 1000,
            channel_id: 30,
            emoji: "✅".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_returns_gateway_answer() {
        let (bridge, mut rx) = channel(Duration::from_secs(5));
        tokio::spawn(async move {
            while let Some(GatewayTask::Publish { guild_id, reply }) = rx.recv().await {
                assert_eq!(guild_id, GuildId::new(10));
                let _ = reply.send(Ok(receipt()));
            }
        });

        assert_eq!(bridge.publish(GuildId::new(10)).await.unwrap(), receipt());
    }

    #[tokio::test]
    async fn test_publish_passes_through_errors() {
        let (bridge, mut rx) = channel(Duration::from_secs(5));
        tokio::spawn(async move {
            while let Some(GatewayTask::Publish { reply, .. }) = rx.recv().await {
                let _ = reply.send(Err(BotError::RoleNotFound { id: "20".into() }));
            }
        });

        assert!(matches!(
            bridge.publish(GuildId::new(10)).await,
            Err(BotError::RoleNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_stalled_gateway_times_out() {
        let (bridge, _rx) = channel(Duration::from_millis(50));

        let result = bridge.publish(GuildId::new(10)).await;
        assert!(matches!(result, Err(BotError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_stopped_gateway_is_unavailable() {
        let (bridge, rx) = channel(Duration::from_secs(5));
        drop(rx);

        assert!(matches!(
            bridge.publish(GuildId::new(10)).await,
            Err(BotError::GatewayUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_dropped_task_is_unavailable() {
        let (bridge, mut rx) = channel(Duration::from_secs(5));
        tokio::spawn(async move {
            // Take the task and drop it unanswered.
            let _ = rx.recv().await;
        });

        assert!(matches!(
            bridge.publish(GuildId::new(10)).await,
            Err(BotError::GatewayUnavailable)
        ));
    }
}
