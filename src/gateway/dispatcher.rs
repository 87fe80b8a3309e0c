use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::bridge::{GatewayTask, TaskReceiver};
use crate::config::SharedConfigStore;
use crate::events::{handle_member_join, handle_reaction, VerificationEvent};
use crate::platform::SharedPlatform;
use crate::publish::publish_verification;

pub type EventSender = mpsc::UnboundedSender<VerificationEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<VerificationEvent>;

/// The gateway's single dispatch loop.
///
/// Takes one notification or bridged task at a time and runs it to
/// completion before looking at the next, so handlers never overlap.
pub struct Dispatcher {
    platform: SharedPlatform,
    store: SharedConfigStore,
}

impl Dispatcher {
    pub fn new(platform: SharedPlatform, store: SharedConfigStore) -> Self {
        Self { platform, store }
    }

    pub async fn run(self, mut events: EventReceiver, mut tasks: TaskReceiver) {
        info!("Dispatch loop started");
        loop {
            tokio::select! {
                Some(event) = events.recv() => self.dispatch_event(event).await,
                Some(task) = tasks.recv() => self.dispatch_task(task).await,
                else => break,
            }
        }
        info!("Dispatch loop stopped");
    }

    async fn dispatch_event(&self, event: VerificationEvent) {
        let description = event.describe();
        let handled = AssertUnwindSafe(self.handle_event(event)).catch_unwind().await;
        if handled.is_err() {
            error!("Handler panicked on {}", description);
        }
    }

    async fn handle_event(&self, event: VerificationEvent) {
        let platform = self.platform.as_ref();
        match event {
            VerificationEvent::MemberJoined(join) => {
                let outcome = handle_member_join(platform, &self.store, &join).await;
                debug!("Join of {} in {}: {:?}", join.user_id, join.guild_id, outcome);
            }
            VerificationEvent::Reaction(reaction) => {
                let outcome = handle_reaction(platform, &self.store, &reaction).await;
                debug!(
                    "Reaction {:?} by {} on {}: {:?}",
                    reaction.kind, reaction.user_id, reaction.message_id, outcome
                );
            }
        }
    }

    async fn dispatch_task(&self, task: GatewayTask) {
        match task {
            GatewayTask::Publish { guild_id, reply } => {
                let result = AssertUnwindSafe(publish_verification(
                    self.platform.as_ref(),
                    &self.store,
                    guild_id,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!("Publish for guild {} panicked", guild_id);
                    Err(crate::error::BotError::Internal {
                        message: "publish panicked".to_string(),
                    })
                });

                if let Err(e) = &result {
                    error!("Publish for guild {} failed: {}", guild_id, e);
                }
                if reply.send(result).is_err() {
                    info!(
                        "Publish for guild {} finished after the caller stopped waiting",
                        guild_id
                    );
                }
            }
        }
    }
}
