use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::{directive, Decision, Outcome, TeleportKind, TeleportRequest};
use crate::config::MainConfig;
use crate::error::MtpError;
use crate::host::Host;
use crate::utils::{same_identity, valid_identity};

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub timeout: Duration,
    pub teleport: bool,
    pub teleport_ask: bool,
    pub teleport_invite: bool,
}

impl TrackerSettings {
    pub fn from_config(config: &MainConfig) -> Self {
        Self {
            timeout: config.timeout.teleport(),
            teleport: config.enable_modules.teleport,
            teleport_ask: config.enable_modules.teleport_ask,
            teleport_invite: config.enable_modules.teleport_invite,
        }
    }
}

#[derive(Debug)]
struct LiveRequest {
    request: TeleportRequest,
    waiter: Option<oneshot::Sender<Outcome>>,
    timer: Option<JoinHandle<()>>,
}

/// Ids are handed out in submission order, so the highest id is the newest
/// request even if the wall clock stepped back in between.
fn newest_index(live: &[LiveRequest], target: &str) -> Option<usize> {
    live.iter()
        .enumerate()
        .filter(|(_, entry)| same_identity(&entry.request.target, target))
        .max_by_key(|(_, entry)| entry.request.id)
        .map(|(index, _)| index)
}

/// Returned by [`RequestTracker::submit`]; resolves once the request settles.
#[derive(Debug)]
pub struct RequestHandle {
    request: TeleportRequest,
    outcome: oneshot::Receiver<Outcome>,
}

impl RequestHandle {
    pub fn request(&self) -> &TeleportRequest {
        &self.request
    }

    /// Yields until the request is accepted, rejected, cancelled or timed out.
    pub async fn wait(self) -> Outcome {
        self.outcome.await.unwrap_or(Outcome::Cancelled)
    }
}

/// Pending teleport confirmations.
///
/// A request leaves the live set under the lock before anything else happens
/// to it, so whichever of confirm, timer, sweep or shutdown removes it first is
/// the only one that notifies players or runs the teleport.
#[derive(Debug)]
pub struct RequestTracker {
    host: Arc<dyn Host>,
    settings: TrackerSettings,
    next_id: AtomicU64,
    live: Mutex<Vec<LiveRequest>>,
}

impl RequestTracker {
    pub fn new(host: Arc<dyn Host>, settings: TrackerSettings) -> Arc<Self> {
        Arc::new(Self {
            host,
            settings,
            next_id: AtomicU64::new(0),
            live: Mutex::new(Vec::new()),
        })
    }

    fn check_enabled(&self, kind: Option<TeleportKind>) -> Result<(), MtpError> {
        if !self.settings.teleport {
            return Err(MtpError::FeatureDisabled("teleport"));
        }
        match kind {
            Some(TeleportKind::Ask) if !self.settings.teleport_ask => {
                Err(MtpError::FeatureDisabled("teleport_ask"))
            }
            Some(TeleportKind::Invite) if !self.settings.teleport_invite => {
                Err(MtpError::FeatureDisabled("teleport_invite"))
            }
            _ => Ok(()),
        }
    }

    pub async fn submit(
        self: &Arc<Self>,
        requesting: &str,
        target: &str,
        kind: TeleportKind,
    ) -> Result<RequestHandle, MtpError> {
        self.check_enabled(Some(kind))?;
        if !valid_identity(requesting) || !valid_identity(target) {
            return Err(MtpError::Validation("invalid player identity".into()));
        }
        if same_identity(requesting, target) {
            return Err(MtpError::Validation("cannot teleport to yourself".into()));
        }

        let (tx, rx) = oneshot::channel();
        let request = {
            let mut live = self.live.lock().await;
            if live
                .iter()
                .any(|entry| entry.request.involves_pair(requesting, target))
            {
                warn!(
                    "Teleport request between {} and {} already pending",
                    requesting, target
                );
                return Err(MtpError::Duplicate {
                    requesting: requesting.to_string(),
                    target: target.to_string(),
                });
            }

            let request = TeleportRequest {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                requesting: requesting.to_string(),
                target: target.to_string(),
                kind,
                created_at: Utc::now(),
                outcome: Outcome::Pending,
            };
            live.push(LiveRequest {
                request: request.clone(),
                waiter: Some(tx),
                timer: Some(self.arm_timer(request.id)),
            });
            request
        };

        info!("Teleport request created: {}", request);
        self.notify(&request.target, request.kind.notify_key()).await;

        Ok(RequestHandle {
            request,
            outcome: rx,
        })
    }

    fn arm_timer(self: &Arc<Self>, id: u64) -> JoinHandle<()> {
        let tracker: Weak<Self> = Arc::downgrade(self);
        let timeout = self.settings.timeout;
        tokio::spawn(async move {
            time::sleep(timeout).await;
            if let Some(tracker) = tracker.upgrade() {
                tracker.fire_timer(id).await;
            }
        })
    }

    async fn fire_timer(&self, id: u64) {
        let entry = {
            let mut live = self.live.lock().await;
            match live.iter().position(|entry| entry.request.id == id) {
                Some(index) => live.remove(index),
                None => return,
            }
        };
        let mut entry = entry;
        // This is the timer's own task; detach instead of aborting it.
        entry.timer.take();
        self.settle(entry, Outcome::TimedOut).await;
    }

    /// Resolves the most recent live request targeting `target`. Older requests
    /// to the same player stay pending until they are resolved or expire.
    pub async fn confirm(
        &self,
        target: &str,
        decision: Decision,
    ) -> Result<TeleportRequest, MtpError> {
        self.check_enabled(None)?;
        if !valid_identity(target) {
            return Err(MtpError::Validation("invalid player identity".into()));
        }

        let entry = {
            let mut live = self.live.lock().await;
            match newest_index(&live, target) {
                Some(index) => live.remove(index),
                None => return Err(MtpError::NotFound(target.to_string())),
            }
        };

        Ok(self.settle(entry, decision.into()).await)
    }

    /// The request [`confirm`](Self::confirm) would resolve right now.
    pub async fn newest_for(&self, target: &str) -> Option<TeleportRequest> {
        let live = self.live.lock().await;
        newest_index(&live, target).map(|index| live[index].request.clone())
    }

    /// Times out every request older than the configured timeout at `now`.
    pub async fn expire(&self, now: DateTime<Utc>) -> Vec<TeleportRequest> {
        let timeout = TimeDelta::from_std(self.settings.timeout).unwrap_or(TimeDelta::MAX);
        let expired: Vec<LiveRequest> = {
            let mut live = self.live.lock().await;
            let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *live)
                .into_iter()
                .partition(|entry| now - entry.request.created_at > timeout);
            *live = kept;
            expired
        };

        let mut settled = Vec::with_capacity(expired.len());
        for entry in expired {
            settled.push(self.settle(entry, Outcome::TimedOut).await);
        }
        settled
    }

    /// Cancels everything without waiting for anyone; used on shutdown.
    pub async fn cancel_all(&self) -> Vec<TeleportRequest> {
        let entries = std::mem::take(&mut *self.live.lock().await);
        if !entries.is_empty() {
            info!("Cancelling {} pending teleport requests", entries.len());
        }

        let mut settled = Vec::with_capacity(entries.len());
        for entry in entries {
            settled.push(self.settle(entry, Outcome::Cancelled).await);
        }
        settled
    }

    pub async fn live(&self) -> Vec<TeleportRequest> {
        self.live
            .lock()
            .await
            .iter()
            .map(|entry| entry.request.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.live.lock().await.len()
    }

    async fn notify(&self, player: &str, key: &str) {
        if let Err(e) = self.host.tell(player, key).await {
            warn!("Failed to tell {} `{}`: {}", player, key, e);
        }
    }

    async fn settle(&self, mut entry: LiveRequest, outcome: Outcome) -> TeleportRequest {
        debug_assert_eq!(
            entry.request.outcome,
            Outcome::Pending,
            "teleport request {} settled twice",
            entry.request.id
        );
        debug_assert_ne!(outcome, Outcome::Pending);

        entry.request.outcome = outcome;
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        let request = &entry.request;

        match outcome {
            Outcome::Accepted => {
                match directive::between_players(request.kind, &request.requesting, &request.target)
                {
                    Ok(directive) => {
                        info!("Teleport request accepted: {}", request);
                        if let Err(e) = self.host.execute(directive.as_str()).await {
                            error!("Failed to run `{}`: {}", directive, e);
                        }
                    }
                    Err(e) => error!("Cannot build teleport for {}: {}", request, e),
                }
                self.notify(&request.target, "tpr.accept").await;
                self.notify(&request.requesting, "tpr.accepted").await;
            }
            Outcome::Rejected => {
                info!("Teleport request rejected: {}", request);
                self.notify(&request.target, "tpr.reject").await;
                self.notify(&request.requesting, "tpr.rejected").await;
            }
            Outcome::Cancelled => {
                info!("Teleport request cancelled: {}", request);
                if self.host.is_server_running() {
                    self.notify(&request.target, "tpr.cancel").await;
                    self.notify(&request.requesting, "tpr.cancelled").await;
                } else {
                    debug!("Server not running, skipping cancel notifications");
                }
            }
            Outcome::TimedOut => {
                error!("Teleport request timed out: {}", request);
                let key = MtpError::TimeoutExpired.message_key();
                self.notify(&request.requesting, key).await;
                self.notify(&request.target, key).await;
            }
            Outcome::Pending => {}
        }

        if let Some(waiter) = entry.waiter.take() {
            let _ = waiter.send(outcome);
        }
        entry.request
    }
}
