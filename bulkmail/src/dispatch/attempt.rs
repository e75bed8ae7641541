//! A single send attempt

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::email::{Campaign, EmailError, EmailSender};
use crate::recipients::Recipient;
use crate::store::{Claim, SendTracker, StoreError};

/// Services shared by every attempt in a run
#[derive(Clone)]
pub struct DispatchContext {
    /// Mail backend
    pub sender: Arc<dyn EmailSender>,
    /// Ledger and quota
    pub tracker: Arc<SendTracker>,
    /// Rendered message
    pub campaign: Arc<Campaign>,
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("sender", &self.sender.name())
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

/// What happened to one recipient
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Delivered, recorded in the ledger and counted
    Sent {
        /// Recipient
        recipient: Recipient,
        /// Daily count after this send
        daily_count: u32,
    },
    /// Already in the ledger or claimed by another attempt
    Skipped {
        /// Recipient
        recipient: Recipient,
    },
    /// Transport failed; nothing was recorded
    Failed {
        /// Recipient
        recipient: Recipient,
        /// Transport error
        error: EmailError,
    },
    /// Ledger or quota storage failed
    StoreFailed {
        /// Recipient
        recipient: Recipient,
        /// Storage error
        error: StoreError,
    },
}

/// Claim, send, then commit or release one recipient
///
/// Ledger and quota calls touch the disk and hold the tracker lock, so they
/// run on the blocking pool rather than on the async workers.
pub async fn send_one(ctx: Arc<DispatchContext>, recipient: Recipient) -> AttemptOutcome {
    let address = recipient.as_str();
    info!(recipient = %address, "sending email");

    match on_tracker(&ctx, address, |tracker, address| tracker.claim(address)).await {
        Ok(Claim::Acquired) => {}
        Ok(claim) => {
            warn!(recipient = %address, ?claim, "already sent, skipping");
            return AttemptOutcome::Skipped { recipient };
        }
        Err(err) => {
            error!(recipient = %address, error = %err, "ledger lookup failed");
            return AttemptOutcome::StoreFailed {
                recipient,
                error: err,
            };
        }
    }

    if let Err(err) = ctx.sender.send(ctx.campaign.email_for(&recipient)).await {
        let released = on_tracker(&ctx, address, |tracker, address| {
            tracker.release(address);
            Ok(())
        })
        .await;
        if let Err(release_err) = released {
            error!(recipient = %address, error = %release_err, "failed to release claim");
        }
        warn!(recipient = %address, error = %err, "failed to send email");
        return AttemptOutcome::Failed {
            recipient,
            error: err,
        };
    }

    match on_tracker(&ctx, address, |tracker, address| tracker.commit(address)).await {
        Ok(daily_count) => {
            info!(recipient = %address, daily_count, "email sent");
            AttemptOutcome::Sent {
                recipient,
                daily_count,
            }
        }
        Err(err) => {
            error!(recipient = %address, error = %err, "email sent but not recorded");
            AttemptOutcome::StoreFailed {
                recipient,
                error: err,
            }
        }
    }
}

async fn on_tracker<T, F>(ctx: &DispatchContext, address: &str, call: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&SendTracker, &str) -> Result<T, StoreError> + Send + 'static,
{
    let tracker = Arc::clone(&ctx.tracker);
    let address = address.to_string();
    tokio::task::spawn_blocking(move || call(&tracker, &address)).await?
}
