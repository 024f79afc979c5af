//! Review lifecycle: single-flight status transitions per alert.
//!
//! Each alert is `idle` until a transition starts, `pending(target)` while
//! the request is in flight, and back to `idle` once the outcome is known.
//! Nothing about the alert itself changes locally before the server
//! confirms; on success the caller drops it from status-scoped lists (or
//! refetches the detail record), on failure the view stays as it was and
//! the action remains available for a retry.

use std::collections::HashMap;
use std::fmt::Display;

use thiserror::Error;
use tracing::{info, warn};

use crate::feed::AlertFeed;
use crate::model::{AlertId, AlertStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("alert #{0} already has a status change in flight")]
    AlreadyPending(AlertId),
    #[error("alerts cannot be moved back to {0}")]
    InvalidTarget(AlertStatus),
}

/// Moderator actions that map onto a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    /// Dashboard "Report to Authority": new → investigating.
    ReportToAuthority,
    /// Detail page "Start Investigation".
    StartInvestigation,
    /// Detail page and investigation queue "Mark Resolved".
    MarkResolved,
}

impl ReviewAction {
    pub fn target(&self) -> AlertStatus {
        match self {
            Self::ReportToAuthority | Self::StartInvestigation => AlertStatus::Investigating,
            Self::MarkResolved => AlertStatus::Resolved,
        }
    }

    /// The detail-page action for a requested status. Alerts never move
    /// back to `new`.
    pub fn for_target(target: AlertStatus) -> Result<Self, ReviewError> {
        match target {
            AlertStatus::Investigating => Ok(Self::StartInvestigation),
            AlertStatus::Resolved => Ok(Self::MarkResolved),
            AlertStatus::New => Err(ReviewError::InvalidTarget(target)),
        }
    }

    /// Label shown while the request is in flight.
    pub fn busy_label(&self) -> &'static str {
        match self {
            Self::ReportToAuthority => "Reporting...",
            Self::StartInvestigation | Self::MarkResolved => "Updating...",
        }
    }
}

/// Where the transition was triggered; decides the wording and the
/// follow-up on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewView {
    /// A status-scoped list (the live feed or a case queue).
    List,
    /// The single-alert detail page.
    Detail,
}

/// A transition that has been started and not yet finished.
#[must_use = "a pending transition must be finished to release the alert"]
#[derive(Debug, PartialEq, Eq)]
pub struct PendingTransition {
    alert_id: AlertId,
    action: ReviewAction,
    view: ReviewView,
}

impl PendingTransition {
    pub fn alert_id(&self) -> AlertId {
        self.alert_id
    }

    pub fn action(&self) -> ReviewAction {
        self.action
    }

    pub fn target(&self) -> AlertStatus {
        self.action.target()
    }
}

/// Result of a finished transition, with the message scoped to the alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub alert_id: AlertId,
    pub target: AlertStatus,
    pub succeeded: bool,
    pub message: String,
}

/// Tracks in-flight transitions so at most one runs per alert.
#[derive(Debug, Default)]
pub struct ReviewState {
    pending: HashMap<AlertId, AlertStatus>,
}

impl ReviewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, id: AlertId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Target status of the in-flight transition for `id`, if any.
    pub fn pending_target(&self, id: AlertId) -> Option<AlertStatus> {
        self.pending.get(&id).copied()
    }

    /// Start a transition. Refused while another one for the same alert is
    /// in flight.
    pub fn begin(
        &mut self,
        alert_id: AlertId,
        action: ReviewAction,
        view: ReviewView,
    ) -> Result<PendingTransition, ReviewError> {
        if self.pending.contains_key(&alert_id) {
            return Err(ReviewError::AlreadyPending(alert_id));
        }
        self.pending.insert(alert_id, action.target());
        Ok(PendingTransition {
            alert_id,
            action,
            view,
        })
    }

    /// Finish a transition triggered from a status-scoped list.
    ///
    /// On success the alert leaves `feed`, since it no longer matches the
    /// feed's status. On failure `feed` is untouched.
    pub fn finish_in_list<E: Display>(
        &mut self,
        pending: PendingTransition,
        result: Result<(), E>,
        feed: &mut AlertFeed,
    ) -> TransitionOutcome {
        let succeeded = result.is_ok();
        let outcome = self.finish(pending, result);
        if succeeded {
            feed.remove(outcome.alert_id);
        }
        outcome
    }

    /// Finish a transition without touching any list. Detail views call
    /// this and then refetch the record.
    pub fn finish<E: Display>(
        &mut self,
        pending: PendingTransition,
        result: Result<(), E>,
    ) -> TransitionOutcome {
        self.pending.remove(&pending.alert_id);
        let target = pending.target();
        let succeeded = match &result {
            Ok(()) => {
                info!(id = pending.alert_id, target = %target, "alert status updated");
                true
            }
            Err(e) => {
                warn!(
                    id = pending.alert_id,
                    target = %target,
                    error = %e,
                    "alert status update failed"
                );
                false
            }
        };
        TransitionOutcome {
            alert_id: pending.alert_id,
            target,
            succeeded,
            message: outcome_message(&pending, succeeded),
        }
    }
}

fn outcome_message(pending: &PendingTransition, succeeded: bool) -> String {
    let id = pending.alert_id;
    match (pending.view, pending.action, succeeded) {
        (ReviewView::Detail, _, true) => format!("Alert marked as {}.", pending.target()),
        (ReviewView::Detail, _, false) => "Failed to update alert status.".to_string(),
        (ReviewView::List, ReviewAction::MarkResolved, true) => {
            format!("Alert #{id} marked as resolved.")
        }
        (ReviewView::List, ReviewAction::MarkResolved, false) => {
            format!("Failed to resolve alert #{id}.")
        }
        (ReviewView::List, _, true) => format!("Alert #{id} marked for authority review."),
        (ReviewView::List, _, false) => format!("Failed to report alert #{id}."),
    }
}
