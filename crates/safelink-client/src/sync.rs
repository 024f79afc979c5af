//! Async drivers that connect the API client to the feed and review state.
//!
//! The state types live in `safelink-core` and never perform I/O. These
//! functions issue the request, then hand the result back to the state
//! machine, so every mutation happens on the caller's task.

use safelink_core::{
    AlertDetail, AlertFeed, AlertId, AlertPatch, ReviewAction, ReviewError, ReviewState, ReviewView,
    SnapshotOutcome, TransitionOutcome,
};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::http::ApiClient;

/// Fetch a snapshot for the feed's scope and apply it.
///
/// Also used for manual refresh: a successful snapshot replaces the working
/// set, discarding push-only entries the server did not confirm. On failure
/// the feed keeps its data and records the load-failure message before the
/// error is returned.
pub async fn refresh(api: &ApiClient, feed: &mut AlertFeed) -> Result<SnapshotOutcome, ApiError> {
    let ticket = feed.begin_fetch();
    match api.list_alerts(Some(feed.scope())).await {
        Ok(alerts) => {
            let outcome = feed.apply_snapshot(ticket, Ok::<_, ApiError>(alerts));
            info!(scope = %feed.scope(), ?outcome, "feed refreshed");
            Ok(outcome)
        }
        Err(e) => {
            let outcome = feed.apply_snapshot(ticket, Err::<Vec<_>, _>(&e));
            debug!(scope = %feed.scope(), ?outcome, "feed refresh failed");
            Err(e)
        }
    }
}

/// Run a transition from a status-scoped list. On success the alert leaves
/// `feed`; on failure nothing changes and the action can be retried.
pub async fn transition_in_list(
    api: &ApiClient,
    review: &mut ReviewState,
    feed: &mut AlertFeed,
    alert_id: AlertId,
    action: ReviewAction,
) -> Result<TransitionOutcome, ReviewError> {
    let pending = review.begin(alert_id, action, ReviewView::List)?;
    let result = api
        .update_alert(alert_id, &AlertPatch::status(pending.target()))
        .await
        .map(|_| ());
    Ok(review.finish_in_list(pending, result, feed))
}

/// Result of a detail-view transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTransition {
    pub outcome: TransitionOutcome,
    /// False when the status change went through but the record could not
    /// be reloaded, so the local detail still shows the old state.
    pub refreshed: bool,
}

/// Run a transition from the detail view. On success the detail record is
/// replaced by a fresh `GET /alerts/{id}`, not by the patch response.
///
/// If the patch succeeds but the refetch fails, the outcome still reports
/// success, `refreshed` is false, and `detail` keeps its previous contents.
pub async fn transition_detail(
    api: &ApiClient,
    review: &mut ReviewState,
    detail: &mut AlertDetail,
    action: ReviewAction,
) -> Result<DetailTransition, ReviewError> {
    let pending = review.begin(detail.id, action, ReviewView::Detail)?;
    let result = api
        .update_alert(detail.id, &AlertPatch::status(pending.target()))
        .await
        .map(|_| ());
    let outcome = review.finish(pending, result);
    let mut refreshed = false;
    if outcome.succeeded {
        match api.get_alert(detail.id).await {
            Ok(fresh) => {
                *detail = fresh;
                refreshed = true;
            }
            Err(e) => warn!(id = detail.id, error = %e, "alert refetch after status change failed"),
        }
    }
    Ok(DetailTransition { outcome, refreshed })
}
