//! Status-scoped alert feed kept fresh by REST snapshots and push messages.
//!
//! An [`AlertFeed`] holds the alerts for exactly one [`AlertStatus`]. Two
//! sources write to it:
//!
//! - snapshots (`GET /alerts?status=...`), which replace the working set
//!   wholesale and are the only way entries disappear besides an explicit
//!   lifecycle transition;
//! - push messages (`/ws/alerts`), which insert or move an entry to the
//!   front when its status matches the feed's scope and are ignored
//!   otherwise.
//!
//! A push announcing a later status for an entry already in the feed does
//! not remove it. Removal is left to [`AlertFeed::remove`] (called after a
//! confirmed transition) and to the next snapshot.

use std::collections::HashSet;
use std::fmt::Display;

use tracing::{debug, warn};

use crate::model::{Alert, AlertId, AlertStatus};

/// Ticket handed out when a snapshot fetch starts.
///
/// Tickets increase monotonically per feed; a snapshot is applied only if
/// no later-issued snapshot has been applied already.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// What happened to a snapshot handed to [`AlertFeed::apply_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Working set replaced; carries the new length.
    Replaced(usize),
    /// Fetch failed; previous data kept and the error flag set.
    Failed,
    /// A newer snapshot was already applied; this one was dropped.
    Stale,
}

/// What happened to a pushed alert handed to [`AlertFeed::merge_push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Inserted,
    /// Alert was already present; it now sits at the front with the new payload.
    MovedToFront,
    /// Status did not match the feed's scope.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct AlertFeed {
    scope: AlertStatus,
    alerts: Vec<Alert>,
    error: Option<String>,
    loaded: bool,
    next_ticket: u64,
    last_applied: Option<FetchTicket>,
}

impl AlertFeed {
    pub fn new(scope: AlertStatus) -> Self {
        Self {
            scope,
            alerts: Vec::new(),
            error: None,
            loaded: false,
            next_ticket: 0,
            last_applied: None,
        }
    }

    pub fn scope(&self) -> AlertStatus {
        self.scope
    }

    /// Alerts in display order (most recent push or snapshot order first).
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn get(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: AlertId) -> bool {
        self.get(id).is_some()
    }

    /// User-visible message from the last failed snapshot, cleared on success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True once any snapshot has been applied successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Start a snapshot fetch.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.next_ticket += 1;
        FetchTicket(self.next_ticket)
    }

    /// Apply the result of the fetch identified by `ticket`.
    ///
    /// On success the working set is replaced (duplicate ids keep their
    /// first occurrence). On failure the working set is untouched and
    /// [`error`](Self::error) is set.
    pub fn apply_snapshot<E: Display>(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Alert>, E>,
    ) -> SnapshotOutcome {
        if self.last_applied.is_some_and(|last| ticket <= last) {
            debug!(ticket = ticket.0, scope = %self.scope, "dropping stale snapshot");
            return SnapshotOutcome::Stale;
        }
        self.last_applied = Some(ticket);

        match result {
            Ok(alerts) => {
                let mut seen = HashSet::with_capacity(alerts.len());
                self.alerts = alerts.into_iter().filter(|a| seen.insert(a.id)).collect();
                self.error = None;
                self.loaded = true;
                SnapshotOutcome::Replaced(self.alerts.len())
            }
            Err(e) => {
                warn!(error = %e, scope = %self.scope, "alert snapshot failed");
                self.error = Some(load_failure_message(self.scope).to_string());
                SnapshotOutcome::Failed
            }
        }
    }

    /// Merge a pushed alert.
    ///
    /// Only alerts whose status equals the feed's scope are admitted; any
    /// existing entry with the same id is replaced and the alert moves to
    /// the front.
    pub fn merge_push(&mut self, alert: Alert) -> PushOutcome {
        if alert.status != self.scope {
            debug!(
                id = alert.id,
                status = %alert.status,
                scope = %self.scope,
                "ignoring out-of-scope push"
            );
            return PushOutcome::Ignored;
        }
        let existed = self.remove(alert.id).is_some();
        self.alerts.insert(0, alert);
        if existed {
            PushOutcome::MovedToFront
        } else {
            PushOutcome::Inserted
        }
    }

    /// Drop an alert from the feed. Used after a confirmed transition.
    pub fn remove(&mut self, id: AlertId) -> Option<Alert> {
        let idx = self.alerts.iter().position(|a| a.id == id)?;
        Some(self.alerts.remove(idx))
    }
}

/// Message shown when a snapshot for the given scope cannot be loaded.
pub fn load_failure_message(scope: AlertStatus) -> &'static str {
    match scope {
        AlertStatus::New => "Failed to load alerts.",
        AlertStatus::Investigating => "Failed to load investigation cases.",
        AlertStatus::Resolved => "Failed to load resolved cases.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use chrono::{TimeZone, Utc};

    fn alert(id: AlertId, status: AlertStatus) -> Alert {
        Alert {
            id,
            post_id: Some(id * 10),
            category: "harassment".into(),
            severity: Severity::Med,
            fusion_score: 50.0,
            status,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn loaded(scope: AlertStatus, alerts: Vec<Alert>) -> AlertFeed {
        let mut feed = AlertFeed::new(scope);
        let ticket = feed.begin_fetch();
        feed.apply_snapshot::<String>(ticket, Ok(alerts));
        feed
    }

    fn ids(feed: &AlertFeed) -> Vec<AlertId> {
        feed.alerts().iter().map(|a| a.id).collect()
    }

    #[test]
    fn out_of_scope_push_leaves_set_unchanged() {
        let mut feed = loaded(
            AlertStatus::New,
            vec![alert(1, AlertStatus::New), alert(2, AlertStatus::New)],
        );
        let before = feed.alerts().to_vec();
        for status in [AlertStatus::Investigating, AlertStatus::Resolved] {
            assert_eq!(feed.merge_push(alert(3, status)), PushOutcome::Ignored);
            assert_eq!(feed.merge_push(alert(1, status)), PushOutcome::Ignored);
        }
        assert_eq!(feed.alerts(), before.as_slice());
    }

    #[test]
    fn accepted_push_goes_to_front_once() {
        let mut feed = loaded(
            AlertStatus::New,
            vec![alert(1, AlertStatus::New), alert(2, AlertStatus::New)],
        );
        let mut pushed = alert(2, AlertStatus::New);
        pushed.fusion_score = 99.0;
        assert_eq!(feed.merge_push(pushed.clone()), PushOutcome::MovedToFront);
        assert_eq!(ids(&feed), vec![2, 1]);
        assert_eq!(feed.alerts()[0], pushed);

        assert_eq!(feed.merge_push(alert(5, AlertStatus::New)), PushOutcome::Inserted);
        assert_eq!(ids(&feed), vec![5, 2, 1]);
    }

    #[test]
    fn merging_same_push_twice_is_idempotent() {
        let mut once = loaded(AlertStatus::New, vec![alert(1, AlertStatus::New)]);
        once.merge_push(alert(9, AlertStatus::New));
        let mut twice = once.clone();
        twice.merge_push(alert(9, AlertStatus::New));
        assert_eq!(once.alerts(), twice.alerts());
        assert_eq!(ids(&twice), vec![9, 1]);
    }

    #[test]
    fn later_status_push_does_not_remove_existing_entry() {
        let mut crit = alert(1, AlertStatus::New);
        crit.severity = Severity::Critical;
        let mut feed = loaded(AlertStatus::New, vec![crit]);

        feed.merge_push(alert(1, AlertStatus::Investigating));
        assert!(feed.contains(1));

        let ticket = feed.begin_fetch();
        feed.apply_snapshot::<String>(ticket, Ok(vec![]));
        assert!(!feed.contains(1));
    }

    #[test]
    fn removed_alert_is_not_resurrected_by_push_of_other_status() {
        let mut queue =
            loaded(AlertStatus::Investigating, vec![alert(4, AlertStatus::Investigating)]);
        assert!(queue.remove(4).is_some());
        assert_eq!(queue.merge_push(alert(4, AlertStatus::New)), PushOutcome::Ignored);
        assert!(!queue.contains(4));
    }

    #[test]
    fn failed_snapshot_keeps_previous_data() {
        let mut feed = loaded(AlertStatus::New, vec![alert(1, AlertStatus::New)]);
        let ticket = feed.begin_fetch();
        assert_eq!(feed.apply_snapshot(ticket, Err("connection refused")), SnapshotOutcome::Failed);
        assert_eq!(ids(&feed), vec![1]);
        assert_eq!(feed.error(), Some("Failed to load alerts."));

        let ticket = feed.begin_fetch();
        feed.apply_snapshot::<String>(ticket, Ok(vec![alert(2, AlertStatus::New)]));
        assert_eq!(feed.error(), None);
        assert_eq!(ids(&feed), vec![2]);
    }

    #[test]
    fn first_load_failure_leaves_empty_unloaded_feed() {
        let mut feed = AlertFeed::new(AlertStatus::Resolved);
        let ticket = feed.begin_fetch();
        feed.apply_snapshot(ticket, Err("timeout"));
        assert!(feed.is_empty());
        assert!(!feed.is_loaded());
        assert_eq!(feed.error(), Some("Failed to load resolved cases."));
    }

    #[test]
    fn stale_snapshot_is_dropped() {
        let mut feed = AlertFeed::new(AlertStatus::New);
        let older = feed.begin_fetch();
        let newer = feed.begin_fetch();
        feed.apply_snapshot::<String>(newer, Ok(vec![alert(2, AlertStatus::New)]));
        assert_eq!(
            feed.apply_snapshot::<String>(older, Ok(vec![alert(1, AlertStatus::New)])),
            SnapshotOutcome::Stale
        );
        assert_eq!(ids(&feed), vec![2]);
    }

    #[test]
    fn snapshot_resync_discards_push_only_entries() {
        let mut feed = loaded(AlertStatus::New, vec![alert(1, AlertStatus::New)]);
        feed.merge_push(alert(2, AlertStatus::New));
        let ticket = feed.begin_fetch();
        feed.apply_snapshot::<String>(ticket, Ok(vec![alert(1, AlertStatus::New)]));
        assert_eq!(ids(&feed), vec![1]);
    }

    #[test]
    fn snapshot_duplicates_keep_first_occurrence() {
        let mut first = alert(1, AlertStatus::New);
        first.fusion_score = 10.0;
        let feed = loaded(
            AlertStatus::New,
            vec![first.clone(), alert(2, AlertStatus::New), alert(1, AlertStatus::New)],
        );
        assert_eq!(ids(&feed), vec![1, 2]);
        assert_eq!(feed.get(1), Some(&first));
    }
}
