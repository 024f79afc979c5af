//! Terminal rendering for the dashboard, case queues, and alert cards.
//!
//! Every view is a pure projection of the data it is handed; nothing here
//! talks to the API.

use chrono::{DateTime, Utc};
use safelink_core::evidence::{detection_label, file_name, storage_url};
use safelink_core::view::{
    AlertFilter, FeedStats, category_label, content_snippet, score_percent, split_by_risk,
    status_tag, time_ago,
};
use safelink_core::{Alert, AlertDetail, AlertFeed, MediaItem, ReviewState, User};
use serde_json::Value;

const MAX_DETECTIONS: usize = 10;
const MAX_FRAMES: usize = 8;

// ── Rows ──

/// One alert as a single dashboard row.
pub fn alert_row(alert: &Alert, now: DateTime<Utc>) -> String {
    format!(
        "#{:<6} {:<9} {:<22} {:>3}%  {:<8} {}",
        alert.id,
        alert.severity,
        category_label(&alert.category),
        score_percent(alert.fusion_score),
        time_ago(alert.created_at, now),
        status_tag(alert, now),
    )
}

fn print_rows(alerts: &[&Alert], review: &ReviewState, now: DateTime<Utc>) {
    for alert in alerts {
        print!("  {}", alert_row(alert, now));
        if let Some(target) = review.pending_target(alert.id) {
            print!("  (moving to {target}...)");
        }
        println!();
        println!("          {}", content_snippet(alert));
    }
}

// ── Dashboard ──

/// Stats, critical bucket, and live feed for the `new` scope.
pub fn print_dashboard(
    feed: &AlertFeed,
    filter: &AlertFilter,
    review: &ReviewState,
    now: DateTime<Utc>,
) {
    let stats = FeedStats::compute(feed.alerts());
    println!("=== SafeLink Monitor ===");
    println!();
    println!("Overview");
    println!("  {:<26} {}", "Scanned", stats.scanned);
    println!("  {:<26} {}", "Flagged harmful", stats.flagged_harmful);
    println!("  {:<26} {}", "Reported", stats.reported);
    println!("  {:<26} {}", "Average fusion score", stats.average_label());
    println!();

    if let Some(error) = feed.error() {
        println!("! {error}");
        println!();
    }

    let visible = filter.apply(feed.alerts());
    let (critical, general) = split_by_risk(&visible);

    println!("Critical Risk ({})", critical.len());
    if critical.is_empty() {
        println!("  No critical alerts.");
    }
    print_rows(&critical, review, now);
    println!();

    println!("Live Feed ({})", general.len());
    if general.is_empty() {
        println!("  No alerts match the current filters.");
    }
    print_rows(&general, review, now);
    println!();
}

/// Investigation queue or resolved archive.
pub fn print_queue(title: &str, feed: &AlertFeed, review: &ReviewState, now: DateTime<Utc>) {
    println!("=== {title} ({}) ===", feed.len());
    if let Some(error) = feed.error() {
        println!("! {error}");
    }
    if feed.is_empty() && feed.is_loaded() {
        println!("  No cases.");
    }
    let rows: Vec<&Alert> = feed.alerts().iter().collect();
    print_rows(&rows, review, now);
    println!();
}

pub fn print_alert_list(alerts: &[Alert], now: DateTime<Utc>) {
    if alerts.is_empty() {
        println!("No alerts found.");
        return;
    }
    for alert in alerts {
        println!("  {}  [{}]", alert_row(alert, now), alert.status);
    }
}

// ── Detail card ──

/// Print a single alert as a vertical card.
pub fn print_alert_card(detail: &AlertDetail, api_base: &str, now: DateTime<Utc>) {
    println!("=== Alert #{} ===", detail.id);
    println!(
        "{} · {} · {}",
        detail.severity(),
        category_label(detail.category()),
        detail.status.as_str().to_uppercase()
    );
    println!();

    println!("Post");
    print_field("Platform", detail.platform());
    print_field("Author", detail.author());
    if let Some(url) = detail.post_url() {
        print_field("URL", url);
    }
    let text = detail.post_text();
    print_field("Text", if text.is_empty() { "(no text)" } else { text });
    println!();

    println!("Analysis");
    print_field("Fusion score", &format!("{}%", score_percent(detail.fusion_score())));
    print_json_field("Text probabilities", detail.text_probs());
    print_json_field("Audio probabilities", detail.audio_probs());
    if let Some(score) = detail.video_score() {
        print_field("Video score", &format!("{score:.3}"));
    }
    print_json_field("Explanation", detail.explanation());
    print_json_field("Model versions", detail.model_versions());
    println!();

    let media = detail.media();
    if !media.is_empty() {
        println!("Evidence ({})", media.len());
        for item in &media {
            print_media(item, api_base);
        }
        println!();
    }

    println!("Timestamps");
    print_field(
        "Created",
        &format!("{} ({})", detail.created_at.to_rfc3339(), time_ago(detail.created_at, now)),
    );
    print_field("Updated", &detail.updated_at.to_rfc3339());
    if let Some(assignee) = detail.assigned_to {
        print_field("Assigned to", &format!("user #{assignee}"));
    }
    println!();
}

fn print_media(item: &MediaItem, api_base: &str) {
    let name = if item.path.is_empty() { "-" } else { file_name(&item.path) };
    println!("  [{}] {}", item.kind, name);
    match storage_url(api_base, &item.path) {
        Some(url) => println!("    {:<24} {}", "link", url),
        None if !item.path.is_empty() => println!("    {:<24} {} (not served)", "path", item.path),
        None => {}
    }

    let transcript = item.transcript();
    if !transcript.is_empty() {
        println!("    {:<24} {}", "transcript", transcript);
    }

    let detections = item.top_detections();
    if !detections.is_empty() {
        let shown: Vec<String> = detections
            .iter()
            .take(MAX_DETECTIONS)
            .map(|d| detection_label(d))
            .collect();
        println!("    {:<24} {}", "detections", shown.join(", "));
        if detections.len() > MAX_DETECTIONS {
            println!("    ... and {} more", detections.len() - MAX_DETECTIONS);
        }
    }

    let frames = item.evidence_frames();
    if !frames.is_empty() {
        println!("    frames ({}):", frames.len());
        for frame in frames.iter().take(MAX_FRAMES) {
            let shown =
                storage_url(api_base, frame).unwrap_or_else(|| file_name(frame).to_string());
            println!("      {shown}");
        }
        if frames.len() > MAX_FRAMES {
            println!("      ... and {} more", frames.len() - MAX_FRAMES);
        }
    }
}

// ── Users, debug ──

pub fn print_users(users: &[User]) {
    println!("=== Users ({}) ===", users.len());
    for user in users {
        println!("  #{:<5} {:<10} {}", user.id, user.role, user.email);
    }
}

pub fn print_debug_result(result: &Value) {
    println!("=== Model check ===");
    match serde_json::to_string_pretty(result) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{result}"),
    }
}

// ── Helpers ──

fn print_field(name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    println!("  {:<26} {}", name, value);
}

/// Opaque classifier blobs are shown compactly; null and empty objects are skipped.
fn print_json_field(name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(map) if map.is_empty() => {}
        Value::String(s) => print_field(name, s),
        other => print_field(name, &other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use safelink_core::{AlertStatus, Severity};

    #[test]
    fn row_shows_label_score_and_age() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        let alert = Alert {
            id: 42,
            post_id: None,
            category: "child_abuse".into(),
            severity: Severity::Critical,
            fusion_score: 93.6,
            status: AlertStatus::New,
            created_at: now - chrono::Duration::seconds(90),
        };
        let row = alert_row(&alert, now);
        assert!(row.starts_with("#42 "));
        assert!(row.contains("CRITICAL"));
        assert!(row.contains("Child Abuse"));
        assert!(row.contains(" 94%"));
        assert!(row.contains("1m ago"));
        assert!(row.ends_with("NEW"));
    }
}
