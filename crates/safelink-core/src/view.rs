//! Dashboard projections over an alert set.
//!
//! Everything here is a pure function of the alerts, the current instant,
//! and the filter parameters. Nothing mutates the feed.

use chrono::{DateTime, Utc};

use crate::model::{Alert, AlertStatus, Severity};

/// Recency window for the `NEW` tag, in hours.
pub const DEFAULT_RECENT_HOURS: i64 = 24;

/// Display form of a classifier category: `hate_speech` → `Hate Speech`.
pub fn category_label(category: &str) -> String {
    category
        .replace('_', " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One-line headline for a feed card.
pub fn content_snippet(alert: &Alert) -> String {
    format!("Detected {} content", category_label(&alert.category).to_lowercase())
}

/// Fusion score as a card percentage, clamped to 1..=99.
pub fn score_percent(fusion_score: f64) -> u8 {
    if fusion_score.is_nan() {
        return 1;
    }
    fusion_score.round().clamp(1.0, 99.0) as u8
}

/// Compact age label: `45s ago`, `12m ago`, `3h ago`, `2d ago`.
///
/// Timestamps in the future count as `0s ago`.
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    if secs < 60 {
        return format!("{secs}s ago");
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

/// True if `created_at` is no older than `max_age_hours` and not in the future.
pub fn is_recent(created_at: DateTime<Utc>, now: DateTime<Utc>, max_age_hours: i64) -> bool {
    let age_ms = (now - created_at).num_milliseconds();
    age_ms >= 0 && age_ms <= max_age_hours * 60 * 60 * 1000
}

/// Tag for a general-feed card: `NEW` while recent, else the status.
pub fn status_tag(alert: &Alert, now: DateTime<Utc>) -> String {
    if is_recent(alert.created_at, now, DEFAULT_RECENT_HOURS) {
        "NEW".to_string()
    } else {
        alert.status.as_str().to_uppercase()
    }
}

/// A named category filter matching any of its keywords.
#[derive(Debug, PartialEq, Eq)]
pub struct CategoryPreset {
    pub id: &'static str,
    pub label: &'static str,
    keywords: &'static [&'static str],
}

impl CategoryPreset {
    /// Case-insensitive keyword match against the raw category and its
    /// space-separated form. The `all` preset matches everything.
    pub fn matches(&self, category: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let raw = category.to_lowercase();
        let spaced = raw.replace('_', " ");
        self.keywords
            .iter()
            .any(|kw| raw.contains(kw) || spaced.contains(kw))
    }
}

pub const CATEGORY_PRESETS: &[CategoryPreset] = &[
    CategoryPreset {
        id: "all",
        label: "All",
        keywords: &[],
    },
    CategoryPreset {
        id: "harassment",
        label: "Harassment",
        keywords: &["harassment"],
    },
    CategoryPreset {
        id: "hate-speech",
        label: "Hate Speech",
        keywords: &["hate", "speech"],
    },
    CategoryPreset {
        id: "child-abuse",
        label: "Child Abuse",
        keywords: &["child", "abuse"],
    },
    CategoryPreset {
        id: "elder-abuse",
        label: "Elder Abuse",
        keywords: &["elder", "abuse"],
    },
    CategoryPreset {
        id: "violent-act",
        label: "Violent Act",
        keywords: &["violence", "violent", "act"],
    },
    CategoryPreset {
        id: "murder-threat",
        label: "Murder Threat",
        keywords: &["murder", "kill", "homicide", "threat"],
    },
];

/// Look up a preset by id; unknown ids fall back to `all`.
pub fn category_preset(id: &str) -> &'static CategoryPreset {
    CATEGORY_PRESETS
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(id))
        .unwrap_or(&CATEGORY_PRESETS[0])
}

/// Dashboard filter: free text, severity, and category preset.
#[derive(Debug)]
pub struct AlertFilter {
    pub query: String,
    pub severity: Option<Severity>,
    pub category: &'static CategoryPreset,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            severity: None,
            category: &CATEGORY_PRESETS[0],
        }
    }
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.matches_query(alert)
            && self.severity.is_none_or(|s| alert.severity == s)
            && self.category.matches(&alert.category)
    }

    /// Free text matches if the alert's JSON form contains the query.
    fn matches_query(&self, alert: &Alert) -> bool {
        let query = self.query.trim();
        if query.is_empty() {
            return true;
        }
        serde_json::to_string(alert)
            .unwrap_or_default()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }

    pub fn apply<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|a| self.matches(a)).collect()
    }
}

/// Split alerts into the critical bucket (CRITICAL/HIGH) and the general feed.
pub fn split_by_risk<'a>(alerts: &[&'a Alert]) -> (Vec<&'a Alert>, Vec<&'a Alert>) {
    alerts.iter().copied().partition(|a| a.severity.is_critical())
}

/// Headline numbers for the dashboard, computed over the unfiltered feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedStats {
    pub scanned: usize,
    pub flagged_harmful: usize,
    pub reported: usize,
    pub average_score: f64,
}

impl FeedStats {
    pub fn compute(alerts: &[Alert]) -> Self {
        let scanned = alerts.len();
        let flagged_harmful = alerts.iter().filter(|a| a.severity.is_critical()).count();
        let reported = alerts.iter().filter(|a| a.status != AlertStatus::New).count();
        let average_score = if scanned == 0 {
            0.0
        } else {
            alerts.iter().map(|a| a.fusion_score).sum::<f64>() / scanned as f64
        };
        Self {
            scanned,
            flagged_harmful,
            reported,
            average_score,
        }
    }

    /// Average score with one decimal, `0.0` for an empty feed.
    pub fn average_label(&self) -> String {
        format!("{:.1}", self.average_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    fn alert(id: i64, category: &str, severity: Severity, score: f64) -> Alert {
        Alert {
            id,
            post_id: None,
            category: category.into(),
            severity,
            fusion_score: score,
            status: AlertStatus::New,
            created_at: now() - Duration::hours(1),
        }
    }

    #[test]
    fn category_labels() {
        assert_eq!(category_label("child_abuse"), "Child Abuse");
        assert_eq!(category_label("hate_speech_general"), "Hate Speech General");
        assert_eq!(category_label("harassment"), "Harassment");
        assert_eq!(category_label(""), "");
    }

    #[test]
    fn time_ago_boundaries() {
        assert!(time_ago(now() - Duration::seconds(45), now()).ends_with("s ago"));
        assert_eq!(time_ago(now() - Duration::seconds(90), now()), "1m ago");
        assert_eq!(time_ago(now() - Duration::hours(25), now()), "1d ago");
        assert_eq!(time_ago(now() - Duration::minutes(59), now()), "59m ago");
        assert_eq!(time_ago(now() - Duration::minutes(60), now()), "1h ago");
        assert_eq!(time_ago(now() + Duration::seconds(30), now()), "0s ago");
    }

    #[test]
    fn recency_window() {
        assert!(is_recent(now() - Duration::hours(23), now(), DEFAULT_RECENT_HOURS));
        assert!(is_recent(now() - Duration::hours(24), now(), DEFAULT_RECENT_HOURS));
        assert!(!is_recent(now() - Duration::hours(25), now(), DEFAULT_RECENT_HOURS));
        assert!(!is_recent(now() + Duration::minutes(1), now(), DEFAULT_RECENT_HOURS));
        assert!(is_recent(now() - Duration::hours(47), now(), 48));
    }

    #[test]
    fn status_tag_prefers_new_when_recent() {
        let mut a = alert(1, "harassment", Severity::Low, 10.0);
        assert_eq!(status_tag(&a, now()), "NEW");
        a.created_at = now() - Duration::days(3);
        a.status = AlertStatus::Investigating;
        assert_eq!(status_tag(&a, now()), "INVESTIGATING");
    }

    #[test]
    fn score_percent_clamps() {
        assert_eq!(score_percent(0.2), 1);
        assert_eq!(score_percent(55.5), 56);
        assert_eq!(score_percent(140.0), 99);
        assert_eq!(score_percent(f64::NAN), 1);
    }

    #[test]
    fn presets_match_raw_and_spaced_forms() {
        assert!(category_preset("hate-speech").matches("hate_speech_general"));
        assert!(category_preset("murder-threat").matches("KILL_THREAT"));
        assert!(!category_preset("elder-abuse").matches("harassment"));
        assert!(category_preset("all").matches("anything"));
        assert_eq!(category_preset("nope").id, "all");
    }

    #[test]
    fn filter_combines_criteria() {
        let alerts = vec![
            alert(1, "hate_speech", Severity::Critical, 90.0),
            alert(2, "harassment", Severity::Low, 20.0),
            alert(3, "child_abuse", Severity::High, 70.0),
        ];
        let filter = AlertFilter {
            severity: Some(Severity::Critical),
            ..AlertFilter::default()
        };
        assert_eq!(filter.apply(&alerts).iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);

        let filter = AlertFilter {
            query: "HARASS".into(),
            ..AlertFilter::default()
        };
        assert_eq!(filter.apply(&alerts).iter().map(|a| a.id).collect::<Vec<_>>(), vec![2]);

        let filter = AlertFilter {
            category: category_preset("child-abuse"),
            ..AlertFilter::default()
        };
        assert_eq!(filter.apply(&alerts).iter().map(|a| a.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn free_text_matches_serialized_fields() {
        let alerts = vec![alert(42, "harassment", Severity::Low, 20.0)];
        let filter = AlertFilter {
            query: "\"id\":42".into(),
            ..AlertFilter::default()
        };
        assert_eq!(filter.apply(&alerts).len(), 1);
    }

    #[test]
    fn filtering_does_not_mutate_input() {
        let alerts = vec![alert(1, "hate_speech", Severity::Critical, 90.0)];
        let before = alerts.clone();
        let _ = AlertFilter::default().apply(&alerts);
        assert_eq!(alerts, before);
    }

    #[test]
    fn risk_split() {
        let alerts = vec![
            alert(1, "a", Severity::Critical, 90.0),
            alert(2, "b", Severity::Med, 40.0),
            alert(3, "c", Severity::High, 70.0),
            alert(4, "d", Severity::Low, 5.0),
        ];
        let refs: Vec<&Alert> = alerts.iter().collect();
        let (critical, general) = split_by_risk(&refs);
        assert_eq!(critical.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(general.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn stats() {
        let mut alerts = vec![
            alert(1, "a", Severity::Critical, 90.0),
            alert(2, "b", Severity::Low, 10.0),
        ];
        alerts[1].status = AlertStatus::Investigating;
        let stats = FeedStats::compute(&alerts);
        assert_eq!(stats.scanned, 2);
        assert_eq!(stats.flagged_harmful, 1);
        assert_eq!(stats.reported, 1);
        assert_eq!(stats.average_label(), "50.0");
        assert_eq!(FeedStats::compute(&[]).average_label(), "0.0");
    }

    #[test]
    fn snippet() {
        let a = alert(1, "hate_speech", Severity::Low, 1.0);
        assert_eq!(content_snippet(&a), "Detected hate speech content");
    }
}
