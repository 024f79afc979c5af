//! Alert, user, and request types shared by the client and the dashboard.
//!
//! Summary records are strictly typed. The detail payload's `post` and
//! `analysis` records belong to the classifier service and are kept as
//! JSON maps with defaulting accessors.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::api_timestamp;

/// Server-assigned alert identity.
pub type AlertId = i64;

/// Classifier risk bucket, ordered from lowest to highest risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    Low,
    Med,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Low, Self::Med, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Med => "MED",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// CRITICAL and HIGH alerts go to the critical bucket.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MED" => Ok(Self::Med),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("unknown severity {s:?}")),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Review lifecycle status. Advances new → investigating → resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlertStatus {
    New,
    Investigating,
    Resolved,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 3] = [Self::New, Self::Investigating, Self::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
        }
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            _ => Err(format!("unknown alert status {s:?}")),
        }
    }
}

impl TryFrom<String> for AlertStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlertStatus> for String {
    fn from(value: AlertStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Alert summary as returned by `GET /alerts` and pushed on `/ws/alerts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    pub category: String,
    pub severity: Severity,
    pub fusion_score: f64,
    pub status: AlertStatus,
    #[serde(with = "api_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Full alert record from `GET /alerts/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDetail {
    pub id: AlertId,
    pub status: AlertStatus,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(with = "api_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "api_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub post: Map<String, Value>,
    #[serde(default)]
    pub analysis: Map<String, Value>,
}

impl AlertDetail {
    pub fn post_text(&self) -> &str {
        str_field(&self.post, "text").trim()
    }

    pub fn post_url(&self) -> Option<&str> {
        let url = str_field(&self.post, "url").trim();
        (!url.is_empty()).then_some(url)
    }

    pub fn platform(&self) -> &str {
        str_field(&self.post, "platform")
    }

    pub fn author(&self) -> &str {
        str_field(&self.post, "author")
    }

    /// Media attached to the post. Entries that are not JSON objects are skipped.
    pub fn media(&self) -> Vec<MediaItem> {
        self.post
            .get("media")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn category(&self) -> &str {
        str_field(&self.analysis, "category")
    }

    /// Severity from the analysis record; LOW when absent or unrecognised.
    pub fn severity(&self) -> Severity {
        str_field(&self.analysis, "severity")
            .parse()
            .unwrap_or(Severity::Low)
    }

    pub fn fusion_score(&self) -> f64 {
        self.analysis
            .get("fusion_score")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    pub fn text_probs(&self) -> &Value {
        self.analysis.get("text_probs").unwrap_or(&Value::Null)
    }

    pub fn audio_probs(&self) -> &Value {
        self.analysis.get("audio_probs").unwrap_or(&Value::Null)
    }

    pub fn video_score(&self) -> Option<f64> {
        self.analysis.get("video_score").and_then(Value::as_f64)
    }

    pub fn explanation(&self) -> &Value {
        self.analysis.get("explanation_json").unwrap_or(&Value::Null)
    }

    pub fn model_versions(&self) -> &Value {
        self.analysis.get("model_versions").unwrap_or(&Value::Null)
    }
}

/// A media attachment and whatever the classifier derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub meta_json: Map<String, Value>,
}

impl MediaItem {
    pub fn transcript(&self) -> &str {
        str_field(&self.meta_json, "transcript").trim()
    }

    pub fn evidence_frames(&self) -> Vec<&str> {
        str_list(&self.meta_json, "evidence_frames")
    }

    /// Detection strings in `label:score` form, in classifier order.
    pub fn top_detections(&self) -> Vec<&str> {
        str_list(&self.meta_json, "top_detections")
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or("")
}

fn str_list<'a>(map: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Moderator,
    Police,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Moderator => "MODERATOR",
            Self::Police => "POLICE",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "MODERATOR" => Ok(Self::Moderator),
            "POLICE" => Ok(Self::Police),
            _ => Err(format!("unknown role {s:?}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Body of `PATCH /alerts/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
}

impl AlertPatch {
    pub fn status(status: AlertStatus) -> Self {
        Self {
            status: Some(status),
            assigned_to: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackDecision {
    Approve,
    Reject,
}

impl FromStr for FeedbackDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(format!("unknown decision {s:?}")),
        }
    }
}

/// Body of `POST /alerts/{id}/feedback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub decision: FeedbackDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackAck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub feedback_id: Option<i64>,
}

/// Body of `POST /debug/model-check`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugCheckRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    pub run_audio: bool,
}

impl DebugCheckRequest {
    /// Blank optional fields are dropped rather than sent as empty strings.
    pub fn new(
        text: impl Into<String>,
        lang: Option<String>,
        video_path: Option<String>,
        run_audio: bool,
    ) -> Self {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            text: text.into(),
            lang: non_blank(lang),
            video_path: non_blank(video_path),
            run_audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alert_parses_case_insensitive_status_and_naive_timestamp() {
        let alert: Alert = serde_json::from_value(json!({
            "id": 7,
            "post_id": 3,
            "category": "hate_speech",
            "severity": "critical",
            "fusion_score": 91.5,
            "status": "NEW",
            "created_at": "2026-02-01T08:00:00"
        }))
        .unwrap();
        assert_eq!(alert.status, AlertStatus::New);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.created_at.to_rfc3339(), "2026-02-01T08:00:00+00:00");
    }

    #[test]
    fn alert_serializes_wire_casing() {
        let alert: Alert = serde_json::from_value(json!({
            "id": 1,
            "category": "harassment",
            "severity": "HIGH",
            "fusion_score": 40.0,
            "status": "Investigating",
            "created_at": "2026-02-01T08:00:00Z"
        }))
        .unwrap();
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["status"], "investigating");
        assert_eq!(value["severity"], "HIGH");
        assert!(value.get("post_id").is_none());
    }

    #[test]
    fn unknown_status_is_an_error() {
        let result: Result<Alert, _> = serde_json::from_value(json!({
            "id": 1,
            "category": "x",
            "severity": "LOW",
            "fusion_score": 1.0,
            "status": "archived",
            "created_at": ""
        }));
        assert!(result.is_err());
    }

    #[test]
    fn severity_orders_by_risk() {
        assert!(Severity::Low < Severity::Med);
        assert!(Severity::High < Severity::Critical);
        assert!(Severity::High.is_critical());
        assert!(!Severity::Med.is_critical());
    }

    #[test]
    fn detail_accessors_apply_defaults() {
        let detail: AlertDetail = serde_json::from_value(json!({
            "id": 4,
            "status": "new",
            "assigned_to": null,
            "created_at": "2026-02-01T08:00:00",
            "updated_at": "2026-02-01T08:05:00",
            "post": { "text": "  hello  ", "url": "" },
            "analysis": {}
        }))
        .unwrap();
        assert_eq!(detail.post_text(), "hello");
        assert_eq!(detail.post_url(), None);
        assert_eq!(detail.severity(), Severity::Low);
        assert_eq!(detail.fusion_score(), 0.0);
        assert_eq!(detail.category(), "");
        assert!(detail.media().is_empty());
        assert!(detail.text_probs().is_null());
    }

    #[test]
    fn media_meta_accessors() {
        let detail: AlertDetail = serde_json::from_value(json!({
            "id": 4,
            "status": "investigating",
            "created_at": "2026-02-01T08:00:00",
            "updated_at": "2026-02-01T08:05:00",
            "post": {
                "media": [
                    {
                        "id": 11,
                        "type": "video",
                        "path": "/storage/media/clip.mp4",
                        "meta_json": {
                            "transcript": "he said something",
                            "evidence_frames": ["/storage/frames/1.jpg", "/storage/frames/2.jpg"],
                            "top_detections": ["knife:0.81", "person:0.99"]
                        }
                    },
                    "not-an-object"
                ]
            },
            "analysis": { "severity": "HIGH", "fusion_score": 72.25, "category": "violent_act" }
        }))
        .unwrap();
        let media = detail.media();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].kind, "video");
        assert_eq!(media[0].transcript(), "he said something");
        assert_eq!(
            media[0].evidence_frames(),
            vec!["/storage/frames/1.jpg", "/storage/frames/2.jpg"]
        );
        assert_eq!(media[0].top_detections(), vec!["knife:0.81", "person:0.99"]);
        assert_eq!(detail.severity(), Severity::High);
        assert_eq!(detail.fusion_score(), 72.25);
    }

    #[test]
    fn patch_omits_unset_fields() {
        let body = serde_json::to_value(AlertPatch::status(AlertStatus::Resolved)).unwrap();
        assert_eq!(body, json!({ "status": "resolved" }));
    }

    #[test]
    fn debug_request_drops_blank_fields() {
        let req = DebugCheckRequest::new("text", Some("  ".into()), Some("clip.mp4".into()), true);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body, json!({ "text": "text", "video_path": "clip.mp4", "run_audio": true }));
    }
}
