//! Helpers for rendering media evidence attached to an alert.

const STORAGE_MARKER: &str = "/storage/";

/// Resolve a media path to a URL the operator can open.
///
/// Absolute `http(s)` URLs pass through. Paths that start with or contain
/// `/storage/` are rewritten against the API origin. Anything else is not
/// served by the API and has no URL.
pub fn storage_url(api_base: &str, path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    let idx = path.find(STORAGE_MARKER)?;
    Some(format!("{}{}", api_base.trim_end_matches('/'), &path[idx..]))
}

/// Last path segment, or the whole path if it has none.
pub fn file_name(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}

/// Readable form of a `label:score` detection: `weapon_gun:0.87` → `Weapon Gun 87%`.
pub fn detection_label(detection: &str) -> String {
    let (label, score) = match detection.split_once(':') {
        Some((label, score)) => (label, Some(score)),
        None => (detection, None),
    };
    let nice = title_words(&label.replace('_', " "));
    match score.and_then(|s| s.trim().parse::<f64>().ok()) {
        Some(score) if score.is_finite() => format!("{nice} {}%", (score * 100.0).round() as i64),
        _ => nice,
    }
}

/// Uppercase the first letter of every word, leaving the rest alone.
fn title_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}
