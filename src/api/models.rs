//! Usage data as returned by the API and as consumed by the rest of the app.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LABEL_FIVE_HOUR: &str = "5-Hour";
pub const LABEL_WEEKLY: &str = "Weekly";
pub const LABEL_OPUS: &str = "Opus";
pub const LABEL_SONNET: &str = "Sonnet";

/// A single usage metric, normalized.
///
/// `utilization` is a percentage and is not clamped; upstream occasionally
/// reports values above 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStat {
    pub utilization: f64,
    pub resets_at: Option<DateTime<Utc>>,
    pub label: String,
}

/// The latest fetched usage for the configured organization.
///
/// Replaced wholesale on every successful fetch. Metrics missing from the
/// response stay at their zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub five_hour: UsageStat,
    pub seven_day: UsageStat,
    pub seven_day_opus: UsageStat,
    pub seven_day_sonnet: UsageStat,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrganizationInfo {
    #[serde(rename = "uuid")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Raw body of `GET /api/organizations/{id}/usage`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageApiResponse {
    #[serde(default)]
    pub five_hour: Option<UsageMetric>,
    #[serde(default)]
    pub seven_day: Option<UsageMetric>,
    #[serde(default)]
    pub seven_day_opus: Option<UsageMetric>,
    #[serde(default)]
    pub seven_day_sonnet: Option<UsageMetric>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageMetric {
    #[serde(default)]
    pub utilization: Option<f64>,
    #[serde(default)]
    pub resets_at: Option<String>,
}

impl UsageMetric {
    fn to_stat(&self, label: &str) -> UsageStat {
        UsageStat {
            utilization: self.utilization.unwrap_or(0.0),
            resets_at: self.resets_at.as_deref().and_then(parse_timestamp),
            label: label.to_string(),
        }
    }
}

impl UsageApiResponse {
    /// Converts the raw response into a snapshot stamped with `fetched_at`.
    pub fn to_snapshot(&self, fetched_at: DateTime<Utc>) -> UsageSnapshot {
        let stat = |metric: &Option<UsageMetric>, label: &str| {
            metric
                .as_ref()
                .map(|m| m.to_stat(label))
                .unwrap_or_default()
        };

        UsageSnapshot {
            five_hour: stat(&self.five_hour, LABEL_FIVE_HOUR),
            seven_day: stat(&self.seven_day, LABEL_WEEKLY),
            seven_day_opus: stat(&self.seven_day_opus, LABEL_OPUS),
            seven_day_sonnet: stat(&self.seven_day_sonnet, LABEL_SONNET),
            fetched_at,
        }
    }
}

/// Structured error body returned alongside 4xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub error: ApiErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: ApiErrorCode,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorCode {
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Extracts `error.details.error_code` from an error body, if present.
pub fn parse_error_code(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error.details.error_code)
        .filter(|code| !code.is_empty())
}

/// Parses the ISO-8601 variants the API has been seen to emit.
///
/// Returns `None` for empty or unrecognized input rather than failing.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Zone-less variants are treated as UTC.
    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S%.f"];
    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .map(|naive| naive.and_utc())
    })
}

/// Human-readable countdown until `reset_at`, relative to `now`.
pub fn time_until_reset(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = reset_at - now;
    if remaining < chrono::Duration::zero() {
        return "Now".to_string();
    }

    let mut hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;

    if hours > 24 {
        let days = hours / 24;
        hours %= 24;
        return format!("{}d {}h", days, hours);
    }

    if hours > 0 {
        return format!("{}h {}m", hours, minutes);
    }
    format!("{}m", minutes)
}

#[cfg(test)]
#[path = "tests/models_tests.rs"]
mod tests;
