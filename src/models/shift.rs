use serde::{Deserialize, Serialize};

/// A shift/time-tracking entry as returned by `/api/shift/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    #[serde(rename = "staffId")]
    pub staff_id: String,
    /// ISO date, e.g. "2026-08-29".
    pub date: String,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    /// Worked hours as recorded by the server, if already computed.
    #[serde(default)]
    pub hours: Option<f64>,
}

impl Shift {
    /// Human-readable time span, e.g. "09:00 - 17:30".
    pub fn display_span(&self) -> String {
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => format!("{} - {}", start, end),
            (Some(start), None) => format!("{} - ?", start),
            _ => "-".to_string(),
        }
    }
}
