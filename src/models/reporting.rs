//! Revenue reporting models.
//!
//! The reporting endpoint aggregates register activity over a named date
//! range and returns totals both including and excluding tax (TTC/HT).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named date range accepted by the reporting endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportRange {
    Today,
    Yesterday,
    Week,
    Month,
}

impl ReportRange {
    /// All ranges the dashboard displays, in display order.
    pub const ALL: [ReportRange; 4] = [
        ReportRange::Today,
        ReportRange::Yesterday,
        ReportRange::Week,
        ReportRange::Month,
    ];

    /// Query-parameter value for this range.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportRange::Today => "today",
            ReportRange::Yesterday => "yesterday",
            ReportRange::Week => "week",
            ReportRange::Month => "month",
        }
    }
}

impl fmt::Display for ReportRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated revenue figures for one date range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total including tax (toutes taxes comprises).
    #[serde(rename = "TTC", default)]
    pub total_ttc: f64,
    /// Total excluding tax (hors taxes).
    #[serde(rename = "HT", default)]
    pub total_ht: f64,
    #[serde(rename = "TVA", default)]
    pub total_tva: f64,
    #[serde(rename = "ticketCount", default)]
    pub ticket_count: u32,
}

impl ReportSummary {
    /// Average ticket value including tax, or zero when no tickets exist.
    pub fn average_ticket(&self) -> f64 {
        if self.ticket_count == 0 {
            0.0
        } else {
            self.total_ttc / self.ticket_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_query_values() {
        assert_eq!(ReportRange::Yesterday.as_str(), "yesterday");
        assert_eq!(ReportRange::Today.to_string(), "today");
    }

    #[test]
    fn parses_api_payload() {
        let json = r#"{"TTC": 120.0, "HT": 100.0, "TVA": 20.0, "ticketCount": 4}"#;
        let summary: ReportSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.total_ttc, 120.0);
        assert_eq!(summary.total_ht, 100.0);
        assert_eq!(summary.average_ticket(), 30.0);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let summary: ReportSummary = serde_json::from_str(r#"{"TTC": 50.0}"#).unwrap();
        assert_eq!(summary.total_ht, 0.0);
        assert_eq!(summary.average_ticket(), 0.0);
    }
}
