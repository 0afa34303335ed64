use serde::{Deserialize, Serialize};

/// A cash-register reconciliation entry as returned by `/api/cash-entry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEntry {
    pub id: String,
    /// ISO date the register was counted.
    pub date: String,
    #[serde(rename = "openingFloat")]
    pub opening_float: f64,
    #[serde(rename = "closingCount")]
    pub closing_count: f64,
    /// Expected closing amount from register activity.
    #[serde(default)]
    pub expected: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl CashEntry {
    /// Counted minus expected; negative means the drawer came up short.
    pub fn discrepancy(&self) -> f64 {
        self.closing_count - self.expected
    }

    pub fn is_balanced(&self) -> bool {
        self.discrepancy().abs() < 0.005
    }
}
