//! Domain models for dashboard data.
//!
//! These types mirror the JSON payloads served by the dashboard API:
//! revenue reporting summaries, staff records, shift entries, and
//! cash-register reconciliation entries.

pub mod cash;
pub mod reporting;
pub mod shift;
pub mod staff;

pub use cash::CashEntry;
pub use reporting::{ReportRange, ReportSummary};
pub use shift::Shift;
pub use staff::StaffMember;
