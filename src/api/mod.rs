//! HTTP client module for the dashboard API.
//!
//! This module provides the `ApiClient` for fetching reporting, staff,
//! shift, and cash-entry data. All endpoints respond with a JSON envelope
//! `{ "success": bool, "data": ..., "error": ... }`; the client unwraps the
//! envelope and surfaces `success: false` as an error.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
