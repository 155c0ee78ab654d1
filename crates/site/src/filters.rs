//! Custom Askama template filters and date formatting helpers.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::{Datelike, NaiveDate};

/// Dates as guests read them: `31-12-2026`.
const DISPLAY_FORMAT: &str = "%d-%m-%Y";

/// Dates in URLs and form values: `2026-12-31`.
const ISO_FORMAT: &str = "%Y-%m-%d";

#[must_use]
pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

#[must_use]
pub fn iso_date(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    Ok(chrono::Utc::now().year())
}
