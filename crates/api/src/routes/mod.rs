//! HTTP route handlers.

pub mod email;
pub mod health;
pub mod stats;
pub mod transactions;
pub mod users;

use shared::dates::{self, BoundaryFormat, TimeWindow};

use crate::error::ApiError;

/// Builds the inclusive time window from optional boundary query
/// parameters. Runs before any upstream fetch so malformed or inverted
/// boundaries never cost a network call.
fn parse_window(
    from_date: Option<&str>,
    to_date: Option<&str>,
    format: BoundaryFormat,
) -> Result<TimeWindow, ApiError> {
    let lower = from_date
        .map(|raw| dates::parse_lower_boundary(raw, format))
        .transpose()?;
    let upper = to_date
        .map(|raw| dates::parse_upper_boundary(raw, format))
        .transpose()?;
    Ok(TimeWindow::new(lower, upper)?)
}
