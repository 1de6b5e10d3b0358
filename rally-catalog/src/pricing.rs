use chrono::NaiveTime;
use rally_shared::Money;

const CLOCK_FORMAT: &str = "%H:%M";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PricingError {
    #[error("Invalid clock time: {0}")]
    InvalidClock(String),

    #[error("Session must end after it starts ({start} - {end})")]
    NonPositiveDuration {
        start: String,
        end: String,
    },
}

/// Parse a 24-hour `HH:MM` clock value.
pub fn parse_clock(value: &str) -> Result<NaiveTime, PricingError> {
    NaiveTime::parse_from_str(value.trim(), CLOCK_FORMAT)
        .map_err(|_| PricingError::InvalidClock(value.to_string()))
}

/// Fractional hours between two clock times, never negative.
pub fn duration_between(start: NaiveTime, end: NaiveTime) -> f64 {
    let minutes = (end - start).num_minutes();
    if minutes <= 0 {
        0.0
    } else {
        minutes as f64 / 60.0
    }
}

/// Fractional hours between two `HH:MM` strings.
///
/// Returns `0.0` both for an inverted/empty range and for unparsable input;
/// a zero duration means the session cannot be priced.
pub fn duration(start: &str, end: &str) -> f64 {
    match (parse_clock(start), parse_clock(end)) {
        (Ok(s), Ok(e)) => duration_between(s, e),
        _ => 0.0,
    }
}

/// Reject a range that cannot be priced.
pub fn require_priceable(start: NaiveTime, end: NaiveTime) -> Result<f64, PricingError> {
    let hours = duration_between(start, end);
    if hours <= 0.0 {
        return Err(PricingError::NonPositiveDuration {
            start: start.format(CLOCK_FORMAT).to_string(),
            end: end.format(CLOCK_FORMAT).to_string(),
        });
    }
    Ok(hours)
}

/// `rate × courtCount × durationHours`, rounded once to the cent.
pub fn total_court_fee(rate: Money, court_count: u32, duration_hours: f64) -> Money {
    (rate * court_count).scale(duration_hours.max(0.0))
}

/// `qty × price`
pub fn total_shuttle_cost(qty: u32, price: Money) -> Money {
    price * qty
}
