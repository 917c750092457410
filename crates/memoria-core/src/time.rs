//! UTC timestamp helpers (component B).
//!
//! Every timestamp stored or compared by the core uses the fixed lexical
//! format `YYYY-MM-DDThh:mm:ss.ffffffZ`, chosen so that string ordering
//! equals chronological ordering without parsing.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::CoreError;

/// Render the current instant in the fixed timestamp format.
pub fn now() -> String {
    format(Utc::now())
}

/// Render an arbitrary instant in the fixed timestamp format.
pub fn format(instant: DateTime<Utc>) -> String {
    // `SecondsFormat::Micros` gives exactly six fractional digits, matching
    // the `%Y-%m-%dT%H:%M:%S.%fZ` shape the original service relies on.
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp previously produced by [`now`] or [`format`].
///
/// Any other shape is a validation error — the core never guesses at
/// alternate formats.
pub fn parse(value: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CoreError::validation(format!("invalid timestamp: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_format() {
        let rendered = now();
        let parsed = parse(&rendered).expect("now() output must parse");
        assert_eq!(format(parsed), rendered);
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!(parse("not-a-timestamp").is_err());
        assert!(parse("2024-01-01").is_err());
    }

    #[test]
    fn string_order_matches_chronological_order() {
        let earlier = format(chrono::Utc::now() - chrono::Duration::seconds(5));
        let later = now();
        assert!(earlier < later);
    }
}
