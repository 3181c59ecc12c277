//! `HH:MM:SS` encoding of elapsed seconds
//!
//! Hours are a flat total and never wrap at 24, so a counter that has been
//! running for two days reads `48:00:00`.

/// Errors from parsing an elapsed-time string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected HH:MM:SS, got {0:?}")]
    Shape(String),

    #[error("invalid number in {field}: {value:?}")]
    Number { field: &'static str, value: String },

    #[error("{field} must be below 60, got {value}")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("elapsed time does not fit in 64 bits")]
    Overflow,
}

/// Format seconds as zero-padded `HH:MM:SS`
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse an `HH:MM:SS` string back into seconds
///
/// Surrounding whitespace (including a trailing newline) is ignored.
pub fn parse_hms(text: &str) -> Result<u64, ParseError> {
    let trimmed = text.trim();
    let parts: Vec<&str> = trimmed.split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(ParseError::Shape(trimmed.to_string()));
    };

    let hours = parse_field("hours", hours)?;
    let minutes = parse_field("minutes", minutes)?;
    let seconds = parse_field("seconds", seconds)?;

    if minutes >= 60 {
        return Err(ParseError::OutOfRange { field: "minutes", value: minutes });
    }
    if seconds >= 60 {
        return Err(ParseError::OutOfRange { field: "seconds", value: seconds });
    }

    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or(ParseError::Overflow)
}

fn parse_field(field: &'static str, value: &str) -> Result<u64, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::Number { field, value: value.to_string() });
    }
    value.parse().map_err(|_| ParseError::Overflow)
}
