//! Turns device records into typed readings.
//!
//! The bin firmware prints records such as `Load sensor value: -12.5g` and
//! `Trash percentage in dustbin: 87.3%`. Anything else on the line (boot
//! banners, partial records after a reset) is data, not an error, and comes
//! back as [`ParsedReading::Unrecognized`].

use super::RawLine;

pub(crate) const LOAD_LABEL: &str = "Load sensor value";
pub(crate) const TRASH_LABEL: &str = "Trash percentage in dustbin";

const SEPARATOR: &str = ": ";

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ParsedReading {
    /// Absolute load in grams.
    LoadGrams(f64),
    TrashPercent(f64),
    Unrecognized,
}

pub(crate) fn parse(line: &RawLine) -> ParsedReading {
    parse_str(&line.text)
}

pub(crate) fn parse_str(line: &str) -> ParsedReading {
    let mut segments = line.trim().split(SEPARATOR);
    let (Some(name), Some(value), None) = (segments.next(), segments.next(), segments.next())
    else {
        return ParsedReading::Unrecognized;
    };

    match name {
        LOAD_LABEL => value
            .trim()
            .strip_suffix('g')
            .and_then(parse_number)
            .map(|grams| ParsedReading::LoadGrams(grams.abs()))
            .unwrap_or(ParsedReading::Unrecognized),
        TRASH_LABEL => {
            let value = value.trim();
            parse_number(value.strip_suffix('%').unwrap_or(value))
                .map(ParsedReading::TrashPercent)
                .unwrap_or(ParsedReading::Unrecognized)
        }
        _ => ParsedReading::Unrecognized,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
