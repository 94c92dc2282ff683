//! Date formats used by profile pages and list exports.

use super::collapse_whitespace;
use crate::models::DateRange;
use anyhow::{bail, Context};
use chrono::NaiveDate;

const UNKNOWN: [&str; 4] = ["", "?", "Not available", "Unknown"];

/// Parse a sidebar date: `"Apr 3, 1998"`, `"April 3, 1998"`, `"Apr 1998"`
/// (first of the month) or `"1998"` (first of the year).
///
/// Placeholders such as `"?"` yield `None`.
pub(crate) fn parse_profile_date(text: &str) -> anyhow::Result<Option<NaiveDate>> {
    let text = collapse_whitespace(text);
    if UNKNOWN.contains(&text.as_str()) {
        return Ok(None);
    }

    for format in ["%b %d, %Y", "%B %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return Ok(Some(date));
        }
    }

    let month_first = format!("1 {text}");
    for format in ["%d %b %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&month_first, format) {
            return Ok(Some(date));
        }
    }

    if text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()) {
        let year = text.parse().context("bad year")?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .map(Some)
            .with_context(|| format!("year {year} out of range"));
    }

    bail!("unrecognised date {text:?}")
}

/// Parse `"Apr 3, 1998 to Apr 24, 1999"`. A single date is both start and end.
pub(crate) fn parse_date_range(text: &str) -> anyhow::Result<DateRange> {
    match text.split_once(" to ") {
        Some((start, end)) => Ok(DateRange {
            start: parse_profile_date(start).context("bad start date")?,
            end: parse_profile_date(end).context("bad end date")?,
        }),
        None => {
            let date = parse_profile_date(text)?;
            Ok(DateRange {
                start: date,
                end: date,
            })
        }
    }
}

/// Parse a list export date `YYYY-MM-DD`, where zero parts mean unknown.
///
/// A date with any unknown part yields `None`.
pub(crate) fn parse_list_date(text: &str) -> anyhow::Result<Option<NaiveDate>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let parts = text
        .split('-')
        .map(|part| part.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("bad list date {text:?}"))?;
    let [year, month, day] = parts[..] else {
        bail!("bad list date {text:?}");
    };
    if year == 0 || month == 0 || day == 0 {
        return Ok(None);
    }

    let year = i32::try_from(year).context("year out of range")?;
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .with_context(|| format!("invalid list date {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_profile_dates() -> anyhow::Result<()> {
        assert_eq!(parse_profile_date("Apr 3, 1998")?, date(1998, 4, 3));
        assert_eq!(parse_profile_date("  Apr  3,  1998 ")?, date(1998, 4, 3));
        assert_eq!(parse_profile_date("April 3, 1998")?, date(1998, 4, 3));
        assert_eq!(parse_profile_date("Apr 1998")?, date(1998, 4, 1));
        assert_eq!(parse_profile_date("1998")?, date(1998, 1, 1));
        assert_eq!(parse_profile_date("?")?, None);
        assert_eq!(parse_profile_date("Not available")?, None);
        assert!(parse_profile_date("sometime").is_err());
        Ok(())
    }

    #[test]
    fn test_date_ranges() -> anyhow::Result<()> {
        let range = parse_date_range("Apr 3, 1998 to Apr 24, 1999")?;
        assert_eq!(range.start, date(1998, 4, 3));
        assert_eq!(range.end, date(1999, 4, 24));

        let ongoing = parse_date_range("Jul 24, 1999 to ?")?;
        assert_eq!(ongoing.start, date(1999, 7, 24));
        assert_eq!(ongoing.end, None);

        let single = parse_date_range("Apr 23, 2001")?;
        assert_eq!(single.start, single.end);
        Ok(())
    }

    #[test]
    fn test_list_dates() -> anyhow::Result<()> {
        assert_eq!(parse_list_date("1998-04-03")?, date(1998, 4, 3));
        assert_eq!(parse_list_date("0000-00-00")?, None);
        assert_eq!(parse_list_date("2004-00-00")?, None);
        assert_eq!(parse_list_date("2010-05-00")?, None);
        assert_eq!(parse_list_date("")?, None);
        assert!(parse_list_date("2004-13-01").is_err());
        assert!(parse_list_date("yesterday").is_err());
        Ok(())
    }
}
