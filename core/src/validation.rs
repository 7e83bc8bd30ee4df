//! Explicit request validation.
//!
//! Each operation has a request type that enumerates its fields; unknown fields are
//! rejected at deserialization and format constraints are checked here, before any
//! store is touched. Violations surface as [`BookingError::InvalidArgument`].

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::{BookingError, Result};
use crate::types::{BusinessId, ScheduleId, Slot, SlotPatch};

/// Zero-padded 24h `HH:MM` or `HH:MM:SS`.
#[allow(clippy::expect_used)] // literal pattern
static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9](:[0-5][0-9])?$").expect("valid time pattern")
});

/// `YYYY-MM-DD`.
#[allow(clippy::expect_used)] // literal pattern
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date pattern"));

/// Check a time-of-day string.
///
/// # Errors
///
/// Returns `InvalidArgument` unless `value` is `HH:MM` or `HH:MM:SS`.
pub fn validate_time(field: &str, value: &str) -> Result<()> {
    if TIME_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(BookingError::InvalidArgument(format!(
            "{field} must be in format HH:MM or HH:MM:SS"
        )))
    }
}

/// Check a calendar date string.
///
/// # Errors
///
/// Returns `InvalidArgument` unless `value` is a real `YYYY-MM-DD` date.
pub fn validate_date(value: &str) -> Result<()> {
    if DATE_PATTERN.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(BookingError::InvalidArgument(format!(
            "date must be a valid calendar date in format YYYY-MM-DD, got {value:?}"
        )))
    }
}

/// Normalize an optional `?date=` filter. An empty value means "no filter".
///
/// # Errors
///
/// Returns `InvalidArgument` for a malformed date.
pub fn validate_date_filter(date: Option<String>) -> Result<Option<String>> {
    match date {
        None => Ok(None),
        Some(date) if date.is_empty() => Ok(None),
        Some(date) => {
            validate_date(&date)?;
            Ok(Some(date))
        }
    }
}

fn validate_window(start_time: &str, end_time: &str) -> Result<()> {
    // Both are zero-padded, so lexical order is chronological order.
    if start_time < end_time {
        Ok(())
    } else {
        Err(BookingError::InvalidArgument(
            "start_time must be before end_time".to_string(),
        ))
    }
}

/// Body of a slot creation request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotRequest {
    /// Calendar date
    pub date: String,
    /// Window start
    pub start_time: String,
    /// Window end
    pub end_time: String,
    /// Initial availability
    pub available: bool,
}

impl SlotRequest {
    /// Validate and turn into a new slot record for `business_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed date or time, or when
    /// `start_time` is not before `end_time`.
    pub fn into_slot(self, business_id: BusinessId) -> Result<Slot> {
        validate_date(&self.date)?;
        validate_time("start_time", &self.start_time)?;
        validate_time("end_time", &self.end_time)?;
        validate_window(&self.start_time, &self.end_time)?;

        Ok(Slot {
            id: ScheduleId::new(),
            business_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            available: self.available,
        })
    }
}

/// Body of a partial slot update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotPatchRequest {
    /// New date
    pub date: Option<String>,
    /// New start
    pub start_time: Option<String>,
    /// New end
    pub end_time: Option<String>,
    /// New availability
    pub available: Option<bool>,
}

impl SlotPatchRequest {
    /// Validate against the slot being updated.
    ///
    /// When either time is provided, the merged window must still satisfy
    /// `start_time < end_time`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty patch, a malformed field, or an
    /// inverted window.
    pub fn into_patch(self, current: &Slot) -> Result<SlotPatch> {
        let patch = SlotPatch {
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            available: self.available,
        };

        if patch.is_empty() {
            return Err(BookingError::InvalidArgument(
                "No fields to update".to_string(),
            ));
        }
        if let Some(date) = &patch.date {
            validate_date(date)?;
        }
        if let Some(start_time) = &patch.start_time {
            validate_time("start_time", start_time)?;
        }
        if let Some(end_time) = &patch.end_time {
            validate_time("end_time", end_time)?;
        }
        if patch.start_time.is_some() || patch.end_time.is_some() {
            let start = patch.start_time.as_deref().unwrap_or(&current.start_time);
            let end = patch.end_time.as_deref().unwrap_or(&current.end_time);
            validate_window(start, end)?;
        }

        Ok(patch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(date: &str, start: &str, end: &str) -> SlotRequest {
        SlotRequest {
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            available: true,
        }
    }

    #[test]
    fn test_accepts_both_time_formats() {
        assert!(validate_time("start_time", "09:00").is_ok());
        assert!(validate_time("start_time", "23:59:59").is_ok());
    }

    #[test]
    fn test_rejects_unpadded_and_out_of_range_times() {
        assert!(validate_time("start_time", "9:00").is_err());
        assert!(validate_time("start_time", "24:00").is_err());
        assert!(validate_time("start_time", "12:60").is_err());
        assert!(validate_time("start_time", "12:00pm").is_err());
    }

    #[test]
    fn test_rejects_impossible_dates() {
        assert!(validate_date("2025-03-01").is_ok());
        assert!(validate_date("2024-02-29").is_ok());
        assert!(validate_date("2025-02-29").is_err());
        assert!(validate_date("2025-3-1").is_err());
        assert!(validate_date("01/03/2025").is_err());
    }

    #[test]
    fn test_create_requires_start_before_end() {
        let business_id = BusinessId::new();
        assert!(request("2025-03-01", "09:00", "10:00").into_slot(business_id).is_ok());
        assert!(request("2025-03-01", "10:00", "10:00").into_slot(business_id).is_err());
        assert!(request("2025-03-01", "10:00", "09:00").into_slot(business_id).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"date":"2025-03-01","start_time":"09:00","end_time":"10:00","available":true,"business_id":"x"}"#;
        assert!(serde_json::from_str::<SlotRequest>(json).is_err());
    }

    #[test]
    fn test_patch_checks_merged_window() {
        let slot = request("2025-03-01", "09:00", "10:00")
            .into_slot(BusinessId::new())
            .unwrap();

        let inverted = SlotPatchRequest {
            end_time: Some("08:30".to_string()),
            ..SlotPatchRequest::default()
        };
        assert!(inverted.into_patch(&slot).is_err());

        let extended = SlotPatchRequest {
            end_time: Some("11:00".to_string()),
            ..SlotPatchRequest::default()
        };
        assert_eq!(
            extended.into_patch(&slot).unwrap().end_time.as_deref(),
            Some("11:00")
        );

        let availability_only = SlotPatchRequest {
            available: Some(false),
            ..SlotPatchRequest::default()
        };
        assert!(availability_only.into_patch(&slot).is_ok());
    }

    #[test]
    fn test_empty_patch_rejected() {
        let slot = request("2025-03-01", "09:00", "10:00")
            .into_slot(BusinessId::new())
            .unwrap();
        assert!(SlotPatchRequest::default().into_patch(&slot).is_err());
    }

    #[test]
    fn test_date_filter() {
        assert_eq!(validate_date_filter(None).unwrap(), None);
        assert_eq!(validate_date_filter(Some(String::new())).unwrap(), None);
        assert!(validate_date_filter(Some("tomorrow".to_string())).is_err());
    }

    proptest! {
        #[test]
        fn prop_lexical_order_matches_chronological(
            a in (0u32..24, 0u32..60, proptest::option::of(0u32..60)),
            b in (0u32..24, 0u32..60, proptest::option::of(0u32..60)),
        ) {
            let fmt = |(h, m, s): (u32, u32, Option<u32>)| match s {
                Some(s) => format!("{h:02}:{m:02}:{s:02}"),
                None => format!("{h:02}:{m:02}"),
            };
            let (ta, tb) = (fmt(a), fmt(b));
            prop_assert!(validate_time("t", &ta).is_ok());
            prop_assert!(validate_time("t", &tb).is_ok());

            let secs = |(h, m, s): (u32, u32, Option<u32>)| h * 3600 + m * 60 + s.unwrap_or(0);
            if secs(a) < secs(b) {
                prop_assert!(ta < tb);
            }
        }
    }
}
