// storefront/src/appointments.rs

//! Bulk slot generation for nutritionist calendars.

use crate::errors::AppError;
use crate::models::AppointmentSlot;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::Deserialize;

pub const MAX_RANGE_DAYS: i64 = 92;
pub const MIN_SLOT_MINUTES: u32 = 5;
pub const MAX_SLOT_MINUTES: u32 = 480;

/// Recurring weekly availability, expanded into concrete slots. Times are UTC.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotTemplate {
  pub from_date: NaiveDate,
  pub to_date: NaiveDate,
  pub weekdays: Vec<Weekday>,
  pub day_start: NaiveTime,
  pub day_end: NaiveTime,
  pub slot_minutes: u32,
}

pub type SlotWindow = (DateTime<Utc>, DateTime<Utc>);

impl SlotTemplate {
  pub fn validate(&self) -> Result<(), AppError> {
    if self.from_date > self.to_date {
      return Err(AppError::Validation("from_date must not be after to_date.".to_string()));
    }
    if (self.to_date - self.from_date).num_days() > MAX_RANGE_DAYS {
      return Err(AppError::Validation(format!(
        "Date range cannot exceed {} days.",
        MAX_RANGE_DAYS
      )));
    }
    if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&self.slot_minutes) {
      return Err(AppError::Validation(format!(
        "slot_minutes must be between {} and {}.",
        MIN_SLOT_MINUTES, MAX_SLOT_MINUTES
      )));
    }
    if self.day_start >= self.day_end {
      return Err(AppError::Validation("day_start must be before day_end.".to_string()));
    }
    if self.weekdays.is_empty() {
      return Err(AppError::Validation("At least one weekday is required.".to_string()));
    }
    Ok(())
  }
}

/// Expands `template` into back-to-back windows. Every window ends at or before `day_end`.
pub fn generate_slots(template: &SlotTemplate) -> Result<Vec<SlotWindow>, AppError> {
  template.validate()?;
  let step = Duration::minutes(i64::from(template.slot_minutes));

  let mut windows = Vec::new();
  for date in template.from_date.iter_days().take_while(|d| *d <= template.to_date) {
    if !template.weekdays.contains(&date.weekday()) {
      continue;
    }
    let day_end = date.and_time(template.day_end).and_utc();
    let mut start = date.and_time(template.day_start).and_utc();
    while start + step <= day_end {
      windows.push((start, start + step));
      start += step;
    }
  }
  Ok(windows)
}

/// Splits `windows` into those free of `existing` slots and the count of overlapping ones.
pub fn drop_overlapping(windows: Vec<SlotWindow>, existing: &[AppointmentSlot]) -> (Vec<SlotWindow>, usize) {
  let total = windows.len();
  let kept: Vec<SlotWindow> = windows
    .into_iter()
    .filter(|(start, end)| !existing.iter().any(|slot| slot.overlaps(*start, *end)))
    .collect();
  let skipped = total - kept.len();
  (kept, skipped)
}
