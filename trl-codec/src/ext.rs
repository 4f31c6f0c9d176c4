//! Date and time support through the [`chrono`] crate.
//!
//! [`register_chrono_types`] registers `NaiveDate` and `NaiveTime` with
//! positional constructors and adds the [`ChronoExtensions`]
//! deconstructors, so dates are written as `NaiveDate(2024, 2, 29)` and
//! times as `NaiveTime(12, 30, 0)`.

use crate::{ExtensionProvider, Extensions, Registry, RegistrationError, TypeDescriptor};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

/// Deconstructors splitting dates into (year, month, day) and times into
/// (hour, minute, second), with their shorter prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoExtensions;

impl ExtensionProvider for ChronoExtensions {
    fn name(&self) -> &str {
        "chrono"
    }

    fn register(&self, extensions: &mut Extensions) {
        extensions
            .deconstructor(|d: &NaiveDate| (d.year(),))
            .deconstructor(|d: &NaiveDate| (d.year(), d.month()))
            .deconstructor(|d: &NaiveDate| (d.year(), d.month(), d.day()))
            .deconstructor(|t: &NaiveTime| (t.hour(), t.minute()))
            .deconstructor(|t: &NaiveTime| (t.hour(), t.minute(), t.second()));
    }
}

/// Registers `NaiveDate` and `NaiveTime` and their deconstructors.
pub fn register_chrono_types(registry: &mut Registry) -> Result<(), RegistrationError> {
    registry.register(
        TypeDescriptor::composite::<NaiveDate>()
            .try_constructor(|y: i32| NaiveDate::from_ymd_opt(y, 1, 1).ok_or("year out of range"))
            .try_constructor(|y: i32, m: u32| NaiveDate::from_ymd_opt(y, m, 1).ok_or("invalid month"))
            .try_constructor(|y: i32, m: u32, d: u32| NaiveDate::from_ymd_opt(y, m, d).ok_or("invalid date")),
    )?;
    registry.register(
        TypeDescriptor::composite::<NaiveTime>()
            .try_constructor(|h: u32, m: u32| NaiveTime::from_hms_opt(h, m, 0).ok_or("invalid time"))
            .try_constructor(|h: u32, m: u32, s: u32| NaiveTime::from_hms_opt(h, m, s).ok_or("invalid time")),
    )?;
    registry.register_list::<NaiveDate>();
    registry.register_optional::<NaiveDate>();
    registry.register_list::<NaiveTime>();
    registry.register_optional::<NaiveTime>();
    registry.register_extensions(&ChronoExtensions)
}
