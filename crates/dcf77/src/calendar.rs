//! Calendar time snapshots and the time source contract.

use core::{error, fmt};
use time::{days_per_month, time::Tm};

/// Local calendar time of one instant, as transmitted by DCF77.
///
/// Snapshots are taken once per composition. Consecutive minutes are derived with
/// [`CalendarTime::next_minute`] rather than by asking the time source again, so the three minutes
/// of one transmission are always consecutive.
///
/// # Examples
///
/// ```
/// # use dcf77::CalendarTime;
/// // Sunday, March 31, 2024. 23:59:30 CEST.
/// let t = CalendarTime::new(2024, 3, 31, 23, 59, 30, 7, true).unwrap();
/// let n = t.next_minute();
/// assert_eq!((n.month, n.day, n.hour, n.minute, n.weekday), (4, 1, 0, 0, 1));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarTime {
	/// Absolute Gregorian year, e.g. 2024
	pub year: u16,
	/// Month of the year, ranged [1, 12]
	pub month: u8,
	/// Day of the month, ranged [1, 31]
	pub day: u8,
	/// Hours, ranged [0, 23]
	pub hour: u8,
	/// Minutes, ranged [0, 59]
	pub minute: u8,
	/// Seconds, ranged [0, 59]
	pub second: u8,
	/// Day of the week, ranged [1, 7] => [Monday, Sunday]. Zero is accepted as Sunday.
	pub weekday: u8,
	/// Whether daylight savings time is in effect
	pub is_dst: bool
}

/// The error type for constructing calendar snapshots.
///
/// Each variant carries the rejected value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum CalendarError {
	/// Month outside [1, 12].
	InvalidMonth(u8),
	/// Day outside the month.
	InvalidDay(u8),
	/// Hour outside [0, 23].
	InvalidHour(u8),
	/// Minute outside [0, 59].
	InvalidMinute(u8),
	/// Second outside [0, 59].
	InvalidSecond(u8),
	/// Weekday outside [0, 7].
	InvalidWeekday(u8)
}

impl fmt::Display for CalendarError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CalendarError::InvalidMonth(x) => write!(f, "Invalid month: {}", x),
			CalendarError::InvalidDay(x) => write!(f, "Invalid day of month: {}", x),
			CalendarError::InvalidHour(x) => write!(f, "Invalid hour: {}", x),
			CalendarError::InvalidMinute(x) => write!(f, "Invalid minute: {}", x),
			CalendarError::InvalidSecond(x) => write!(f, "Invalid second: {}", x),
			CalendarError::InvalidWeekday(x) => write!(f, "Invalid weekday: {}", x),
		}
	}
}

impl fmt::Debug for CalendarError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for CalendarError {}

impl CalendarTime {
	/// Create a range checked snapshot.
	///
	/// A weekday of 0 is normalized to 7 (Sunday), so both the ISO numbering and the C library's
	/// Sunday-first numbering are accepted for Sunday.
	///
	/// # Errors
	///
	/// Returns the [`CalendarError`] variant of the first field that is out of range. The day is
	/// checked against the length of the given month.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8, weekday: u8, is_dst: bool
	) -> Result<CalendarTime, CalendarError> {
		if !(1..=12).contains(&month) {
			return Err(CalendarError::InvalidMonth(month));
		}
		if day == 0 || day > days_per_month(year, month) {
			return Err(CalendarError::InvalidDay(day));
		}
		if hour > 23 {
			return Err(CalendarError::InvalidHour(hour));
		}
		if minute > 59 {
			return Err(CalendarError::InvalidMinute(minute));
		}
		if second > 59 {
			return Err(CalendarError::InvalidSecond(second));
		}
		if weekday > 7 {
			return Err(CalendarError::InvalidWeekday(weekday));
		}

		Ok(CalendarTime {
			year,
			month,
			day,
			hour,
			minute,
			second,
			weekday: if weekday == 0 { 7 } else { weekday },
			is_dst
		})
	}

	/// Create a snapshot from local calendar time.
	///
	/// # Errors
	///
	/// See [`CalendarTime::new`].
	pub fn from_tm(tm: &Tm, is_dst: bool) -> Result<CalendarTime, CalendarError> {
		CalendarTime::new(tm.year(), tm.mon, tm.day, tm.hour, tm.min, tm.sec, tm.iso_wday(), is_dst)
	}

	/// The two digit year within the century.
	#[inline(always)]
	pub fn year_in_century(&self) -> u8 {
		(self.year % 100) as u8
	}

	/// The snapshot one minute later.
	///
	/// Rolls the hour, day, weekday, month and year over as needed. The seconds and the daylight
	/// savings flag are carried over unchanged: a switch to or from daylight savings time inside
	/// the following minutes is not reflected.
	pub fn next_minute(&self) -> CalendarTime {
		let mut next = *self;
		next.minute += 1;
		if next.minute < 60 {
			return next;
		}
		next.minute = 0;
		next.hour += 1;
		if next.hour < 24 {
			return next;
		}
		next.hour = 0;
		next.weekday = if self.weekday >= 7 { 1 } else { self.weekday + 1 };
		next.day += 1;
		if next.day <= days_per_month(next.year, next.month) {
			return next;
		}
		next.day = 1;
		next.month += 1;
		if next.month <= 12 {
			return next;
		}
		next.month = 1;
		next.year += 1;
		next
	}
}

/// A source of local calendar time.
///
/// Implementations return the current time already corrected for clock offsets and localized to
/// the transmitted timezone, including the daylight savings flag. How the time is acquired (system
/// clock, network, RTC chip) is up to the implementation.
pub trait TimeSource {
	/// The error type for failed reads.
	type Error;

	/// Read the current local time.
	fn now(&mut self) -> Result<CalendarTime, Self::Error>;
}
