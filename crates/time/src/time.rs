//! Calendar arithmetic on UTC dates and Unix timestamps, unaware of timezone.
//!
//! This module reads the real-time clock (feature `now`) and converts between Unix time and
//! Gregorian calendar dates. The conversions are pure integer arithmetic on a calendar that starts
//! its year on March 1, which puts the leap day at the end of the year. They do not rely on libc's
//! `mktime` or `gmtime`, so they are thread safe and available without `std`.
//!
//! # Examples
//!
//! ```
//! # use time::time::Tm;
//! // Mon, Jun 17, 2024. 09:50:07 UTC.
//! let date = Tm::new(1718617807).unwrap();
//! assert_eq!((date.year(), date.mon, date.day), (2024, 6, 17));
//! assert_eq!((date.hour, date.min, date.sec), (9, 50, 7));
//! assert_eq!((date.iso_wday(), date.yday), (1, 169));
//! assert_eq!(date.timestamp(), 1718617807);
//! ```

#[cfg(feature = "now")]
use core::mem::MaybeUninit;
#[cfg(feature = "now")]
use libc::{timespec, clock_gettime, CLOCK_REALTIME};

/// A signed number of seconds, added to a [`TimeSpec`] to shift it.
#[repr(transparent)]
pub struct Seconds(pub i64);

/// Unix time with nanosecond granularity.
///
/// Clock correction offsets are applied with [`TimeSpec::checked_add`]. Negative offsets move the
/// clock backwards.
///
/// # Examples
///
/// ```
/// # use time::time::{Seconds, TimeSpec};
/// // Jan 1, 2025. 12:00:00.5 UTC.
/// let c = TimeSpec { sec: 1735732800, nsec: 500000000 };
/// assert_eq!(c.checked_add(Seconds(-10)), Some(TimeSpec { sec: c.sec - 10, nsec: 500000000 }));
/// assert_eq!(c.checked_add(Seconds(i64::MAX)), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSpec {
	/// Seconds since the Unix epoch
	pub sec: i64,
	/// Fraction of `sec`, below one billion
	pub nsec: i64
}

#[cfg_attr(docsrs, doc(cfg(feature = "now")))]
#[cfg(feature = "now")]
impl From<timespec> for TimeSpec {
	fn from(value: timespec) -> Self {
		TimeSpec {
			sec: value.tv_sec,
			nsec: value.tv_nsec
		}
	}
}

impl TimeSpec {
	/// Shift by `rhs`, or `None` if the seconds overflow.
	pub fn checked_add(self, rhs: Seconds) -> Option<TimeSpec> {
		Some(TimeSpec {
			sec: self.sec.checked_add(rhs.0)?,
			nsec: self.nsec
		})
	}
}

/// Read `CLOCK_REALTIME`.
///
/// Returns `None` if `libc::clock_gettime` fails.
///
/// # Examples
///
/// ```
/// # use time::time::now;
/// assert!(now().is_some_and(|c| c.sec > 0));
/// ```
#[cfg_attr(docsrs, doc(cfg(feature = "now")))]
#[cfg(feature = "now")]
pub fn now() -> Option<TimeSpec> {
	let mut time = MaybeUninit::<timespec>::uninit();
	// Safety:
	// - clock_gettime only writes to time
	// - time is initialized if and only if clock_gettime returns zero
	unsafe {
		match clock_gettime(CLOCK_REALTIME, time.as_mut_ptr()) {
			0 => Some(time.assume_init().into()),
			_ => None
		}
	}
}

/// Whether February of `year` has 29 days.
///
/// Takes the full year (2024), not the offset stored in [`Tm::year`][Tm#structfield.year] (124).
///
/// ```
/// # use time::time::isleapyear;
/// assert!(isleapyear(2000) && isleapyear(2024));
/// assert!(!isleapyear(1900) && !isleapyear(2023));
/// ```
#[inline(always)]
pub fn isleapyear(year: u16) -> bool {
	year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
/// The Gregorian calendar repeats every 400 years.
const YEARS_PER_ERA: i64 = 400;
const DAYS_PER_ERA: i64 = 146097;
/// Days from March 1, 0000 (day zero of the shifted calendar) to January 1, 1970.
const DAYS_TO_EPOCH: i64 = 719468;
/// Base of [`Tm::year`][Tm#structfield.year].
pub const YEAR_ADJUST: i64 = 1900;

/// Days since the Unix epoch of year `y`, month `m`, day `d`.
///
/// See <http://howardhinnant.github.io/date_algorithms.html#days_from_civil>. Out of range months
/// and days produce meaningless results but never panic.
fn days_from_civil(y: i64, m: u8, d: u8) -> i64 {
	let y = if m <= 2 { y - 1 } else { y };
	let era = y.div_euclid(YEARS_PER_ERA);
	let year_of_era = y.rem_euclid(YEARS_PER_ERA);
	// Months counted from March
	let mp = (m as i64 + 9) % 12;
	let day_of_year = (153 * mp + 2) / 5 + d as i64 - 1;
	let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
	era * DAYS_PER_ERA + day_of_era - DAYS_TO_EPOCH
}

/// Inverse of [`days_from_civil`], returning `(year, month, day)`.
fn civil_from_days(days: i64) -> (i64, u8, u8) {
	let z = days + DAYS_TO_EPOCH;
	let era = z.div_euclid(DAYS_PER_ERA);
	let day_of_era = z.rem_euclid(DAYS_PER_ERA);
	let year_of_era = (day_of_era - day_of_era / 1460 + day_of_era / 36524 - day_of_era / 146096) / 365;
	let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
	let mp = (5 * day_of_year + 2) / 153;
	let d = (day_of_year - (153 * mp + 2) / 5 + 1) as u8;
	let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
	(era * YEARS_PER_ERA + year_of_era + (m <= 2) as i64, m, d)
}

/// Broken-down calendar time, laid out like [`libc::tm`] except that `mon` and `yday` count from
/// one instead of zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tm {
	/// 0..=59
	pub sec: u8,
	/// 0..=59
	pub min: u8,
	/// 0..=23
	pub hour: u8,
	/// 1..=31
	pub day: u8,
	/// 1..=12, January first
	pub mon: u8,
	/// Offset from 1900, covering 1900 to 2155. See [`Tm::year()`].
	pub year: u8,
	/// 0..=6, Sunday first
	pub wday: u8,
	/// 1..=366
	pub yday: u16
}

impl Tm {
	/// Convert a Unix timestamp into a UTC calendar date.
	///
	/// Returns `None` for timestamps before the Unix epoch (Jan 1, 1970) or after the last
	/// representable year (2155).
	pub fn new(unixtimestamp: i64) -> Option<Tm> {
		if unixtimestamp < 0 {
			return None;
		}
		let days = unixtimestamp / SECONDS_PER_DAY;
		let secs = unixtimestamp % SECONDS_PER_DAY;
		let (y, mon, day) = civil_from_days(days);
		let year = u8::try_from(y - YEAR_ADJUST).ok()?;

		Some(Tm {
			sec: (secs % SECONDS_PER_MINUTE) as u8,
			min: (secs % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as u8,
			hour: (secs / SECONDS_PER_HOUR) as u8,
			day,
			mon,
			year,
			wday: ((days + 4) % 7) as u8, // Jan 1, 1970 was a Thursday
			yday: (days - days_from_civil(y, 1, 1) + 1) as u16
		})
	}

	/// The full year, e.g. 2024.
	#[inline(always)]
	pub fn year(&self) -> u16 {
		self.year as u16 + YEAR_ADJUST as u16
	}

	/// Get the ISO 8601 day of the week, ranged [1, 7] => [Monday, Sunday].
	#[inline(always)]
	pub fn iso_wday(&self) -> u8 {
		if self.wday == 0 { 7 } else { self.wday }
	}

	/// Convert the calendar date back into a Unix timestamp.
	///
	/// This is the inverse of [`Tm::new`], ignoring [`Tm::wday`] and [`Tm::yday`].
	pub fn timestamp(&self) -> i64 {
		days_from_civil(self.year() as i64, self.mon, self.day) * SECONDS_PER_DAY
			+ self.hour as i64 * SECONDS_PER_HOUR
			+ self.min as i64 * SECONDS_PER_MINUTE
			+ self.sec as i64
	}
}

/// Weekday of a full year, month (1 = January) and day, counted from Sunday = 0.
///
/// # Examples
///
/// ```
/// # use time::time::wday_from_ymd;
/// assert_eq!(wday_from_ymd(2024, 1, 1), 1);   // Monday
/// assert_eq!(wday_from_ymd(2024, 2, 29), 4);  // Thursday
/// assert_eq!(wday_from_ymd(2024, 10, 27), 0); // Sunday
/// ```
pub fn wday_from_ymd(y: u16, m: u8, d: u8) -> u8 {
	(days_from_civil(y as i64, m, d) + 4).rem_euclid(7) as u8
}

/// Length of month `m` (1 = January) of year `y`. Months out of range count as 31 days.
pub fn days_per_month(y: u16, m: u8) -> u8 {
	match m {
		2 if isleapyear(y) => 29,
		2 => 28,
		4 | 6 | 9 | 11 => 30,
		_ => 31
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::mem::MaybeUninit;

	// Reference conversion
	fn utc_time(time: libc::time_t) -> libc::tm {
		unsafe {
			let mut utc = MaybeUninit::<libc::tm>::uninit();
			libc::gmtime_r(&time, utc.as_mut_ptr());
			utc.assume_init()
		}
	}

	fn compare_dates(time: i64) {
		let c = utc_time(time);
		let t = Tm::new(time).unwrap();
		let expected = (
			c.tm_year, c.tm_mon + 1, c.tm_mday, c.tm_hour, c.tm_min, c.tm_sec, c.tm_wday, c.tm_yday + 1
		);
		let actual = (
			t.year as i32, t.mon as i32, t.day as i32, t.hour as i32, t.min as i32, t.sec as i32,
			t.wday as i32, t.yday as i32
		);
		assert_eq!(actual, expected, "time: {}", time);
	}

	#[test]
	fn date_test() {
		assert!(Tm::new(-1).is_none());
		assert!(Tm::new(i64::MAX).is_none());
		for time in [0, 5097600, 951782400, 951868799, 1709164800, 1711846740, 1718617807] {
			compare_dates(time);
		}
		// Roughly every 11 days up to 2150, at a different time of day each step
		let mut time = 0;
		while time < 5679000000 {
			compare_dates(time);
			time += 950399;
		}
	}

	#[test]
	fn timestamp_test() {
		let mut time = 0;
		while time < 5679000000 {
			assert_eq!(Tm::new(time).unwrap().timestamp(), time, "time: {}", time);
			time += 950399;
		}
	}

	#[test]
	fn wday_test() {
		// Sunday, March 31, 2024
		let t = Tm::new(1711846740).unwrap();
		assert_eq!(t.wday, 0);
		assert_eq!(t.iso_wday(), 7);
		assert_eq!(wday_from_ymd(2024, 3, 31), 0);
		// Monday, June 17, 2024
		assert_eq!(Tm::new(1718617807).unwrap().iso_wday(), 1);
		assert_eq!(wday_from_ymd(1970, 1, 1), 4);
		assert_eq!(wday_from_ymd(2000, 2, 29), 2);

		// Garbage in, garbage out, but no panic
		assert!(wday_from_ymd(0, 0, 0) < 7);
		assert!(wday_from_ymd(u16::MAX, u8::MAX, u8::MAX) < 7);
	}

	#[test]
	fn isleapyear_test() {
		assert!(!isleapyear(1900));
		assert!(isleapyear(2000));
		assert!(isleapyear(2020));
		assert!(!isleapyear(2023));
		assert!(isleapyear(2024));
		assert!(!isleapyear(2100));
	}

	#[test]
	fn days_per_month_test() {
		let days: [u8; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
		for (m, &d) in (1..=12).zip(days.iter()) {
			assert_eq!(days_per_month(2024, m), d, "month: {}", m);
		}
		assert_eq!(days_per_month(2023, 2), 28);
		assert_eq!(days_per_month(2000, 2), 29);
		assert_eq!(days_per_month(1900, 2), 28);
	}
}
