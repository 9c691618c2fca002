//! The system clock as a [`TimeSource`].

use dcf77::{CalendarError, CalendarTime, TimeSource};
use log::trace;
use time::{Seconds, TimeSpec};
use time::local::{localtime, LocalTimeError};

/// The error type for reading local time.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
	#[error("Failed to read the system clock")]
	Unavailable,

	#[error("Clock correction of {0} s overflows the time")]
	Overflow(i64),

	#[error(transparent)]
	Local(#[from] LocalTimeError),

	#[error(transparent)]
	Calendar(#[from] CalendarError)
}

/// Local time from the system clock, shifted by a fixed correction.
///
/// The local timezone must be installed with [`time::local::set_timezone`] before the clock is
/// read, otherwise the C library's default (usually UTC) applies.
pub struct LocalClock {
	offset: i64
}

impl LocalClock {
	/// Create a clock that reads `offset` seconds ahead of the system clock.
	pub fn new(offset: i64) -> LocalClock {
		LocalClock { offset }
	}

	/// Local calendar time for the Unix time `time`, after applying the correction.
	///
	/// # Errors
	///
	/// Returns [`ClockError::Overflow`] if the correction pushes `time` out of range, or the
	/// conversion error if the local time cannot be represented.
	pub fn at(&self, time: TimeSpec) -> Result<CalendarTime, ClockError> {
		let corrected = time.checked_add(Seconds(self.offset)).ok_or(ClockError::Overflow(self.offset))?;
		let local = localtime(corrected.sec)?;
		trace!("Local time {:?} (UTC{:+}s)", local.tm, local.utoff);
		Ok(CalendarTime::from_tm(&local.tm, local.isdst)?)
	}
}

impl TimeSource for LocalClock {
	type Error = ClockError;

	fn now(&mut self) -> Result<CalendarTime, ClockError> {
		let now = time::now().ok_or(ClockError::Unavailable)?;
		self.at(now)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use time::local::set_timezone;

	fn unix(sec: i64) -> TimeSpec {
		TimeSpec { sec, nsec: 0 }
	}

	// The only test in this crate that touches TZ
	#[test]
	fn local_clock_test() {
		let installed = unsafe { set_timezone("CET-1CEST,M3.5.0/02,M10.5.0/03") };
		installed.unwrap();

		// Sun, May 26, 2024. 16:58:25 UTC.
		let clock = LocalClock::new(0);
		assert_eq!(
			clock.at(unix(1716742705)).unwrap(),
			CalendarTime::new(2024, 5, 26, 18, 58, 25, 7, true).unwrap()
		);

		let clock = LocalClock::new(35);
		assert_eq!(
			clock.at(unix(1716742705)).unwrap(),
			CalendarTime::new(2024, 5, 26, 18, 59, 0, 7, true).unwrap()
		);

		// Sun, Mar 31, 2024. 00:59:30 UTC, the last half minute of CET.
		let clock = LocalClock::new(0);
		assert_eq!(
			clock.at(unix(1711846770)).unwrap(),
			CalendarTime::new(2024, 3, 31, 1, 59, 30, 7, false).unwrap()
		);
		let next = LocalClock::new(60).at(unix(1711846770)).unwrap();
		assert_eq!((next.hour, next.minute, next.is_dst), (3, 0, true));

		assert!(LocalClock::new(0).now().is_ok());

		// Corrections that leave the timestamp range fail instead of wrapping
		assert!(matches!(LocalClock::new(i64::MAX).now(), Err(ClockError::Overflow(i64::MAX))));
		assert!(matches!(LocalClock::new(1).at(unix(i64::MAX)), Err(ClockError::Overflow(1))));
	}
}
