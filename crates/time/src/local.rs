//! Local civil time governed by a POSIX TZ rule.
//!
//! The rule (e.g. `CET-1CEST,M3.5.0/02,M10.5.0/03` for central Europe) is installed process-wide
//! through the `TZ` environment variable, after which Unix timestamps convert to local calendar
//! time with the daylight savings flag resolved by the C library.
//!
//! # Examples
//!
//! ```
//! # use time::local::{localtime, set_timezone};
//! // Safety: no other threads are running yet
//! unsafe { set_timezone("CET-1CEST,M3.5.0/02,M10.5.0/03").unwrap() };
//!
//! // Sun, Mar 31, 2024. 01:00:00 UTC, one second after the switch to CEST.
//! let local = localtime(1711846800).unwrap();
//! assert_eq!((local.tm.hour, local.tm.min), (3, 0));
//! assert!(local.isdst);
//! ```

use core::mem::MaybeUninit;
use std::env;
use std::error;
use std::fmt;
use std::string::{String, ToString};
use crate::time::{Tm, YEAR_ADJUST};

/// The error type for local time conversion.
#[cfg_attr(test, derive(PartialEq))]
pub enum LocalTimeError {
	/// The TZ rule is not syntactically plausible. The rejected rule is provided in the payload.
	InvalidRule(String),
	/// The C library could not convert the timestamp. The timestamp is provided in the payload.
	ConversionFailed(i64),
	/// The local year is outside [1900, 2155]. The absolute year is provided in the payload.
	UnsupportedYear(i64)
}

impl fmt::Display for LocalTimeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LocalTimeError::InvalidRule(x) => write!(f, "Invalid TZ rule: {:?}", x),
			LocalTimeError::ConversionFailed(x) => write!(f, "Failed to convert time to local time: {}", x),
			LocalTimeError::UnsupportedYear(x) => write!(f, "Unsupported local year: {}", x),
		}
	}
}

impl fmt::Debug for LocalTimeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for LocalTimeError {}

// Not exported by the libc crate on every target
unsafe extern "C" {
	fn tzset();
}

/// Calendar time in the installed local timezone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTime {
	/// The local calendar time
	pub tm: Tm,
	/// Whether daylight savings time is in effect
	pub isdst: bool,
	/// The UTC offset in seconds
	pub utoff: i32
}

/// Check that `rule` looks like a POSIX TZ rule before handing it to the C library.
///
/// The C library silently falls back to UTC for rules it cannot parse, so this catches the obvious
/// mistakes (empty strings, whitespace, non-ASCII) up front. It is not a full parser.
fn plausible_rule(rule: &str) -> bool {
	let Some(first) = rule.bytes().next() else {
		return false;
	};
	(first.is_ascii_alphabetic() || first == b'<' || first == b':')
		&& rule.bytes().all(|b| b.is_ascii_graphic())
}

/// Install `rule` as the process-wide local timezone.
///
/// # Errors
///
/// Returns [`LocalTimeError::InvalidRule`] if `rule` is empty or contains characters that cannot
/// appear in a TZ rule.
///
/// # Safety
///
/// This function modifies the process environment with [`std::env::set_var`] and carries the same
/// contract: no other thread may read the environment outside of [`std::env`] (including the C
/// library inside [`localtime`]) while it runs. Calling it once at startup, before spawning
/// threads, satisfies this.
pub unsafe fn set_timezone(rule: &str) -> Result<(), LocalTimeError> {
	if !plausible_rule(rule) {
		return Err(LocalTimeError::InvalidRule(rule.to_string()));
	}

	// Safety:
	// - rule is ASCII graphic, so it holds no NUL or '=' for set_var to reject
	// - the caller guarantees no unsynchronized environment access
	unsafe {
		env::set_var("TZ", rule);
		tzset();
	}
	Ok(())
}

/// Convert a Unix timestamp into local calendar time.
///
/// A leap second reported by the C library (`tm_sec == 60`) is folded into second 59.
///
/// This function is thread safe once the timezone has been installed.
///
/// # Errors
///
/// Returns [`LocalTimeError::ConversionFailed`] if the C library rejects `time`, and
/// [`LocalTimeError::UnsupportedYear`] if the local year does not fit [`Tm::year`].
pub fn localtime(time: i64) -> Result<LocalTime, LocalTimeError> {
	let t = time as libc::time_t;
	let mut out = MaybeUninit::<libc::tm>::uninit();
	// Safety:
	// - localtime_r does not read out, only writes
	// - if localtime_r returns non-null, out is successfully initialized
	let tm = unsafe {
		if libc::localtime_r(&t, out.as_mut_ptr()).is_null() {
			return Err(LocalTimeError::ConversionFailed(time));
		}
		out.assume_init()
	};

	if !(0..=u8::MAX as i32).contains(&tm.tm_year) {
		return Err(LocalTimeError::UnsupportedYear(tm.tm_year as i64 + YEAR_ADJUST));
	}

	Ok(LocalTime {
		tm: Tm {
			sec: tm.tm_sec.min(59) as u8,
			min: tm.tm_min as u8,
			hour: tm.tm_hour as u8,
			day: tm.tm_mday as u8,
			mon: (tm.tm_mon + 1) as u8,
			year: tm.tm_year as u8,
			wday: tm.tm_wday as u8,
			yday: (tm.tm_yday + 1) as u16
		},
		isdst: tm.tm_isdst > 0,
		utoff: tm.tm_gmtoff as i32
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn plausible_rule_test() {
		assert!(plausible_rule("CET-1CEST,M3.5.0/02,M10.5.0/03"));
		assert!(plausible_rule("UTC0"));
		assert!(plausible_rule("<+01>-1"));
		assert!(plausible_rule(":Europe/Berlin"));
		assert!(!plausible_rule(""));
		assert!(!plausible_rule("CET -1"));
		assert!(!plausible_rule("-1CET"));
		assert!(!plausible_rule("CET\u{e9}-1"));
		assert!(!plausible_rule("CET-1\0"));
	}

	// All environment changes live in one test so parallel tests never race on TZ.
	#[test]
	fn localtime_test() {
		assert_eq!(
			unsafe { set_timezone("") },
			Err(LocalTimeError::InvalidRule(String::new()))
		);
		let installed = unsafe { set_timezone("CET-1CEST,M3.5.0/02,M10.5.0/03") };
		installed.unwrap();
		assert_eq!(std::env::var("TZ").as_deref(), Ok("CET-1CEST,M3.5.0/02,M10.5.0/03"));

		// Sun, Mar 31, 2024. 00:59:00 UTC, last minute of CET.
		let local = localtime(1711846740).unwrap();
		assert_eq!(local.tm, Tm { sec: 0, min: 59, hour: 1, day: 31, mon: 3, year: 124, wday: 0, yday: 91 });
		assert!(!local.isdst);
		assert_eq!(local.utoff, 3600);

		// One minute later the clock jumps to 03:00 CEST.
		let local = localtime(1711846800).unwrap();
		assert_eq!((local.tm.hour, local.tm.min), (3, 0));
		assert!(local.isdst);
		assert_eq!(local.utoff, 7200);

		// Sun, May 26, 2024. 18:58:25 CEST.
		let local = localtime(1716742705).unwrap();
		assert_eq!(local.tm, Tm { sec: 25, min: 58, hour: 18, day: 26, mon: 5, year: 124, wday: 0, yday: 147 });
		assert!(local.isdst);
	}
}
