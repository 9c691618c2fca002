//! One DCF77 minute frame.
//!
//! See [DCF77 documentation](https://en.wikipedia.org/wiki/DCF77#Time_code_details) for the layout.
//! Announcement, leap second and weather bits are always transmitted as zero.

use crate::{PulseCode, CalendarTime};
use crate::bcd::{parity_bit, to_bcd_digits};

/// Number of slots in a minute frame, one per second.
pub const FRAME_LEN: usize = 60;

/// A complete minute frame, indexed by second.
pub type MinuteFrame = [PulseCode; FRAME_LEN];

/// Long when daylight savings time (CEST) is in effect.
pub const DST_BIT: usize = 17;
/// Long when standard time (CET) is in effect.
pub const STD_BIT: usize = 18;
/// Start of encoded time, always long.
pub const START_BIT: usize = 20;
/// Start and width of the minute field, followed by its parity bit.
pub const MINUTE: (usize, u8) = (21, 7);
/// Minute parity.
pub const MINUTE_PARITY: usize = 28;
/// Start and width of the hour field, followed by its parity bit.
pub const HOUR: (usize, u8) = (29, 6);
/// Hour parity.
pub const HOUR_PARITY: usize = 35;
/// Start and width of the day of month field.
pub const DAY: (usize, u8) = (36, 6);
/// Start and width of the day of week field.
pub const WEEKDAY: (usize, u8) = (42, 3);
/// Start and width of the month field.
pub const MONTH: (usize, u8) = (45, 5);
/// Start and width of the two digit year field.
pub const YEAR: (usize, u8) = (50, 8);
/// Parity over day, weekday, month and year.
pub const DATE_PARITY: usize = 58;
/// Minute marker, no pulse.
pub const MARKER: usize = 59;

/// Write the BCD digits of `value` into `frame` at `field`.
#[inline]
fn write_field(frame: &mut [PulseCode], (start, width): (usize, u8), value: u8) {
	for (slot, bit) in frame[start..start + width as usize].iter_mut().zip(to_bcd_digits(value, width)) {
		*slot = PulseCode::from_bit(bit);
	}
}

/// Even parity over the data bits already written to `frame[range]`.
#[inline]
fn parity(frame: &[PulseCode], range: core::ops::Range<usize>) -> PulseCode {
	PulseCode::from_bit(parity_bit(frame[range].iter().map(|p| p.bit())))
}

/// Encode `time` into the first [`FRAME_LEN`] slots of `frame`.
///
/// Only the minute, hour, day, weekday, month, two digit year and daylight savings flag of `time`
/// are used. The seconds are ignored.
///
/// # Panics
///
/// Panics if `frame` is shorter than [`FRAME_LEN`], or if a field of `time` is out of range (which
/// [`CalendarTime::new`] rules out).
pub fn write_minute_frame(time: &CalendarTime, frame: &mut [PulseCode]) {
	let frame = &mut frame[..FRAME_LEN];
	frame.fill(PulseCode::Short);

	frame[DST_BIT] = PulseCode::from_bit(time.is_dst);
	frame[STD_BIT] = PulseCode::from_bit(!time.is_dst);
	frame[START_BIT] = PulseCode::Long;

	write_field(frame, MINUTE, time.minute);
	frame[MINUTE_PARITY] = parity(frame, MINUTE.0..MINUTE_PARITY);

	write_field(frame, HOUR, time.hour);
	frame[HOUR_PARITY] = parity(frame, HOUR.0..HOUR_PARITY);

	write_field(frame, DAY, time.day);
	write_field(frame, WEEKDAY, if time.weekday == 0 { 7 } else { time.weekday });
	write_field(frame, MONTH, time.month);
	write_field(frame, YEAR, time.year_in_century());
	frame[DATE_PARITY] = parity(frame, DAY.0..DATE_PARITY);

	frame[MARKER] = PulseCode::None;
}

/// Build the minute frame for `time`.
///
/// # Examples
///
/// ```
/// # use dcf77::{build_minute_frame, CalendarTime, PulseCode};
/// // Sunday, May 26, 2024. 18:58 CEST.
/// let time = CalendarTime::new(2024, 5, 26, 18, 58, 0, 7, true).unwrap();
/// let frame = build_minute_frame(&time);
/// assert_eq!(frame[17], PulseCode::Long);  // CEST
/// assert_eq!(frame[18], PulseCode::Short);
/// assert_eq!(frame[20], PulseCode::Long);  // start of time
/// assert_eq!(frame[59], PulseCode::None);  // minute marker
/// ```
pub fn build_minute_frame(time: &CalendarTime) -> MinuteFrame {
	let mut frame = [PulseCode::Short; FRAME_LEN];
	write_minute_frame(time, &mut frame);
	frame
}
