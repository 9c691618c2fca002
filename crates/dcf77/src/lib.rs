//! Encode and emit the DCF77 time signal.
//!
//! This crate turns a calendar minute into the pulse pattern a [DCF77] receiver expects and
//! replays it on a digital output line in real time. A transmission cycle covers three
//! consecutive minutes, framed by a short header and trailer so that a receiver's clock model can
//! lock on before the first real minute starts:
//!
//! | Slots     | Content                        |
//! | --------- | ------------------------------ |
//! | 0-1       | header: short pulse, no pulse  |
//! | 2-61      | minute N                       |
//! | 62-121    | minute N+1                     |
//! | 122-181   | minute N+2                     |
//! | 182       | trailer: short pulse           |
//!
//! The pieces, leaves first:
//! - [`bcd`]: packed BCD encoding and even parity.
//! - [`frame`]: one 60-slot minute frame for a [`CalendarTime`].
//! - [`telegram`]: the 183-slot [`Telegram`] and the decision of when to start transmitting it.
//! - [`emitter`]: a 100 ms tick state machine that drives an [`OutputPin`] from a telegram.
//!
//! This crate is `no_std` and does not allocate. The output line is any
//! [`embedded_hal::digital::OutputPin`], so the same emitter runs on a microcontroller GPIO or a
//! host-side line.
//!
//! [DCF77]: https://en.wikipedia.org/wiki/DCF77
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//!
//! # Examples
//!
//! ```
//! # use core::convert::Infallible;
//! # use embedded_hal::digital::{ErrorType, OutputPin};
//! # use dcf77::{CalendarTime, compose_telegram, Composition, PulseEmitter, Tick};
//! # struct Pin;
//! # impl ErrorType for Pin { type Error = Infallible; }
//! # impl OutputPin for Pin {
//! # 	fn set_low(&mut self) -> Result<(), Infallible> { Ok(()) }
//! # 	fn set_high(&mut self) -> Result<(), Infallible> { Ok(()) }
//! # }
//! // Sunday, May 26, 2024. 18:58:25 CEST.
//! let now = CalendarTime::new(2024, 5, 26, 18, 58, 25, 7, true).unwrap();
//!
//! let Composition::Ready { telegram, alignment_delay } = compose_telegram(&now) else {
//! 	panic!("too close to the minute boundary");
//! };
//! // Transmission starts at second 58
//! assert_eq!(alignment_delay.as_secs(), 33);
//!
//! let mut emitter = PulseEmitter::new(Pin);
//! emitter.start(telegram).unwrap();
//! // Call tick() every 100 ms until the transmission finishes
//! while !matches!(emitter.tick(), Ok(Tick::Finished(_))) {}
//! ```

#![no_std]

use core::fmt;

pub mod bcd;
pub mod calendar;
pub mod frame;
pub mod telegram;
pub mod emitter;

pub use calendar::{CalendarError, CalendarTime, TimeSource};
pub use emitter::{EmitterState, PulseEmitter, Tick};
pub use frame::{build_minute_frame, MinuteFrame};
pub use telegram::{compose_telegram, Composition, Telegram};

/// The content of one second-long slot of a transmission.
///
/// A DCF77 receiver sees a drop in carrier amplitude at the start of every second except the last
/// one of each minute. The length of that drop carries the bit value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PulseCode {
	/// No pulse at all. Only used for the minute marker.
	None = 0,
	/// Line low for 100 ms, a logical 0.
	#[default]
	Short = 1,
	/// Line low for 200 ms, a logical 1.
	Long = 2
}

impl PulseCode {
	/// The pulse that encodes a data bit.
	#[inline(always)]
	pub const fn from_bit(bit: bool) -> PulseCode {
		if bit { PulseCode::Long } else { PulseCode::Short }
	}

	/// The data bit this pulse carries. [`PulseCode::None`] carries no data and reads as `false`.
	#[inline(always)]
	pub const fn bit(self) -> bool {
		matches!(self, PulseCode::Long)
	}

	/// Digit used in diagnostic dumps: `0` none, `1` short, `2` long.
	#[inline(always)]
	pub const fn digit(self) -> char {
		match self {
			PulseCode::None => '0',
			PulseCode::Short => '1',
			PulseCode::Long => '2'
		}
	}
}

/// Formats a run of slots as one digit per slot, see [`PulseCode::digit`].
///
/// # Examples
///
/// ```
/// # use dcf77::{PulseCode, Digits};
/// let slots = [PulseCode::Short, PulseCode::None, PulseCode::Long];
/// assert_eq!(format!("{}", Digits(&slots)), "102");
/// ```
pub struct Digits<'a>(pub &'a [PulseCode]);

impl fmt::Display for Digits<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.iter().try_for_each(|p| fmt::Write::write_char(f, p.digit()))
	}
}
