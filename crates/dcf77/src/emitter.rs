//! Real time replay of a telegram on an output line.
//!
//! The emitter is a state machine ticked every [`TICK_INTERVAL`]. Each slot of the telegram spans
//! [`TICKS_PER_SLOT`] ticks, and the line is driven as follows (`L` low, `H` high, `.` unchanged):
//!
//! | Code    | Sub-tick 0 | 1   | 2   | 3-9 |
//! | ------- | ---------- | --- | --- | --- |
//! | `Short` | `L`        | `H` | `H` | `.` |
//! | `Long`  | `L`        | `.` | `H` | `.` |
//! | `None`  | `.`        | `.` | `H` | `.` |
//!
//! The line rests high between pulses, so the driven level mirrors the carrier amplitude of a
//! real transmitter.

use core::time::Duration;
use embedded_hal::digital::OutputPin;
use log::{info, trace, warn};
use crate::PulseCode;
use crate::telegram::{Telegram, TELEGRAM_LEN};

/// The period at which [`PulseEmitter::tick`] must be called.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Number of ticks per one second slot.
pub const TICKS_PER_SLOT: u8 = 10;

/// Position of the emitter within a transmission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitterState {
	/// Index of the slot being transmitted, ranged [0, 182]
	pub slot_index: usize,
	/// Tick within the slot, ranged [0, 9]
	pub sub_tick: u8,
	/// Whether a transmission is in progress
	pub active: bool
}

impl EmitterState {
	/// Advance the state machine by one tick.
	///
	/// The state machine advances as follows:
	/// - `sub_tick < 9` => `sub_tick + 1`
	/// - `sub_tick == 9` => next slot at `sub_tick == 0`
	/// - `sub_tick == 9` on the last slot => inactive, back at slot 0
	fn advance(&mut self) {
		if self.sub_tick + 1 < TICKS_PER_SLOT {
			self.sub_tick += 1;
			return;
		}
		self.sub_tick = 0;
		if self.slot_index + 1 < TELEGRAM_LEN {
			self.slot_index += 1;
		} else {
			self.slot_index = 0;
			self.active = false;
		}
	}
}

/// Outcome of one [`PulseEmitter::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
	/// No transmission in progress, the line was not touched.
	Idle,
	/// A transmission is in progress.
	Transmitting,
	/// The last tick of the transmission. The telegram is handed back.
	Finished(Telegram)
}

/// Drives an output line from a [`Telegram`], one tick at a time.
///
/// The emitter owns the telegram from [`PulseEmitter::start`] until the tick that returns
/// [`Tick::Finished`], so the telegram cannot change mid-transmission.
pub struct PulseEmitter<P: OutputPin> {
	line: P,
	state: EmitterState,
	telegram: Option<Telegram>
}

impl<P: OutputPin> PulseEmitter<P> {
	/// Create an idle emitter on `line`. The line is not touched until a transmission starts.
	pub fn new(line: P) -> PulseEmitter<P> {
		PulseEmitter {
			line,
			state: EmitterState::default(),
			telegram: None
		}
	}

	/// Whether a transmission is in progress.
	#[inline(always)]
	pub fn is_active(&self) -> bool {
		self.state.active
	}

	/// Position within the current transmission. Back at slot 0 and inactive when idle.
	#[inline(always)]
	pub fn state(&self) -> EmitterState {
		self.state
	}

	/// Begin transmitting `telegram` from its first slot on the next tick.
	///
	/// # Errors
	///
	/// A transmission in progress is never interrupted: if the emitter is active, `telegram` is
	/// handed back unchanged.
	pub fn start(&mut self, telegram: Telegram) -> Result<(), Telegram> {
		if self.state.active {
			return Err(telegram);
		}
		self.telegram = Some(telegram);
		self.state = EmitterState { slot_index: 0, sub_tick: 0, active: true };
		info!("Transmission started");
		Ok(())
	}

	/// Service one tick.
	///
	/// Must be called every [`TICK_INTERVAL`]. When idle this does nothing and returns
	/// [`Tick::Idle`].
	///
	/// # Errors
	///
	/// Returns the line's error if driving it failed. The state machine advances regardless, so a
	/// transient line failure costs at most one edge and never stalls or shifts the transmission.
	pub fn tick(&mut self) -> Result<Tick, P::Error> {
		let code = match (self.state.active, &self.telegram) {
			(true, Some(telegram)) => telegram.slots()[self.state.slot_index],
			_ => return Ok(Tick::Idle)
		};

		let EmitterState { slot_index, sub_tick, .. } = self.state;
		let result = match (sub_tick, code) {
			(0, PulseCode::None) => Ok(()),
			(0, _) => self.line.set_low(),
			(1, PulseCode::Short) => self.line.set_high(),
			(2, _) => self.line.set_high(),
			_ => Ok(())
		};
		if sub_tick == 0 {
			trace!("Slot {}: {:?}", slot_index, code);
		}

		self.state.advance();

		if let Err(e) = result {
			warn!("Failed to drive output line at slot {}, tick {}: {:?}", slot_index, sub_tick, e);
			return Err(e);
		}

		if self.state.active {
			return Ok(Tick::Transmitting);
		}
		match self.telegram.take() {
			Some(telegram) => {
				info!("Transmission finished");
				Ok(Tick::Finished(telegram))
			},
			None => Ok(Tick::Idle)
		}
	}

	/// The output line.
	#[inline(always)]
	pub fn line(&self) -> &P {
		&self.line
	}
}

#[cfg(test)]
mod tests {
	extern crate std;
	use std::vec::Vec;
	use core::convert::Infallible;
	use embedded_hal::digital::{Error, ErrorKind, ErrorType};
	use super::*;
	use crate::{CalendarTime, compose_telegram, Composition};

	/// Records every level driven on the line.
	#[derive(Default)]
	struct Recorder {
		level: Option<bool>,
		writes: Vec<bool>
	}

	impl ErrorType for Recorder {
		type Error = Infallible;
	}

	impl OutputPin for Recorder {
		fn set_low(&mut self) -> Result<(), Infallible> {
			self.level = Some(false);
			self.writes.push(false);
			Ok(())
		}

		fn set_high(&mut self) -> Result<(), Infallible> {
			self.level = Some(true);
			self.writes.push(true);
			Ok(())
		}
	}

	#[derive(Debug, PartialEq)]
	struct Broken;

	impl Error for Broken {
		fn kind(&self) -> ErrorKind {
			ErrorKind::Other
		}
	}

	/// Fails every other write.
	#[derive(Default)]
	struct Flaky {
		calls: usize
	}

	impl ErrorType for Flaky {
		type Error = Broken;
	}

	impl Flaky {
		fn write(&mut self) -> Result<(), Broken> {
			self.calls += 1;
			if self.calls % 2 == 1 { Err(Broken) } else { Ok(()) }
		}
	}

	impl OutputPin for Flaky {
		fn set_low(&mut self) -> Result<(), Broken> {
			self.write()
		}

		fn set_high(&mut self) -> Result<(), Broken> {
			self.write()
		}
	}

	fn telegram() -> Telegram {
		// Sunday, May 26, 2024. 18:58:25 CEST.
		let now = CalendarTime::new(2024, 5, 26, 18, 58, 25, 7, true).unwrap();
		match compose_telegram(&now) {
			Composition::Ready { telegram, .. } => telegram,
			Composition::Skip => unreachable!()
		}
	}

	// Line level after each tick of a slot, starting from a high line.
	fn expected_levels(code: PulseCode) -> [bool; TICKS_PER_SLOT as usize] {
		let mut levels = [true; TICKS_PER_SLOT as usize];
		match code {
			PulseCode::None => {},
			PulseCode::Short => levels[0] = false,
			PulseCode::Long => { levels[0] = false; levels[1] = false; }
		}
		levels
	}

	#[test]
	fn pulse_shapes() {
		let telegram = telegram();
		let mut emitter = PulseEmitter::new(Recorder { level: Some(true), writes: Vec::new() });
		emitter.start(telegram).unwrap();

		// Header: short, then the gap
		for code in [PulseCode::Short, PulseCode::None] {
			let before = emitter.line().writes.len();
			for (i, &level) in expected_levels(code).iter().enumerate() {
				assert_eq!(emitter.tick(), Ok(Tick::Transmitting));
				assert_eq!(emitter.line().level, Some(level), "{:?} tick {}", code, i);
			}
			let writes = &emitter.line().writes[before..];
			match code {
				PulseCode::Short => assert_eq!(writes, [false, true, true]),
				PulseCode::None => assert_eq!(writes, [true]),
				PulseCode::Long => unreachable!()
			}
		}

		// Slots 2-19 of the first frame are short pulses; slot 19 (frame bit 17) is long for CEST.
		for _ in 2..19 {
			for _ in 0..TICKS_PER_SLOT {
				emitter.tick().unwrap();
			}
		}
		let before = emitter.line().writes.len();
		for (i, &level) in expected_levels(PulseCode::Long).iter().enumerate() {
			emitter.tick().unwrap();
			assert_eq!(emitter.line().level, Some(level), "long tick {}", i);
		}
		assert_eq!(emitter.line().writes[before..], [false, true]);
	}

	#[test]
	fn full_transmission() {
		let telegram = telegram();
		let mut emitter = PulseEmitter::new(Recorder::default());
		assert_eq!(emitter.tick(), Ok(Tick::Idle));
		emitter.start(telegram).unwrap();
		assert!(emitter.is_active());

		for (slot, &code) in telegram.slots().iter().enumerate() {
			for sub_tick in 0..TICKS_PER_SLOT {
				assert_eq!(emitter.state(), EmitterState { slot_index: slot, sub_tick, active: true });
				let tick = emitter.tick();
				if slot == TELEGRAM_LEN - 1 && sub_tick == TICKS_PER_SLOT - 1 {
					assert_eq!(tick, Ok(Tick::Finished(telegram)));
				} else {
					assert_eq!(tick, Ok(Tick::Transmitting));
				}
				if sub_tick > 1 || code != PulseCode::None {
					let level = expected_levels(code)[sub_tick as usize];
					assert_eq!(emitter.line().level, Some(level), "slot {} tick {}", slot, sub_tick);
				}
			}
		}

		assert_eq!(emitter.state(), EmitterState { slot_index: 0, sub_tick: 0, active: false });
		let writes = emitter.line().writes.len();
		let pulses = telegram.slots().iter().filter(|&&p| p != PulseCode::None).count();
		let shorts = telegram.slots().iter().filter(|&&p| p == PulseCode::Short).count();
		assert_eq!(writes, TELEGRAM_LEN + pulses + shorts);

		// Idle ticks never touch the line
		for _ in 0..100 {
			assert_eq!(emitter.tick(), Ok(Tick::Idle));
		}
		assert_eq!(emitter.line().writes.len(), writes);
	}

	#[test]
	fn start_while_active() {
		let telegram = telegram();
		let mut emitter = PulseEmitter::new(Recorder::default());
		emitter.start(telegram).unwrap();
		emitter.tick().unwrap();
		assert_eq!(emitter.start(telegram), Err(telegram));
		assert_eq!(emitter.state(), EmitterState { slot_index: 0, sub_tick: 1, active: true });
	}

	#[test]
	fn line_errors_are_surfaced() {
		let telegram = telegram();
		let mut emitter = PulseEmitter::new(Flaky::default());
		emitter.start(telegram).unwrap();

		let mut errors = 0;
		let mut finished = false;
		for _ in 0..(TELEGRAM_LEN * TICKS_PER_SLOT as usize) {
			match emitter.tick() {
				Ok(Tick::Finished(_)) => finished = true,
				Ok(_) => {},
				Err(e) => {
					assert_eq!(e, Broken);
					errors += 1;
				}
			}
		}

		// Every other write failed, yet the transmission ran to completion on schedule
		assert!(finished);
		assert_eq!(errors, (emitter.line().calls + 1) / 2);
		assert!(!emitter.is_active());
		assert_eq!(emitter.tick(), Ok(Tick::Idle));
	}
}
