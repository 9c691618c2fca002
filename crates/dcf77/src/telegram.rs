//! The three minute telegram and the decision of when to transmit it.

use core::time::Duration;
use log::{debug, info};
use crate::{CalendarTime, Digits, PulseCode};
use crate::frame::{write_minute_frame, FRAME_LEN};

/// Number of slots in a telegram.
pub const TELEGRAM_LEN: usize = 183;

/// First slot of each of the three minute frames.
pub const FRAME_OFFSETS: [usize; 3] = [2, 62, 122];

/// Last second of the minute at which a telegram can still be composed.
pub const LATEST_START_SECOND: u8 = 56;

/// Second of the minute at which transmission of the header starts.
///
/// The header occupies seconds 58 and 59, so the first frame starts exactly at the next minute
/// boundary.
pub const START_SECOND: u8 = 58;

/// A complete transmission: header, three consecutive minute frames, and trailer.
///
/// Telegrams are only produced fully populated by [`compose_telegram`]. The header is a short pulse
/// followed by a gap, which a receiver reads as the end of a minute, and the trailer is a single
/// short pulse closing the last minute marker.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Telegram {
	slots: [PulseCode; TELEGRAM_LEN]
}

impl Telegram {
	/// All slots, in transmission order.
	#[inline(always)]
	pub fn slots(&self) -> &[PulseCode; TELEGRAM_LEN] {
		&self.slots
	}

	/// The slot at `index`, or `None` past the end of the telegram.
	#[inline(always)]
	pub fn slot(&self, index: usize) -> Option<PulseCode> {
		self.slots.get(index).copied()
	}

	/// Minute frame `n` (0, 1 or 2), or `None` if `n > 2`.
	pub fn frame(&self, n: usize) -> Option<&[PulseCode]> {
		FRAME_OFFSETS.get(n).map(|&start| &self.slots[start..start + FRAME_LEN])
	}

	/// The three minute frames in transmission order.
	pub fn frames(&self) -> impl Iterator<Item = &[PulseCode]> {
		FRAME_OFFSETS.iter().map(move |&start| &self.slots[start..start + FRAME_LEN])
	}
}

impl core::fmt::Debug for Telegram {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "Telegram({})", Digits(&self.slots))
	}
}

/// Result of [`compose_telegram`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composition {
	/// The telegram is ready. Transmission must start `alignment_delay` after the time that was
	/// passed to [`compose_telegram`].
	Ready {
		telegram: Telegram,
		alignment_delay: Duration
	},
	/// Too close to the end of the minute to start a transmission. Try again later.
	Skip
}

/// Compose the telegram for the minute of `now` and the two minutes after it.
///
/// Transmission starts at second [`START_SECOND`] of the minute of `now`, so that the first frame
/// lines up with the following minute boundary. The first frame encodes the minute of `now` but is
/// sent during the minute after it, and a receiver only takes it at the marker one minute later
/// still. A receiver set this way runs two minutes behind; pass a positive clock correction (the
/// emulator's `--offset`) to compensate.
///
/// Returns [`Composition::Skip`] if `now.second > 56`, since there is not enough time left to
/// start at second 58 reliably.
///
/// # Examples
///
/// ```
/// # use dcf77::{CalendarTime, compose_telegram, Composition, PulseCode};
/// // Sunday, May 26, 2024. 18:58:25 CEST.
/// let now = CalendarTime::new(2024, 5, 26, 18, 58, 25, 7, true).unwrap();
/// let Composition::Ready { telegram, alignment_delay } = compose_telegram(&now) else {
/// 	unreachable!();
/// };
/// assert_eq!(alignment_delay.as_secs(), 33);
/// assert_eq!(telegram.slot(0), Some(PulseCode::Short));
/// assert_eq!(telegram.slot(1), Some(PulseCode::None));
/// assert_eq!(telegram.slot(182), Some(PulseCode::Short));
///
/// let late = CalendarTime { second: 57, ..now };
/// assert_eq!(compose_telegram(&late), Composition::Skip);
/// ```
pub fn compose_telegram(now: &CalendarTime) -> Composition {
	if now.second > LATEST_START_SECOND {
		info!("Skipping composition at second {}, too close to the minute boundary", now.second);
		return Composition::Skip;
	}

	let mut slots = [PulseCode::None; TELEGRAM_LEN];
	let mut minute = *now;
	for (n, &offset) in FRAME_OFFSETS.iter().enumerate() {
		if n > 0 {
			minute = minute.next_minute();
		}
		write_minute_frame(&minute, &mut slots[offset..offset + FRAME_LEN]);
	}
	slots[0] = PulseCode::Short;
	slots[1] = PulseCode::None;
	slots[TELEGRAM_LEN - 1] = PulseCode::Short;

	let telegram = Telegram { slots };
	let alignment_delay = Duration::from_secs((START_SECOND - now.second) as u64);

	debug!(
		"Composed telegram for {:04}-{:02}-{:02} {:02}:{:02} (weekday {}, {}), starting in {:?}",
		now.year, now.month, now.day, now.hour, now.minute, now.weekday,
		if now.is_dst { "DST" } else { "standard time" }, alignment_delay
	);
	for frame in telegram.frames() {
		debug!("{}", Digits(frame));
	}

	Composition::Ready { telegram, alignment_delay }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::build_minute_frame;

	fn ready(now: &CalendarTime) -> (Telegram, Duration) {
		match compose_telegram(now) {
			Composition::Ready { telegram, alignment_delay } => (telegram, alignment_delay),
			Composition::Skip => panic!("unexpected skip at {:?}", now)
		}
	}

	fn at(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8, weekday: u8) -> CalendarTime {
		CalendarTime::new(year, month, day, hour, minute, second, weekday, false).unwrap()
	}

	#[test]
	fn skip_test() {
		for second in 0..=59 {
			let now = at(2024, 5, 26, 18, 58, second, 7);
			match compose_telegram(&now) {
				Composition::Ready { alignment_delay, .. } => {
					assert!(second <= 56);
					assert_eq!(alignment_delay, Duration::from_secs(58 - second as u64));
				},
				Composition::Skip => assert!(second >= 57)
			}
		}
	}

	#[test]
	fn layout_test() {
		let now = at(2024, 5, 26, 18, 58, 0, 7);
		let (telegram, delay) = ready(&now);
		assert_eq!(delay, Duration::from_secs(58));
		assert_eq!(telegram.slots().len(), TELEGRAM_LEN);
		assert_eq!(telegram.slot(0), Some(PulseCode::Short));
		assert_eq!(telegram.slot(1), Some(PulseCode::None));
		assert_eq!(telegram.slot(182), Some(PulseCode::Short));
		assert_eq!(telegram.slot(183), None);
		assert!(telegram.frame(3).is_none());

		// Minute markers at the end of each frame, and nowhere else besides the header gap
		let gaps: [usize; 4] = [1, 61, 121, 181];
		for (i, &p) in telegram.slots().iter().enumerate() {
			assert_eq!(p == PulseCode::None, gaps.contains(&i), "slot {}", i);
		}

		assert_eq!(telegram.frame(0), Some(&build_minute_frame(&now)[..]));
		assert_eq!(telegram.frame(1), Some(&build_minute_frame(&now.next_minute())[..]));
		assert_eq!(telegram.frame(2), Some(&build_minute_frame(&now.next_minute().next_minute())[..]));
		assert_eq!(telegram.frames().count(), 3);
	}

	#[test]
	fn rollover_test() {
		// Each case lists the start and the expected (year, month, day, hour, minute, weekday) of
		// the third frame.
		let cases = [
			(at(2024, 5, 26, 18, 58, 10, 7), (2024, 5, 26, 19, 0, 7)),
			(at(2024, 5, 26, 23, 59, 10, 7), (2024, 5, 27, 0, 1, 1)),
			(at(2024, 2, 29, 23, 58, 10, 4), (2024, 3, 1, 0, 0, 5)),
			(at(2024, 12, 31, 23, 59, 56, 2), (2025, 1, 1, 0, 1, 3)),
		];
		for (now, (year, month, day, hour, minute, weekday)) in cases {
			let (telegram, _) = ready(&now);
			let last = at(year, month, day, hour, minute, now.second, weekday);
			assert_eq!(telegram.frame(2), Some(&build_minute_frame(&last)[..]), "start {:?}", now);
		}
	}

	#[test]
	fn dst_transition_not_corrected() {
		// Sunday, March 31, 2024. 01:59:30 CET. Clocks jump to 03:00 CEST a minute later, but all
		// three frames keep standard time.
		let now = at(2024, 3, 31, 1, 59, 30, 7);
		let (telegram, delay) = ready(&now);
		assert_eq!(delay, Duration::from_secs(28));

		let expected = [(1, 59), (2, 0), (2, 1)];
		for (frame, (hour, minute)) in telegram.frames().zip(expected) {
			let t = at(2024, 3, 31, hour, minute, 0, 7);
			assert_eq!(frame, &build_minute_frame(&t)[..]);
			assert_eq!(frame[17], PulseCode::Short);
			assert_eq!(frame[18], PulseCode::Long);
			assert_eq!(frame[59], PulseCode::None);
		}
	}
}
