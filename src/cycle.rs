//! The composer side of a transmission cycle.
//!
//! A cycle is: wait for the previous transmission to finish, read the time, compose a telegram,
//! sleep until second 58, mark the transmission active, and hand the telegram to the emitter
//! thread. The emitter thread, running [`service_tick`], clears the flag once the last slot has
//! been sent.

use std::fmt::Display;
use std::num::NonZero;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::sync::mpsc::{Receiver, SyncSender};
use std::time::Duration;
use dcf77::{compose_telegram, Composition, PulseEmitter, Telegram, Tick, TimeSource};
use embedded_hal::digital::OutputPin;
use log::{info, warn};
use crate::error::AppError;

/// Multi-threaded "transmission active" flag using a condition variable.
///
/// Unlike a one-shot notification this flag is reusable: it is set once per cycle by the composer
/// and cleared by the emitter thread.
pub struct TransmissionFlag {
	/// `true` while a telegram is being transmitted.
	active: Mutex<bool>,
	/// Signalled whenever the flag is cleared.
	cond: Condvar
}

impl TransmissionFlag {
	/// Create a new, clear flag.
	pub fn new() -> Arc<TransmissionFlag> {
		Arc::new(TransmissionFlag {
			active: Mutex::new(false),
			cond: Condvar::new()
		})
	}

	// Lock the flag, ignoring poisoning
	fn lock(&self) -> MutexGuard<'_, bool> {
		self.active.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Mark a transmission as in progress. Called by the composer right before the handoff.
	pub fn activate(&self) {
		*self.lock() = true;
	}

	/// Clear the flag and wake all threads in [`TransmissionFlag::wait_clear`].
	pub fn clear(&self) {
		*self.lock() = false;
		self.cond.notify_all();
	}

	/// Whether a transmission is in progress.
	pub fn is_active(&self) -> bool {
		*self.lock()
	}

	/// Block until the flag is clear. Returns immediately if it already is.
	pub fn wait_clear(&self) {
		drop(self.cond.wait_while(self.lock(), |active| *active).unwrap_or_else(PoisonError::into_inner));
	}
}

/// The emitter side of a transmission cycle, called once per tick.
///
/// An idle emitter picks up the next telegram waiting in `rx`, if any. A telegram is never started
/// while another is in progress, it stays queued until the tick after [`Tick::Finished`]. The
/// `flag` is cleared on that last tick.
///
/// # Errors
///
/// Returns the output line's error. The emitter has already logged it and the transmission carries
/// on regardless.
pub fn service_tick<P: OutputPin>(
	emitter: &mut PulseEmitter<P>,
	rx: &Receiver<Telegram>,
	flag: &TransmissionFlag
) -> Result<Tick, P::Error> {
	if !emitter.is_active() {
		if let Ok(telegram) = rx.try_recv() {
			// Cannot fail, the emitter is idle
			let _ = emitter.start(telegram);
		}
	}
	let tick = emitter.tick();
	if let Ok(Tick::Finished(_)) = tick {
		flag.clear();
	}
	tick
}

/// Composes telegrams from a [`TimeSource`] and hands them to the emitter thread.
pub struct Composer<S> {
	source: S,
	poll: Duration,
	flag: Arc<TransmissionFlag>,
	tx: SyncSender<Telegram>
}

impl<S: TimeSource> Composer<S>
where S::Error: Display
{
	/// Create a composer reading `source`, retrying every `poll` after a skip or a failed read.
	pub fn new(source: S, poll: Duration, flag: Arc<TransmissionFlag>, tx: SyncSender<Telegram>)
		-> Composer<S>
	{
		Composer { source, poll, flag, tx }
	}

	/// Run cycles until `count` telegrams have been handed off and transmitted, or forever if
	/// `count` is `None`.
	///
	/// `sleep` is called for every wait, with the duration to wait. Returns the number of telegrams
	/// transmitted.
	///
	/// # Errors
	///
	/// Returns [`AppError::Channel`] if the emitter thread stopped receiving telegrams. Failed time
	/// reads are logged and retried after the poll interval.
	pub fn run(&mut self, count: Option<NonZero<usize>>, mut sleep: impl FnMut(Duration))
		-> Result<usize, AppError>
	{
		let mut sent = 0;
		while count.is_none_or(|c| sent < c.get()) {
			self.flag.wait_clear();

			let now = match self.source.now() {
				Ok(now) => now,
				Err(e) => {
					warn!("Failed to read the time, retrying in {:?}: {}", self.poll, e);
					sleep(self.poll);
					continue;
				}
			};

			match compose_telegram(&now) {
				Composition::Skip => sleep(self.poll),
				Composition::Ready { telegram, alignment_delay } => {
					sleep(alignment_delay);
					self.flag.activate();
					self.tx.send(telegram).map_err(|_| AppError::Channel)?;
					sent += 1;
					let last = now.next_minute().next_minute();
					info!(
						"Telegram {} handed off: {:02}:{:02} to {:02}:{:02}",
						sent, now.hour, now.minute, last.hour, last.minute
					);
				}
			}
		}

		// Let the last transmission run to completion
		self.flag.wait_clear();
		Ok(sent)
	}
}
