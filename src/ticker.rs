//! Periodic timer on a dedicated thread.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, warn};

/// Handle to a running periodic timer. See [`schedule_periodic`].
pub struct Ticker {
	stop: Arc<AtomicBool>,
	handle: JoinHandle<()>
}

impl Ticker {
	/// Stop the timer and wait for the current callback to return.
	pub fn stop(self) {
		self.stop.store(true, Ordering::Relaxed);
		if self.handle.join().is_err() {
			warn!("Ticker thread panicked");
		}
	}
}

/// Call `callback` every `interval` on a new thread until [`Ticker::stop`] is called.
///
/// Deadlines are computed from the start time rather than from the end of the previous callback,
/// so callback run time and sleep jitter do not accumulate into drift. A callback that returns late
/// is followed immediately by the next one. If the thread falls more than one whole interval
/// behind (e.g. the process was suspended), the missed ticks are dropped and the schedule restarts
/// from the current time.
///
/// # Errors
///
/// Returns an error if the thread could not be spawned.
pub fn schedule_periodic<F>(interval: Duration, mut callback: F) -> io::Result<Ticker>
where F: FnMut() + Send + 'static
{
	let stop = Arc::new(AtomicBool::new(false));
	let stopped = stop.clone();
	let handle = thread::Builder::new()
		.name(String::from("ticker"))
		.spawn(move || {
			debug!("Ticker started, interval {:?}", interval);
			let mut next = Instant::now() + interval;
			while !stopped.load(Ordering::Relaxed) {
				let now = Instant::now();
				if next > now {
					thread::sleep(next - now);
				} else if now - next > interval {
					warn!("Ticker overran by {:?}, resynchronizing", now - next);
					next = now;
				}
				callback();
				next += interval;
			}
			debug!("Ticker stopped");
		})?;

	Ok(Ticker { stop, handle })
}
