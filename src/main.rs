//! Emulate a DCF77 receiver's output line.
//!
//! Radio-controlled clocks contain a small receiver module that demodulates the [DCF77] longwave
//! signal into a digital line: low for 100 ms (a zero bit) or 200 ms (a one bit) at the start of
//! every second, and no pulse at all in the last second of each minute. This application produces
//! that line from the local system clock, so a clock's receiver module can be bypassed (or a clock
//! can be set where the real signal does not reach).
//!
//! Each transmission spans three consecutive minutes. Transmission starts at second 58 so that the
//! first minute frame begins exactly on the next minute boundary. The line is driven low once at
//! startup, and rests high between pulses from the first transmission on.
//!
//! The frame for the minute read is sent during the next minute, and a receiver applies it at the
//! marker that ends it. A clock set this way runs two minutes behind, which `-o 120` compensates.
//!
//! [DCF77]: https://en.wikipedia.org/wiki/DCF77
//!
//! # Command Line Arguments
//!
//! General form: `dcf77-emulator [options...]`
//!
//! | Short form | Long form    | Argument       | Default                          | Description                          |
//! | ---------- | ------------ | -------------- | -------------------------------- | ------------------------------------ |
//! | `-z`       | `--timezone` | [TZ string]    | `CET-1CEST,M3.5.0/02,M10.5.0/03` | The local time rule                  |
//! | `-o`       | `--offset`   | ±86400         | 0                                | Seconds added to the system clock    |
//! | `-n`, `-c` | `--count`    | Integer > 0    | Unlimited                        | The number of telegrams to transmit  |
//! | `-p`       | `--pin`      | GPIO number    | None (console)                   | The sysfs GPIO line to drive         |
//! |            | `--poll`     | Integer > 0    | 30                               | Seconds to wait after a skipped read |
//! |            | `--invert`   |                |                                  | Invert the output polarity           |
//! | `-v`       |              |                |                                  | More logging, repeatable             |
//!
//! Log output goes to stderr. `RUST_LOG` overrides the level chosen with `-v`.
//!
//! [TZ string]: https://pubs.opengroup.org/onlinepubs/9699919799/basedefs/V1_chap08.html
//!
//! # Examples
//!
//! Transmit two telegrams on the console, showing every edge
//! ```sh
//! dcf77-emulator -n 2 -vv
//! ```
//!
//! Drive GPIO 17 continuously, with a clock that runs two seconds slow
//! ```sh
//! dcf77-emulator -p 17 -o 2
//! ```

use std::process::ExitCode;
use std::sync::mpsc::sync_channel;
use std::thread;
use dcf77::{PulseEmitter, Telegram};
use dcf77::emitter::TICK_INTERVAL;
use embedded_hal::digital::OutputPin;
use log::{error, info};

use args::{Arguments, ArgumentsError};
use clock::{ClockError, LocalClock};
use cycle::{service_tick, Composer, TransmissionFlag};
use error::AppError;
use line::{ConsoleLine, HostLine, Polarity, SysfsLine};
use ticker::schedule_periodic;

mod args;
mod clock;
mod cycle;
mod error;
mod line;
mod ticker;

/// Transmit telegrams until `args.count` is reached, blocking until the last one completes.
///
/// The emitter runs on a ticker thread every 100 ms. The composer runs on the calling thread and
/// hands each telegram over a channel of capacity one, guarded by the transmission flag.
///
/// # Errors
///
/// Returns an [`AppError`] if the timezone rule is rejected, the output line cannot be opened or
/// initialized, the ticker thread cannot be spawned, or the ticker thread goes away.
fn run(args: Arguments) -> Result<usize, AppError> {
	// Safety: no other threads have been spawned yet
	let installed = unsafe { time::local::set_timezone(&args.timezone) };
	installed.map_err(ClockError::from)?;
	info!("Local time rule: {}", args.timezone);

	let line = match args.pin {
		Some(pin) => HostLine::Sysfs(SysfsLine::open(pin)?),
		None => HostLine::Console(ConsoleLine::new())
	};
	let mut line = Polarity::new(line, args.invert);
	line.set_low()?;

	let flag = TransmissionFlag::new();
	let (tx, rx) = sync_channel::<Telegram>(1);
	let mut emitter = PulseEmitter::new(line);
	let emitter_flag = flag.clone();
	let ticker = schedule_periodic(TICK_INTERVAL, move || {
		// Line errors are logged by the emitter, and the transmission carries on
		let _ = service_tick(&mut emitter, &rx, &emitter_flag);
	})?;

	let mut composer = Composer::new(LocalClock::new(args.offset), args.poll, flag, tx);
	let sent = composer.run(args.count, thread::sleep)?;
	ticker.stop();
	Ok(sent)
}

/// Main program entry point.
///
/// Parses input arguments and transmits telegrams. See [`crate`] documentation for details.
fn main() -> ExitCode {
	let args = match Arguments::parse(std::env::args_os().skip(1)) {
		Ok(a) => a,
		Err(e) => {
			return if let ArgumentsError::Help = e {
				println!("\
Emulate a DCF77 receiver output line from the local system clock.

Usage: dcf77-emulator [OPTIONS]

Options:
  -z, --timezone <RULE>     POSIX TZ rule, default CET-1CEST,M3.5.0/02,M10.5.0/03
  -o, --offset <SECONDS>    correction added to the system clock, at most 86400 either way,
                            default 0
  -n, -c, --count <COUNT>   the number of telegrams to transmit, default unlimited
  -p, --pin <GPIO>          drive a sysfs GPIO line instead of the console
  --poll <SECONDS>          retry interval after a skipped read, default 30
  --invert                  invert the output polarity
  -v                        more logging (-vv for every edge)
  -h, --help                print this help

Examples:
  dcf77-emulator -n 2 -vv
  dcf77-emulator -p 17 -o 2\n");
				ExitCode::SUCCESS
			} else {
				eprintln!("{}", AppError::from(e));
				ExitCode::FAILURE
			}
		}
	};

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level())).init();

	match run(args) {
		Ok(sent) => {
			info!("Transmitted {} telegrams", sent);
			ExitCode::SUCCESS
		},
		Err(e) => {
			error!("{}", e);
			ExitCode::FAILURE
		}
	}
}
