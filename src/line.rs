//! Host-side output lines.
//!
//! The emitter drives any [`OutputPin`]. On a host this is either the console, which only logs the
//! edges, or a Linux GPIO line exposed through sysfs (`/sys/class/gpio`), e.g. on a Raspberry Pi
//! wired to the input of a clock's receiver module.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use log::{debug, trace};

/// Root of the sysfs GPIO interface.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// The error type for host output lines.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
	#[error("GPIO {0}: {1}")]
	Gpio(u32, #[source] io::Error)
}

impl embedded_hal::digital::Error for LineError {
	fn kind(&self) -> ErrorKind {
		ErrorKind::Other
	}
}

/// A line that only logs its edges at trace level.
#[derive(Default)]
pub struct ConsoleLine {
	level: Option<bool>
}

impl ConsoleLine {
	/// Create a line with no level driven yet.
	pub fn new() -> ConsoleLine {
		ConsoleLine::default()
	}

	/// The last driven level, `true` for high.
	#[cfg(test)]
	pub fn level(&self) -> Option<bool> {
		self.level
	}

	fn set(&mut self, level: bool) {
		if self.level != Some(level) {
			trace!("Line {}", if level { "high" } else { "low" });
		}
		self.level = Some(level);
	}
}

impl ErrorType for ConsoleLine {
	type Error = LineError;
}

impl OutputPin for ConsoleLine {
	fn set_low(&mut self) -> Result<(), LineError> {
		self.set(false);
		Ok(())
	}

	fn set_high(&mut self) -> Result<(), LineError> {
		self.set(true);
		Ok(())
	}
}

/// A GPIO line driven through the sysfs interface.
pub struct SysfsLine {
	pin: u32,
	value: File
}

impl SysfsLine {
	/// Export GPIO `pin` if needed, configure it as an output, and open it for writing.
	///
	/// # Errors
	///
	/// Returns [`LineError::Gpio`] if any of the sysfs files cannot be written, typically because
	/// the pin does not exist or the process lacks permission.
	pub fn open(pin: u32) -> Result<SysfsLine, LineError> {
		SysfsLine::open_in(Path::new(SYSFS_GPIO_ROOT), pin)
	}

	fn open_in(root: &Path, pin: u32) -> Result<SysfsLine, LineError> {
		let err = |e| LineError::Gpio(pin, e);
		let dir: PathBuf = root.join(format!("gpio{}", pin));
		if !dir.exists() {
			debug!("Exporting GPIO {}", pin);
			fs::write(root.join("export"), pin.to_string()).map_err(err)?;
		}

		// The kernel creates the pin's files asynchronously after export, and udev may still be
		// adjusting their permissions.
		let mut attempts = 0;
		loop {
			match fs::write(dir.join("direction"), "out") {
				Ok(()) => break,
				Err(e) if attempts < 10 && matches!(
					e.kind(), io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
				) => {
					attempts += 1;
					thread::sleep(Duration::from_millis(20));
				},
				Err(e) => return Err(err(e))
			}
		}

		let value = OpenOptions::new().write(true).open(dir.join("value")).map_err(err)?;
		debug!("Opened GPIO {} as output", pin);
		Ok(SysfsLine { pin, value })
	}

	fn write(&mut self, level: bool) -> Result<(), LineError> {
		self.value.seek(SeekFrom::Start(0))
			.and_then(|_| self.value.write_all(if level { b"1" } else { b"0" }))
			.map_err(|e| LineError::Gpio(self.pin, e))
	}
}

impl ErrorType for SysfsLine {
	type Error = LineError;
}

impl OutputPin for SysfsLine {
	fn set_low(&mut self) -> Result<(), LineError> {
		self.write(false)
	}

	fn set_high(&mut self) -> Result<(), LineError> {
		self.write(true)
	}
}

/// Either of the host lines, chosen at startup.
pub enum HostLine {
	/// No hardware, edges are only logged.
	Console(ConsoleLine),
	/// A GPIO pin through sysfs.
	Sysfs(SysfsLine)
}

impl ErrorType for HostLine {
	type Error = LineError;
}

impl OutputPin for HostLine {
	fn set_low(&mut self) -> Result<(), LineError> {
		match self {
			HostLine::Console(l) => l.set_low(),
			HostLine::Sysfs(l) => l.set_low()
		}
	}

	fn set_high(&mut self) -> Result<(), LineError> {
		match self {
			HostLine::Console(l) => l.set_high(),
			HostLine::Sysfs(l) => l.set_high()
		}
	}
}

/// Output polarity adapter.
///
/// With `inverted` set, low and high are swapped, for receivers wired through an inverting
/// transistor stage.
pub struct Polarity<P> {
	pin: P,
	inverted: bool
}

impl<P: OutputPin> Polarity<P> {
	/// Wrap `pin`, swapping levels if `inverted` is set.
	pub fn new(pin: P, inverted: bool) -> Polarity<P> {
		Polarity { pin, inverted }
	}

	/// The wrapped pin.
	#[cfg(test)]
	pub fn inner(&self) -> &P {
		&self.pin
	}
}

impl<P: ErrorType> ErrorType for Polarity<P> {
	type Error = P::Error;
}

impl<P: OutputPin> OutputPin for Polarity<P> {
	fn set_low(&mut self) -> Result<(), P::Error> {
		if self.inverted { self.pin.set_high() } else { self.pin.set_low() }
	}

	fn set_high(&mut self) -> Result<(), P::Error> {
		if self.inverted { self.pin.set_low() } else { self.pin.set_high() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// Scratch directory standing in for /sys/class/gpio
	fn scratch(name: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("dcf77-line-{}-{}", name, std::process::id()));
		let _ = fs::remove_dir_all(&dir);
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	#[test]
	fn console_line_test() {
		let mut line = ConsoleLine::new();
		assert_eq!(line.level(), None);
		line.set_low().unwrap();
		assert_eq!(line.level(), Some(false));
		line.set_high().unwrap();
		line.set_high().unwrap();
		assert_eq!(line.level(), Some(true));
	}

	#[test]
	fn polarity_test() {
		let mut line = Polarity::new(ConsoleLine::new(), false);
		line.set_low().unwrap();
		assert_eq!(line.inner().level(), Some(false));

		let mut line = Polarity::new(ConsoleLine::new(), true);
		line.set_low().unwrap();
		assert_eq!(line.inner().level(), Some(true));
		line.set_high().unwrap();
		assert_eq!(line.inner().level(), Some(false));
	}

	#[test]
	fn sysfs_line_test() {
		let root = scratch("exported");
		let dir = root.join("gpio17");
		fs::create_dir_all(&dir).unwrap();
		fs::write(dir.join("direction"), "in").unwrap();
		fs::write(dir.join("value"), "0").unwrap();

		let mut line = HostLine::Sysfs(SysfsLine::open_in(&root, 17).unwrap());
		assert!(!root.join("export").exists());
		assert_eq!(fs::read_to_string(dir.join("direction")).unwrap(), "out");

		line.set_high().unwrap();
		assert_eq!(fs::read_to_string(dir.join("value")).unwrap(), "1");
		line.set_low().unwrap();
		assert_eq!(fs::read_to_string(dir.join("value")).unwrap(), "0");

		fs::remove_dir_all(&root).unwrap();
	}

	#[test]
	fn sysfs_line_missing() {
		// Nothing creates gpio5 after the export, so opening fails once the retries run out
		let root = scratch("missing");
		let result = SysfsLine::open_in(&root, 5);
		assert!(matches!(result, Err(LineError::Gpio(5, _))));
		assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "5");

		fs::remove_dir_all(&root).unwrap();
	}
}
