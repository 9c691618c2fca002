//! Support for command line argument parsing.
//!
//! See [crate] documentation for details on command line arguments and examples.

use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Debug};
use std::num::NonZero;
use std::time::Duration;

/// Central European rule: CET (UTC+1) with CEST (UTC+2) from the last Sunday in March at 02:00 to
/// the last Sunday in October at 03:00.
pub const DEFAULT_TIMEZONE: &str = "CET-1CEST,M3.5.0/02,M10.5.0/03";

/// Largest accepted clock correction, one day either way.
pub const MAX_OFFSET: i64 = 86400;

/// Default retry interval after a skipped composition.
pub const DEFAULT_POLL: Duration = Duration::from_secs(30);

/// The error type for parsing command line arguments.
#[cfg_attr(test, derive(PartialEq))]
pub enum ArgumentsError {
	/// The option was unrecognized. The option is returned as the payload of this variant.
	UnrecognizedOption(String),
	/// Error converting an option or parameter to UTF-8. The argument index and original
	/// [`OsString`] that could not be converted are returned as the payload of this variant.
	InvalidUTF8(usize, OsString),
	/// A positional argument was supplied, but none are accepted. The argument is returned as the
	/// payload of this variant.
	UnexpectedArgument(String),
	/// The provided telegram count was invalid. The supplied count argument is returned as the
	/// payload of this variant.
	InvalidCount(String),
	/// The provided time offset was not an integer, or exceeded [`MAX_OFFSET`]. The supplied offset
	/// argument is returned as the payload of this variant.
	InvalidOffset(String),
	/// The provided GPIO number was invalid. The supplied argument is returned as the payload of this
	/// variant.
	InvalidPin(String),
	/// The provided poll interval was invalid. The supplied argument is returned as the payload of
	/// this variant.
	InvalidPoll(String),
	/// The parameter for an option was not supplied. The option is returned as the payload for this
	/// variant.
	MissingParameter(String),
	/// Help option (-h) was included, so print help details and exit.
	Help
}

impl Display for ArgumentsError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ArgumentsError::UnrecognizedOption(s) => write!(f, "Unrecognized option: {}", s),
			ArgumentsError::InvalidUTF8(i, v) => write!(f, "Invalid UTF-8 in argument {}: {:?}", i, v),
			ArgumentsError::UnexpectedArgument(s) => write!(f, "Unexpected argument: {}", s),
			ArgumentsError::InvalidCount(s) => write!(f, "Invalid count: {}", s),
			ArgumentsError::InvalidOffset(s) => write!(f, "Invalid offset: {}", s),
			ArgumentsError::InvalidPin(s) => write!(f, "Invalid GPIO number: {}", s),
			ArgumentsError::InvalidPoll(s) => write!(f, "Invalid poll interval: {}", s),
			ArgumentsError::MissingParameter(s) => write!(f, "Missing parameter for option {}", s),
			ArgumentsError::Help => write!(f, "Help requested")
		}
	}
}

impl Debug for ArgumentsError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

impl Error for ArgumentsError {}

/// Convert an argument to [`&str`].
///
/// The function takes the argument index `i`, optional argument name `a`, and the argument `s`.
///
/// # Errors
///
/// Returns [`ArgumentsError::InvalidUTF8`] if the argument could not be converted to UTF-8 or
/// [`ArgumentsError::MissingParameter`] if the argument is `None`.
fn arg_to_str<'a, 'b>(i: usize, a: Option<&'a str>, s: Option<&'b OsString>)
	-> Result<&'b str, ArgumentsError>
{
	match s {
		Some(v) => v.to_str().ok_or_else(|| ArgumentsError::InvalidUTF8(i, v.clone())),
		None => Err(ArgumentsError::MissingParameter(a.map(String::from).unwrap_or_default()))
	}
}

/// Parse the parameter of option `name` at index `i` with `parse`, mapping failures to `err`.
fn parse_param<'a, T>(
	i: usize,
	name: &str,
	param: Option<&'a OsString>,
	parse: impl FnOnce(&'a str) -> Option<T>,
	err: impl FnOnce(String) -> ArgumentsError
) -> Result<T, ArgumentsError> {
	let v = arg_to_str(i, Some(name), param)?;
	parse(v).ok_or_else(|| err(v.to_string()))
}

/// Parsed command line arguments.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Arguments {
	/// The POSIX TZ rule for local time.
	pub timezone: String,
	/// Correction in seconds added to the system clock, within [`MAX_OFFSET`] either way.
	pub offset: i64,
	/// The number of telegrams to transmit, or `None` to run until stopped.
	pub count: Option<NonZero<usize>>,
	/// The sysfs GPIO line to drive, or `None` for the console line.
	pub pin: Option<u32>,
	/// How long to wait after a skipped composition.
	pub poll: Duration,
	/// Whether to invert the output polarity.
	pub invert: bool,
	/// Number of `-v` flags.
	pub verbosity: u8
}

impl Default for Arguments {
	fn default() -> Arguments {
		Arguments {
			timezone: String::from(DEFAULT_TIMEZONE),
			offset: 0,
			count: None,
			pin: None,
			poll: DEFAULT_POLL,
			invert: false,
			verbosity: 0
		}
	}
}

impl Arguments {
	/// Parse command line arguments.
	///
	/// The input can be any type that implements [`Iterator`] that yields [`OsString`], though
	/// typically this would be [`std::env::args_os`]. This function assumes that the application
	/// name is **not** supplied as the first item yielded by `args`, see examples for common use.
	///
	/// # Errors
	///
	/// This function can return any of the variants in [`ArgumentsError`]. See that documentation
	/// for more details.
	///
	/// # Examples
	///
	/// ```ignore
	/// let args = match Arguments::parse(std::env::args_os().skip(1)) {
	/// 	Ok(a) => a,
	/// 	Err(e) => {
	/// 		// Handle error
	/// 		panic!("{}", e);
	/// 	}
	/// };
	/// ```
	pub fn parse(mut args: impl Iterator<Item = OsString>) -> Result<Arguments, ArgumentsError>
	{
		let mut parsed = Arguments::default();
		let mut i = 0;
		while let Some(arg) = args.next() {
			match arg_to_str(i, None, Some(&arg))? {
				n @ ("-n" | "-c" | "--count") => {
					parsed.count = Some(parse_param(
						i + 1, n, args.next().as_ref(),
						|v| v.parse().ok(),
						ArgumentsError::InvalidCount
					)?);
					// Increment because we called args.next()
					i += 1;
				},
				z @ ("-z" | "--timezone") => {
					parsed.timezone = arg_to_str(i + 1, Some(z), args.next().as_ref())?.to_string();
					i += 1;
				},
				o @ ("-o" | "--offset") => {
					parsed.offset = parse_param(
						i + 1, o, args.next().as_ref(),
						|v| v.parse::<i64>().ok().filter(|o| o.abs() <= MAX_OFFSET),
						ArgumentsError::InvalidOffset
					)?;
					i += 1;
				},
				p @ ("-p" | "--pin") => {
					parsed.pin = Some(parse_param(
						i + 1, p, args.next().as_ref(),
						|v| v.parse().ok(),
						ArgumentsError::InvalidPin
					)?);
					i += 1;
				},
				"--poll" => {
					parsed.poll = parse_param(
						i + 1, "--poll", args.next().as_ref(),
						|v| v.parse::<NonZero<u64>>().ok().map(|s| Duration::from_secs(s.get())),
						ArgumentsError::InvalidPoll
					)?;
					i += 1;
				},
				"--invert" => parsed.invert = true,
				"-h" | "--help" => return Err(ArgumentsError::Help),
				v if v.len() > 1 && v.starts_with('-') && v[1..].bytes().all(|b| b == b'v') => {
					parsed.verbosity = parsed.verbosity.saturating_add((v.len() - 1) as u8);
				},
				v => {
					if v.starts_with('-') {
						return Err(ArgumentsError::UnrecognizedOption(v.to_string()));
					}
					return Err(ArgumentsError::UnexpectedArgument(v.to_string()));
				}
			}
			i += 1;
		}

		Ok(parsed)
	}

	/// The default log filter for the requested verbosity.
	pub fn log_level(&self) -> &'static str {
		match self.verbosity {
			0 => "info",
			1 => "debug",
			_ => "trace"
		}
	}
}
