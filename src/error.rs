//! Error types used across modules.
//!
//! Library errors ([`dcf77::CalendarError`], [`time::local::LocalTimeError`]) are wrapped here so
//! that `main` has a single error type to report.

use std::io;
use crate::args::ArgumentsError;
use crate::clock::ClockError;
use crate::line::LineError;

/// The error type for running the emulator.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),

	#[error("{0}")]
	Arguments(#[from] ArgumentsError),

	#[error("Clock error: {0}")]
	Clock(#[from] ClockError),

	#[error("Output line error: {0}")]
	Line(#[from] LineError),

	#[error("Emitter thread is no longer receiving telegrams")]
	Channel
}
