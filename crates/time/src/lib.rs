//! Utilities for dealing with civil time.
//!
//! This crate is divided into two halves: [`time`] deals with converting between Unix timestamps
//! and UTC calendar time, with no understanding of timezones; [`local`] converts Unix timestamps
//! into local calendar time governed by a POSIX TZ rule, using the C library's timezone support.
//!
//! By default, this crate supports `no_std` for Unix <-> UTC conversions and calendar arithmetic.
//! If the `now` feature is enabled, the [`time`] module enables a helper function to get the
//! current time ([`time::now`]). If the `local` feature is enabled (which implies `std`), the
//! [`local`] module is available.
//!
//! # Examples
//!
//! Weekday and month length lookups for rolling calendar fields forward by hand.
//! ```
//! # use time::{days_per_month, wday_from_ymd};
//! // Feb 28, 2024 is followed by a leap day, a Thursday
//! assert_eq!(days_per_month(2024, 2), 29);
//! assert_eq!(wday_from_ymd(2024, 2, 29), 4);
//! ```

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

pub mod time;
#[cfg(feature = "local")]
#[cfg_attr(docsrs, doc(cfg(feature = "local")))]
pub mod local;

pub use time::*;
