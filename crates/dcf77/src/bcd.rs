//! Binary-coded decimal fields and even parity.
//!
//! DCF77 transmits every numeric field as packed BCD (units nibble first, then tens), least
//! significant bit first, truncated to the width of the field. Each group of fields is closed by
//! an even parity bit.

/// Pack a two digit decimal value into BCD, tens in the high nibble.
///
/// # Panics
///
/// Panics if `value >= 100`. Calendar fields are range checked by [`crate::CalendarTime::new`],
/// so a value this large means the caller skipped that check.
///
/// # Examples
///
/// ```
/// # use dcf77::bcd::to_bcd;
/// assert_eq!(to_bcd(7), 0x07);
/// assert_eq!(to_bcd(59), 0x59);
/// ```
#[inline]
pub const fn to_bcd(value: u8) -> u8 {
	assert!(value < 100, "BCD value out of range");
	((value / 10) << 4) | (value % 10)
}

/// Iterator over the bits of a BCD field, least significant bit first.
///
/// Created by [`to_bcd_digits`].
#[derive(Clone, Debug)]
pub struct BcdDigits {
	packed: u8,
	remaining: u8
}

impl Iterator for BcdDigits {
	type Item = bool;

	fn next(&mut self) -> Option<bool> {
		if self.remaining == 0 {
			return None;
		}
		let bit = self.packed & 1 > 0;
		self.packed >>= 1;
		self.remaining -= 1;
		Some(bit)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining as usize, Some(self.remaining as usize))
	}
}

impl ExactSizeIterator for BcdDigits {}

/// Encode `value` as a `width` bit BCD field, least significant bit first.
///
/// DCF77 field widths are 3 (weekday), 5 (month), 6 (hour, day), 7 (minute) and 8 (year).
///
/// # Panics
///
/// Panics if `value >= 100`, if `width > 8`, or if the BCD encoding of `value` does not fit in
/// `width` bits (e.g. month 20 in a 5 bit field). These are all programming errors.
///
/// # Examples
///
/// ```
/// # use dcf77::bcd::to_bcd_digits;
/// // 37 = 0011_0111 in BCD
/// let bits: Vec<bool> = to_bcd_digits(37, 7).collect();
/// assert_eq!(bits, [true, true, true, false, true, true, false]);
/// ```
pub fn to_bcd_digits(value: u8, width: u8) -> BcdDigits {
	assert!(width <= 8, "BCD field wider than 8 bits");
	let packed = to_bcd(value);
	assert!(
		width == 8 || packed >> width == 0,
		"BCD value {} does not fit in {} bits", value, width
	);
	BcdDigits { packed, remaining: width }
}

/// The even parity bit over `bits`.
///
/// Returns `true` if the number of set bits is odd, so that appending the result makes the total
/// count even.
///
/// # Examples
///
/// ```
/// # use dcf77::bcd::parity_bit;
/// assert_eq!(parity_bit([true, false, true]), false);
/// assert_eq!(parity_bit([true, true, true]), true);
/// assert_eq!(parity_bit([]), false);
/// ```
pub fn parity_bit<I: IntoIterator<Item = bool>>(bits: I) -> bool {
	bits.into_iter().fold(false, |acc, bit| acc ^ bit)
}
