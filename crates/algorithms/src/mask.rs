//! Cell values of 8-bit masks.
//!
//! Masks (cloud, shadow, green space) are `Raster<u8>` holding one of three
//! values. Anything other than `SET` or `CLEAR` is treated as no-data.

/// Condition holds
pub const SET: u8 = 1;
/// Condition does not hold
pub const CLEAR: u8 = 0;
/// No observation
pub const NODATA: u8 = 255;

#[inline]
pub fn is_set(v: u8) -> bool {
    v == SET
}

#[inline]
pub fn is_valid(v: u8) -> bool {
    v == SET || v == CLEAR
}

#[inline]
pub fn from_bool(b: bool) -> u8 {
    if b { SET } else { CLEAR }
}
