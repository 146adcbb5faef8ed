//! Utility functions for frame decoding and numeric conversions.

pub mod safe_cast;
pub mod yuv;
