//! # Phasor Transcoding
//!
//! This module converts voltage phasors between the domain model and the wire format.
//! On the wire a phasor is a floating-point polar pair: a big-endian f32 magnitude
//! followed by a big-endian f32 angle in radians. The domain model stores both values as
//! f64 and keeps the angle in degrees; the degree/radian conversion happens here and
//! nowhere else.
//!
//! ## Key Components
//!
//! - `Phasor`: Magnitude and angle (degrees) of one sampled channel.
//! - `decode_phasor`: 8 wire bytes to `Phasor`. Never fails, NaN and infinities pass
//!   through untouched.
//! - `encode_phasor`: Magnitude and angle (degrees) to 8 wire bytes. The f32 cast is
//!   lossy by design of the wire format and saturates to infinity when out of range.
//!
//! ## Usage
//!
//! Both the digest decoder and the frame encoder call into this module, so the two
//! directions always agree on field order and units.

use serde::{Deserialize, Serialize};

/// A polar phasor measurement with the angle in degrees.
///
/// The angle is not wrapped into any range; decoded values keep whatever the radian
/// value on the wire represented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phasor {
    pub magnitude: f64,
    pub angle_degrees: f64,
}

impl Phasor {
    pub fn new(magnitude: f64, angle_degrees: f64) -> Self {
        Phasor {
            magnitude,
            angle_degrees,
        }
    }

    pub fn angle_radians(&self) -> f64 {
        self.angle_degrees.to_radians()
    }

    /// Parses a phasor from its 8-byte wire form.
    pub fn from_hex(bytes: [u8; 8]) -> Self {
        decode_phasor(bytes)
    }

    /// Converts the phasor to its 8-byte wire form.
    pub fn to_hex(&self) -> [u8; 8] {
        encode_phasor(self.magnitude, self.angle_degrees)
    }
}

/// Decodes a big-endian f32 magnitude and f32 radian angle.
///
/// # Parameters
///
/// * `bytes`: Magnitude in bytes 0..4, angle in radians in bytes 4..8.
///
/// # Returns
///
/// A `Phasor` with the angle converted to degrees (`radians * 180 / PI`).
pub fn decode_phasor(bytes: [u8; 8]) -> Phasor {
    let magnitude = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let radians = f32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    Phasor {
        magnitude: magnitude as f64,
        angle_degrees: (radians as f64).to_degrees(),
    }
}

/// Encodes a magnitude and an angle in degrees as two big-endian f32 values.
///
/// # Parameters
///
/// * `magnitude`: Phasor magnitude, cast to f32.
/// * `angle_degrees`: Phase angle in degrees, converted to radians then cast to f32.
///
/// # Returns
///
/// An 8-byte array: magnitude followed by the angle in radians.
pub fn encode_phasor(magnitude: f64, angle_degrees: f64) -> [u8; 8] {
    let mut result = [0u8; 8];
    result[0..4].copy_from_slice(&(magnitude as f32).to_be_bytes());
    result[4..8].copy_from_slice(&(angle_degrees.to_radians() as f32).to_be_bytes());
    result
}
