//! Packing of byte strings into plaintext coefficients.

use crate::errors::backend;
use crate::{Error, Result};
use fhe::bfv::{BfvParameters, Encoding, Plaintext};
use fhe_traits::{FheDecoder, FheEncoder};
use fhe_util::transcode_from_bytes;
use log::trace;
use std::sync::Arc;

/// Encodes byte strings as the coefficients of a plaintext polynomial.
///
/// Each coefficient holds `bits_per_coefficient` bits, one less than the
/// bit-width of the plaintext modulus, so that a packed value is always
/// smaller than the modulus.
///
/// The string is read as a little-endian bitstream: byte `i` provides the bits
/// `8 * i..8 * (i + 1)` of the stream, least significant bit first, and
/// coefficient `j` holds the bits `w * j..w * (j + 1)` where `w` is
/// `bits_per_coefficient`, least significant bit first. Bits past the end of
/// the string are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEncoder {
    par: Arc<BfvParameters>,
    nbits: usize,
}

impl StringEncoder {
    /// Creates an encoder for plaintexts of the given parameters.
    pub fn new(par: &Arc<BfvParameters>) -> Self {
        Self {
            par: par.clone(),
            nbits: par.plaintext().ilog2() as usize,
        }
    }

    /// Returns the number of bits packed in each coefficient.
    pub fn bits_per_coefficient(&self) -> usize {
        self.nbits
    }

    /// Returns the maximum length in bytes of a string that fits in one
    /// plaintext.
    pub fn capacity(&self) -> usize {
        (self.par.degree() * self.nbits) / 8
    }

    /// Returns the number of coefficients needed to pack `len` bytes.
    pub fn coefficient_count(&self, len: usize) -> usize {
        (len * 8).div_ceil(self.nbits)
    }

    /// Packs a byte string into exactly `coefficient_count(value.len())`
    /// coefficients.
    ///
    /// Returns an error if the string does not fit in one plaintext; the
    /// string is never truncated.
    pub fn pack(&self, value: &[u8]) -> Result<Vec<u64>> {
        let count = self.coefficient_count(value.len());
        if count > self.par.degree() {
            return Err(Error::invalid_argument(format!(
                "String of {} bytes requires {} coefficients, exceeding the limit of {} ({} bytes)",
                value.len(),
                count,
                self.par.degree(),
                self.capacity()
            )));
        }

        let out = transcode_from_bytes(value, self.nbits);
        debug_assert_eq!(out.len(), count);

        trace!("packed {} bytes into {} coefficients", value.len(), count);
        Ok(out)
    }

    /// Unpacks coefficients into a byte string of
    /// `ceil(coefficients.len() * bits_per_coefficient / 8)` bytes.
    ///
    /// Only the `bits_per_coefficient` low bits of each coefficient are read.
    /// The result is usually longer than the string that was packed; the
    /// extra bytes of a packed string are zero.
    pub fn unpack(&self, coefficients: &[u64]) -> Vec<u8> {
        // Decoded coefficients range up to the plaintext modulus, above the
        // `nbits` bits `transcode_to_bytes` accepts, so they are masked here.
        let mask = (1u128 << self.nbits) - 1;
        let mut out = Vec::with_capacity((coefficients.len() * self.nbits).div_ceil(8));
        let mut current_value = 0u128;
        let mut current_value_nbits = 0;
        for coefficient in coefficients {
            current_value |= ((*coefficient as u128) & mask) << current_value_nbits;
            current_value_nbits += self.nbits;
            while current_value_nbits >= 8 {
                out.push(current_value as u8);
                current_value >>= 8;
                current_value_nbits -= 8;
            }
        }
        if current_value_nbits > 0 {
            out.push(current_value as u8);
        }
        out
    }

    /// Encodes a byte string as a plaintext in the coefficient (`poly`)
    /// encoding.
    pub fn encode(&self, value: &[u8]) -> Result<Plaintext> {
        let coefficients = self.pack(value)?;
        backend(|| Plaintext::try_encode(coefficients.as_slice(), Encoding::poly(), &self.par))
    }

    /// Decodes all the coefficients of a plaintext into a byte string of at
    /// least `capacity()` bytes.
    ///
    /// Fails only if the plaintext was encoded with a different encoding.
    pub fn decode(&self, pt: &Plaintext) -> Result<Vec<u8>> {
        let coefficients = backend(|| Vec::<u64>::try_decode(pt, Encoding::poly()))?;
        Ok(self.unpack(&coefficients))
    }
}
