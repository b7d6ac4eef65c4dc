//! Configuration of the BFV parameters backing a [`Context`](crate::Context).

use crate::{Error, Result};
use fhe::bfv::{BfvParameters, BfvParametersBuilder};
use fhe_math::zq::primes::generate_prime;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Default polynomial degree, i.e. the number of plaintext slots.
pub const DEFAULT_DEGREE: usize = 4096;

/// Default bit-width of the plaintext modulus.
pub const DEFAULT_PLAINTEXT_NBITS: usize = 20;

/// Default sizes of the ciphertext moduli for [`DEFAULT_DEGREE`].
pub const DEFAULT_MODULI_SIZES: [usize; 3] = [36, 36, 37];

/// Default variance of the error distribution.
pub const DEFAULT_VARIANCE: usize = 10;

const MIN_DEGREE: usize = 8;
const MODULUS_NBITS: RangeInclusive<usize> = 10..=62;
const VARIANCE: RangeInclusive<usize> = 1..=16;

/// Returns the sizes of the ciphertext moduli providing 128 bits of security
/// for a given polynomial degree, or `None` when no default exists for that
/// degree.
pub fn coefficient_moduli_sizes_128(degree: usize) -> Option<&'static [usize]> {
    match degree {
        1024 => Some(&[27]),
        2048 => Some(&[54]),
        4096 => Some(&DEFAULT_MODULI_SIZES),
        8192 => Some(&[43, 43, 44, 44, 44]),
        16384 => Some(&[48, 48, 48, 49, 49, 49, 49, 49, 49]),
        _ => None,
    }
}

/// A validated description of the encryption parameters of a context.
///
/// The plaintext modulus is not stored: it is derived as the largest
/// `plaintext_nbits`-bit prime congruent to 1 modulo `2 * degree`, so that
/// plaintexts can be batched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    degree: usize,
    plaintext_nbits: usize,
    moduli_sizes: Vec<usize>,
    variance: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            plaintext_nbits: DEFAULT_PLAINTEXT_NBITS,
            moduli_sizes: DEFAULT_MODULI_SIZES.to_vec(),
            variance: DEFAULT_VARIANCE,
        }
    }
}

impl ContextConfig {
    /// Returns the polynomial degree.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the bit-width of the plaintext modulus.
    pub fn plaintext_nbits(&self) -> usize {
        self.plaintext_nbits
    }

    /// Returns the sizes of the ciphertext moduli.
    pub fn moduli_sizes(&self) -> &[usize] {
        &self.moduli_sizes
    }

    /// Returns the variance of the error distribution.
    pub fn variance(&self) -> usize {
        self.variance
    }

    /// Derives the batching-friendly plaintext modulus.
    pub fn plaintext_modulus(&self) -> Result<u64> {
        let modulo = 2 * self.degree as u64;
        generate_prime(self.plaintext_nbits, modulo, 1 << self.plaintext_nbits).ok_or_else(|| {
            Error::invalid_argument(format!(
                "No {}-bit prime congruent to 1 modulo {}",
                self.plaintext_nbits, modulo
            ))
        })
    }

    /// Builds the BFV parameters described by this configuration.
    pub fn build_parameters(&self) -> Result<Arc<BfvParameters>> {
        let plaintext = self.plaintext_modulus()?;
        let par = BfvParametersBuilder::new()
            .set_degree(self.degree)
            .set_plaintext_modulus(plaintext)
            .set_moduli_sizes(&self.moduli_sizes)
            .set_variance(self.variance)
            .build_arc()?;
        Ok(par)
    }
}

/// Builder for a [`ContextConfig`].
///
/// Every field starts at its default; when only the degree is changed, the
/// ciphertext moduli are taken from [`coefficient_moduli_sizes_128`].
#[derive(Debug, Clone)]
pub struct ContextConfigBuilder {
    degree: usize,
    plaintext_nbits: usize,
    moduli_sizes: Option<Vec<usize>>,
    variance: usize,
}

impl Default for ContextConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextConfigBuilder {
    /// Creates a new builder holding the default configuration.
    pub fn new() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            plaintext_nbits: DEFAULT_PLAINTEXT_NBITS,
            moduli_sizes: None,
            variance: DEFAULT_VARIANCE,
        }
    }

    /// Sets the polynomial degree. It must be a power of two larger or equal
    /// to 8.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the bit-width of the plaintext modulus.
    pub fn set_plaintext_nbits(&mut self, nbits: usize) -> &mut Self {
        self.plaintext_nbits = nbits;
        self
    }

    /// Sets the sizes of the ciphertext moduli explicitly.
    pub fn set_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        self.moduli_sizes = Some(sizes.to_vec());
        self
    }

    /// Sets the error variance. It must be between one and sixteen.
    pub fn set_variance(&mut self, variance: usize) -> &mut Self {
        self.variance = variance;
        self
    }

    /// Validates the configuration.
    pub fn build(&self) -> Result<ContextConfig> {
        if !self.degree.is_power_of_two() || self.degree < MIN_DEGREE {
            return Err(Error::invalid_argument(format!(
                "Invalid degree: {} is not a power of 2 larger than {}",
                self.degree, MIN_DEGREE
            )));
        }

        if !MODULUS_NBITS.contains(&self.plaintext_nbits) {
            return Err(Error::invalid_argument(format!(
                "Invalid plaintext modulus size: {}, expected an integer between {} and {}",
                self.plaintext_nbits,
                MODULUS_NBITS.start(),
                MODULUS_NBITS.end()
            )));
        }

        let moduli_sizes = match &self.moduli_sizes {
            Some(sizes) => sizes.clone(),
            None => coefficient_moduli_sizes_128(self.degree)
                .ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "No default ciphertext moduli for degree {}",
                        self.degree
                    ))
                })?
                .to_vec(),
        };
        if moduli_sizes.is_empty() {
            return Err(Error::invalid_argument(
                "At least one ciphertext modulus is required",
            ));
        }
        if let Some(size) = moduli_sizes.iter().find(|s| !MODULUS_NBITS.contains(s)) {
            return Err(Error::invalid_argument(format!(
                "Invalid modulus size: {}, expected an integer between {} and {}",
                size,
                MODULUS_NBITS.start(),
                MODULUS_NBITS.end()
            )));
        }
        if moduli_sizes.iter().sum::<usize>() <= self.plaintext_nbits {
            return Err(Error::invalid_argument(
                "The ciphertext modulus must be larger than the plaintext modulus",
            ));
        }

        if !VARIANCE.contains(&self.variance) {
            return Err(Error::invalid_argument(format!(
                "Invalid variance: {}, expected an integer between {} and {}",
                self.variance,
                VARIANCE.start(),
                VARIANCE.end()
            )));
        }

        Ok(ContextConfig {
            degree: self.degree,
            plaintext_nbits: self.plaintext_nbits,
            moduli_sizes,
            variance: self.variance,
        })
    }
}
