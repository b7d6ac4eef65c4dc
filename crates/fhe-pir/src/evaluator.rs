//! Homomorphic operations on the ciphertexts of a context.

use crate::errors::{backend, backend_infallible};
use crate::{Error, Result};
use fhe::bfv::{dot_product_scalar, BfvParameters, Ciphertext, Plaintext};
use std::sync::Arc;

/// Performs homomorphic operations under the parameters of a
/// [`Context`](crate::Context).
///
/// Every ciphertext operand is checked against these parameters: its degree
/// and its ciphertext moduli must match one level of the evaluator's moduli
/// chain, otherwise the operation fails with [`Error::InvalidArgument`].
/// Plaintext operands carry no public description of their parameters; the
/// encryption library rejects a plaintext that does not belong to the
/// parameters of the ciphertext it is combined with, which is reported as
/// [`Error::InvalidArgument`] too.
///
/// Two parameter sets sharing the degree and the ciphertext moduli but not the
/// plaintext modulus cannot be told apart from a ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluator {
    par: Arc<BfvParameters>,
}

impl Evaluator {
    pub(crate) fn new(par: &Arc<BfvParameters>) -> Self {
        Self { par: par.clone() }
    }

    /// Returns the parameters the operands must be created under.
    pub fn parameters(&self) -> &Arc<BfvParameters> {
        &self.par
    }

    /// Verifies that a ciphertext was created under the parameters of this
    /// evaluator.
    pub(crate) fn check_ciphertext(&self, ct: &Ciphertext) -> Result<()> {
        let first = ct
            .first()
            .ok_or_else(|| Error::invalid_argument("The ciphertext has no polynomial"))?;
        let moduli = first.ctx().moduli();
        let degree = first.coefficients().ncols();
        if degree != self.par.degree() || moduli.is_empty() || !self.par.moduli().starts_with(moduli)
        {
            return Err(Error::invalid_argument(format!(
                "Incompatible ciphertext: degree {} and moduli {:?}, expected degree {} and moduli {:?}",
                degree,
                moduli,
                self.par.degree(),
                self.par.moduli()
            )));
        }
        Ok(())
    }

    /// Adds two ciphertexts.
    pub fn add(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        self.check_ciphertext(lhs)?;
        self.check_ciphertext(rhs)?;
        backend_infallible(|| lhs + rhs)
    }

    /// Adds a plaintext to a ciphertext.
    pub fn add_plain(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        self.check_ciphertext(ct)?;
        backend_infallible(|| ct + pt)
    }

    /// Subtracts `rhs` from `lhs`.
    pub fn sub(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        self.check_ciphertext(lhs)?;
        self.check_ciphertext(rhs)?;
        backend_infallible(|| lhs - rhs)
    }

    /// Multiplies two ciphertexts. The result is not relinearized.
    pub fn multiply(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<Ciphertext> {
        self.check_ciphertext(lhs)?;
        self.check_ciphertext(rhs)?;
        backend_infallible(|| lhs * rhs)
    }

    /// Multiplies a ciphertext by a plaintext.
    pub fn multiply_plain(&self, ct: &Ciphertext, pt: &Plaintext) -> Result<Ciphertext> {
        self.check_ciphertext(ct)?;
        backend_infallible(|| ct * pt)
    }

    /// Multiplies a ciphertext by a plaintext in place.
    ///
    /// On error, `ct` is left unchanged.
    pub fn multiply_plain_inplace(&self, ct: &mut Ciphertext, pt: &Plaintext) -> Result<()> {
        let product = self.multiply_plain(ct, pt)?;
        *ct = product;
        Ok(())
    }

    /// Computes the sum of the products `cts[i] * pts[i]`.
    pub fn dot_product(&self, cts: &[Ciphertext], pts: &[Plaintext]) -> Result<Ciphertext> {
        if cts.len() != pts.len() {
            return Err(Error::invalid_argument(format!(
                "Mismatched lengths: {} ciphertexts and {} plaintexts",
                cts.len(),
                pts.len()
            )));
        }
        cts.iter().try_for_each(|ct| self.check_ciphertext(ct))?;
        backend(|| dot_product_scalar(cts.iter(), pts.iter()))
    }
}
