//! The encryption context of a retrieval session.

use crate::errors::backend;
use crate::{ContextConfig, Error, Evaluator, Result, StringEncoder};
use fhe::bfv::{BfvParameters, Ciphertext, Encoding, Plaintext, PublicKey, SecretKey};
use fhe_traits::{
    Deserialize, DeserializeParametrized, FheDecoder, FheDecrypter, FheEncoder, FheEncrypter,
    Serialize,
};
use log::debug;
use rand::{rng, CryptoRng, RngCore};
use std::fmt;
use std::sync::Arc;

/// Number of bits of noise budget a ciphertext must have left to be decrypted.
pub const MIN_NOISE_BUDGET: usize = 16;

/// Owns the parameters and the key pair of one session, and composes the
/// encoding, encryption and serialization primitives of the BFV scheme.
///
/// The secret key never leaves the context: it is generated at construction,
/// is not serializable, and is zeroized when the context is dropped. A context
/// restored from serialized parameters generates its own key pair.
pub struct Context {
    par: Arc<BfvParameters>,
    sk: SecretKey,
    pk: PublicKey,
    encoder: StringEncoder,
    evaluator: Evaluator,
    database_size: usize,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("parameters", &self.par)
            .field("database_size", &self.database_size)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates a context with the default configuration and a fresh key pair.
    ///
    /// # Panics
    ///
    /// Panics if the default parameters are rejected, which indicates a broken
    /// build of the encryption library rather than a recoverable error.
    pub fn new(database_size: usize) -> Self {
        Self::with_config(&ContextConfig::default(), database_size)
            .expect("the default parameters are valid")
    }

    /// Creates a context with the parameters described by `config` and a
    /// fresh key pair.
    pub fn with_config(config: &ContextConfig, database_size: usize) -> Result<Self> {
        Self::with_config_and_rng(config, database_size, &mut rng())
    }

    /// Same as [`Context::with_config`], drawing the keys from `rng`.
    pub fn with_config_and_rng<R: RngCore + CryptoRng>(
        config: &ContextConfig,
        database_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let par = config.build_parameters()?;
        Ok(Self::generate(par, database_size, rng))
    }

    /// Creates a context from serialized parameters, as produced by
    /// [`Context::serialize_parameters`]. The keys are not restored: a fresh
    /// key pair is generated.
    pub fn from_parameters_bytes(bytes: &[u8], database_size: usize) -> Result<Self> {
        Self::from_parameters_bytes_with_rng(bytes, database_size, &mut rng())
    }

    /// Same as [`Context::from_parameters_bytes`], drawing the keys from `rng`.
    pub fn from_parameters_bytes_with_rng<R: RngCore + CryptoRng>(
        bytes: &[u8],
        database_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let par = backend(|| BfvParameters::try_deserialize(bytes))?;
        debug!("restored parameters from {} bytes", bytes.len());
        Ok(Self::generate(Arc::new(par), database_size, rng))
    }

    fn generate<R: RngCore + CryptoRng>(
        par: Arc<BfvParameters>,
        database_size: usize,
        rng: &mut R,
    ) -> Self {
        let sk = SecretKey::random(&par, rng);
        let pk = PublicKey::new(&sk, rng);
        debug!(
            "created context: degree = {}, plaintext_modulus = {}, moduli = {:?}, database_size = {}",
            par.degree(),
            par.plaintext(),
            par.moduli(),
            database_size
        );
        Self {
            encoder: StringEncoder::new(&par),
            evaluator: Evaluator::new(&par),
            par,
            sk,
            pk,
            database_size,
        }
    }

    /// Returns the parameters of the context.
    pub fn parameters(&self) -> &Arc<BfvParameters> {
        &self.par
    }

    /// Returns the public key of the context.
    pub fn public_key(&self) -> &PublicKey {
        &self.pk
    }

    /// Returns the evaluator performing homomorphic operations under the
    /// parameters of the context.
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Returns the string encoder matching the parameters of the context.
    pub fn string_encoder(&self) -> &StringEncoder {
        &self.encoder
    }

    /// Returns the size of the database this context was created for.
    pub fn database_size(&self) -> usize {
        self.database_size
    }

    /// Returns the number of values a plaintext can batch.
    pub fn slot_count(&self) -> usize {
        self.par.degree()
    }

    /// Returns the plaintext modulus.
    pub fn plaintext_modulus(&self) -> u64 {
        self.par.plaintext()
    }

    /// Serializes the parameters of the context.
    pub fn serialize_parameters(&self) -> Vec<u8> {
        self.par.to_bytes()
    }

    /// Batches at most `slot_count()` values, each smaller than the plaintext
    /// modulus, into a plaintext.
    pub fn encode(&self, values: &[u64]) -> Result<Plaintext> {
        if values.len() > self.slot_count() {
            return Err(Error::invalid_argument(format!(
                "Too many values provided: {} exceeds limit {}",
                values.len(),
                self.slot_count()
            )));
        }
        let plaintext_modulus = self.plaintext_modulus();
        if let Some(value) = values.iter().find(|v| **v >= plaintext_modulus) {
            return Err(Error::invalid_argument(format!(
                "Value {value} is not smaller than the plaintext modulus {plaintext_modulus}"
            )));
        }
        backend(|| Plaintext::try_encode(values, Encoding::simd(), &self.par))
    }

    /// Decodes all the `slot_count()` values batched in a plaintext.
    pub fn decode(&self, pt: &Plaintext) -> Result<Vec<u64>> {
        backend(|| Vec::<u64>::try_decode(pt, Encoding::simd()))
    }

    /// Serializes a ciphertext.
    pub fn serialize(&self, ct: &Ciphertext) -> Vec<u8> {
        ct.to_bytes()
    }

    /// Deserializes a ciphertext created under the parameters of this context.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Ciphertext> {
        backend(|| Ciphertext::from_bytes(bytes, &self.par))
    }

    /// Encrypts a plaintext under the public key of the context.
    pub fn encrypt_plaintext(&self, pt: &Plaintext) -> Result<Ciphertext> {
        backend(|| self.pk.try_encrypt(pt, &mut rng()))
    }

    /// Decrypts a ciphertext with the secret key of the context.
    ///
    /// The ciphertext is rejected with [`Error::InvalidArgument`] when it does
    /// not belong to the parameters of the context, or when its noise leaves
    /// less than [`MIN_NOISE_BUDGET`] bits of the noise budget. A corrupted
    /// ciphertext consumes the whole budget, except with probability about
    /// `2^-MIN_NOISE_BUDGET`; such a ciphertext decrypts to unrelated values.
    /// The same check rejects a ciphertext evaluated too deeply to decrypt
    /// reliably.
    pub fn decrypt_ciphertext(&self, ct: &Ciphertext) -> Result<Plaintext> {
        self.evaluator.check_ciphertext(ct)?;
        let pt = backend(|| self.sk.try_decrypt(ct))?;

        // Runs in variable time depending on the noise.
        let noise = backend(|| unsafe { self.sk.measure_noise(ct) })?;
        let max_noise = self.max_noise(ct);
        if noise > max_noise {
            return Err(Error::invalid_argument(format!(
                "The ciphertext is corrupted or was evaluated too deeply: noise of {noise} bits exceeds {max_noise} bits"
            )));
        }
        debug!("Decrypted a ciphertext with {noise} bits of noise");
        Ok(pt)
    }

    /// Largest noise, in bits, accepted when decrypting `ct`.
    fn max_noise(&self, ct: &Ciphertext) -> usize {
        let modulus_bits = ct
            .first()
            .map(|c| {
                c.ctx()
                    .moduli()
                    .iter()
                    .map(|qi| qi.ilog2() as usize)
                    .sum::<usize>()
            })
            .unwrap_or_default();
        let plaintext_bits = (u64::BITS - self.plaintext_modulus().leading_zeros()) as usize;
        modulus_bits.saturating_sub(plaintext_bits + 1 + MIN_NOISE_BUDGET)
    }

    /// Batches `values` into a plaintext, encrypts it, and serializes the
    /// resulting ciphertext.
    pub fn encrypt(&self, values: &[u64]) -> Result<Vec<u8>> {
        let pt = self.encode(values)?;
        let ct = self.encrypt_plaintext(&pt)?;
        Ok(self.serialize(&ct))
    }

    /// Deserializes a ciphertext, decrypts it, and decodes the `slot_count()`
    /// values it batches.
    ///
    /// Malformed bytes, foreign ciphertexts and ciphertexts without enough
    /// noise budget are rejected as described in
    /// [`Context::decrypt_ciphertext`].
    pub fn decrypt(&self, bytes: &[u8]) -> Result<Vec<u64>> {
        let ct = self.deserialize(bytes)?;
        let pt = self.decrypt_ciphertext(&ct)?;
        self.decode(&pt)
    }

    /// Packs a byte string into the slots of a plaintext and encrypts it.
    pub fn encrypt_bytes(&self, value: &[u8]) -> Result<Vec<u8>> {
        let values = self.encoder.pack(value)?;
        self.encrypt(&values)
    }

    /// Decrypts a ciphertext produced by [`Context::encrypt_bytes`]. The
    /// result starts with the encrypted string and is padded with zeros.
    pub fn decrypt_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let values = self.decrypt(bytes)?;
        Ok(self.encoder.unpack(&values))
    }
}
