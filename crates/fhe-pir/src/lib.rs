#![crate_name = "fhe_pir"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]
#![doc = include_str!("../README.md")]

#[cfg(test)]
#[macro_use]
extern crate proptest;

mod config;
mod context;
mod errors;
mod evaluator;
mod string_encoder;

pub use config::{
    coefficient_moduli_sizes_128, ContextConfig, ContextConfigBuilder, DEFAULT_DEGREE,
    DEFAULT_MODULI_SIZES, DEFAULT_PLAINTEXT_NBITS, DEFAULT_VARIANCE,
};
pub use context::{Context, MIN_NOISE_BUDGET};
pub use errors::{Error, ErrorCode, Result};
pub use evaluator::Evaluator;
pub use string_encoder::StringEncoder;
