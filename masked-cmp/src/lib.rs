#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![deny(missing_docs)] // Require all public interfaces to be documented
#![warn(clippy::pedantic)] // Be pedantic by default
#![warn(clippy::integer_division_remainder_used)] // Secret values never meet `/` or `%`
#![allow(clippy::must_use_candidate)] // Accessors would all need it

//! # Usage
//!
//! ```
//! use masked_cmp::{Context, KYBER_768, Scenario, Verification};
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let mut params = KYBER_768.with_shares(2);
//! params.b.ncoeffs = 64;
//! params.c.ncoeffs = 32;
//!
//! let mut ctx = Context::new(params, StdRng::seed_from_u64(1), Verification::Enabled).unwrap();
//!
//! // Either way the received ciphertext was tampered with, so the check must fail.
//! ctx.prepare(Scenario::NoDecryptionFailure);
//! ctx.run_comparison().unwrap();
//! ctx.prepare(Scenario::DecryptionFailure);
//! ctx.run_comparison().unwrap();
//! ```

extern crate alloc;

/// Arithmetic-to-Boolean conversion into bitsliced shares
pub mod a2b;

/// Constant-time division by a public modulus
mod arith;

/// Single-byte command codes
mod command;

/// Masked equality check
mod compare;

/// Modulus compression, in the clear and on shares
mod compress;

/// Scenario orchestration
mod context;

mod error;

/// Boolean masking gadgets
pub mod gadgets;

/// Parameter sets
mod param;

/// Random share generation
mod random;

/// Arithmetic sharing
mod shares;

mod truncate;

pub use arith::Modulus;
pub use command::{Command, PROTOCOL_VERSION, ProtocolVersion, check_protocol};
pub use compare::{BitslicedComparator, Comparison, MaskedComparator};
pub use compress::{Compress, Compressor, RoundingCompressor, SharedDomain, ShiftCompressor};
pub use context::{Context, OpCounts, Scenario};
pub use error::{Error, Result};
pub use param::{
    Component, DEFAULT_SHARES, FIRE_SABER, Family, KYBER_512, KYBER_768, KYBER_1024, LIGHT_SABER,
    MAX_SHARED_BITS, Params, SABER,
};
pub use random::ShareSource;
pub use shares::{SharedVector, Verification, mask};
