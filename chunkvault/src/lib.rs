//! The Chunkvault Library.
//!
//! Components shared by everything that touches chunks: hashing,
//! stream utilities and the fixed-size splitter.

#![deny(
    asm_sub_register,
    deprecated,
    missing_abi,
    unsafe_code,
    unused_macros,
    unused_must_use,
    unused_unsafe
)]
#![deny(clippy::from_over_into, clippy::needless_question_mark)]
#![cfg_attr(
    not(debug_assertions),
    deny(unused_imports, unused_mut, unused_variables,)
)]

#[cfg(feature = "chunking")]
pub mod chunking;
pub mod error;
pub mod hash;
pub mod mime;
#[cfg(feature = "stream")]
pub mod stream;
#[cfg(feature = "tokio")]
pub mod testing;

pub use error::{ChunkvaultError, ChunkvaultResult};
