//! Utilities for testing.

use tokio::runtime::Runtime;

/// Returns a current-thread runtime for benchmarks and blocking tests.
pub fn get_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Returns `len` bytes of fake chunk contents.
///
/// The bytes come from a fixed-seed linear congruential generator, so
/// the same length always yields the same data and digest.
pub fn get_fake_data(len: usize) -> Vec<u8> {
    let mut state = 42u32;
    let mut data = vec![0u8; len];

    for (i, byte) in data.iter_mut().enumerate() {
        (state, _) = state.overflowing_mul(1664525u32);
        (state, _) = state.overflowing_add(1013904223u32);
        *byte = ((state >> (i % 24)) & 0xff) as u8;
    }

    data
}
