// SPDX-License-Identifier: MIT

//! Shared fixtures for the integration suites.
//!
//! Every suite runs against an in-memory device that starts out filled
//! with deterministic garbage, so format and the mount scan are always
//! exercised on dirty media rather than on convenient zeroes.

pub const DEFAULT_MEM_SIZE: usize = 0x400;
pub const DEFAULT_SECTOR_SIZE: u32 = 0x20;

/// Fills `buf` from a seeded xorshift64 stream so failures reproduce.
pub fn fill_rand(buf: &mut [u8], seed: u64) {
    let mut state = seed | 1;
    for byte in buf.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *byte = state as u8;
    }
}

/// Allocates a device-sized buffer pre-filled with garbage.
pub fn garbage_device(size: usize, seed: u64) -> Vec<u8> {
    let mut mem = vec![0u8; size];
    fill_rand(&mut mem, seed);
    mem
}
