// SPDX-License-Identifier: MIT
//! Power-loss simulation for crash-consistency tests.
//!
//! [`FaultIO`] wraps any [`BlockIO`] and randomly aborts group writes,
//! either before any byte lands or after a truncated prefix of the buffer
//! group. The atomic word is never committed on an aborted group, so the
//! wrapped device is left exactly as a real power cut would leave it.

use crate::{ATOMIC_WRITE_SIZE, BlockIO, BlockIOError, BlockIOResult};

/// Fault policy for [`FaultIO`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Transparent passthrough.
    None,
    /// With probability `1/prob` per group write, abort before any byte
    /// reaches the device.
    BeforeGroup { prob: u32 },
    /// With probability `1/prob` per group write, write a random prefix of
    /// the concatenated buffers, skip the rest and the atomic word.
    MidGroup { prob: u32 },
}

/// Transparent wrapper injecting simulated power loss into group writes.
///
/// Reads, plain writes and flushes pass through untouched. A triggered fault
/// surfaces as [`BlockIOError::Interrupted`] and is counted in `faults` so a
/// harness can assert the fault path actually ran. Randomness comes from a
/// seeded xorshift generator; runs are reproducible per seed.
pub struct FaultIO<'a, IO: BlockIO + ?Sized> {
    inner: &'a mut IO,
    policy: FaultPolicy,
    state: u64,
    pub faults: u64,
}

impl<'a, IO: BlockIO + ?Sized> FaultIO<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO, policy: FaultPolicy) -> Self {
        Self::with_seed(inner, policy, 0x9E37_79B9_7F4A_7C15)
    }

    #[inline]
    pub fn with_seed(inner: &'a mut IO, policy: FaultPolicy, seed: u64) -> Self {
        Self {
            inner,
            policy,
            // The all-zero state would stick, keep one bit set.
            state: seed | 1,
            faults: 0,
        }
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn roll(&mut self, prob: u32) -> bool {
        prob != 0 && self.next() % prob as u64 == 0
    }
}

impl<'a, IO: BlockIO + ?Sized> BlockIO for FaultIO<'a, IO> {
    #[inline]
    fn total_size(&self) -> u64 {
        self.inner.total_size()
    }

    #[inline]
    fn sector_size(&self) -> u32 {
        self.inner.sector_size()
    }

    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        self.inner.write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.inner.read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        self.inner.flush()
    }

    fn write_group(&mut self, offset: u64, atomic: Option<u32>, bufs: &[&[u8]]) -> BlockIOResult {
        let prob = match self.policy {
            FaultPolicy::None => return self.inner.write_group(offset, atomic, bufs),
            FaultPolicy::BeforeGroup { prob } | FaultPolicy::MidGroup { prob } => prob,
        };

        if !self.roll(prob) {
            return self.inner.write_group(offset, atomic, bufs);
        }

        self.faults += 1;

        if let FaultPolicy::MidGroup { .. } = self.policy {
            let total: usize = bufs.iter().map(|b| b.len()).sum();
            let mut budget = match total {
                0 => 0,
                n => (self.next() % n as u64) as usize,
            };

            let mut pos = match atomic {
                Some(_) => offset + ATOMIC_WRITE_SIZE as u64,
                None => offset,
            };

            // A contiguous prefix of the group lands, nothing after it and
            // never the atomic word.
            for buf in bufs {
                let take = buf.len().min(budget);
                if take != 0 {
                    self.inner.write_at(pos, &buf[..take])?;
                }
                budget -= take;
                if budget == 0 {
                    break;
                }
                pos += buf.len() as u64;
            }
        }

        Err(BlockIOError::Interrupted)
    }
}
