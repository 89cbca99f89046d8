// SPDX-License-Identifier: MIT

//! Chunk placement planning.

use alloc::vec::Vec;

use crate::chunk::{FileId, META_SIZE};
use crate::errors::{FsError, FsResult};
use crate::meta::HelMeta;
use crate::usage::UsageMap;

/// One planned chunk: where it starts and how many payload bytes it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub id: FileId,
    pub bytes: u32,
}

/// Chooses the chunks a new file will occupy.
///
/// Greedy first-fit over the free runs: every run but the last is taken
/// whole, the last takes the remainder. This is the function to swap out
/// when the placement policy needs tuning.
///
/// Always returns at least one span; a zero-byte file still occupies one
/// chunk. Fails with [`FsError::OutOfSpace`] when the free runs cannot hold
/// `size` payload bytes plus one metadata word per chunk.
pub fn plan_chunks(usage: &UsageMap, meta: &HelMeta, size: u32) -> FsResult<Vec<ChunkSpan>> {
    let sector_size = meta.sector_size() as u64;
    let mut spans = Vec::new();
    let mut left = size as u64;
    let mut from = 0;

    loop {
        let id = usage.find_first_free(from).ok_or(FsError::OutOfSpace)?;
        let run = usage.free_run(id);
        let capacity = run as u64 * sector_size - META_SIZE as u64;

        spans.try_reserve(1).map_err(|_| FsError::OutOfMemory)?;
        if capacity >= left {
            // Last chunk takes what is still owed.
            spans.push(ChunkSpan {
                id,
                bytes: left as u32,
            });
            return Ok(spans);
        }

        spans.push(ChunkSpan {
            id,
            bytes: capacity as u32,
        });
        left -= capacity;
        from = id + run;
    }
}
