#![cfg_attr(not(feature = "std"), no_std)]

//! Chunk-chained file system kernel for flat storage.
//!
//! Files are singly-linked chains of sector-aligned chunks. Each chunk
//! carries a single 32-bit metadata word that the device must commit
//! atomically; ordering every chain write so the head word lands last makes
//! file creation and deletion power-loss safe without a journal.
//!
//! [`fs::HelFs`] is the kernel proper (id-addressed files), [`naming::NamedFs`]
//! layers fixed-size names on top of it.

#[cfg(feature = "alloc")]
#[macro_use]
extern crate alloc;

mod macros;

// Core modules
pub mod chunk;
pub mod errors;
pub mod meta;

#[cfg(feature = "alloc")]
pub mod allocator;
#[cfg(feature = "alloc")]
pub mod fs;
#[cfg(feature = "alloc")]
pub mod naming;
#[cfg(feature = "alloc")]
pub mod usage;

#[cfg(feature = "alloc")]
pub use fs::HelFs;
#[cfg(feature = "alloc")]
pub use naming::{NAME_SIZE, NamedFs};

pub use chunk::FileId;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use helio::prelude::*;

    pub use super::chunk::*;
    pub use super::errors::*;
    pub use super::meta::*;

    #[cfg(feature = "alloc")]
    pub use super::allocator::*;
    #[cfg(feature = "alloc")]
    pub use super::fs::*;
    #[cfg(feature = "alloc")]
    pub use super::naming::*;
    #[cfg(feature = "alloc")]
    pub use super::usage::*;
}
