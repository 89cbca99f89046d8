// SPDX-License-Identifier: MIT

use core::fmt;

pub use helio::errors::*;

/// Top-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IO(BlockIOError),
    /// Not enough free sectors to hold the requested payload.
    OutOfSpace,
    /// Heap allocation failed.
    OutOfMemory,
    /// Id or range outside the device, or geometry the metadata word cannot
    /// encode.
    Bounds,
    /// The sector id does not carry a file start marker.
    NotAFile,
    /// Iteration or lookup found no further file.
    FileNotFound,
    /// A file with that name already exists.
    AlreadyExists,
    InvalidParam,
    Other(&'static str),
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(_) => "IO error",
            FsError::OutOfSpace => "Out of space",
            FsError::OutOfMemory => "Out of memory",
            FsError::Bounds => "Out of boundaries",
            FsError::NotAFile => "Id is not a file",
            FsError::FileNotFound => "File not found",
            FsError::AlreadyExists => "File already exists",
            FsError::InvalidParam => "Invalid parameter",
            FsError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<BlockIOError> {
        match self {
            FsError::IO(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let Some(src) = self.source() {
            write!(f, "\n  caused by: {}", src.msg())?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::IO(e) => Some(e),
            _ => None,
        }
    }
}

pub type FsResult<T = ()> = Result<T, FsError>;

crate::fs_error_wiring! {
    top => FsError {
        BlockIOError : IO,
    },
}
