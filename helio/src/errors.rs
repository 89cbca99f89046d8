// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for device operations.
pub type BlockIOResult<T = ()> = core::result::Result<T, BlockIOError>;

/// Error type for device operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIOError {
    /// Access past the end of the device.
    OutOfBounds,
    /// The backend cannot perform the requested operation.
    Unsupported,
    /// Simulated power loss raised by a fault-injecting wrapper; the write
    /// group it aborted was not sealed.
    Interrupted,
    Other(&'static str),
}

impl BlockIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockIOError::OutOfBounds => "Access out of device bounds",
            BlockIOError::Unsupported => "Unsupported operation",
            BlockIOError::Interrupted => "Interrupted write group",
            BlockIOError::Other(msg) => msg,
        }
    }
}

impl From<&'static str> for BlockIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        BlockIOError::Other(msg)
    }
}

impl fmt::Display for BlockIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BlockIOError {}
