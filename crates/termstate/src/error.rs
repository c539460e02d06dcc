// SPDX-License-Identifier: MIT
//
// Error types for terminal state I/O.
//
// Two failure kinds cross the crate boundary: the platform has no
// terminal-control ioctl at all, or the ioctl ran and returned an errno.
// Stores add a wrapper that keeps the previous state around when only the
// write half failed.

use std::io;

use crate::state::State;

/// A failed fetch or store against a terminal descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// This target has no known terminal-control ioctl mapping.
    ///
    /// Permanent. Callers should fall back to line-buffered input.
    #[error("unsupported platform: no terminal-control ioctl for this target")]
    UnsupportedPlatform,

    /// The control transfer returned a nonzero status.
    ///
    /// Carries the platform errno (`EBADF`, `ENOTTY`, `EPERM`, …).
    #[error("terminal control transfer failed: {}", os_error(.0))]
    Device(i32),
}

impl Error {
    /// The platform error code, if the transfer itself failed.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::UnsupportedPlatform => None,
            Self::Device(code) => Some(*code),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::UnsupportedPlatform => Self::new(io::ErrorKind::Unsupported, err),
            Error::Device(code) => Self::from_raw_os_error(code),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn os_error(code: &i32) -> io::Error {
    io::Error::from_raw_os_error(*code)
}

/// Result alias for fetches.
pub type Result<T> = std::result::Result<T, Error>;

// ─── Store errors ───────────────────────────────────────────────────────────

/// A failed store.
///
/// A store fetches the current state before writing, so it can fail in two
/// places. Only the second leaves a meaningful previous state behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Reading the current state failed; no write was attempted.
    #[error("could not read current terminal state: {0}")]
    Fetch(#[source] Error),

    /// The current state was read but the write failed.
    ///
    /// The terminal may or may not reflect the requested state.
    #[error("could not write terminal state: {source}")]
    Store {
        /// State read just before the failed write.
        previous: State,
        #[source]
        source: Error,
    },
}

impl StoreError {
    /// The state read before the write, or [`State::ZERO`] if that read failed.
    #[must_use]
    pub const fn previous(&self) -> State {
        match self {
            Self::Fetch(_) => State::ZERO,
            Self::Store { previous, .. } => *previous,
        }
    }

    /// The underlying fetch or store failure.
    #[must_use]
    pub const fn error(&self) -> Error {
        match self {
            Self::Fetch(err) | Self::Store { source: err, .. } => *err,
        }
    }
}

impl From<StoreError> for io::Error {
    fn from(err: StoreError) -> Self {
        err.error().into()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
