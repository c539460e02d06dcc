// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Device I/O — move a `State` to and from a terminal descriptor.
//
// Two operations, both built on one primitive: "issue opcode X on fd with
// this buffer". The primitive is the `Transfer` trait so tests can stand in
// a fake terminal; the real one is `Ioctl`.
//
// Every store fetches first and hands back what was there. That previous
// state is the undo token: no separate save step is needed before
// overwriting a terminal's settings.
//
// Nothing here locks. Two threads storing to the same descriptor race the
// way the kernel says they race: last writer wins.
//
// Safety: `Ioctl::transfer` is the single unsafe call. The buffer is a
// `State`, which is `repr(transparent)` over the exact struct the request
// reads or writes, and it lives for the whole call.

use tracing::debug;

use crate::error::{Error, Result, StoreError};
use crate::platform::{Capabilities, OpCode};
use crate::state::State;

/// A file descriptor number.
pub type Fd = i32;

/// Standard input, the descriptor used by the convenience entry points.
pub const STDIN: Fd = 0;

// ─── Transfer primitive ─────────────────────────────────────────────────────

/// The low-level device-control call.
///
/// Issues `op` on `fd`, with `state` as the buffer the request reads from or
/// writes into. A failure reports the platform error code.
pub trait Transfer {
    /// Perform one control transfer.
    ///
    /// # Errors
    ///
    /// Returns the errno of the failed call.
    fn transfer(&self, fd: Fd, op: OpCode, state: &mut State) -> std::result::Result<(), i32>;
}

/// The real transfer primitive: `ioctl(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ioctl;

impl Transfer for Ioctl {
    #[cfg(unix)]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn transfer(&self, fd: Fd, op: OpCode, state: &mut State) -> std::result::Result<(), i32> {
        let rc = unsafe { libc::ioctl(fd, op as _, state.as_mut_ptr()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO))
        }
    }

    // No ioctl here. `Capabilities::CURRENT` is unsupported on these
    // targets, so `Device` never gets this far.
    #[cfg(not(unix))]
    fn transfer(&self, _fd: Fd, _op: OpCode, _state: &mut State) -> std::result::Result<(), i32> {
        Err(0)
    }
}

// ─── Device ─────────────────────────────────────────────────────────────────

/// A capability table paired with a transfer primitive.
///
/// [`Device::native`] is the process-wide real device. Build others with
/// [`Device::new`] to run the same logic against a fake primitive.
#[derive(Debug, Clone, Copy)]
pub struct Device<T> {
    caps: Capabilities,
    transfer: T,
}

static NATIVE: Device<Ioctl> = Device::new(Capabilities::CURRENT, Ioctl);

impl Device<Ioctl> {
    /// The real device for this platform.
    #[inline]
    #[must_use]
    pub fn native() -> &'static Self {
        &NATIVE
    }
}

impl<T> Device<T> {
    /// Pair a capability table with a transfer primitive.
    #[must_use]
    pub const fn new(caps: Capabilities, transfer: T) -> Self {
        Self { caps, transfer }
    }

    /// The capability table this device checks before every call.
    #[inline]
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// The underlying transfer primitive.
    #[inline]
    #[must_use]
    pub const fn primitive(&self) -> &T {
        &self.transfer
    }
}

impl<T: Transfer> Device<T> {
    fn call(&self, fd: Fd, op: OpCode, state: &mut State) -> Result<()> {
        if !self.caps.is_supported() {
            return Err(Error::UnsupportedPlatform);
        }
        self.transfer.transfer(fd, op, state).map_err(Error::Device)
    }

    /// Read the current terminal state of `fd`.
    ///
    /// Has no effect on the terminal.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedPlatform`] without touching `fd` if the capability
    /// table is unsupported; [`Error::Device`] if the transfer fails (bad
    /// descriptor, not a terminal, …).
    pub fn fetch(&self, fd: Fd) -> Result<State> {
        // The kernel may fill less than the whole block (Linux writes 19 of
        // the 32 c_cc slots); start from zero so the tail is deterministic.
        let mut state = State::ZERO;
        self.call(fd, self.caps.fetch_op, &mut state)?;
        debug!(fd, ?state, "fetched terminal state");
        Ok(state)
    }

    /// Write `desired` to `fd`, returning the state that was there before.
    ///
    /// The previous state is fetched first with the fetch opcode, then
    /// `desired` is written with the store opcode.
    ///
    /// # Errors
    ///
    /// [`StoreError::Fetch`] if the preliminary fetch fails; nothing is
    /// written. [`StoreError::Store`] if the write fails; it still carries
    /// the previous state. In that case the terminal may hold any mix of old
    /// and new settings.
    pub fn store(&self, fd: Fd, desired: State) -> std::result::Result<State, StoreError> {
        let previous = self.fetch(fd).map_err(StoreError::Fetch)?;

        let mut buf = desired;
        self.call(fd, self.caps.store_op, &mut buf)
            .map_err(|source| StoreError::Store { previous, source })?;

        debug!(fd, ?previous, ?desired, "stored terminal state");
        Ok(previous)
    }

    /// Whether `fd` answers a terminal-state fetch.
    #[must_use]
    pub fn is_terminal(&self, fd: Fd) -> bool {
        self.fetch(fd).is_ok()
    }
}

// ─── Convenience entry points ───────────────────────────────────────────────

/// Read the terminal state of standard input.
///
/// # Errors
///
/// See [`Device::fetch`].
pub fn fetch() -> Result<State> {
    fetch_fd(STDIN)
}

/// Read the terminal state of `fd`.
///
/// # Errors
///
/// See [`Device::fetch`].
pub fn fetch_fd(fd: Fd) -> Result<State> {
    Device::native().fetch(fd)
}

/// Write `desired` to standard input, returning the previous state.
///
/// # Errors
///
/// See [`Device::store`].
pub fn store(desired: State) -> std::result::Result<State, StoreError> {
    store_fd(STDIN, desired)
}

/// Write `desired` to `fd`, returning the previous state.
///
/// # Errors
///
/// See [`Device::store`].
pub fn store_fd(fd: Fd, desired: State) -> std::result::Result<State, StoreError> {
    Device::native().store(fd, desired)
}

/// Whether `fd` is a terminal this platform can configure.
#[must_use]
pub fn is_terminal(fd: Fd) -> bool {
    Device::native().is_terminal(fd)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
