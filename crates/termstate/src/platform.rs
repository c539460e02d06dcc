// SPDX-License-Identifier: MIT
//
// Platform capability table — which ioctl fetches and stores the terminal
// control block on this target, and whether there is one at all.
//
// One table is compiled per target family. Nothing branches on the OS at
// runtime: the rest of the crate asks `Capabilities::CURRENT` and gets a
// single boolean plus two opcodes.
//
//   Linux, Android          TCGETS   / TCSETS
//   macOS, iOS, the BSDs    TIOCGETA / TIOCSETA
//   everything else         unsupported
//
// Both pairs write immediately (the TCSANOW flavour). A drain or flush
// variant would be a different opcode, not a flag.

/// An ioctl request number, widened to a common integer type.
///
/// The native request type differs between libcs (`c_ulong` on glibc and
/// Darwin, `c_int` on musl). The device layer narrows it back at the call.
pub type OpCode = u64;

// ─── Capabilities ───────────────────────────────────────────────────────────

/// Per-platform constants describing the terminal-control ioctl interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether this target has a known terminal-control ioctl mapping.
    pub supported: bool,
    /// Request that reads the control block into a buffer.
    pub fetch_op: OpCode,
    /// Request that writes the control block from a buffer.
    pub store_op: OpCode,
}

impl Capabilities {
    /// A table with no ioctl mapping. Every device operation built on it
    /// fails with [`Error::UnsupportedPlatform`](crate::Error::UnsupportedPlatform).
    pub const UNSUPPORTED: Self = Self {
        supported: false,
        fetch_op: 0,
        store_op: 0,
    };

    /// The table for the target this crate was compiled for.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[allow(clippy::unnecessary_cast)]
    pub const CURRENT: Self = Self {
        supported: true,
        fetch_op: libc::TCGETS as OpCode,
        store_op: libc::TCSETS as OpCode,
    };

    /// The table for the target this crate was compiled for.
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd",
    ))]
    #[allow(clippy::unnecessary_cast)]
    pub const CURRENT: Self = Self {
        supported: true,
        fetch_op: libc::TIOCGETA as OpCode,
        store_op: libc::TIOCSETA as OpCode,
    };

    /// The table for the target this crate was compiled for.
    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "netbsd",
        target_os = "openbsd",
    )))]
    pub const CURRENT: Self = Self::UNSUPPORTED;

    /// Whether device operations can be attempted with this table.
    #[inline]
    #[must_use]
    pub const fn is_supported(self) -> bool {
        self.supported
    }
}

/// Whether the current platform exposes the terminal-control ioctl interface.
///
/// When this is `false`, every fetch and store returns
/// [`Error::UnsupportedPlatform`](crate::Error::UnsupportedPlatform) without
/// touching the descriptor. Callers should check it up front and fall back to
/// line-buffered input.
#[inline]
#[must_use]
pub const fn is_supported() -> bool {
    Capabilities::CURRENT.is_supported()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
