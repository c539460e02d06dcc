// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Terminal state — a plain-value copy of the OS terminal control block.
//
// `State` wraps the platform's `termios` layout byte for byte, so the
// device layer can hand a pointer to it straight to the ioctl. Copying a
// `State` produces an independent snapshot; nothing here talks to a
// terminal. Equality is structural over the whole block, which is what
// callers use to ask "did that modification change anything?".
//
// Safety: the only unsafe is `mem::zeroed()` for the zero state. Every
// field of the control block is an integer or an integer array, so the
// all-zero bit pattern is a valid value.
//
// Targets without termios get a same-shaped `#[repr(C)]` stand-in with
// Linux's constants. The device layer refuses to touch it (see
// `platform`), but modifiers and tests still work on it.

use std::fmt;

// ─── Platform layout ────────────────────────────────────────────────────────

#[cfg(unix)]
mod sys {
    pub use libc::{ECHO, ECHOE, ECHOK, ECHONL, ICANON, IEXTEN, ISIG};
    pub use libc::{VEOF, VERASE, VINTR, VKILL, VMIN, VQUIT, VSTART, VSTOP, VSUSP, VTIME};
    pub use libc::{tcflag_t as Flag, termios as Raw};
}

#[cfg(not(unix))]
mod sys {
    pub type Flag = u32;
    pub type Cc = u8;

    pub const NCCS: usize = 32;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Raw {
        pub c_iflag: Flag,
        pub c_oflag: Flag,
        pub c_cflag: Flag,
        pub c_lflag: Flag,
        pub c_line: u8,
        pub c_cc: [Cc; NCCS],
        pub c_ispeed: u32,
        pub c_ospeed: u32,
    }

    pub const ISIG: Flag = 0o000_001;
    pub const ICANON: Flag = 0o000_002;
    pub const ECHO: Flag = 0o000_010;
    pub const ECHOE: Flag = 0o000_020;
    pub const ECHOK: Flag = 0o000_040;
    pub const ECHONL: Flag = 0o000_100;
    pub const IEXTEN: Flag = 0o100_000;

    pub const VINTR: usize = 0;
    pub const VQUIT: usize = 1;
    pub const VERASE: usize = 2;
    pub const VKILL: usize = 3;
    pub const VEOF: usize = 4;
    pub const VTIME: usize = 5;
    pub const VMIN: usize = 6;
    pub const VSTART: usize = 8;
    pub const VSTOP: usize = 9;
    pub const VSUSP: usize = 10;
}

/// One flag word of the control block (`tcflag_t`).
///
/// Its width is platform-defined: 32 bits on Linux, 64 on Darwin.
pub type Flag = sys::Flag;

/// The platform's raw control block type (`libc::termios` on Unix).
pub type RawState = sys::Raw;

// ─── Local flags ────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// The named bits of the local-mode word (`c_lflag`).
    ///
    /// Bits without a name here are preserved untouched: the accessors on
    /// [`State`] go through `from_bits_retain`, never `from_bits_truncate`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LocalFlags: Flag {
        /// `ICANON` — line-buffered input, delivered on newline.
        const CANONICAL    = sys::ICANON;
        /// `ECHO` — typed characters are written back.
        const ECHO         = sys::ECHO;
        /// `ECHONL` — echo newline even when `ECHO` is off.
        const ECHO_NEWLINE = sys::ECHONL;
        /// `ECHOE` — erase character visually erases.
        const ECHO_ERASE   = sys::ECHOE;
        /// `ECHOK` — kill character echoes a newline.
        const ECHO_KILL    = sys::ECHOK;
        /// `ISIG` — INTR, QUIT and SUSP generate signals.
        const SIGNALS      = sys::ISIG;
        /// `IEXTEN` — implementation-defined input processing.
        const EXTENDED     = sys::IEXTEN;
    }
}

// ─── Control characters ─────────────────────────────────────────────────────

/// A symbolic slot in the control-character array (`c_cc`).
///
/// The numeric index of each slot is platform-defined; `VMIN` is 6 on Linux
/// and 16 on macOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlChar {
    /// `VINTR` — interrupt (usually `^C`).
    Intr,
    /// `VQUIT` — quit (usually `^\`).
    Quit,
    /// `VERASE` — erase one character.
    Erase,
    /// `VKILL` — erase the line.
    Kill,
    /// `VEOF` — end of file (usually `^D`).
    Eof,
    /// `VMIN` — minimum byte count for a non-canonical read.
    Min,
    /// `VTIME` — non-canonical read timeout, in tenths of a second.
    Time,
    /// `VSTART` — resume output (usually `^Q`).
    Start,
    /// `VSTOP` — suspend output (usually `^S`).
    Stop,
    /// `VSUSP` — suspend the job (usually `^Z`).
    Susp,
}

impl ControlChar {
    /// Every slot, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Intr,
        Self::Quit,
        Self::Erase,
        Self::Kill,
        Self::Eof,
        Self::Min,
        Self::Time,
        Self::Start,
        Self::Stop,
        Self::Susp,
    ];

    /// Index of this slot in `c_cc` on the current platform.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Intr => sys::VINTR,
            Self::Quit => sys::VQUIT,
            Self::Erase => sys::VERASE,
            Self::Kill => sys::VKILL,
            Self::Eof => sys::VEOF,
            Self::Min => sys::VMIN,
            Self::Time => sys::VTIME,
            Self::Start => sys::VSTART,
            Self::Stop => sys::VSTOP,
            Self::Susp => sys::VSUSP,
        }
    }
}

// ─── State ──────────────────────────────────────────────────────────────────

/// A snapshot of a terminal's line-discipline configuration.
///
/// Obtained from [`fetch`](crate::fetch) (or any other device fetch), then
/// derived from with the modifiers ([`cbreak`](Self::cbreak),
/// [`set_echo`](Self::set_echo), …) and written back with
/// [`store`](crate::store). A `State` never aliases a live terminal.
///
/// ```
/// use termstate::{ControlChar, LocalFlags, State};
///
/// let cooked = State::ZERO.with_local_flags(LocalFlags::CANONICAL | LocalFlags::ECHO);
/// let raw = cooked.cbreak().echo_off();
///
/// assert!(!raw.is_canonical());
/// assert!(!raw.is_echo());
/// assert_eq!(raw.control_char(ControlChar::Min), 1);
/// assert_ne!(cooked, raw);
/// ```
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct State(RawState);

impl State {
    /// The all-zero control block. This is what a failed fetch reports.
    // SAFETY: the control block is plain integers; all-zero is valid.
    pub const ZERO: Self = Self(unsafe { std::mem::zeroed() });

    /// Wrap a raw control block.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: RawState) -> Self {
        Self(raw)
    }

    /// The raw control block, for handing to other termios APIs.
    #[inline]
    #[must_use]
    pub const fn into_raw(self) -> RawState {
        self.0
    }

    /// Pointer to the control block, for the ioctl buffer argument.
    #[inline]
    pub(crate) const fn as_mut_ptr(&mut self) -> *mut RawState {
        &raw mut self.0
    }

    // ── Flag words ──────────────────────────────────────────────────

    /// Input-mode word (`c_iflag`).
    #[inline]
    #[must_use]
    pub const fn input_flags(&self) -> Flag {
        self.0.c_iflag
    }

    /// Output-mode word (`c_oflag`).
    #[inline]
    #[must_use]
    pub const fn output_flags(&self) -> Flag {
        self.0.c_oflag
    }

    /// Control-mode word (`c_cflag`).
    #[inline]
    #[must_use]
    pub const fn control_flags(&self) -> Flag {
        self.0.c_cflag
    }

    /// Local-mode word (`c_lflag`), with every bit retained.
    #[inline]
    #[must_use]
    pub const fn local_flags(&self) -> LocalFlags {
        LocalFlags::from_bits_retain(self.0.c_lflag)
    }

    /// Copy with the input-mode word replaced.
    #[inline]
    #[must_use]
    pub const fn with_input_flags(mut self, flags: Flag) -> Self {
        self.0.c_iflag = flags;
        self
    }

    /// Copy with the output-mode word replaced.
    #[inline]
    #[must_use]
    pub const fn with_output_flags(mut self, flags: Flag) -> Self {
        self.0.c_oflag = flags;
        self
    }

    /// Copy with the control-mode word replaced.
    #[inline]
    #[must_use]
    pub const fn with_control_flags(mut self, flags: Flag) -> Self {
        self.0.c_cflag = flags;
        self
    }

    /// Copy with the local-mode word replaced.
    #[inline]
    #[must_use]
    pub const fn with_local_flags(mut self, flags: LocalFlags) -> Self {
        self.0.c_lflag = flags.bits();
        self
    }

    // ── Control characters ──────────────────────────────────────────

    /// Value of a control-character slot.
    #[inline]
    #[must_use]
    pub const fn control_char(&self, slot: ControlChar) -> u8 {
        self.0.c_cc[slot.index()]
    }

    /// Copy with one control-character slot replaced.
    #[inline]
    #[must_use]
    pub const fn with_control_char(mut self, slot: ControlChar, value: u8) -> Self {
        self.0.c_cc[slot.index()] = value;
        self
    }

    // ── Predicates ──────────────────────────────────────────────────

    /// Whether input is line-buffered (`ICANON` set).
    #[inline]
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        self.local_flags().contains(LocalFlags::CANONICAL)
    }

    /// Whether typed characters are echoed (`ECHO` set).
    #[inline]
    #[must_use]
    pub const fn is_echo(&self) -> bool {
        self.local_flags().contains(LocalFlags::ECHO)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<RawState> for State {
    fn from(raw: RawState) -> Self {
        Self(raw)
    }
}

impl From<State> for RawState {
    fn from(state: State) -> Self {
        state.0
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("iflag", &format_args!("{:#x}", self.input_flags()))
            .field("oflag", &format_args!("{:#x}", self.output_flags()))
            .field("cflag", &format_args!("{:#x}", self.control_flags()))
            .field("lflag", &format_args!("{:#x}", self.local_flags().bits()))
            .field("vmin", &self.control_char(ControlChar::Min))
            .field("vtime", &self.control_char(ControlChar::Time))
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
