// SPDX-License-Identifier: MIT
//
// Modifiers — pure `State -> State` transformations.
//
// Each modifier takes a state by value and returns a derived one; the
// receiver is a copy, so nothing is mutated in place. They compose left to
// right: `state.apply(&[State::cbreak, State::echo_off])` is
// `state.cbreak().echo_off()`.
//
// The set is closed and small, so a modifier is a plain `fn` pointer. No
// boxing, no trait objects.

use crate::state::{ControlChar, LocalFlags, State};

/// A state transformation, usable in a modifier sequence.
///
/// Any `fn(State) -> State` qualifies, including the methods below named as
/// paths (`State::cbreak`) and closures that capture nothing.
pub type Modifier = fn(State) -> State;

/// Both echo bits: typed characters and the bare newline.
const ECHOS: LocalFlags = LocalFlags::ECHO.union(LocalFlags::ECHO_NEWLINE);

impl State {
    /// Cbreak (a.k.a. "rare") mode: input is delivered byte by byte.
    ///
    /// Clears `ICANON`, sets `VMIN` to 1 so a read blocks until at least
    /// one byte arrives, and `VTIME` to 0 so it never times out. Signal
    /// generation, output processing and echo are left alone.
    #[must_use]
    pub const fn cbreak(self) -> Self {
        self.with_local_flags(self.local_flags().difference(LocalFlags::CANONICAL))
            .with_control_char(ControlChar::Min, 1)
            .with_control_char(ControlChar::Time, 0)
    }

    /// Set or clear `ECHO` and `ECHONL` together.
    #[must_use]
    pub const fn set_echo(self, on: bool) -> Self {
        let flags = if on {
            self.local_flags().union(ECHOS)
        } else {
            self.local_flags().difference(ECHOS)
        };
        self.with_local_flags(flags)
    }

    /// [`set_echo(true)`](Self::set_echo), as a [`Modifier`].
    #[must_use]
    pub const fn echo_on(self) -> Self {
        self.set_echo(true)
    }

    /// [`set_echo(false)`](Self::set_echo), as a [`Modifier`].
    #[must_use]
    pub const fn echo_off(self) -> Self {
        self.set_echo(false)
    }

    /// Apply `modifiers` in order, first to last.
    ///
    /// ```
    /// use termstate::{LocalFlags, State};
    ///
    /// let s = State::ZERO.with_local_flags(LocalFlags::CANONICAL | LocalFlags::ECHO);
    /// assert_eq!(s.apply(&[State::cbreak, State::echo_off]), s.cbreak().echo_off());
    /// assert_eq!(s.apply(&[]), s);
    /// ```
    #[must_use]
    pub fn apply(self, modifiers: &[Modifier]) -> Self {
        modifiers.iter().fold(self, |state, modify| modify(state))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
