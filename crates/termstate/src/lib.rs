// SPDX-License-Identifier: MIT
//
// termstate — read, modify and restore a terminal's line discipline.
//
// Interactive programs that want keystrokes as they are typed, rather than
// a line at a time, need to switch the terminal out of canonical mode and
// usually turn echo off. They also need to switch it back on every exit
// path, or the user's shell is left unusable.
//
// The crate is layered leaf-first:
//
//   platform  → which ioctl fetches/stores the control block, if any
//   state     → `State`, a plain-value copy of that control block
//   device    → fetch/store a `State` on a descriptor
//   modifier  → pure `State -> State` transforms (cbreak, echo)
//   scoped    → apply modifiers now, restore on drop
//
// Reading bytes, parsing keys and everything above that belong to the
// caller.
//
// ```no_run
// use termstate::State;
//
// let _guard = termstate::acquire_scoped(&[State::cbreak, State::echo_off]);
// // stdin now yields one byte per keystroke, without echo.
// ```

pub mod device;
pub mod error;
pub mod modifier;
pub mod platform;
pub mod scoped;
pub mod state;

#[cfg(test)]
mod testing;

pub use device::{Device, Fd, Ioctl, STDIN, Transfer, fetch, fetch_fd, is_terminal, store, store_fd};
pub use error::{Error, Result, StoreError};
pub use modifier::Modifier;
pub use platform::{Capabilities, OpCode, is_supported};
pub use scoped::{RestoreGuard, acquire_scoped, acquire_scoped_fd};
pub use state::{ControlChar, Flag, LocalFlags, RawState, State};
