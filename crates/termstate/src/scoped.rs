// SPDX-License-Identifier: MIT
//
// Scoped acquisition — apply modifiers now, put the terminal back later.
//
// `acquire_scoped` fetches the current state, derives the desired one by
// running the modifiers over a copy, stores it, and returns a guard holding
// the original. Dropping the guard (normal return, `?`, unwinding panic)
// stores the original back.
//
//   Unknown ──fetch──▶ Fetched ──store──▶ Modified ──restore──▶ Restored
//
// If the first fetch fails there is nothing to restore: the modifiers are
// not applied, nothing is written, and the guard is inert. A failed store
// at acquisition is logged and otherwise ignored; the terminal may then
// hold a mix of old and new bits, and the guard will still try to restore.
//
// Guards on the native device also park their original state in a global
// backup that a panic hook restores before the previous hook prints. Under
// `panic = "abort"` no destructor runs, and without the hook the panic
// message would land on a terminal with echo off. The backup belongs to
// the outermost guard: nested guards leave it alone. The hook fires on a
// panic in any thread, so a caught panic elsewhere also resets the terminal.
//
// `process::exit` runs no destructors. Return from `main` instead.

use std::sync::{Mutex, Once, PoisonError};

use tracing::{debug, warn};

use crate::device::{Device, Fd, Ioctl, STDIN, Transfer};
use crate::error::{Error, StoreError};
use crate::modifier::Modifier;
use crate::state::State;

// ─── Guard ──────────────────────────────────────────────────────────────────

/// Restores a terminal's original state when dropped.
///
/// Returned by [`acquire_scoped`] and friends. Call [`restore`](Self::restore)
/// to restore early and see the result; the drop restores again, which is
/// redundant but harmless.
///
/// ```no_run
/// use termstate::State;
///
/// let _guard = termstate::acquire_scoped(&[State::cbreak, State::echo_off]);
/// // ... read keystrokes one byte at a time ...
/// // The terminal is restored when `_guard` goes out of scope.
/// ```
#[derive(Debug)]
#[must_use = "the terminal is restored as soon as the guard is dropped"]
pub struct RestoreGuard<'a, T: Transfer> {
    device: &'a Device<T>,
    fd: Fd,
    /// State fetched at acquisition. `None` if that fetch failed.
    initial: Option<State>,
    fetch_error: Option<Error>,
    /// Whether this guard put `initial` in the panic backup.
    owns_backup: bool,
}

impl<T: Transfer> RestoreGuard<'_, T> {
    /// The descriptor this guard restores.
    #[inline]
    #[must_use]
    pub const fn fd(&self) -> Fd {
        self.fd
    }

    /// The state captured at acquisition, if the fetch succeeded.
    #[inline]
    #[must_use]
    pub const fn initial(&self) -> Option<State> {
        self.initial
    }

    /// Why the acquisition fetch failed, if it did.
    ///
    /// When this is `Some`, the modifiers were not applied and
    /// [`restore`](Self::restore) does nothing.
    #[inline]
    #[must_use]
    pub const fn fetch_error(&self) -> Option<Error> {
        self.fetch_error
    }

    /// Store the original state back.
    ///
    /// Safe to call any number of times; each call re-stores the same state.
    /// A no-op if the acquisition fetch failed.
    ///
    /// # Errors
    ///
    /// Whatever [`Device::store`] reports.
    pub fn restore(&self) -> Result<(), StoreError> {
        match self.initial {
            Some(initial) => self.device.store(self.fd, initial).map(|_| ()),
            None => Ok(()),
        }
    }
}

impl<T: Transfer> Drop for RestoreGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(fd = self.fd, %err, "could not restore terminal state");
        }
        if self.owns_backup {
            clear_backup();
        }
    }
}

// ─── Acquisition ────────────────────────────────────────────────────────────

impl<T: Transfer> Device<T> {
    /// Apply `modifiers` to `fd` and return a guard that undoes them.
    ///
    /// Never fails: a fetch error makes the guard inert (see
    /// [`RestoreGuard::fetch_error`]), and a store error is logged.
    pub fn acquire_scoped(&self, fd: Fd, modifiers: &[Modifier]) -> RestoreGuard<'_, T> {
        let mut guard = RestoreGuard {
            device: self,
            fd,
            initial: None,
            fetch_error: None,
            owns_backup: false,
        };

        match self.fetch(fd) {
            Ok(initial) => {
                guard.initial = Some(initial);
                let desired = initial.apply(modifiers);
                if let Err(err) = self.store(fd, desired) {
                    warn!(fd, %err, "could not apply terminal modifiers");
                }
            }
            Err(err) => {
                debug!(fd, %err, "terminal state unavailable; nothing to restore");
                guard.fetch_error = Some(err);
            }
        }

        guard
    }
}

/// Apply `modifiers` to standard input until the returned guard drops.
///
/// ```no_run
/// use termstate::State;
///
/// fn run() -> std::io::Result<()> {
///     let guard = termstate::acquire_scoped(&[State::cbreak, State::echo_off]);
///     if let Some(err) = guard.fetch_error() {
///         eprintln!("line-buffered fallback: {err}");
///     }
///     // ... `?` anywhere in here still restores the terminal ...
///     Ok(())
/// }
/// ```
pub fn acquire_scoped(modifiers: &[Modifier]) -> RestoreGuard<'static, Ioctl> {
    acquire_scoped_fd(STDIN, modifiers)
}

/// Apply `modifiers` to `fd` until the returned guard drops.
///
/// Also registers the original state for restoration from the panic hook.
pub fn acquire_scoped_fd(fd: Fd, modifiers: &[Modifier]) -> RestoreGuard<'static, Ioctl> {
    let mut guard = Device::native().acquire_scoped(fd, modifiers);
    if let Some(initial) = guard.initial {
        guard.owns_backup = register_backup(fd, initial);
    }
    guard
}

// ─── Panic-safe restore ─────────────────────────────────────────────────────

/// Original state of the outermost live native guard, for the panic hook.
static BACKUP: Mutex<Option<(Fd, State)>> = Mutex::new(None);

/// Ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Park `state` in the backup unless another guard already has.
fn register_backup(fd: Fd, state: State) -> bool {
    install_panic_hook();
    let mut slot = BACKUP.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return false;
    }
    *slot = Some((fd, state));
    true
}

fn clear_backup() {
    *BACKUP.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Best-effort restore from the backup. Errors are ignored.
fn restore_from_backup() {
    let parked = *BACKUP.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some((fd, state)) = parked {
        let _ = Device::native().store(fd, state);
    }
}

/// Chain a hook that restores the backup ahead of the existing one.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_from_backup();
            original(info);
        }));
    });
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Capabilities;
    use crate::state::{ControlChar, LocalFlags};
    use crate::testing::{ENOTTY, FAKE_CAPS, FAKE_FETCH, FAKE_STORE, FakeTerminal, Forbidden};
    use pretty_assertions::assert_eq;

    fn cooked() -> State {
        State::ZERO
            .with_local_flags(LocalFlags::CANONICAL | LocalFlags::ECHO | LocalFlags::ECHO_NEWLINE)
            .with_control_char(ControlChar::Time, 3)
    }

    fn fake_device() -> Device<FakeTerminal> {
        Device::new(FAKE_CAPS, FakeTerminal::with_state(cooked()))
    }

    // ── Acquire / restore ───────────────────────────────────────────

    #[test]
    fn acquire_applies_modifiers() {
        let dev = fake_device();
        let guard = dev.acquire_scoped(0, &[State::cbreak, State::echo_off]);

        assert_eq!(guard.initial(), Some(cooked()));
        assert_eq!(guard.fetch_error(), None);
        assert_eq!(dev.primitive().live.get(), cooked().cbreak().echo_off());
        drop(guard);
    }

    #[test]
    fn drop_restores_initial_state() {
        let dev = fake_device();
        {
            let _guard = dev.acquire_scoped(0, &[State::cbreak, State::echo_off]);
            assert_ne!(dev.primitive().live.get(), cooked());
        }
        assert_eq!(dev.primitive().live.get(), cooked());
    }

    #[test]
    fn explicit_restore_can_repeat() {
        let dev = fake_device();
        let guard = dev.acquire_scoped(0, &[State::cbreak]);

        guard.restore().unwrap();
        assert_eq!(dev.primitive().live.get(), cooked());
        guard.restore().unwrap();
        assert_eq!(dev.primitive().live.get(), cooked());
    }

    #[test]
    fn acquire_and_restore_use_fetch_then_store() {
        let dev = fake_device();
        drop(dev.acquire_scoped(4, &[State::echo_off]));

        assert_eq!(
            *dev.primitive().calls.borrow(),
            vec![
                (4, FAKE_FETCH), // initial
                (4, FAKE_FETCH), // store's previous
                (4, FAKE_STORE), // desired
                (4, FAKE_FETCH), // restore's previous
                (4, FAKE_STORE), // initial
            ]
        );
    }

    #[test]
    fn modifiers_apply_in_order() {
        let dev = fake_device();
        let guard = dev.acquire_scoped(0, &[State::echo_off, State::echo_on]);
        assert!(dev.primitive().live.get().is_echo());
        drop(guard);
    }

    // ── Exit paths ──────────────────────────────────────────────────

    #[test]
    fn error_return_restores() {
        fn read_key() -> Result<u8, Error> {
            Err(Error::Device(ENOTTY))
        }

        fn fallible(dev: &Device<FakeTerminal>) -> Result<u8, Error> {
            let _guard = dev.acquire_scoped(0, &[State::cbreak]);
            let key = read_key()?;
            Ok(key)
        }

        let dev = fake_device();
        assert!(fallible(&dev).is_err());
        assert_eq!(dev.primitive().live.get(), cooked());
    }

    #[test]
    fn unwinding_panic_restores() {
        let dev = fake_device();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = dev.acquire_scoped(0, &[State::cbreak, State::echo_off]);
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(dev.primitive().live.get(), cooked());
    }

    // ── Failures ────────────────────────────────────────────────────

    #[test]
    fn fetch_failure_makes_guard_inert() {
        let dev = fake_device();
        dev.primitive().fail_fetch.set(Some(ENOTTY));

        let guard = dev.acquire_scoped(0, &[State::cbreak]);
        assert_eq!(guard.initial(), None);
        assert_eq!(guard.fetch_error(), Some(Error::Device(ENOTTY)));
        assert_eq!(guard.restore(), Ok(()));
        drop(guard);

        assert_eq!(dev.primitive().ops(), vec![FAKE_FETCH]);
        assert_eq!(dev.primitive().live.get(), cooked());
    }

    #[test]
    fn unsupported_platform_never_calls_primitive() {
        let dev = Device::new(Capabilities::UNSUPPORTED, Forbidden);
        let guard = dev.acquire_scoped(0, &[State::cbreak, State::echo_off]);
        assert_eq!(guard.fetch_error(), Some(Error::UnsupportedPlatform));
        assert_eq!(guard.restore(), Ok(()));
    }

    #[test]
    fn store_failure_at_acquire_is_swallowed() {
        let dev = fake_device();
        dev.primitive().fail_store.set(Some(5));

        let guard = dev.acquire_scoped(0, &[State::cbreak]);
        assert_eq!(guard.initial(), Some(cooked()));
        assert_eq!(guard.fetch_error(), None);

        let err = guard.restore().unwrap_err();
        assert_eq!(err.error(), Error::Device(5));
        assert_eq!(err.previous(), cooked());

        dev.primitive().fail_store.set(None);
        drop(guard);
        assert_eq!(dev.primitive().live.get(), cooked());
    }

    // ── Native device ───────────────────────────────────────────────

    #[cfg(unix)]
    #[test]
    fn native_guard_on_non_terminal_is_inert() {
        use std::os::fd::AsRawFd;

        let file = std::fs::File::open("/dev/null").unwrap();
        let guard = acquire_scoped_fd(file.as_raw_fd(), &[State::cbreak]);
        assert!(guard.initial().is_none());
        assert!(guard.fetch_error().is_some());
        assert!(!guard.owns_backup);
    }

    #[test]
    fn backup_belongs_to_first_registrant() {
        // fd -1 so a stray hook run can never touch a real terminal.
        assert!(register_backup(-1, cooked()));
        assert!(!register_backup(-1, State::ZERO));
        assert_eq!(
            *BACKUP.lock().unwrap_or_else(PoisonError::into_inner),
            Some((-1, cooked()))
        );
        clear_backup();
        assert_eq!(*BACKUP.lock().unwrap_or_else(PoisonError::into_inner), None);
    }
}
