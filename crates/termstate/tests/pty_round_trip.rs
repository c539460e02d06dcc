// SPDX-License-Identifier: MIT
//! Fetch/store against a real terminal device.
//!
//! Each test opens a fresh pseudo-terminal pair and works on the slave side,
//! so nothing here depends on how the test runner's stdin is attached.
#![cfg(unix)]
#![allow(unsafe_code)]

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use termstate::{ControlChar, LocalFlags, State};

// ── Helpers ─────────────────────────────────────────────────────────────

/// `ptsname` returns a pointer into static storage; serialize callers.
static PTSNAME_LOCK: Mutex<()> = Mutex::new(());

/// A pseudo-terminal pair. The master is kept open so the slave stays a tty.
struct Pty {
    _master: OwnedFd,
    slave: File,
}

impl Pty {
    fn open() -> Self {
        let master = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        assert!(master >= 0, "posix_openpt: {}", std::io::Error::last_os_error());
        let master = unsafe { OwnedFd::from_raw_fd(master) };

        assert_eq!(unsafe { libc::grantpt(master.as_raw_fd()) }, 0, "grantpt");
        assert_eq!(unsafe { libc::unlockpt(master.as_raw_fd()) }, 0, "unlockpt");

        let path = {
            let _lock = PTSNAME_LOCK.lock().unwrap();
            let name = unsafe { libc::ptsname(master.as_raw_fd()) };
            assert!(!name.is_null(), "ptsname");
            unsafe { CStr::from_ptr(name) }.to_str().unwrap().to_owned()
        };

        let slave = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .unwrap();

        Self {
            _master: master,
            slave,
        }
    }

    fn fd(&self) -> i32 {
        self.slave.as_raw_fd()
    }
}

// ── Device I/O ──────────────────────────────────────────────────────────

#[test]
fn slave_is_a_terminal() {
    let pty = Pty::open();
    assert!(termstate::is_terminal(pty.fd()));
}

#[test]
fn fetched_state_round_trips() {
    let pty = Pty::open();
    let s = termstate::fetch_fd(pty.fd()).unwrap();

    let previous = termstate::store_fd(pty.fd(), s).unwrap();
    assert_eq!(previous, s);
    assert_eq!(termstate::fetch_fd(pty.fd()).unwrap(), s);
}

#[test]
fn store_returns_previous_and_applies_desired() {
    let pty = Pty::open();
    let initial = termstate::fetch_fd(pty.fd()).unwrap();
    let desired = initial.cbreak().echo_off();

    assert_eq!(termstate::store_fd(pty.fd(), desired).unwrap(), initial);
    assert_eq!(termstate::fetch_fd(pty.fd()).unwrap(), desired);
}

#[test]
fn consecutive_stores_chain_previous_states() {
    let pty = Pty::open();
    let a = termstate::fetch_fd(pty.fd()).unwrap();
    let b = a.cbreak();
    let c = b.echo_off();

    assert_eq!(termstate::store_fd(pty.fd(), b).unwrap(), a);
    assert_eq!(termstate::store_fd(pty.fd(), c).unwrap(), b);
    assert_eq!(termstate::store_fd(pty.fd(), a).unwrap(), c);
    assert_eq!(termstate::fetch_fd(pty.fd()).unwrap(), a);
}

// ── Scoped restore ──────────────────────────────────────────────────────

#[test]
fn scoped_guard_modifies_then_restores() {
    let pty = Pty::open();
    // Make sure there is something to turn off.
    let base = termstate::fetch_fd(pty.fd()).unwrap();
    let cooked = base.with_local_flags(base.local_flags() | LocalFlags::CANONICAL).echo_on();
    termstate::store_fd(pty.fd(), cooked).unwrap();
    let initial = termstate::fetch_fd(pty.fd()).unwrap();

    {
        let guard = termstate::acquire_scoped_fd(pty.fd(), &[State::cbreak, State::echo_off]);
        assert_eq!(guard.initial(), Some(initial));

        let live = termstate::fetch_fd(pty.fd()).unwrap();
        assert!(!live.is_canonical());
        assert!(!live.is_echo());
        assert!(!live.local_flags().contains(LocalFlags::ECHO_NEWLINE));
        assert_eq!(live.control_char(ControlChar::Min), 1);
        assert_eq!(live.control_char(ControlChar::Time), 0);
    }

    assert_eq!(termstate::fetch_fd(pty.fd()).unwrap(), initial);
}

#[test]
fn scoped_guard_restores_on_error_path() {
    fn fails_midway(fd: i32) -> std::io::Result<()> {
        let _guard = termstate::acquire_scoped_fd(fd, &[State::cbreak, State::echo_off]);
        Err(std::io::Error::other("caller bailed out"))
    }

    let pty = Pty::open();
    let initial = termstate::fetch_fd(pty.fd()).unwrap();
    assert!(fails_midway(pty.fd()).is_err());
    assert_eq!(termstate::fetch_fd(pty.fd()).unwrap(), initial);
}

#[test]
fn explicit_restore_then_drop() {
    let pty = Pty::open();
    let initial = termstate::fetch_fd(pty.fd()).unwrap();

    let guard = termstate::acquire_scoped_fd(pty.fd(), &[State::cbreak]);
    guard.restore().unwrap();
    assert_eq!(termstate::fetch_fd(pty.fd()).unwrap(), initial);
    drop(guard);
    assert_eq!(termstate::fetch_fd(pty.fd()).unwrap(), initial);
}
