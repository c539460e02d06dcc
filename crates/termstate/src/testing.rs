// SPDX-License-Identifier: MIT
//
// Fake transfer primitives for unit tests.
//
// `FakeTerminal` keeps one control block in memory and answers the two
// opcodes in `FAKE_CAPS` the way a real tty answers TCGETS/TCSETS. Either
// half can be made to fail with an errno. Every call is recorded so tests
// can assert on the exact opcode sequence.

use std::cell::{Cell, RefCell};

use crate::device::{Fd, Transfer};
use crate::platform::{Capabilities, OpCode};
use crate::state::State;

pub const FAKE_FETCH: OpCode = 0x5401;
pub const FAKE_STORE: OpCode = 0x5402;

pub const FAKE_CAPS: Capabilities = Capabilities {
    supported: true,
    fetch_op: FAKE_FETCH,
    store_op: FAKE_STORE,
};

pub const EINVAL: i32 = 22;
pub const ENOTTY: i32 = 25;

#[derive(Debug, Default)]
pub struct FakeTerminal {
    pub live: Cell<State>,
    pub calls: RefCell<Vec<(Fd, OpCode)>>,
    pub fail_fetch: Cell<Option<i32>>,
    pub fail_store: Cell<Option<i32>>,
}

impl FakeTerminal {
    pub fn with_state(state: State) -> Self {
        let fake = Self::default();
        fake.live.set(state);
        fake
    }

    pub fn ops(&self) -> Vec<OpCode> {
        self.calls.borrow().iter().map(|&(_, op)| op).collect()
    }
}

impl Transfer for FakeTerminal {
    fn transfer(&self, fd: Fd, op: OpCode, state: &mut State) -> Result<(), i32> {
        self.calls.borrow_mut().push((fd, op));
        match op {
            FAKE_FETCH => match self.fail_fetch.get() {
                Some(code) => Err(code),
                None => {
                    *state = self.live.get();
                    Ok(())
                }
            },
            FAKE_STORE => match self.fail_store.get() {
                Some(code) => Err(code),
                None => {
                    self.live.set(*state);
                    Ok(())
                }
            },
            _ => Err(EINVAL),
        }
    }
}

/// A primitive that must never run.
#[derive(Debug, Default)]
pub struct Forbidden;

impl Transfer for Forbidden {
    fn transfer(&self, fd: Fd, op: OpCode, _state: &mut State) -> Result<(), i32> {
        panic!("transfer primitive invoked on fd {fd} with op {op:#x}");
    }
}
