// SPDX-License-Identifier: MIT
//
// termstate inspect — show stdin's terminal state and what cbreak would change.
//
// Read-only: the state is fetched and modified as a value, never stored.
//
// Usage:
//   cargo run -p termstate --example inspect

use std::process::ExitCode;

use termstate::{ControlChar, LocalFlags, State};

fn main() -> ExitCode {
    if !termstate::is_supported() {
        eprintln!("inspect: terminal control is not supported on this platform");
        return ExitCode::FAILURE;
    }

    let current = match termstate::fetch() {
        Ok(state) => state,
        Err(err) => {
            eprintln!("inspect: stdin: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("current: {current:?}");
    println!("local flags:");
    for (name, flag) in LocalFlags::all().iter_names() {
        let mark = if current.local_flags().contains(flag) { 'x' } else { ' ' };
        println!("  [{mark}] {name}");
    }
    println!("control characters:");
    for slot in ControlChar::ALL {
        println!("  {:<6} {:3}", format!("{slot:?}"), current.control_char(slot));
    }

    let raw = current.apply(&[State::cbreak, State::echo_off]);
    if raw == current {
        println!("cbreak + echo off: already in effect");
    } else {
        println!("cbreak + echo off: {raw:?}");
    }

    ExitCode::SUCCESS
}
