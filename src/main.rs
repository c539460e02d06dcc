// SPDX-License-Identifier: MIT
//
// keyecho — print every byte a terminal sends, as it is typed.
//
// A thin demonstration of termstate: the terminal is put in cbreak mode
// with echo off for the duration of `run`, then restored by the guard on
// the way out, whether that is a quit key, EOF or an I/O error.
//
//   args + KEYECHO_LOG → Config → logging → acquire guard → read loop
//
// If the platform has no terminal-control ioctl, or the descriptor is not
// a terminal, the same loop runs without the guard and the kernel delivers
// input a line at a time.

use std::env;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use termstate::{Fd, Modifier, STDIN, State};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Version string from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "KEYECHO_LOG";

/// Filter used when `KEYECHO_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";

// ─── Configuration ──────────────────────────────────────────────────────────

/// Runtime configuration, from the command line and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    /// Terminal descriptor to configure and read.
    fd: Fd,
    /// Keep echo on (cbreak only).
    echo: bool,
    /// Byte that ends the session after it is printed.
    quit: u8,
    /// Write logs here instead of stderr.
    log_file: Option<PathBuf>,
    /// `tracing` filter directive.
    log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fd: STDIN,
            echo: false,
            quit: b'q',
            log_file: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Run(Config),
    Help,
    Version,
}

/// Parse command-line arguments (without the program name).
///
/// `log_filter` is the value of `KEYECHO_LOG`, if set.
fn parse_args<I>(args: I, log_filter: Option<String>) -> Result<Invocation, String>
where
    I: IntoIterator<Item = String>,
{
    let mut config = Config::default();
    if let Some(filter) = log_filter.filter(|f| !f.trim().is_empty()) {
        config.log_filter = filter;
    }

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "-V" | "--version" => return Ok(Invocation::Version),
            "-e" | "--echo" => config.echo = true,
            "--fd" => {
                let value = args.next().ok_or("--fd requires a descriptor number")?;
                config.fd = value
                    .parse()
                    .ok()
                    .filter(|fd: &Fd| *fd >= 0)
                    .ok_or_else(|| format!("invalid descriptor: {value}"))?;
            }
            "-q" | "--quit" => {
                let value = args.next().ok_or("--quit requires a key")?;
                config.quit = parse_quit(&value)?;
            }
            "--log-file" => {
                let value = args.next().ok_or("--log-file requires a path")?;
                config.log_file = Some(PathBuf::from(value));
            }
            other => return Err(format!("unknown option: {other}")),
        }
    }

    Ok(Invocation::Run(config))
}

/// A quit key is a single ASCII character, `^X` for a control key, or a
/// decimal byte value.
fn parse_quit(value: &str) -> Result<u8, String> {
    let bytes = value.as_bytes();
    match bytes {
        [b] if b.is_ascii() => Ok(*b),
        [b'^', b] if b.is_ascii_alphabetic() || b"@[\\]^_?".contains(b) => {
            Ok(if *b == b'?' { 0x7f } else { b.to_ascii_uppercase() & 0x1f })
        }
        _ => value
            .parse::<u8>()
            .map_err(|_| format!("invalid quit key: {value}")),
    }
}

fn print_version() {
    println!("keyecho {VERSION}");
}

fn print_help() {
    println!("keyecho {VERSION} - print raw keystrokes from a cbreak-mode terminal");
    println!();
    println!("Usage: keyecho [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --fd <N>             Terminal descriptor to use (default: 0)");
    println!("  -e, --echo           Leave echo on");
    println!("  -q, --quit <KEY>     Quit key: a character, ^X, or a byte value (default: q)");
    println!("  --log-file <PATH>    Write logs to PATH instead of stderr");
    println!("  -h, --help           Show this help");
    println!("  -V, --version        Show version");
    println!();
    println!("Environment:");
    println!("  {LOG_ENV:<20} Log filter, e.g. debug or termstate=debug (default: {DEFAULT_LOG_FILTER})");
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Install the global `tracing` subscriber.
fn init_logging(config: &Config) -> io::Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // A subscriber may already be installed (tests); keep that one.
    if let Some(path) = &config.log_file {
        let file = File::create(path)?;
        let _ = builder.with_writer(Mutex::new(file)).with_ansi(false).try_init();
    } else {
        let _ = builder.with_writer(io::stderr).try_init();
    }
    Ok(())
}

// ─── Echo loop ──────────────────────────────────────────────────────────────

/// One output line for a byte: decimal, hex, and a readable glyph.
fn describe_byte(b: u8) -> String {
    let glyph = match b {
        0x20 => "SPACE".to_string(),
        0x21..=0x7e => char::from(b).to_string(),
        0x00..=0x1f => format!("^{}", char::from(b | 0x40)),
        0x7f => "^?".to_string(),
        _ => "·".to_string(),
    };
    format!("{b:3}  0x{b:02x}  {glyph}")
}

/// Copy `input` to `output` one described byte per line, until `quit` or EOF.
///
/// Returns the number of bytes read.
fn echo_bytes<R: Read, W: Write>(mut input: R, mut output: W, quit: u8) -> io::Result<usize> {
    let mut buf = [0u8; 1];
    let mut count = 0;

    loop {
        match input.read(&mut buf) {
            Ok(0) => {
                debug!(count, "end of input");
                break;
            }
            Ok(_) => {
                count += 1;
                writeln!(output, "{}", describe_byte(buf[0]))?;
                output.flush()?;
                if buf[0] == quit {
                    debug!(count, "quit key");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(count)
}

/// A readable handle on `fd` that leaves the descriptor itself open.
#[cfg(unix)]
#[allow(unsafe_code)]
fn open_input(fd: Fd) -> io::Result<File> {
    use std::os::fd::BorrowedFd;

    // SAFETY: `fd` only has to stay open for the duration of the dup.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    Ok(File::from(borrowed.try_clone_to_owned()?))
}

#[cfg(not(unix))]
fn open_input(fd: Fd) -> io::Result<io::Stdin> {
    if fd == STDIN {
        Ok(io::stdin())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "only standard input is available on this platform",
        ))
    }
}

fn run(config: &Config) -> io::Result<()> {
    let input = open_input(config.fd)?;
    let stdout = io::stdout();

    if !termstate::is_supported() {
        eprintln!("keyecho: raw input is not supported on this platform; reading whole lines");
        echo_bytes(input, stdout.lock(), config.quit)?;
        return Ok(());
    }

    let modifiers: &[Modifier] = if config.echo {
        &[State::cbreak]
    } else {
        &[State::cbreak, State::echo_off]
    };
    let guard = termstate::acquire_scoped_fd(config.fd, modifiers);

    if let Some(err) = guard.fetch_error() {
        eprintln!(
            "keyecho: fd {} is not a configurable terminal ({err}); reading whole lines",
            config.fd
        );
    } else {
        info!(fd = config.fd, echo = config.echo, "cbreak mode on");
        eprintln!(
            "keyecho: press keys; '{}' quits",
            char::from(config.quit).escape_default()
        );
    }

    let count = echo_bytes(input, stdout.lock(), config.quit)?;
    info!(count, "session finished");

    // Restore explicitly so a failure is reported; the drop would swallow it.
    guard.restore()?;
    Ok(())
}

fn main() -> ExitCode {
    let config = match parse_args(env::args().skip(1), env::var(LOG_ENV).ok()) {
        Ok(Invocation::Run(config)) => config,
        Ok(Invocation::Help) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Version) => {
            print_version();
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("keyecho: {msg}");
            eprintln!("Try 'keyecho --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("keyecho: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("keyecho: {e}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
