//! shi - the interpreter binary.
//!
//! Startup is thin by design: build the interpreter, bind `*args*`,
//! evaluate the embedded prelude and call its `shi-main` entry point.
//! Script/REPL dispatch lives in the prelude itself; after `shi-main`
//! returns, the event loop runs until no watcher remains, so scripts
//! that registered timers or I/O watchers keep running.

use anyhow::Context;

use shi_core::HeapConfig;
use shi_eval::{eval_source, run_event_loop, Interp};

/// The language-level standard library and entry point, embedded at
/// build time and evaluated once before any user input.
const PRELUDE: &str = include_str!("prelude.shi");

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut ip =
        Interp::new(HeapConfig::from_env()).context("failed to initialize interpreter")?;

    let args: Vec<String> = std::env::args().collect();
    ip.set_args(&args).context("failed to bind *args*")?;

    if let Err(e) = eval_source(&mut ip, PRELUDE) {
        ip.unhandled_error(&e);
    }
    if let Err(e) = eval_source(&mut ip, "(shi-main)") {
        ip.unhandled_error(&e);
    }
    if let Err(e) = run_event_loop(&mut ip) {
        ip.unhandled_error(&e);
    }
    ip.shutdown(0);
}
