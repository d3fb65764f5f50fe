//! Event loop and watcher primitives.
//!
//! Single-threaded and cooperative: one `poll(2)` call per iteration,
//! with the timeout derived from the earliest pending timer. Signals are
//! latched into an atomic mask by a minimal handler and drained by the
//! loop. Ready watchers fire in registration (FIFO) order; each dispatch
//! opens a fresh root scope, loads the saved environment and callback
//! into slots and applies the callback with no arguments.
//!
//! The loop exits when the registry is empty. `ev-stop` takes effect no
//! later than the next iteration: a watcher stopped by an earlier
//! callback in the same batch is skipped, not fired.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use rustc_hash::FxHashMap;

use shi_core::{raise, Result, Scope, Slot, Tag, ValRef, WatchSource};

use crate::eval::{apply_func, eval_list};
use crate::interp::Interp;
use crate::prim::expect_len;

/// Watcher type tags, bound as `EV_*` constants in the global environment
pub const EV_READ: i64 = 1;
pub const EV_WRITE: i64 = 2;
pub const EV_TIMER: i64 = 256;
pub const EV_SIGNAL: i64 = 1024;

/// Signals latched since the last drain, one bit per signal number
static PENDING_SIGNALS: AtomicU64 = AtomicU64::new(0);

extern "C" fn latch_signal(signo: libc::c_int) {
    // Async-signal-safe: a single atomic or.
    PENDING_SIGNALS.fetch_or(1u64 << (signo as u32 & 63), Ordering::SeqCst);
}

fn take_pending_signals() -> u64 {
    PENDING_SIGNALS.swap(0, Ordering::SeqCst)
}

fn install_signal_handler(signo: i32) -> std::io::Result<()> {
    let handler = latch_signal as extern "C" fn(libc::c_int);
    let r = unsafe { libc::signal(signo, handler as libc::sighandler_t) };
    if r == libc::SIG_ERR {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn restore_signal_handler(signo: i32) {
    unsafe {
        libc::signal(signo, libc::SIG_DFL);
    }
}

/// (ev-start type cb arg) -> watcher id
///
/// Types: `EV_READ`/`EV_WRITE` take a file descriptor, `EV_TIMER` a
/// period in milliseconds, `EV_SIGNAL` a signal number.
pub fn prim_ev_start(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    if ip.list_len(ip.load(args)).unwrap_or(0) < 2 {
        raise!("ev-start: not given at least 2 argument");
    }
    let mut s = Scope::new(ip);
    let values = eval_list(&mut s, env, args)?;
    let kind = s.car(values);
    if s.tag(kind) != Tag::Int {
        raise!("ev-start: type arg not an int");
    }
    let cb = s.car(s.cdr(values));
    if s.tag(cb) != Tag::Fn {
        raise!("ev-start: callback arg not a function");
    }
    let rest = s.cdr(s.cdr(values));
    if rest == ValRef::NIL {
        raise!("ev-start: watcher argument missing");
    }
    let arg = s.car(rest);

    let source = match s.int_value(kind) {
        EV_READ | EV_WRITE => {
            if s.tag(arg) != Tag::Int {
                raise!("ev-start: io watcher needs a file descriptor");
            }
            let fd = s.int_value(arg) as i32;
            if s.int_value(kind) == EV_READ {
                WatchSource::Read { fd }
            } else {
                WatchSource::Write { fd }
            }
        }
        EV_TIMER => {
            if s.tag(arg) != Tag::Int {
                raise!("ev-start: timer watcher needs a delay as int");
            }
            WatchSource::Timer {
                interval_ms: s.int_value(arg),
            }
        }
        EV_SIGNAL => {
            if s.tag(arg) != Tag::Int {
                raise!("ev-start: signal watcher needs a signal number as integer");
            }
            let signo = s.int_value(arg) as i32;
            if !(1..=63).contains(&signo) {
                raise!("ev-start: invalid signal number");
            }
            if install_signal_handler(signo).is_err() {
                raise!("ev-start: error installing signal handler");
            }
            WatchSource::Signal { signo }
        }
        _ => raise!("ev-start: unknown watcher type"),
    };

    let env_v = s.load(env);
    let id = {
        let heap = s.heap_mut();
        heap.watch_start(env_v, cb, source)
    };
    debug!("ev: started watcher {} ({:?})", id, source);
    s.make_int(id)
}

/// (ev-stop id) -> t if a watcher was stopped, nil otherwise
pub fn prim_ev_stop(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "ev-stop: not given exactly 1 argument")?;
    let values = eval_list(ip, env, args)?;
    let id = ip.car(values);
    if ip.tag(id) != Tag::Int {
        raise!("ev-stop: 1st arg not int");
    }
    let id = ip.int_value(id);
    match ip.watch_stop(id) {
        None => Ok(ValRef::NIL),
        Some(source) => {
            if let WatchSource::Signal { signo } = source {
                // Restore the default disposition once no other watcher
                // wants this signal.
                let still_watched = ip
                    .watchers()
                    .iter()
                    .any(|w| w.source == WatchSource::Signal { signo });
                if !still_watched {
                    restore_signal_handler(signo);
                }
            }
            debug!("ev: stopped watcher {}", id);
            Ok(ValRef::TRUE)
        }
    }
}

/// Run the event loop until no watcher remains. Errors escaping a
/// callback abort the loop and surface to the caller.
pub fn run(ip: &mut Interp) -> Result<()> {
    let mut timer_due: FxHashMap<i64, Instant> = FxHashMap::default();

    loop {
        if ip.watcher_count() == 0 {
            return Ok(());
        }

        let now = Instant::now();
        timer_due.retain(|id, _| ip.watchers().iter().any(|w| w.id == *id));
        for w in ip.watchers() {
            if let WatchSource::Timer { interval_ms } = w.source {
                timer_due
                    .entry(w.id)
                    .or_insert_with(|| now + Duration::from_millis(interval_ms.max(0) as u64));
            }
        }

        let mut pending = take_pending_signals();

        // Timeout: zero if a signal is already pending, else until the
        // earliest timer, else block.
        let mut timeout_ms: i32 = -1;
        if pending != 0 {
            timeout_ms = 0;
        } else if let Some(earliest) = timer_due.values().min() {
            let wait = earliest.saturating_duration_since(now);
            // Round up so a not-quite-due timer sleeps instead of spinning.
            let ms = wait.as_millis().min(i32::MAX as u128 - 1) as i32;
            timeout_ms = if wait.is_zero() { 0 } else { ms + 1 };
        }

        let mut fds: Vec<libc::pollfd> = Vec::new();
        for w in ip.watchers() {
            match w.source {
                WatchSource::Read { fd } => fds.push(libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                }),
                WatchSource::Write { fd } => fds.push(libc::pollfd {
                    fd,
                    events: libc::POLLOUT,
                    revents: 0,
                }),
                _ => {}
            }
        }

        let n = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if n < 0 {
            let e = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            if e != libc::EINTR {
                raise!("ev: poll failed");
            }
        }
        pending |= take_pending_signals();

        let mut ready: FxHashMap<i32, libc::c_short> = FxHashMap::default();
        if n > 0 {
            for pfd in &fds {
                if pfd.revents != 0 {
                    ready.insert(pfd.fd, pfd.revents);
                }
            }
        }

        // Collect this batch in registry order, then dispatch. Re-arm
        // fired timers before any callback runs so a callback stopping a
        // later watcher does not disturb the schedule.
        let now = Instant::now();
        let mut fired: Vec<i64> = Vec::new();
        for w in ip.watchers() {
            let hit = match w.source {
                WatchSource::Read { fd } => ready
                    .get(&fd)
                    .map(|r| r & (libc::POLLIN | libc::POLLERR | libc::POLLHUP) != 0)
                    .unwrap_or(false),
                WatchSource::Write { fd } => ready
                    .get(&fd)
                    .map(|r| r & (libc::POLLOUT | libc::POLLERR | libc::POLLHUP) != 0)
                    .unwrap_or(false),
                WatchSource::Timer { .. } => {
                    timer_due.get(&w.id).map(|d| *d <= now).unwrap_or(false)
                }
                WatchSource::Signal { signo } => pending & (1u64 << (signo as u32 & 63)) != 0,
            };
            if hit {
                fired.push(w.id);
            }
        }
        for w in ip.watchers() {
            if let WatchSource::Timer { interval_ms } = w.source {
                if fired.contains(&w.id) {
                    timer_due.insert(w.id, now + Duration::from_millis(interval_ms.max(0) as u64));
                }
            }
        }

        for id in fired {
            let (env_v, cb_v) = match ip.watchers().iter().find(|w| w.id == id) {
                Some(w) => (w.env, w.callback),
                // Stopped by an earlier callback in this batch.
                None => continue,
            };
            let mut s = Scope::new(ip);
            let env = s.slot(env_v);
            let cb = s.slot(cb_v);
            let no_args = s.slot(ValRef::NIL);
            apply_func(&mut s, env, cb, no_args)?;
        }
    }
}
