//! Watcher Module - Long-Lived Callback Handles
//!
//! A watcher record keeps a user callback and the environment it was
//! registered in alive across collections; the registry is a GC root and
//! the collector rewrites both references on every cycle. The event loop
//! owns the dispatch side; the record here is only the data it needs.

use crate::value::ValRef;

/// What a watcher is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSource {
    /// File descriptor readable
    Read { fd: i32 },
    /// File descriptor writable
    Write { fd: i32 },
    /// Periodic timer, milliseconds between fires
    Timer { interval_ms: i64 },
    /// POSIX signal delivery
    Signal { signo: i32 },
}

/// One registered watcher
#[derive(Debug)]
pub struct Watcher {
    /// Monotonic id handed back to user code for `ev-stop`
    pub id: i64,
    /// Environment the callback was registered in
    pub env: ValRef,
    /// Callback function applied with no arguments on every fire
    pub callback: ValRef,
    pub source: WatchSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeapConfig;
    use crate::heap::Heap;

    #[test]
    fn test_ids_are_monotonic() {
        let mut heap = Heap::new(HeapConfig::default());
        let a = heap.watch_start(ValRef::NIL, ValRef::NIL, WatchSource::Timer { interval_ms: 1 });
        let b = heap.watch_start(ValRef::NIL, ValRef::NIL, WatchSource::Signal { signo: 2 });
        assert!(b > a);
        assert_eq!(
            heap.watch_stop(a),
            Some(WatchSource::Timer { interval_ms: 1 })
        );
        assert_eq!(heap.watch_stop(a), None);
        assert_eq!(heap.watcher_count(), 1);
        assert_eq!(heap.watchers()[0].id, b);
    }
}
