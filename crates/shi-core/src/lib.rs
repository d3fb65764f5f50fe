//! shi-core - Value Model, Heap and Copying Collector
//!
//! The runtime foundation of the Shi interpreter:
//!
//! - **Values**: a tagged cell type covering integers, strings, interned
//!   symbols, cons pairs, prototype-chained hash-map objects, primitives
//!   and closures, plus the static singletons.
//! - **Heap**: semispace bump allocation with a fixed byte budget and
//!   Cheney's copying collector. Every live cell moves on every cycle, so
//!   host code holds `Slot` handles into a collector-managed root vector
//!   instead of raw references; `Scope` scopes those handles with
//!   guaranteed release.
//! - **Symbols**: a heap-resident interning list; symbol equality is
//!   handle identity.
//! - **Objects**: bucketed alist maps with prototype chains; lexical
//!   environments are ordinary objects.
//! - **Watchers**: the registry of event-loop callback handles the
//!   collector treats as a root.
//!
//! The evaluator, reader and event loop live in sibling crates; this crate
//! knows nothing about syntax or dispatch.

pub mod config;
pub mod error;
pub mod heap;
pub mod obj;
pub mod print;
pub mod value;
pub mod watch;

pub use config::{HeapConfig, DEFAULT_MEMORY_SIZE};
pub use error::{Result, ShiError};
pub use heap::{Heap, HeapHost, Scope, Slot};
pub use print::{escape_into, pr_str};
pub use value::{Closure, PrimId, Tag, ValRef, Value, OBJ_BUCKETS};
pub use watch::{WatchSource, Watcher};
