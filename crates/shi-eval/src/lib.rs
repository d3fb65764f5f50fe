//! shi-eval - Evaluator, Primitives and Event Loop
//!
//! The interpreter proper: `eval` over the tagged values of `shi-core`,
//! macro expansion, function application with dotted and variadic
//! parameter lists, the full primitive set (language, lists, strings,
//! objects, arithmetic, errors, OS, network, watchers, terminal, line
//! editing), the nestable error trap and the `poll(2)`-driven event loop
//! that keeps watcher callbacks alive across collections.

pub mod ev;
pub mod eval;
pub mod interp;
pub mod prim;
pub mod term;

pub use ev::run as run_event_loop;
pub use eval::{apply, eval, eval_list, eval_source, macroexpand, progn};
pub use interp::{Interp, MAX_ERROR_DEPTH, VERSION};
