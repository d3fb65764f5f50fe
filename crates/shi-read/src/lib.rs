//! shi-read - S-Expression Reader
//!
//! Turns source text into Shi values on the heap: atoms, proper and dotted
//! lists, and the closed set of reader-macro desugarings (`'`, `` ` ``,
//! `,`, `,@`, `@`, `{...}`, `obj:key`). Reader errors are ordinary runtime
//! errors and can be trapped like any other.

pub mod escape;
pub mod reader;

pub use escape::unescape;
pub use reader::{read_source, Reader, STRING_MAX_LEN, SYMBOL_MAX_LEN};
