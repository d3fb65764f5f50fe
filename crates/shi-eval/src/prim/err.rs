//! Error primitives: raising and trapping.
//!
//! `trap-error` is the only place an in-flight error stops propagating.
//! The trap applies its first argument with no arguments; if anything
//! below raises, the handler gets the message string. Scoped root frames
//! unwind with the error, so by the time the handler runs the root vector
//! is back at the trap's own height. Fatal errors (out of memory) pass
//! through every trap.

use shi_core::{raise, Result, Scope, ShiError, Slot, Tag, ValRef};

use crate::eval::{apply, eval_list};
use crate::interp::{Interp, MAX_ERROR_DEPTH};
use crate::prim::expect_len;

/// (error message)
pub fn prim_error(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "error: takes exactly 1 argument")?;
    let values = eval_list(ip, env, args)?;
    let v = ip.car(values);
    if ip.tag(v) != Tag::Str {
        raise!("error: 1st arg is not a string");
    }
    Err(ShiError::Message(ip.text(v).to_string()))
}

/// (trap-error fn error-fn)
pub fn prim_trap_error(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "trap-error: takes exactly 2 arguments")?;
    let mut s = Scope::new(ip);
    let values = eval_list(&mut s, env, args)?;
    let f = s.car(values);
    let error_f = s.car(s.cdr(values));
    if s.tag(f) != Tag::Fn || s.tag(error_f) != Tag::Fn {
        raise!("trap-error: both args must be functions");
    }
    let f = s.slot(f);
    let error_f = s.slot(error_f);

    if s.trap_depth >= MAX_ERROR_DEPTH {
        eprintln!("Max error depth reached. Check for nested `trap-error` calls.");
        s.shutdown(1);
    }

    s.trap_depth += 1;
    let no_args = s.slot(ValRef::NIL);
    let result = apply(&mut s, env, f, no_args, false);
    s.trap_depth -= 1;

    match result {
        Ok(v) => Ok(v),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            // Hand the message to the handler; if the handler raises, the
            // next outer trap sees the new message.
            let msg = s.make_str(&e.to_string())?;
            let msg = s.slot(msg);
            let nil = s.slot(ValRef::NIL);
            let arglist = s.cons(msg, nil)?;
            let arglist = s.slot(arglist);
            apply(&mut s, env, error_f, arglist, false)
        }
    }
}
