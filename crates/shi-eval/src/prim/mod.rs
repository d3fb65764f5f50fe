//! Primitive Registry
//!
//! Every primitive is a plain function pointer taking the interpreter,
//! the environment slot and the *raw* (unevaluated) argument list; each
//! primitive decides for itself which arguments to evaluate. The heap
//! stores only a `PrimId` index into the table built here.

use shi_core::{raise, Result, Scope, Slot, ValRef};

use crate::ev;
use crate::interp::{Interp, VERSION};
use crate::term;

pub mod err;
pub mod lang;
pub mod line;
pub mod list;
pub mod math;
pub mod net;
pub mod object;
pub mod os;
pub mod string;

/// A primitive: `(interp, env, raw-args) -> value`
pub type PrimFn = fn(&mut Interp, Slot, Slot) -> Result<ValRef>;

/// Arity check against the raw argument list
pub(crate) fn expect_len(ip: &Interp, args: Slot, n: usize, msg: &str) -> Result<()> {
    if ip.list_len(ip.load(args)) != Some(n) {
        raise!("{}", msg);
    }
    Ok(())
}

/// Bind the startup constants in the global environment
pub(crate) fn define_constants(ip: &mut Interp) -> Result<()> {
    let genv = ip.global_env();
    let mut s = Scope::new(ip);
    let sym = s.slot(ValRef::NIL);
    let val = s.slot(ValRef::NIL);

    // The value goes into its slot before the name is interned: interning
    // can collect, and the slot is what keeps the value reachable.
    let bind = |s: &mut Scope<'_, Interp>, name: &str, v: ValRef| -> Result<()> {
        s.store(val, v);
        let k = s.intern(name)?;
        s.store(sym, k);
        s.obj_set(genv, sym, val)
    };

    bind(&mut s, "t", ValRef::TRUE)?;
    bind(&mut s, "nil", ValRef::NIL)?;

    let version = s.make_str(VERSION)?;
    bind(&mut s, "*system-version*", version)?;

    let bind_int = |s: &mut Scope<'_, Interp>, name: &str, n: i64| -> Result<()> {
        let v = s.make_int(n)?;
        bind(s, name, v)
    };

    // Net
    bind_int(&mut s, "PF_INET", libc::PF_INET as i64)?;
    bind_int(&mut s, "SOCK_STREAM", libc::SOCK_STREAM as i64)?;

    // Ev
    bind_int(&mut s, "EV_READ", ev::EV_READ)?;
    bind_int(&mut s, "EV_WRITE", ev::EV_WRITE)?;
    bind_int(&mut s, "EV_TIMER", ev::EV_TIMER)?;
    bind_int(&mut s, "EV_SIGNAL", ev::EV_SIGNAL)?;

    Ok(())
}

/// Install the whole primitive set in the global environment
pub(crate) fn define_primitives(ip: &mut Interp) -> Result<()> {
    // Lists
    ip.add_primitive("cons", list::prim_cons)?;
    ip.add_primitive("car", list::prim_car)?;
    ip.add_primitive("cdr", list::prim_cdr)?;
    ip.add_primitive("set-car!", list::prim_set_car)?;

    // Strings
    ip.add_primitive("str", string::prim_str)?;
    ip.add_primitive("str-len", string::prim_str_len)?;

    // Language
    ip.add_primitive("def", lang::prim_def)?;
    ip.add_primitive("def-global", lang::prim_def_global)?;
    ip.add_primitive("set", lang::prim_set)?;
    ip.add_primitive("fn", lang::prim_fn)?;
    ip.add_primitive("if", lang::prim_if)?;
    ip.add_primitive("do", lang::prim_do)?;
    ip.add_primitive("while", lang::prim_while)?;
    ip.add_primitive("eq?", lang::prim_eq)?;
    ip.add_primitive("apply", lang::prim_apply)?;
    ip.add_primitive("type", lang::prim_type)?;
    ip.add_primitive("eval", lang::prim_eval)?;
    ip.add_primitive("read-sexp", lang::prim_read_sexp)?;
    ip.add_primitive("sym", lang::prim_sym)?;

    // Macro
    ip.add_primitive("quote", lang::prim_quote)?;
    ip.add_primitive("gensym", lang::prim_gensym)?;
    ip.add_primitive("macro", lang::prim_macro)?;
    ip.add_primitive("macro-expand", lang::prim_macro_expand)?;

    // Object
    ip.add_primitive("obj", object::prim_obj)?;
    ip.add_primitive("obj-get", object::prim_obj_get)?;
    ip.add_primitive("obj-set", object::prim_obj_set)?;
    ip.add_primitive("obj-del", object::prim_obj_del)?;
    ip.add_primitive("obj-proto", object::prim_obj_proto)?;
    ip.add_primitive("obj-proto-set!", object::prim_obj_proto_set)?;
    ip.add_primitive("obj->alist", object::prim_obj_to_alist)?;

    // Math
    ip.add_primitive("+", math::prim_plus)?;
    ip.add_primitive("-", math::prim_minus)?;
    ip.add_primitive("<", math::prim_lt)?;
    ip.add_primitive("=", math::prim_num_eq)?;
    ip.add_primitive("rand", math::prim_rand)?;

    // Error
    ip.add_primitive("error", err::prim_error)?;
    ip.add_primitive("trap-error", err::prim_trap_error)?;

    // OS
    ip.add_primitive("pr-str", lang::prim_pr_str)?;
    ip.add_primitive("write", os::prim_write)?;
    ip.add_primitive("read", os::prim_read)?;
    ip.add_primitive("seconds", os::prim_seconds)?;
    ip.add_primitive("sleep", os::prim_sleep)?;
    ip.add_primitive("exit", os::prim_exit)?;
    ip.add_primitive("open", os::prim_open)?;
    ip.add_primitive("close", os::prim_close)?;
    ip.add_primitive("isatty", os::prim_isatty)?;
    ip.add_primitive("getenv", os::prim_getenv)?;

    // Net
    ip.add_primitive("socket", net::prim_socket)?;
    ip.add_primitive("bind-inet", net::prim_bind_inet)?;
    ip.add_primitive("listen", net::prim_listen)?;
    ip.add_primitive("accept", net::prim_accept)?;

    // Ev
    ip.add_primitive("ev-start", ev::prim_ev_start)?;
    ip.add_primitive("ev-stop", ev::prim_ev_stop)?;

    // Term
    ip.add_primitive("term-raw", term::prim_term_raw)?;

    // Line editing
    ip.add_primitive("readline", line::prim_readline)?;
    ip.add_primitive("history-load", line::prim_history_load)?;
    ip.add_primitive("history-add", line::prim_history_add)?;
    ip.add_primitive("history-save", line::prim_history_save)?;

    Ok(())
}
