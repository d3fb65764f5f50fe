//! The evaluator.
//!
//! `eval` dispatches on the value tag: most values are self-evaluating,
//! symbols are looked up through the environment's prototype chain, and
//! cells are application forms. A cell is macro-expanded first; if the
//! expansion changed it, the result is evaluated in its place. Otherwise
//! the head is evaluated and must be a primitive (which receives the raw
//! argument list and decides what to evaluate) or a function (whose
//! arguments are evaluated left to right).
//!
//! Everything here works through rooted slots: any handle that has to
//! survive a nested `eval` lives in the current scope, never in a bare
//! local.

use shi_core::{raise, Result, Scope, ShiError, Slot, Tag, ValRef};

use crate::interp::Interp;

/// Evaluate one expression in an environment
pub fn eval(ip: &mut Interp, env: Slot, expr: Slot) -> Result<ValRef> {
    let e = ip.load(expr);
    match ip.tag(e) {
        Tag::Int
        | Tag::Str
        | Tag::Obj
        | Tag::Prim
        | Tag::Fn
        | Tag::Mac
        | Tag::True
        | Tag::Nil => Ok(e),
        Tag::Sym => {
            if ip.text(e) == "*env*" {
                return Ok(ip.load(env));
            }
            let env_v = ip.load(env);
            match ip.obj_find(env_v, e)? {
                Some(pair) => Ok(ip.cdr(pair)),
                None => Err(ShiError::UndefinedSymbol(ip.text(e).to_string())),
            }
        }
        Tag::Cell => {
            let mut s = Scope::new(ip);
            let expanded = macroexpand(&mut s, env, expr)?;
            if expanded != s.load(expr) {
                let expanded = s.slot(expanded);
                return eval(&mut s, env, expanded);
            }
            let form = s.load(expr);
            let head = s.car(form);
            let head = s.slot(head);
            let f = eval(&mut s, env, head)?;
            let f = s.slot(f);
            let form = s.load(expr);
            let args = s.cdr(form);
            let args = s.slot(args);
            match s.tag(s.load(f)) {
                Tag::Prim | Tag::Fn => apply(&mut s, env, f, args, true),
                _ => raise!("The head of a list must be a function"),
            }
        }
        tag => raise!("Bug: eval: unknown tag type: {:?}", tag),
    }
}

/// Evaluate every element of a list, returning the results as a new list
pub fn eval_list(ip: &mut Interp, env: Slot, list: Slot) -> Result<ValRef> {
    let mut s = Scope::new(ip);
    let head = s.slot(ValRef::NIL);
    let expr = s.slot(ValRef::NIL);
    let result = s.slot(ValRef::NIL);
    let start = s.load(list);
    let cursor = s.slot(start);
    while s.load(cursor) != ValRef::NIL {
        let cell = s.load(cursor);
        let e = s.car(cell);
        s.store(expr, e);
        let r = eval(&mut s, env, expr)?;
        s.store(result, r);
        let new_head = s.cons(result, head)?;
        s.store(head, new_head);
        let cell = s.load(cursor);
        let next = s.cdr(cell);
        s.store(cursor, next);
    }
    let h = s.load(head);
    Ok(s.heap_mut().reverse(h))
}

/// Evaluate a list of expressions in sequence, returning the last value
pub fn progn(ip: &mut Interp, env: Slot, body: Slot) -> Result<ValRef> {
    let mut s = Scope::new(ip);
    let expr = s.slot(ValRef::NIL);
    let start = s.load(body);
    let cursor = s.slot(start);
    let mut result = ValRef::NIL;
    while s.load(cursor) != ValRef::NIL {
        let cell = s.load(cursor);
        let e = s.car(cell);
        s.store(expr, e);
        result = eval(&mut s, env, expr)?;
        let cell = s.load(cursor);
        let next = s.cdr(cell);
        s.store(cursor, next);
    }
    Ok(result)
}

/// Build the activation environment for a closure call: a fresh frame
/// whose prototype is the captured environment. A bare symbol binds the
/// whole argument list; a dotted tail symbol binds the rest; a length
/// mismatch in either direction is an error.
fn push_env(ip: &mut Interp, env: Slot, vars: Slot, vals: Slot) -> Result<ValRef> {
    let mut s = Scope::new(ip);
    let map = s.slot(ValRef::NIL);
    if s.tag(s.load(vars)) == Tag::Sym {
        // (fn xs body ...)
        let m = s.acons(vars, vals, map)?;
        s.store(map, m);
    } else {
        // (fn (x y) body ...), possibly dotted
        let sym = s.slot(ValRef::NIL);
        let val = s.slot(ValRef::NIL);
        let v0 = s.load(vars);
        let vars_c = s.slot(v0);
        let v1 = s.load(vals);
        let vals_c = s.slot(v1);
        while s.tag(s.load(vars_c)) == Tag::Cell {
            if s.tag(s.load(vals_c)) != Tag::Cell {
                raise!("Cannot apply function: number of argument does not match");
            }
            let vr = s.load(vars_c);
            let k = s.car(vr);
            s.store(sym, k);
            let vl = s.load(vals_c);
            let v = s.car(vl);
            s.store(val, v);
            let m = s.acons(sym, val, map)?;
            s.store(map, m);
            let vr = s.load(vars_c);
            let next = s.cdr(vr);
            s.store(vars_c, next);
            let vl = s.load(vals_c);
            let next = s.cdr(vl);
            s.store(vals_c, next);
        }
        if s.load(vars_c) != ValRef::NIL {
            let m = s.acons(vars_c, vals_c, map)?;
            s.store(map, m);
        } else if s.load(vals_c) != ValRef::NIL {
            raise!("Cannot apply function: number of argument does not match");
        }
    }
    s.make_obj_alist(env, map)
}

/// Apply a closure to an already-evaluated argument list
pub fn apply_func(ip: &mut Interp, _env: Slot, f: Slot, args: Slot) -> Result<ValRef> {
    let mut s = Scope::new(ip);
    let c = s.closure(s.load(f));
    let params = s.slot(c.params);
    let captured = s.slot(c.env);
    let body = s.slot(c.body);
    let newenv = push_env(&mut s, captured, params, args)?;
    let newenv = s.slot(newenv);
    progn(&mut s, newenv, body)
}

/// Apply a primitive or function. With `do_eval`, function arguments are
/// evaluated first; primitives always receive the raw list and choose for
/// themselves.
pub fn apply(ip: &mut Interp, env: Slot, f: Slot, args: Slot, do_eval: bool) -> Result<ValRef> {
    if !ip.is_list(ip.load(args)) {
        raise!("apply: argument must be a list");
    }
    match ip.tag(ip.load(f)) {
        Tag::Prim => {
            let id = ip.prim_id(ip.load(f));
            let run = ip.prim_fn(id);
            run(ip, env, args)
        }
        Tag::Fn => {
            let mut s = Scope::new(ip);
            let eargs = if do_eval {
                eval_list(&mut s, env, args)?
            } else {
                s.load(args)
            };
            let eargs = s.slot(eargs);
            apply_func(&mut s, env, f, eargs)
        }
        _ => raise!("apply: not supported"),
    }
}

/// Expand a macro application form once. Anything that is not a cell
/// headed by a macro (literal or bound through a symbol) comes back
/// unchanged.
pub fn macroexpand(ip: &mut Interp, env: Slot, form: Slot) -> Result<ValRef> {
    let f = ip.load(form);
    if ip.tag(f) != Tag::Cell {
        return Ok(f);
    }
    let head = ip.car(f);
    let mac = match ip.tag(head) {
        Tag::Mac => head,
        Tag::Sym => {
            let env_v = ip.load(env);
            match ip.obj_find(env_v, head)? {
                Some(pair) if ip.tag(ip.cdr(pair)) == Tag::Mac => ip.cdr(pair),
                _ => return Ok(f),
            }
        }
        _ => return Ok(f),
    };
    let mut s = Scope::new(ip);
    let mac = s.slot(mac);
    let form_v = s.load(form);
    let args = s.cdr(form_v);
    let args = s.slot(args);
    apply_func(&mut s, env, mac, args)
}

/// Read a whole source text and evaluate it in the global environment.
/// The convenience entry the driver and the `read-sexp`/`eval` pair build
/// on.
pub fn eval_source(ip: &mut Interp, src: &str) -> Result<ValRef> {
    let genv = ip.global_env();
    let mut s = Scope::new(ip);
    let form = shi_read::read_source(s.heap_mut(), src)?;
    let form = s.slot(form);
    eval(&mut s, genv, form)
}
