//! Language primitives: binding, control flow, application, reflection.

use shi_core::{pr_str, raise, Result, Scope, Slot, Tag, ValRef};

use crate::eval::{apply, eval, eval_list, macroexpand, progn};
use crate::interp::Interp;
use crate::prim::expect_len;

/// (def <symbol> expr)
pub fn prim_def(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let a = ip.load(args);
    if ip.list_len(a) != Some(2) || ip.tag(ip.car(a)) != Tag::Sym {
        raise!("Malformed def");
    }
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let sym = s.car(a);
    let sym = s.slot(sym);
    let vexpr = s.car(s.cdr(a));
    let vexpr = s.slot(vexpr);
    let value = eval(&mut s, env, vexpr)?;
    let value = s.slot(value);
    s.obj_set(env, sym, value)?;
    Ok(s.load(value))
}

/// (def-global <symbol> expr): binds at the root of the environment chain
pub fn prim_def_global(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let a = ip.load(args);
    if ip.list_len(a) != Some(2) || ip.tag(ip.car(a)) != Tag::Sym {
        raise!("Malformed def-global");
    }
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let sym = s.car(a);
    let sym = s.slot(sym);
    let vexpr = s.car(s.cdr(a));
    let vexpr = s.slot(vexpr);
    let value = eval(&mut s, env, vexpr)?;
    let value = s.slot(value);
    let mut e = s.load(env);
    while s.obj_proto(e) != ValRef::NIL {
        e = s.obj_proto(e);
    }
    let root = s.slot(e);
    s.obj_set(root, sym, value)?;
    Ok(s.load(value))
}

/// (set <symbol> expr) rebinds wherever the chain holds the binding;
/// (set (: obj key) val) assigns through the object accessor form
pub fn prim_set(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let a = ip.load(args);
    if ip.list_len(a) != Some(2) {
        raise!("Malformed set");
    }
    let target = ip.car(a);
    if ip.tag(target) == Tag::Cell
        && ip.list_len(target) == Some(3)
        && ip.tag(ip.car(target)) == Tag::Sym
        && ip.text(ip.car(target)).starts_with(':')
    {
        let mut s = Scope::new(ip);
        let a = s.load(args);
        let target = s.car(a);
        let oexpr = s.car(s.cdr(target));
        let oexpr = s.slot(oexpr);
        let obj = eval(&mut s, env, oexpr)?;
        let obj = s.slot(obj);
        let a = s.load(args);
        let target = s.car(a);
        let kexpr = s.car(s.cdr(s.cdr(target)));
        let kexpr = s.slot(kexpr);
        let key = eval(&mut s, env, kexpr)?;
        let key = s.slot(key);
        let a = s.load(args);
        let vexpr = s.car(s.cdr(a));
        let vexpr = s.slot(vexpr);
        let value = eval(&mut s, env, vexpr)?;
        let value = s.slot(value);
        if s.tag(s.load(obj)) != Tag::Obj {
            raise!("set: (:) 1st arg is not an object");
        }
        if s.tag(s.load(key)) != Tag::Sym {
            raise!("set: (:) 2nd arg is not a symbol");
        }
        s.obj_set(obj, key, value)?;
        return Ok(s.load(obj));
    }

    if ip.tag(target) != Tag::Sym {
        raise!("Malformed set");
    }
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let sym = s.car(a);
    let pair = match s.obj_find(s.load(env), sym)? {
        Some(pair) => pair,
        None => raise!("set: unbound variable: {}", s.text(sym)),
    };
    let pair = s.slot(pair);
    let vexpr = s.car(s.cdr(a));
    let vexpr = s.slot(vexpr);
    let value = eval(&mut s, env, vexpr)?;
    let p = s.load(pair);
    s.heap_mut().set_cdr(p, value);
    Ok(value)
}

fn handle_function(ip: &mut Interp, env: Slot, args: Slot, tag: Tag) -> Result<ValRef> {
    let a = ip.load(args);
    if ip.tag(a) != Tag::Cell {
        raise!("Malformed fn or macro");
    }
    let params = ip.car(a);
    let rest = ip.cdr(a);
    if !(ip.is_list(params) || ip.tag(params) == Tag::Sym) || ip.tag(rest) != Tag::Cell {
        raise!("Malformed fn or macro");
    }
    // Accept (arg0 arg1), (arg0 . rest) or a bare rest symbol.
    if ip.tag(params) != Tag::Sym {
        let mut p = params;
        while ip.tag(p) == Tag::Cell {
            if ip.tag(ip.car(p)) != Tag::Sym {
                raise!("fn|macro: arg list must contain only symbols");
            }
            p = ip.cdr(p);
        }
        if p != ValRef::NIL && ip.tag(p) != Tag::Sym {
            raise!("fn|macro: arg list must contain only symbols");
        }
    }
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let params = s.car(a);
    let params = s.slot(params);
    let body = s.cdr(a);
    let body = s.slot(body);
    s.make_closure(tag, env, params, body)
}

/// (fn (<symbol> ...) expr ...)
pub fn prim_fn(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    handle_function(ip, env, args, Tag::Fn)
}

/// (macro (<symbol> ...) expr ...)
pub fn prim_macro(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    handle_function(ip, env, args, Tag::Mac)
}

/// (if c1 t1 c2 t2 ... else?): conditions evaluate left to right; the
/// first non-nil one selects its branch; a trailing odd expression is the
/// else.
pub fn prim_if(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    if ip.list_len(ip.load(args)).unwrap_or(0) < 2 {
        raise!("Malformed if");
    }
    let mut s = Scope::new(ip);
    let start = s.load(args);
    let cursor = s.slot(start);
    let expr = s.slot(ValRef::NIL);
    loop {
        // Invariant: the cursor list has at least two elements.
        let cell = s.load(cursor);
        let cond = s.car(cell);
        s.store(expr, cond);
        let c = eval(&mut s, env, expr)?;
        if c != ValRef::NIL {
            let cell = s.load(cursor);
            let then = s.car(s.cdr(cell));
            s.store(expr, then);
            return eval(&mut s, env, expr);
        }
        let cell = s.load(cursor);
        let rest = s.cdr(s.cdr(cell));
        if rest == ValRef::NIL {
            return Ok(ValRef::NIL);
        }
        if s.cdr(rest) == ValRef::NIL {
            let alt = s.car(rest);
            s.store(expr, alt);
            return eval(&mut s, env, expr);
        }
        s.store(cursor, rest);
    }
}

/// (do body ...)
pub fn prim_do(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    progn(ip, env, args)
}

/// (while cond expr ...)
pub fn prim_while(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    if ip.list_len(ip.load(args)).unwrap_or(0) < 2 {
        raise!("Malformed while");
    }
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let cond = s.car(a);
    let cond = s.slot(cond);
    let body = s.cdr(a);
    let body = s.slot(body);
    while eval(&mut s, env, cond)? != ValRef::NIL {
        eval_list(&mut s, env, body)?;
    }
    Ok(ValRef::NIL)
}

/// (eq? expr expr): integers by value, everything else by identity.
/// Interned symbols are therefore `eq?`, strings never are.
pub fn prim_eq(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "eq?: needs exactly 2 arguments")?;
    let values = eval_list(ip, env, args)?;
    let a = ip.car(values);
    let b = ip.car(ip.cdr(values));
    let eq = match (ip.tag(a), ip.tag(b)) {
        (Tag::Int, Tag::Int) => ip.int_value(a) == ip.int_value(b),
        _ => a == b,
    };
    Ok(if eq { ValRef::TRUE } else { ValRef::NIL })
}

/// (type expr)
pub fn prim_type(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "type: not given exactly 1 argument")?;
    let values = eval_list(ip, env, args)?;
    let v = ip.car(values);
    let name = match ip.tag(v) {
        // A proper list is `list`; a chain with a non-nil tail is `cons`.
        Tag::Cell => {
            if ip.list_len(v).is_some() {
                "list"
            } else {
                "cons"
            }
        }
        Tag::Moved | Tag::Dot | Tag::Cparen | Tag::Ccurly => {
            raise!("type: unknown object type")
        }
        tag => tag.name(),
    };
    ip.intern(name)
}

/// (apply fn args): args are not re-evaluated
pub fn prim_apply(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "apply: not given exactly 2 args")?;
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let fexpr = s.car(a);
    let fexpr = s.slot(fexpr);
    let f = eval(&mut s, env, fexpr)?;
    let f = s.slot(f);
    let a = s.load(args);
    let aexpr = s.car(s.cdr(a));
    let aexpr = s.slot(aexpr);
    let fargs = eval(&mut s, env, aexpr)?;
    if !s.is_list(fargs) {
        raise!("apply: 2nd argument is not a list");
    }
    let fargs = s.slot(fargs);
    apply(&mut s, env, f, fargs, false)
}

/// (eval expr): evaluates its argument to a form, then the form
pub fn prim_eval(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "Malformed eval")?;
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let expr = s.car(a);
    let expr = s.slot(expr);
    let form = eval(&mut s, env, expr)?;
    let form = s.slot(form);
    eval(&mut s, env, form)
}

/// (read-sexp str)
pub fn prim_read_sexp(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "read-sexp: exactly 1 param required")?;
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let expr = s.car(a);
    let expr = s.slot(expr);
    let v = eval(&mut s, env, expr)?;
    if s.tag(v) != Tag::Str {
        raise!("read-sexp: 1st arg is not a string");
    }
    let src = s.text(v).to_string();
    shi_read::read_source(s.heap_mut(), &src)
}

/// (sym str)
pub fn prim_sym(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "sym: exactly 1 param required")?;
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let expr = s.car(a);
    let expr = s.slot(expr);
    let v = eval(&mut s, env, expr)?;
    if s.tag(v) != Tag::Str {
        raise!("sym: 1st arg is not a string");
    }
    let name = s.text(v).to_string();
    s.intern(&name)
}

/// (pr-str expr)
pub fn prim_pr_str(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "Malformed pr-str")?;
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let expr = s.car(a);
    let expr = s.slot(expr);
    let v = eval(&mut s, env, expr)?;
    let text = pr_str(s.heap(), v);
    s.make_str(&text)
}

/// (quote expr)
pub fn prim_quote(ip: &mut Interp, _env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "Malformed quote")?;
    Ok(ip.car(ip.load(args)))
}

/// (macro-expand expr)
pub fn prim_macro_expand(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "Malformed macro-expand")?;
    let mut s = Scope::new(ip);
    let a = s.load(args);
    let expr = s.car(a);
    let expr = s.slot(expr);
    let form = eval(&mut s, env, expr)?;
    let form = s.slot(form);
    macroexpand(&mut s, env, form)
}

/// (gensym): a fresh uninterned symbol, never `eq?` to anything read
pub fn prim_gensym(ip: &mut Interp, _env: Slot, _args: Slot) -> Result<ValRef> {
    let name = format!("G__{}", ip.gensym_counter);
    ip.gensym_counter += 1;
    ip.make_sym(&name)
}
