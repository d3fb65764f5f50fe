//! Arithmetic and comparison primitives.

use rand::Rng;

use shi_core::{raise, Result, Slot, Tag, ValRef};

use crate::eval::eval_list;
use crate::interp::Interp;
use crate::prim::expect_len;

/// (+ <integer> ...): folds from 0
pub fn prim_plus(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    let mut sum: i64 = 0;
    let mut p = values;
    while p != ValRef::NIL {
        let v = ip.car(p);
        if ip.tag(v) != Tag::Int {
            raise!("+ takes only numbers");
        }
        sum = sum.wrapping_add(ip.int_value(v));
        p = ip.cdr(p);
    }
    ip.make_int(sum)
}

/// (- <integer> ...): unary negates, n-ary folds left
pub fn prim_minus(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    if values == ValRef::NIL {
        raise!("- takes only numbers");
    }
    let mut p = values;
    while p != ValRef::NIL {
        if ip.tag(ip.car(p)) != Tag::Int {
            raise!("- takes only numbers");
        }
        p = ip.cdr(p);
    }
    let first = ip.int_value(ip.car(values));
    if ip.cdr(values) == ValRef::NIL {
        return ip.make_int(first.wrapping_neg());
    }
    let mut acc = first;
    let mut p = ip.cdr(values);
    while p != ValRef::NIL {
        acc = acc.wrapping_sub(ip.int_value(ip.car(p)));
        p = ip.cdr(p);
    }
    ip.make_int(acc)
}

/// (< <integer> <integer>)
pub fn prim_lt(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    if ip.list_len(values) != Some(2) {
        raise!("malformed <");
    }
    let x = ip.car(values);
    let y = ip.car(ip.cdr(values));
    if ip.tag(x) != Tag::Int || ip.tag(y) != Tag::Int {
        raise!("< takes only numbers");
    }
    Ok(if ip.int_value(x) < ip.int_value(y) {
        ValRef::TRUE
    } else {
        ValRef::NIL
    })
}

/// (= <integer> <integer>)
pub fn prim_num_eq(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "Malformed =")?;
    let values = eval_list(ip, env, args)?;
    let x = ip.car(values);
    let y = ip.car(ip.cdr(values));
    if ip.tag(x) != Tag::Int || ip.tag(y) != Tag::Int {
        raise!("= only takes numbers");
    }
    Ok(if ip.int_value(x) == ip.int_value(y) {
        ValRef::TRUE
    } else {
        ValRef::NIL
    })
}

/// (rand <integer>): uniform over [0, n)
pub fn prim_rand(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "rand: takes exactly 1 argument")?;
    let values = eval_list(ip, env, args)?;
    let x = ip.car(values);
    if ip.tag(x) != Tag::Int {
        raise!("rand: 1st arg is not an int");
    }
    let bound = ip.int_value(x);
    if bound <= 0 {
        raise!("rand: bound must be positive");
    }
    let n = ip.rng.gen_range(0..bound);
    ip.make_int(n)
}
