//! List primitives.

use shi_core::{raise, Result, Slot, Tag, ValRef};

use crate::eval::eval_list;
use crate::interp::Interp;

/// (cons expr expr)
pub fn prim_cons(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    if ip.list_len(ip.load(args)) != Some(2) {
        raise!("Malformed cons");
    }
    // The evaluated two-element list is reshaped into the pair in place.
    let cell = eval_list(ip, env, args)?;
    let second = ip.car(ip.cdr(cell));
    ip.set_cdr(cell, second);
    Ok(cell)
}

/// (car <cell>)
pub fn prim_car(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    if ip.tag(values) != Tag::Cell
        || ip.tag(ip.car(values)) != Tag::Cell
        || ip.cdr(values) != ValRef::NIL
    {
        raise!("Malformed car");
    }
    Ok(ip.car(ip.car(values)))
}

/// (cdr <cell>)
pub fn prim_cdr(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    if ip.tag(values) != Tag::Cell
        || ip.tag(ip.car(values)) != Tag::Cell
        || ip.cdr(values) != ValRef::NIL
    {
        raise!("Malformed cdr");
    }
    Ok(ip.cdr(ip.car(values)))
}

/// (set-car! <cell> expr)
pub fn prim_set_car(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    if ip.list_len(values) != Some(2) || ip.tag(ip.car(values)) != Tag::Cell {
        raise!("set-car!: invalid arguments");
    }
    let cell = ip.car(values);
    let v = ip.car(ip.cdr(values));
    ip.set_car(cell, v);
    Ok(cell)
}
