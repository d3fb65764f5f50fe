//! String primitives.

use shi_core::{raise, Result, Slot, Tag, ValRef};

use crate::eval::eval_list;
use crate::interp::Interp;

/// (str s0 s1 ...): concatenation
pub fn prim_str(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    let mut out = String::new();
    let mut p = values;
    while p != ValRef::NIL {
        let v = ip.car(p);
        if ip.tag(v) != Tag::Str {
            raise!("str: argument not a string");
        }
        out.push_str(ip.text(v));
        p = ip.cdr(p);
    }
    ip.make_str(&out)
}

/// (str-len s): length in bytes
pub fn prim_str_len(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    let values = eval_list(ip, env, args)?;
    if ip.list_len(values) != Some(1) || ip.tag(ip.car(values)) != Tag::Str {
        raise!("str-len: 1st arg is not a string");
    }
    let len = ip.text(ip.car(values)).len() as i64;
    ip.make_int(len)
}
