//! Object primitives.

use shi_core::{pr_str, raise, Result, Scope, Slot, Tag, ValRef, OBJ_BUCKETS};

use crate::eval::eval_list;
use crate::interp::Interp;
use crate::prim::expect_len;

/// (obj proto props): proto is nil or an object, props an alist with
/// symbol keys
pub fn prim_obj(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "obj: expected exactly 2 args")?;
    let mut s = Scope::new(ip);
    let values = eval_list(&mut s, env, args)?;
    let proto = s.car(values);
    if s.tag(proto) != Tag::Obj && proto != ValRef::NIL {
        raise!("obj: given non object or nil as prototype");
    }
    let props = s.car(s.cdr(values));
    if s.tag(props) != Tag::Cell && props != ValRef::NIL {
        raise!("obj: given non alist as properties");
    }
    let mut i = props;
    while i != ValRef::NIL {
        if s.tag(i) != Tag::Cell || s.tag(s.car(i)) != Tag::Cell {
            raise!("obj: given non alist as properties");
        }
        if s.tag(s.car(s.car(i))) != Tag::Sym {
            raise!("obj: given non symbol as property key");
        }
        i = s.cdr(i);
    }
    let proto = s.slot(proto);
    let props = s.slot(props);
    s.make_obj_alist(proto, props)
}

/// (obj-get o k): looks through the prototype chain
pub fn prim_obj_get(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "obj-get: expected exactly 2 args")?;
    let values = eval_list(ip, env, args)?;
    let o = ip.car(values);
    let k = ip.car(ip.cdr(values));
    if ip.tag(o) != Tag::Obj {
        raise!("obj-get: expected 1st argument to be object");
    }
    if !ip.obj_valid_key(k) {
        raise!("obj-get: expected 2nd argument to be valid object key");
    }
    match ip.obj_find(o, k)? {
        Some(pair) => Ok(ip.cdr(pair)),
        None => raise!("obj-get: unbound key: {}", pr_str(ip, k)),
    }
}

/// (obj-set o k v)
pub fn prim_obj_set(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 3, "obj-set: expected exactly 3 args")?;
    let mut s = Scope::new(ip);
    let values = eval_list(&mut s, env, args)?;
    let o = s.car(values);
    if s.tag(o) != Tag::Obj {
        raise!("obj-set: expected 1st argument to be object");
    }
    let k = s.car(s.cdr(values));
    if !s.obj_valid_key(k) {
        raise!("obj-set: expected 2nd argument to be valid object key");
    }
    let v = s.car(s.cdr(s.cdr(values)));
    let o = s.slot(o);
    let k = s.slot(k);
    let v = s.slot(v);
    s.obj_set(o, k, v)?;
    Ok(s.load(o))
}

/// (obj-del o k)
pub fn prim_obj_del(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "obj-del: expected exactly 2 args")?;
    let values = eval_list(ip, env, args)?;
    let o = ip.car(values);
    if ip.tag(o) != Tag::Obj {
        raise!("obj-del: expected 1st argument to be object");
    }
    let k = ip.car(ip.cdr(values));
    if !ip.obj_valid_key(k) {
        raise!("obj-del: expected 2nd argument to be valid object key");
    }
    ip.obj_del(o, k)?;
    Ok(o)
}

/// (obj-proto o)
pub fn prim_obj_proto(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "obj-proto: expected exactly 1 arg")?;
    let values = eval_list(ip, env, args)?;
    let o = ip.car(values);
    if ip.tag(o) != Tag::Obj {
        raise!("obj-proto: expected 1st argument to be object");
    }
    Ok(ip.obj_proto(o))
}

/// (obj-proto-set! o proto)
pub fn prim_obj_proto_set(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 2, "obj-proto-set!: expected exactly 2 args")?;
    let values = eval_list(ip, env, args)?;
    let o = ip.car(values);
    if ip.tag(o) != Tag::Obj {
        raise!("obj-proto-set!: expected 1st argument to be object");
    }
    let proto = ip.car(ip.cdr(values));
    if ip.tag(proto) != Tag::Obj && proto != ValRef::NIL {
        raise!("obj-proto-set!: expected 2nd argument to be object or nil");
    }
    ip.obj_set_proto(o, proto);
    Ok(o)
}

/// (obj->alist o): the object's own pairs as a list; the pairs are the
/// live cells, so mutating their cdrs writes through
pub fn prim_obj_to_alist(ip: &mut Interp, env: Slot, args: Slot) -> Result<ValRef> {
    expect_len(ip, args, 1, "obj->alist: expected exactly 1 arg")?;
    let mut s = Scope::new(ip);
    let values = eval_list(&mut s, env, args)?;
    let o = s.car(values);
    if s.tag(o) != Tag::Obj {
        raise!("obj->alist: expected 1st argument to be object");
    }
    let o = s.slot(o);
    let alist = s.slot(ValRef::NIL);
    let pair = s.slot(ValRef::NIL);
    let cursor = s.slot(ValRef::NIL);
    for i in 0..OBJ_BUCKETS {
        let bucket = s.obj_bucket(s.load(o), i);
        s.store(cursor, bucket);
        while s.load(cursor) != ValRef::NIL {
            let cell = s.load(cursor);
            let p = s.car(cell);
            s.store(pair, p);
            let new_head = s.cons(pair, alist)?;
            s.store(alist, new_head);
            let cell = s.load(cursor);
            let next = s.cdr(cell);
            s.store(cursor, next);
        }
    }
    Ok(s.load(alist))
}
