//! Object Module - Bucketed Hash Maps with Prototype Chains
//!
//! An object is a fixed array of buckets, each an association list of
//! `(key . value)` pairs, plus a prototype reference. Lexical environments
//! are plain objects whose prototype is the enclosing frame, so variable
//! lookup and prototype lookup are the same walk.
//!
//! Keys may be symbols, strings or integers. Hashing is Jenkins
//! one-at-a-time over the key's bytes (the decimal rendering for
//! integers). Key equality: symbols by identity, integers by value,
//! strings by byte content; mixed types never compare equal.

use crate::error::Result;
use crate::heap::{Heap, Scope, Slot};
use crate::raise;
use crate::value::{Tag, ValRef, Value, OBJ_BUCKETS};

/// Jenkins one-at-a-time
fn jenkins(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0;
    for &b in bytes {
        hash = hash.wrapping_add(b as u64);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

impl Heap {
    /// Bucket index for a key; errors on a non-key type
    pub fn obj_hash(&self, key: ValRef) -> Result<usize> {
        let hash = match self.tag(key) {
            Tag::Sym | Tag::Str => jenkins(self.text(key).as_bytes()),
            Tag::Int => jenkins(self.int_value(key).to_string().as_bytes()),
            _ => raise!("obj_hash: key given is not sym, str, or int"),
        };
        Ok((hash % OBJ_BUCKETS as u64) as usize)
    }

    /// True for the key types an object accepts
    pub fn obj_valid_key(&self, key: ValRef) -> bool {
        matches!(self.tag(key), Tag::Sym | Tag::Str | Tag::Int)
    }

    /// Key equality as the bucket lookup sees it
    pub fn obj_key_eq(&self, a: ValRef, b: ValRef) -> bool {
        match (self.tag(a), self.tag(b)) {
            (Tag::Sym, Tag::Sym) => a == b,
            (Tag::Int, Tag::Int) => self.int_value(a) == self.int_value(b),
            (Tag::Str, Tag::Str) => self.text(a) == self.text(b),
            _ => false,
        }
    }

    pub fn obj_proto(&self, r: ValRef) -> ValRef {
        match self.get(r) {
            Value::Obj { proto, .. } => *proto,
            v => panic!("heap: obj_proto on {:?}", v.tag()),
        }
    }

    pub fn obj_set_proto(&mut self, r: ValRef, proto: ValRef) {
        match self.get_mut(r) {
            Value::Obj { proto: p, .. } => *p = proto,
            v => panic!("heap: obj_set_proto on {:?}", v.tag()),
        }
    }

    pub fn obj_bucket(&self, r: ValRef, i: usize) -> ValRef {
        match self.get(r) {
            Value::Obj { buckets, .. } => buckets[i],
            v => panic!("heap: obj_bucket on {:?}", v.tag()),
        }
    }

    fn obj_set_bucket(&mut self, r: ValRef, i: usize, v: ValRef) {
        match self.get_mut(r) {
            Value::Obj { buckets, .. } => buckets[i] = v,
            other => panic!("heap: obj_set_bucket on {:?}", other.tag()),
        }
    }

    /// The `(key . value)` pair for a key in an already-hashed bucket of
    /// this object only
    fn obj_get_hashed(&self, obj: ValRef, h: usize, key: ValRef) -> Option<ValRef> {
        let mut p = self.obj_bucket(obj, h);
        while p != ValRef::NIL {
            let pair = self.car(p);
            if self.obj_key_eq(key, self.car(pair)) {
                return Some(pair);
            }
            p = self.cdr(p);
        }
        None
    }

    /// The `(key . value)` pair for a key in this object only
    pub fn obj_get(&self, obj: ValRef, key: ValRef) -> Result<Option<ValRef>> {
        let h = self.obj_hash(key)?;
        Ok(self.obj_get_hashed(obj, h, key))
    }

    /// The `(key . value)` pair for a key in this object or any prototype
    pub fn obj_find(&self, obj: ValRef, key: ValRef) -> Result<Option<ValRef>> {
        let h = self.obj_hash(key)?;
        let mut o = obj;
        while o != ValRef::NIL {
            if let Some(pair) = self.obj_get_hashed(o, h, key) {
                return Ok(Some(pair));
            }
            o = self.obj_proto(o);
        }
        Ok(None)
    }

    /// Bind key to value in this object: mutate an existing pair's cdr, or
    /// prepend a fresh pair to the key's bucket
    pub fn obj_set(&mut self, obj: Slot, key: Slot, val: Slot) -> Result<()> {
        let k = self.load(key);
        let h = self.obj_hash(k)?;
        if let Some(pair) = self.obj_get_hashed(self.load(obj), h, k) {
            let v = self.load(val);
            self.set_cdr(pair, v);
            return Ok(());
        }
        let mut s = Scope::new(self);
        let pair = s.cons(key, val)?;
        let pair = s.slot(pair);
        let o = s.load(obj);
        let bucket = s.heap().obj_bucket(o, h);
        let bucket = s.slot(bucket);
        let entry = s.cons(pair, bucket)?;
        let o = s.load(obj);
        s.heap_mut().obj_set_bucket(o, h, entry);
        Ok(())
    }

    /// Remove a key's pair from this object's own bucket, if present.
    /// Does not allocate.
    pub fn obj_del(&mut self, obj: ValRef, key: ValRef) -> Result<()> {
        let h = self.obj_hash(key)?;
        let mut prev: Option<ValRef> = None;
        let mut p = self.obj_bucket(obj, h);
        while p != ValRef::NIL {
            let pair = self.car(p);
            let next = self.cdr(p);
            if self.obj_key_eq(key, self.car(pair)) {
                match prev {
                    None => self.obj_set_bucket(obj, h, next),
                    Some(prev) => self.set_cdr(prev, next),
                }
            } else {
                prev = Some(p);
            }
            p = next;
        }
        Ok(())
    }

    /// Allocate an object and populate it from an alist of
    /// `(key . value)` pairs
    pub fn make_obj_alist(&mut self, proto: Slot, props: Slot) -> Result<ValRef> {
        let mut s = Scope::new(self);
        let obj = s.make_obj(proto)?;
        let obj = s.slot(obj);
        let key = s.slot(ValRef::NIL);
        let val = s.slot(ValRef::NIL);
        let start = s.load(props);
        let cursor = s.slot(start);
        while s.load(cursor) != ValRef::NIL {
            let cell = s.load(cursor);
            let pair = s.heap().car(cell);
            let k = s.heap().car(pair);
            let v = s.heap().cdr(pair);
            s.store(key, k);
            s.store(val, v);
            s.obj_set(obj, key, val)?;
            let cell = s.load(cursor);
            let next = s.heap().cdr(cell);
            s.store(cursor, next);
        }
        Ok(s.load(obj))
    }
}
