//! Heap Module - Semispace Allocation and Copying Collection
//!
//! The heap is a pair of logical semispaces with a fixed byte budget.
//! Allocation appends to the live space and charges the cell's byte size;
//! when the budget would be exceeded the collector runs, and if the request
//! still does not fit the error is fatal.
//!
//! Collection is Cheney's algorithm: a fresh to-space is populated by
//! forwarding the roots (the symbol list, every root slot, every watcher
//! record), then a scan cursor sweeps the to-space forwarding each cell's
//! outgoing references until it catches up with the allocation cursor.
//! Forwarding moves the cell and leaves a `Moved` tombstone at the old
//! index so later references resolve to the same copy; a cycle is therefore
//! visited at most once.
//!
//! Because every live cell moves on every cycle, host code must not keep a
//! raw `ValRef` across any operation that may allocate. It keeps a `Slot`
//! instead: an index into the runtime-owned root vector, which the
//! collector rewrites in place. `Scope` is the scoped acquisition for
//! slots; dropping it releases everything it registered, on every exit
//! path including `?` escapes.

use std::mem;
use std::ops::{Deref, DerefMut};

use log::debug;

use crate::config::HeapConfig;
use crate::error::{Result, ShiError};
use crate::value::{Closure, PrimId, Tag, ValRef, Value, OBJ_BUCKETS};
use crate::watch::{WatchSource, Watcher};

/// A rooted handle: an index into the heap-owned root vector.
///
/// The collector updates the vector in place, so a slot stays valid across
/// collections for as long as its owning `Scope` is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(u32);

/// Anything that owns a heap can host scopes.
///
/// The evaluator wraps the heap in a larger interpreter state; making the
/// scope generic over the host lets the same rooting discipline flow
/// through both layers.
pub trait HeapHost {
    fn heap(&self) -> &Heap;
    fn heap_mut(&mut self) -> &mut Heap;
}

impl HeapHost for Heap {
    fn heap(&self) -> &Heap {
        self
    }
    fn heap_mut(&mut self) -> &mut Heap {
        self
    }
}

/// A scoped root frame.
///
/// Records the root-vector length on entry; `Drop` truncates back to it, so
/// slot registration can never leak past the scope that made it.
pub struct Scope<'a, H: HeapHost> {
    host: &'a mut H,
    base: usize,
}

impl<'a, H: HeapHost> Scope<'a, H> {
    pub fn new(host: &'a mut H) -> Scope<'a, H> {
        let base = host.heap().roots.len();
        Scope { host, base }
    }

    /// Register a value in this scope and get a stable handle to it
    pub fn slot(&mut self, v: ValRef) -> Slot {
        self.host.heap_mut().push_root(v)
    }

    /// The underlying heap, whatever the host is
    pub fn heap(&self) -> &Heap {
        self.host.heap()
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        self.host.heap_mut()
    }
}

impl<H: HeapHost> Deref for Scope<'_, H> {
    type Target = H;
    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: HeapHost> DerefMut for Scope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: HeapHost> Drop for Scope<'_, H> {
    fn drop(&mut self) {
        self.host.heap_mut().roots.truncate(self.base);
    }
}

/// The Shi heap: live semispace, root vector, symbol list and watcher
/// registry.
pub struct Heap {
    /// Cells of the live semispace
    space: Vec<Value>,

    /// Bytes charged against the semispace budget
    used: usize,

    config: HeapConfig,

    /// Head of the interned-symbol list; a dedicated GC root
    symbols: ValRef,

    /// Root slots held by host code
    roots: Vec<ValRef>,

    /// Long-lived callback/env handles for the event loop; a GC root
    watchers: Vec<Watcher>,
    next_watcher_id: i64,

    /// Collection is not re-entrant
    gc_running: bool,

    /// Completed collection cycles
    cycles: u64,
}

impl Heap {
    pub fn new(config: HeapConfig) -> Heap {
        Heap {
            space: Vec::new(),
            used: 0,
            config,
            symbols: ValRef::NIL,
            roots: Vec::new(),
            watchers: Vec::new(),
            next_watcher_id: 0,
            gc_running: false,
            cycles: 0,
        }
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Bytes currently charged against the budget
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Completed collection cycles
    pub fn gc_cycles(&self) -> u64 {
        self.cycles
    }

    // ---- roots -----------------------------------------------------------

    fn push_root(&mut self, v: ValRef) -> Slot {
        let slot = Slot(self.roots.len() as u32);
        self.roots.push(v);
        slot
    }

    /// Register a root slot that is never released. For runtime-lifetime
    /// anchors like the global environment; must be created outside any
    /// live scope.
    pub fn permanent_root(&mut self, v: ValRef) -> Slot {
        self.push_root(v)
    }

    /// Read a slot
    pub fn load(&self, s: Slot) -> ValRef {
        self.roots[s.0 as usize]
    }

    /// Overwrite a slot
    pub fn store(&mut self, s: Slot, v: ValRef) {
        self.roots[s.0 as usize] = v;
    }

    // ---- allocation ------------------------------------------------------

    /// Make room for `size` bytes, collecting if necessary.
    ///
    /// Callers must re-read any rooted handle after this returns: a
    /// collection may have moved every cell.
    fn prepare(&mut self, size: usize) -> Result<()> {
        assert!(!self.gc_running, "heap: allocation during collection");
        if self.config.always_gc {
            self.collect();
        } else if self.used + size > self.config.memory_size {
            self.collect();
        }
        if self.used + size > self.config.memory_size {
            return Err(ShiError::MemoryExhausted);
        }
        Ok(())
    }

    fn commit(&mut self, v: Value) -> ValRef {
        self.used += v.heap_size();
        let r = ValRef::from_index(self.space.len());
        self.space.push(v);
        r
    }

    /// Allocate a value that carries no heap references
    fn alloc_leaf(&mut self, v: Value) -> Result<ValRef> {
        self.prepare(v.heap_size())?;
        Ok(self.commit(v))
    }

    pub fn make_int(&mut self, n: i64) -> Result<ValRef> {
        self.alloc_leaf(Value::Int(n))
    }

    pub fn make_str(&mut self, s: &str) -> Result<ValRef> {
        self.alloc_leaf(Value::Str(s.into()))
    }

    /// Allocate a fresh, uninterned symbol (see also [`Heap::intern`])
    pub fn make_sym(&mut self, name: &str) -> Result<ValRef> {
        self.alloc_leaf(Value::Sym(name.into()))
    }

    pub fn make_prim(&mut self, id: PrimId) -> Result<ValRef> {
        self.alloc_leaf(Value::Prim(id))
    }

    /// Cons a pair. The arguments are slots because this can collect.
    pub fn cons(&mut self, car: Slot, cdr: Slot) -> Result<ValRef> {
        self.prepare(Value::Cell { car: ValRef::NIL, cdr: ValRef::NIL }.heap_size())?;
        let v = Value::Cell {
            car: self.load(car),
            cdr: self.load(cdr),
        };
        Ok(self.commit(v))
    }

    /// Returns ((x . y) . a)
    pub fn acons(&mut self, x: Slot, y: Slot, a: Slot) -> Result<ValRef> {
        let mut s = Scope::new(self);
        let pair = s.cons(x, y)?;
        let pair = s.slot(pair);
        s.cons(pair, a)
    }

    /// Allocate a lambda (`Tag::Fn`) or macro (`Tag::Mac`) closure
    pub fn make_closure(
        &mut self,
        tag: Tag,
        env: Slot,
        params: Slot,
        body: Slot,
    ) -> Result<ValRef> {
        assert!(tag == Tag::Fn || tag == Tag::Mac);
        let probe = Value::Fn(Closure {
            params: ValRef::NIL,
            body: ValRef::NIL,
            env: ValRef::NIL,
        });
        self.prepare(probe.heap_size())?;
        let c = Closure {
            params: self.load(params),
            body: self.load(body),
            env: self.load(env),
        };
        Ok(self.commit(match tag {
            Tag::Fn => Value::Fn(c),
            _ => Value::Mac(c),
        }))
    }

    /// Allocate an empty object with the given prototype
    pub fn make_obj(&mut self, proto: Slot) -> Result<ValRef> {
        let probe = Value::Obj {
            proto: ValRef::NIL,
            buckets: Box::new([ValRef::NIL; OBJ_BUCKETS]),
        };
        self.prepare(probe.heap_size())?;
        let v = Value::Obj {
            proto: self.load(proto),
            buckets: Box::new([ValRef::NIL; OBJ_BUCKETS]),
        };
        Ok(self.commit(v))
    }

    // ---- accessors -------------------------------------------------------

    pub fn tag(&self, r: ValRef) -> Tag {
        match r {
            ValRef::NIL => Tag::Nil,
            ValRef::TRUE => Tag::True,
            ValRef::DOT => Tag::Dot,
            ValRef::CPAREN => Tag::Cparen,
            ValRef::CCURLY => Tag::Ccurly,
            _ => self.space[r.index()].tag(),
        }
    }

    /// Borrow a heap cell. Panics on the static singletons, which have no
    /// cell; check the tag first.
    pub fn get(&self, r: ValRef) -> &Value {
        assert!(!r.is_static(), "heap: static singleton has no cell");
        &self.space[r.index()]
    }

    pub(crate) fn get_mut(&mut self, r: ValRef) -> &mut Value {
        assert!(!r.is_static(), "heap: static singleton has no cell");
        &mut self.space[r.index()]
    }

    pub fn int_value(&self, r: ValRef) -> i64 {
        match self.get(r) {
            Value::Int(n) => *n,
            v => panic!("heap: int_value on {:?}", v.tag()),
        }
    }

    /// Byte content of a string or the name of a symbol
    pub fn text(&self, r: ValRef) -> &str {
        match self.get(r) {
            Value::Str(s) | Value::Sym(s) => s,
            v => panic!("heap: text on {:?}", v.tag()),
        }
    }

    pub fn car(&self, r: ValRef) -> ValRef {
        match self.get(r) {
            Value::Cell { car, .. } => *car,
            v => panic!("heap: car on {:?}", v.tag()),
        }
    }

    pub fn cdr(&self, r: ValRef) -> ValRef {
        match self.get(r) {
            Value::Cell { cdr, .. } => *cdr,
            v => panic!("heap: cdr on {:?}", v.tag()),
        }
    }

    pub fn set_car(&mut self, r: ValRef, v: ValRef) {
        match self.get_mut(r) {
            Value::Cell { car, .. } => *car = v,
            other => panic!("heap: set_car on {:?}", other.tag()),
        }
    }

    pub fn set_cdr(&mut self, r: ValRef, v: ValRef) {
        match self.get_mut(r) {
            Value::Cell { cdr, .. } => *cdr = v,
            other => panic!("heap: set_cdr on {:?}", other.tag()),
        }
    }

    pub fn closure(&self, r: ValRef) -> Closure {
        match self.get(r) {
            Value::Fn(c) | Value::Mac(c) => *c,
            v => panic!("heap: closure on {:?}", v.tag()),
        }
    }

    pub fn prim_id(&self, r: ValRef) -> PrimId {
        match self.get(r) {
            Value::Prim(id) => *id,
            v => panic!("heap: prim_id on {:?}", v.tag()),
        }
    }

    // ---- lists -----------------------------------------------------------

    /// Nil or a cell
    pub fn is_list(&self, r: ValRef) -> bool {
        r == ValRef::NIL || self.tag(r) == Tag::Cell
    }

    /// Length of a proper list; `None` for an improper chain
    pub fn list_len(&self, r: ValRef) -> Option<usize> {
        let mut len = 0;
        let mut p = r;
        while self.tag(p) == Tag::Cell {
            len += 1;
            p = self.cdr(p);
        }
        if p == ValRef::NIL {
            Some(len)
        } else {
            None
        }
    }

    /// Destructively reverse a proper list, returning the new head.
    /// Does not allocate.
    pub fn reverse(&mut self, mut p: ValRef) -> ValRef {
        let mut ret = ValRef::NIL;
        while p != ValRef::NIL {
            let next = self.cdr(p);
            self.set_cdr(p, ret);
            ret = p;
            p = next;
        }
        ret
    }

    // ---- symbols ---------------------------------------------------------

    /// Head of the interned-symbol list
    pub fn symbols(&self) -> ValRef {
        self.symbols
    }

    /// Find an already-interned symbol without allocating
    pub fn find_symbol(&self, name: &str) -> Option<ValRef> {
        let mut p = self.symbols;
        while p != ValRef::NIL {
            let sym = self.car(p);
            if self.text(sym) == name {
                return Some(sym);
            }
            p = self.cdr(p);
        }
        None
    }

    /// Intern a symbol: byte-wise lookup in the symbol list, allocating and
    /// prepending only on a miss. Guarantees one cell per distinct name, so
    /// symbol equality is handle identity.
    pub fn intern(&mut self, name: &str) -> Result<ValRef> {
        if let Some(sym) = self.find_symbol(name) {
            return Ok(sym);
        }
        let mut s = Scope::new(self);
        let sym = s.make_sym(name)?;
        let sym = s.slot(sym);
        let list = s.heap().symbols;
        let list = s.slot(list);
        let new_head = s.cons(sym, list)?;
        s.heap_mut().symbols = new_head;
        Ok(s.load(sym))
    }

    // ---- watchers --------------------------------------------------------

    /// Register a watcher; its env and callback stay live across
    /// collections until it is stopped. Returns the monotonic watcher id.
    pub fn watch_start(&mut self, env: ValRef, callback: ValRef, source: WatchSource) -> i64 {
        self.next_watcher_id += 1;
        let id = self.next_watcher_id;
        self.watchers.push(Watcher {
            id,
            env,
            callback,
            source,
        });
        id
    }

    /// Remove a watcher, returning its event source if it existed
    pub fn watch_stop(&mut self, id: i64) -> Option<WatchSource> {
        let at = self.watchers.iter().position(|w| w.id == id)?;
        Some(self.watchers.remove(at).source)
    }

    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    // ---- collection ------------------------------------------------------

    /// Run a full copying collection.
    pub fn collect(&mut self) {
        assert!(!self.gc_running, "heap: nested collection");
        self.gc_running = true;

        let mut from = mem::take(&mut self.space);
        let mut to: Vec<Value> = Vec::with_capacity(from.len());
        let mut copied = 0usize;

        // Forward the roots first.
        self.symbols = forward(&mut from, &mut to, &mut copied, self.symbols);
        for slot in self.roots.iter_mut() {
            *slot = forward(&mut from, &mut to, &mut copied, *slot);
        }
        for w in self.watchers.iter_mut() {
            w.env = forward(&mut from, &mut to, &mut copied, w.env);
            w.callback = forward(&mut from, &mut to, &mut copied, w.callback);
        }

        // Sweep the scan cursor over the to-space. Cells between the cursor
        // and the end have been copied but may still reference the
        // from-space.
        let mut scan = 0;
        while scan < to.len() {
            match to[scan].tag() {
                Tag::Int | Tag::Str | Tag::Sym | Tag::Prim => {}
                Tag::Cell => {
                    let (car, cdr) = match &to[scan] {
                        Value::Cell { car, cdr } => (*car, *cdr),
                        _ => unreachable!(),
                    };
                    let car = forward(&mut from, &mut to, &mut copied, car);
                    let cdr = forward(&mut from, &mut to, &mut copied, cdr);
                    match &mut to[scan] {
                        Value::Cell { car: c, cdr: d } => {
                            *c = car;
                            *d = cdr;
                        }
                        _ => unreachable!(),
                    }
                }
                Tag::Fn | Tag::Mac => {
                    let c = match &to[scan] {
                        Value::Fn(c) | Value::Mac(c) => *c,
                        _ => unreachable!(),
                    };
                    let c = Closure {
                        params: forward(&mut from, &mut to, &mut copied, c.params),
                        body: forward(&mut from, &mut to, &mut copied, c.body),
                        env: forward(&mut from, &mut to, &mut copied, c.env),
                    };
                    match &mut to[scan] {
                        Value::Fn(dst) | Value::Mac(dst) => *dst = c,
                        _ => unreachable!(),
                    }
                }
                Tag::Obj => {
                    let proto = match &to[scan] {
                        Value::Obj { proto, .. } => *proto,
                        _ => unreachable!(),
                    };
                    let proto = forward(&mut from, &mut to, &mut copied, proto);
                    let mut buckets = match &mut to[scan] {
                        Value::Obj { proto: p, buckets } => {
                            *p = proto;
                            mem::replace(buckets, Box::new([ValRef::NIL; OBJ_BUCKETS]))
                        }
                        _ => unreachable!(),
                    };
                    for b in buckets.iter_mut() {
                        *b = forward(&mut from, &mut to, &mut copied, *b);
                    }
                    match &mut to[scan] {
                        Value::Obj { buckets: dst, .. } => *dst = buckets,
                        _ => unreachable!(),
                    }
                }
                tag => panic!("gc: unexpected tag in to-space: {:?}", tag),
            }
            scan += 1;
        }

        let old_used = self.used;
        self.used = copied;
        self.space = to;
        self.cycles += 1;
        if self.config.debug_gc {
            eprintln!("GC: {} bytes out of {} bytes copied.", copied, old_used);
        }
        debug!(
            "gc cycle {}: {} of {} bytes live",
            self.cycles, copied, old_used
        );
        self.gc_running = false;
    }
}

/// Move one cell from the from-space to the to-space and return its new
/// handle. Idempotent: an already-moved cell resolves through its
/// tombstone; a static singleton is returned unchanged.
fn forward(from: &mut [Value], to: &mut Vec<Value>, copied: &mut usize, r: ValRef) -> ValRef {
    if r.is_static() {
        return r;
    }
    if let Value::Moved(new) = &from[r.index()] {
        return *new;
    }
    let v = mem::replace(&mut from[r.index()], Value::Moved(ValRef::NIL));
    *copied += v.heap_size();
    let new = ValRef::from_index(to.len());
    to.push(v);
    from[r.index()] = Value::Moved(new);
    new
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_heap() -> Heap {
        Heap::new(HeapConfig {
            memory_size: 16 * 1024,
            ..HeapConfig::default()
        })
    }

    #[test]
    fn test_alloc_and_read() {
        let mut heap = small_heap();
        let n = heap.make_int(42).unwrap();
        assert_eq!(heap.tag(n), Tag::Int);
        assert_eq!(heap.int_value(n), 42);
        let s = heap.make_str("hello").unwrap();
        assert_eq!(heap.text(s), "hello");
    }

    #[test]
    fn test_rooted_values_survive_collection() {
        let mut heap = small_heap();
        let mut s = Scope::new(&mut heap);
        let a = s.make_int(1).unwrap();
        let a = s.slot(a);
        let b = s.make_str("keepme").unwrap();
        let b = s.slot(b);
        let pair = s.cons(a, b).unwrap();
        let pair = s.slot(pair);

        s.heap_mut().collect();

        let pair = s.load(pair);
        let car = s.heap().car(pair);
        let cdr = s.heap().cdr(pair);
        assert_eq!(s.heap().int_value(car), 1);
        assert_eq!(s.heap().text(cdr), "keepme");
    }

    #[test]
    fn test_unrooted_values_are_reclaimed() {
        let mut heap = small_heap();
        for i in 0..100 {
            heap.make_int(i).unwrap();
        }
        let before = heap.used_bytes();
        heap.collect();
        assert_eq!(heap.used_bytes(), 0);
        assert!(before > 0);
    }

    #[test]
    fn test_scope_drop_releases_roots() {
        let mut heap = small_heap();
        {
            let mut s = Scope::new(&mut heap);
            let v = s.make_int(9).unwrap();
            s.slot(v);
        }
        heap.collect();
        assert_eq!(heap.used_bytes(), 0);
    }

    #[test]
    fn test_interning_identity_survives_collection() {
        let mut heap = small_heap();
        let a = heap.intern("foo").unwrap();
        let b = heap.intern("foo").unwrap();
        assert_eq!(a, b);
        let c = heap.intern("bar").unwrap();
        assert_ne!(a, c);

        heap.collect();
        let a2 = heap.intern("foo").unwrap();
        let c2 = heap.intern("bar").unwrap();
        assert_eq!(heap.text(a2), "foo");
        assert_ne!(a2, c2);
        // Still the only copy: interning after the move finds it again.
        assert_eq!(heap.intern("foo").unwrap(), a2);
    }

    #[test]
    fn test_shared_structure_preserved() {
        // Two lists sharing a tail must still share it after a collection.
        let mut heap = small_heap();
        let mut s = Scope::new(&mut heap);
        let tail_v = s.make_int(7).unwrap();
        let tail_v = s.slot(tail_v);
        let nil = s.slot(ValRef::NIL);
        let tail = s.cons(tail_v, nil).unwrap();
        let tail = s.slot(tail);
        let x = s.make_int(1).unwrap();
        let x = s.slot(x);
        let y = s.make_int(2).unwrap();
        let y = s.slot(y);
        let l1 = s.cons(x, tail).unwrap();
        let l1 = s.slot(l1);
        let l2 = s.cons(y, tail).unwrap();
        let l2 = s.slot(l2);

        s.heap_mut().collect();

        let l1 = s.load(l1);
        let l2 = s.load(l2);
        assert_eq!(s.heap().cdr(l1), s.heap().cdr(l2));
    }

    #[test]
    fn test_cyclic_structure_collected_once() {
        let mut heap = small_heap();
        let mut s = Scope::new(&mut heap);
        let one = s.make_int(1).unwrap();
        let one = s.slot(one);
        let nil = s.slot(ValRef::NIL);
        let cell = s.cons(one, nil).unwrap();
        // Tie the knot: (1 . <self>)
        s.heap_mut().set_cdr(cell, cell);
        let cell = s.slot(cell);

        s.heap_mut().collect();

        let cell = s.load(cell);
        assert_eq!(s.heap().cdr(cell), cell);
        assert_eq!(s.heap().int_value(s.heap().car(cell)), 1);
    }

    #[test]
    fn test_always_gc_mode() {
        let mut heap = Heap::new(HeapConfig {
            memory_size: 16 * 1024,
            always_gc: true,
            ..HeapConfig::default()
        });
        let mut s = Scope::new(&mut heap);
        let a = s.make_int(1).unwrap();
        let a = s.slot(a);
        let b = s.make_int(2).unwrap();
        let b = s.slot(b);
        let pair = s.cons(a, b).unwrap();
        assert_eq!(s.heap().int_value(s.heap().car(pair)), 1);
        assert_eq!(s.heap().int_value(s.heap().cdr(pair)), 2);
        assert!(s.heap().gc_cycles() >= 3);
    }

    #[test]
    fn test_memory_exhausted_is_reported() {
        let mut heap = Heap::new(HeapConfig {
            memory_size: 512,
            ..HeapConfig::default()
        });
        let mut s = Scope::new(&mut heap);
        // Root everything so the collector cannot reclaim.
        let mut err = None;
        for i in 0..100 {
            match s.make_int(i) {
                Ok(v) => {
                    s.slot(v);
                }
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        assert_eq!(err, Some(ShiError::MemoryExhausted));
    }

    #[test]
    fn test_reverse() {
        let mut heap = small_heap();
        let mut s = Scope::new(&mut heap);
        let mut list = ValRef::NIL;
        for i in (1..=3).rev() {
            let list_slot = s.slot(list);
            let n = s.make_int(i).unwrap();
            let n = s.slot(n);
            list = s.cons(n, list_slot).unwrap();
        }
        // list is (1 2 3)
        let rev = s.heap_mut().reverse(list);
        assert_eq!(s.heap().int_value(s.heap().car(rev)), 3);
        assert_eq!(s.heap().list_len(rev), Some(3));
    }

    #[test]
    fn test_list_len_improper() {
        let mut heap = small_heap();
        let mut s = Scope::new(&mut heap);
        let a = s.make_int(1).unwrap();
        let a = s.slot(a);
        let b = s.make_int(2).unwrap();
        let b = s.slot(b);
        let dotted = s.cons(a, b).unwrap();
        assert_eq!(s.heap().list_len(dotted), None);
        assert_eq!(s.heap().list_len(ValRef::NIL), Some(0));
    }

    #[test]
    fn test_watcher_refs_survive_collection() {
        let mut heap = small_heap();
        let mut s = Scope::new(&mut heap);
        let cb = s.make_str("callback-stand-in").unwrap();
        let cb = s.slot(cb);
        let env = s.make_str("env-stand-in").unwrap();
        let env = s.slot(env);
        let id = {
            let env = s.load(env);
            let cb = s.load(cb);
            s.heap_mut()
                .watch_start(env, cb, WatchSource::Timer { interval_ms: 100 })
        };
        drop(s);

        // Nothing rooted but the registry itself.
        heap.collect();

        assert_eq!(heap.watcher_count(), 1);
        let w = &heap.watchers()[0];
        assert_eq!(w.id, id);
        assert_eq!(heap.text(w.callback), "callback-stand-in");
        assert_eq!(heap.text(w.env), "env-stand-in");

        assert!(heap.watch_stop(id).is_some());
        assert!(heap.watch_stop(id).is_none());
        heap.collect();
        assert_eq!(heap.used_bytes(), 0);
    }
}
