//! Interpreter state.
//!
//! `Interp` bundles the heap with everything the evaluator needs around
//! it: the primitive dispatch table, the trap depth, the PRNG behind
//! `rand`, terminal state and the line editor. It dereferences to the
//! heap, so rooting scopes opened over an interpreter reach every heap
//! operation directly.

use std::ops::{Deref, DerefMut};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use shi_core::{Heap, HeapConfig, HeapHost, PrimId, Result, Scope, ShiError, Slot, ValRef};

use crate::prim::{self, PrimFn};
use crate::term::TermState;

/// Interpreter version bound to `*system-version*`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum nesting of active error traps
pub const MAX_ERROR_DEPTH: usize = 25;

pub struct Interp {
    heap: Heap,

    /// Primitive dispatch table, indexed by the `PrimId` stored in the
    /// heap cell
    prims: Vec<PrimFn>,

    /// Permanent root slot holding the global environment
    genv: Slot,

    /// Active `trap-error` nesting
    pub(crate) trap_depth: usize,

    pub(crate) gensym_counter: u64,

    pub(crate) rng: SmallRng,

    pub(crate) term: TermState,

    pub(crate) editor: Option<rustyline::DefaultEditor>,
}

impl HeapHost for Interp {
    fn heap(&self) -> &Heap {
        &self.heap
    }
    fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }
}

impl Deref for Interp {
    type Target = Heap;
    fn deref(&self) -> &Heap {
        &self.heap
    }
}

impl DerefMut for Interp {
    fn deref_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }
}

impl Interp {
    /// Build an interpreter: fresh heap, root environment, constants and
    /// the whole primitive set.
    pub fn new(config: HeapConfig) -> Result<Interp> {
        let mut heap = Heap::new(config);
        let genv = heap.permanent_root(ValRef::NIL);
        let mut ip = Interp {
            heap,
            prims: Vec::new(),
            genv,
            trap_depth: 0,
            gensym_counter: 0,
            rng: SmallRng::from_entropy(),
            term: TermState::new(),
            editor: None,
        };

        {
            let mut s = Scope::new(&mut ip);
            let nil = s.slot(ValRef::NIL);
            let env = s.make_obj(nil)?;
            let genv = s.genv;
            s.heap_mut().store(genv, env);
        }

        prim::define_constants(&mut ip)?;
        prim::define_primitives(&mut ip)?;
        Ok(ip)
    }

    /// The global environment (a permanent root slot)
    pub fn global_env(&self) -> Slot {
        self.genv
    }

    /// Bind `*args*` to the process arguments, `argv[0]` included
    pub fn set_args(&mut self, args: &[String]) -> Result<()> {
        let genv = self.genv;
        let mut s = Scope::new(self);
        let list = s.slot(ValRef::NIL);
        for a in args.iter().rev() {
            let v = s.make_str(a)?;
            let v = s.slot(v);
            let cell = s.cons(v, list)?;
            s.store(list, cell);
        }
        let sym = s.intern("*args*")?;
        let sym = s.slot(sym);
        s.obj_set(genv, sym, list)
    }

    /// Register a primitive under `name` in the global environment
    pub(crate) fn add_primitive(&mut self, name: &str, f: PrimFn) -> Result<()> {
        let id = PrimId(self.prims.len() as u32);
        self.prims.push(f);
        let genv = self.genv;
        let mut s = Scope::new(self);
        let sym = s.intern(name)?;
        let sym = s.slot(sym);
        let prim = s.make_prim(id)?;
        let prim = s.slot(prim);
        s.obj_set(genv, sym, prim)
    }

    pub(crate) fn prim_fn(&self, id: PrimId) -> PrimFn {
        self.prims[id.0 as usize]
    }

    /// Restore the terminal and leave. Used by `exit`, the trap-depth cap
    /// and the top-level unhandled-error path.
    pub fn shutdown(&mut self, code: i32) -> ! {
        self.term.disable_raw();
        std::process::exit(code);
    }

    /// Terminal handler for errors that reached the top: restore the
    /// terminal, report on stderr, exit 1.
    pub fn unhandled_error(&mut self, e: &ShiError) -> ! {
        self.term.disable_raw();
        eprintln!("unhandled error: {}", e);
        std::process::exit(1);
    }
}
