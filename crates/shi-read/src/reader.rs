//! S-expression reader.
//!
//! Character-level recursive descent over a `(input, position)` pair.
//! Each `read_expr` call produces one value on the heap; the parser-only
//! sentinels (`Cparen`, `Ccurly`, `Dot`) surface as their static handles
//! and never leak past `read_source`.
//!
//! The reader-macro set is closed: `'` quote, `` ` `` quasiquote, `,` and
//! `,@` unquote, `@` unbox, `{...}` alist sugar and the `obj:key` colon
//! accessor are fixed desugarings.

use shi_core::{raise, Heap, Result, Scope, ValRef};

use crate::escape::unescape;

/// Longest accepted symbol, in bytes
pub const SYMBOL_MAX_LEN: usize = 200;
/// Longest accepted string literal, in bytes before unescaping
pub const STRING_MAX_LEN: usize = 1000;

const SYMBOL_CHARS: &[u8] = b"~!#$%^&*-_=+:/?<>";

fn valid_symbol_start_char(c: u8) -> bool {
    c.is_ascii_alphabetic() || SYMBOL_CHARS.contains(&c)
}

fn valid_symbol_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || SYMBOL_CHARS.contains(&c)
}

/// A reader over one source text
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str) -> Reader<'a> {
        Reader {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Skip to the end of the current line. Newline is `\r`, `\r\n` or `\n`.
    fn skip_line(&mut self) {
        while let Some(c) = self.next() {
            if c == b'\n' {
                return;
            }
            if c == b'\r' {
                if self.peek() == Some(b'\n') {
                    self.next();
                }
                return;
            }
        }
    }

    /// Read one expression. `None` means end of input; the static parser
    /// sentinels come back as their handles and are the caller's problem.
    pub fn read_expr(&mut self, heap: &mut Heap) -> Result<Option<ValRef>> {
        loop {
            let c = match self.next() {
                None => return Ok(None),
                Some(c) => c,
            };
            match c {
                b' ' | b'\n' | b'\r' | b'\t' => continue,
                // Line comments; a leading `#` covers shebangs.
                b';' => {
                    self.skip_line();
                    continue;
                }
                b'#' if self.pos == 1 => {
                    self.skip_line();
                    continue;
                }
                b'(' => return Ok(Some(self.read_list(heap)?)),
                b')' => return Ok(Some(ValRef::CPAREN)),
                b'{' => return Ok(Some(self.read_alist(heap)?)),
                b'}' => return Ok(Some(ValRef::CCURLY)),
                b'.' => return Ok(Some(ValRef::DOT)),
                b'@' => return Ok(Some(self.read_special(heap, "unbox")?)),
                b'\'' => return Ok(Some(self.read_special(heap, "quote")?)),
                b'`' => return Ok(Some(self.read_special(heap, "quasiquote")?)),
                b',' => return Ok(Some(self.read_unquote(heap)?)),
                b'"' => return Ok(Some(self.read_string(heap)?)),
                b'0'..=b'9' => {
                    let n = self.read_number((c - b'0') as i64)?;
                    return Ok(Some(heap.make_int(n)?));
                }
                b'-' if self.peek().map(|d| d.is_ascii_digit()).unwrap_or(false) => {
                    let n = self.read_number(0)?;
                    return Ok(Some(heap.make_int(-n)?));
                }
                c if valid_symbol_start_char(c) => {
                    return Ok(Some(self.read_symbol(heap, c)?));
                }
                c => raise!("Don't know how to handle {}", c as char),
            }
        }
    }

    /// Read a list body; `(` has already been consumed.
    fn read_list(&mut self, heap: &mut Heap) -> Result<ValRef> {
        let mut s = Scope::new(heap);
        let head = s.slot(ValRef::NIL);
        loop {
            let obj = match self.read_expr(&mut s)? {
                None => raise!("Unclosed parenthesis"),
                Some(o) => o,
            };
            if obj == ValRef::CPAREN {
                let h = s.load(head);
                return Ok(s.heap_mut().reverse(h));
            }
            if obj == ValRef::DOT {
                let last = match self.read_expr(&mut s)? {
                    None => raise!("Unclosed parenthesis"),
                    Some(o) => o,
                };
                let last = s.slot(last);
                match self.read_expr(&mut s)? {
                    Some(ValRef::CPAREN) => {}
                    _ => raise!("Closed parenthesis expected after dot"),
                }
                let h = s.load(head);
                if h == ValRef::NIL {
                    raise!("Stray dot");
                }
                // After the reverse the old head is the final cell; attach
                // the dotted tail there.
                let ret = s.heap_mut().reverse(h);
                let tail = s.load(last);
                s.heap_mut().set_cdr(h, tail);
                return Ok(ret);
            }
            let obj = s.slot(obj);
            let new_head = s.cons(obj, head)?;
            s.store(head, new_head);
        }
    }

    /// Read an alist body; `{` has already been consumed. Desugars
    /// `{k1 v1 k2 v2}` into `(list (cons k1 v1) (cons k2 v2))`.
    fn read_alist(&mut self, heap: &mut Heap) -> Result<ValRef> {
        let mut s = Scope::new(heap);
        let head = s.slot(ValRef::NIL);
        loop {
            let obj = match self.read_expr(&mut s)? {
                None => raise!("Unclosed curly brace"),
                Some(o) => o,
            };
            if obj == ValRef::DOT {
                raise!("Stray dot in alist");
            }
            if obj == ValRef::CPAREN {
                raise!("Stray closing paren in alist");
            }
            if obj != ValRef::CCURLY {
                let obj = s.slot(obj);
                let new_head = s.cons(obj, head)?;
                s.store(head, new_head);
                continue;
            }

            // Closing brace: desugar.
            let h = s.load(head);
            if s.heap().list_len(h).unwrap_or(0) % 2 != 0 {
                raise!("Alist contains un-even number of elements");
            }
            if h == ValRef::NIL {
                return Ok(ValRef::NIL);
            }
            let items = s.heap_mut().reverse(h);
            s.store(head, items);

            let cons_sym = s.intern("cons")?;
            let cons_sym = s.slot(cons_sym);
            let list_sym = s.intern("list")?;
            let list_sym = s.slot(list_sym);
            let forms = s.slot(ValRef::NIL);
            let key = s.slot(ValRef::NIL);
            let val = s.slot(ValRef::NIL);
            while s.load(head) != ValRef::NIL {
                let cell = s.load(head);
                let k = s.heap().car(cell);
                s.store(key, k);
                let rest = s.heap().cdr(cell);
                let v = s.heap().car(rest);
                s.store(val, v);
                let next = s.heap().cdr(rest);
                s.store(head, next);

                // (cons k v)
                let nil = s.slot(ValRef::NIL);
                let form = s.cons(val, nil)?;
                let form = s.slot(form);
                let form2 = s.cons(key, form)?;
                s.store(form, form2);
                let form3 = s.cons(cons_sym, form)?;
                s.store(form, form3);

                let new_forms = s.cons(form, forms)?;
                s.store(forms, new_forms);
            }
            let fl = s.load(forms);
            let fl = s.heap_mut().reverse(fl);
            s.store(forms, fl);
            return s.cons(list_sym, forms);
        }
    }

    /// `'x` → `(quote x)`, `` `x `` → `(quasiquote x)`, `@x` → `(unbox x)`
    fn read_special(&mut self, heap: &mut Heap, name: &str) -> Result<ValRef> {
        let mut s = Scope::new(heap);
        let sym = s.intern(name)?;
        let sym = s.slot(sym);
        let expr = match self.read_expr(&mut s)? {
            None => raise!("Unexpected end of input after {}", name),
            Some(o) => o,
        };
        let expr = s.slot(expr);
        let nil = s.slot(ValRef::NIL);
        let tail = s.cons(expr, nil)?;
        let tail = s.slot(tail);
        s.cons(sym, tail)
    }

    /// `,x` → `(unquote x)`; `,@x` → `(unquote-splicing x)`
    fn read_unquote(&mut self, heap: &mut Heap) -> Result<ValRef> {
        if self.peek() == Some(b'@') {
            self.next();
            self.read_special(heap, "unquote-splicing")
        } else {
            self.read_special(heap, "unquote")
        }
    }

    fn read_number(&mut self, mut val: i64) -> Result<i64> {
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.next();
            val = match val
                .checked_mul(10)
                .and_then(|v| v.checked_add((c - b'0') as i64))
            {
                Some(v) => v,
                None => raise!("Number literal too large"),
            };
        }
        Ok(val)
    }

    /// Read a string literal; the opening `"` has already been consumed.
    /// Escape pairs are collected verbatim and processed in one pass at
    /// the end.
    fn read_string(&mut self, heap: &mut Heap) -> Result<ValRef> {
        let mut raw = Vec::new();
        loop {
            let c = match self.next() {
                None => raise!("Unclosed string"),
                Some(c) => c,
            };
            if c == b'"' {
                break;
            }
            if raw.len() >= STRING_MAX_LEN {
                raise!("String too long");
            }
            raw.push(c);
            if c == b'\\' {
                match self.next() {
                    None => raise!("Unclosed string"),
                    Some(d) => raw.push(d),
                }
            }
        }
        let raw = match String::from_utf8(raw) {
            Ok(s) => s,
            Err(_) => raise!("String is not valid UTF-8"),
        };
        let text = unescape(&raw)?;
        heap.make_str(&text)
    }

    /// Read a symbol starting with `first`. A colon past the first
    /// character splits the token into the object accessor form:
    /// `obj:key` → `(: obj (quote key))`.
    fn read_symbol(&mut self, heap: &mut Heap, first: u8) -> Result<ValRef> {
        let mut name = String::new();
        name.push(first as char);
        while let Some(c) = self.peek() {
            if !valid_symbol_char(c) {
                break;
            }
            if name.len() >= SYMBOL_MAX_LEN {
                raise!("Symbol name too long");
            }
            self.next();
            name.push(c as char);
        }

        let split = name[1..].find(':').map(|i| i + 1);
        let (obj_part, key_part) = match split {
            None => return heap.intern(&name),
            Some(i) => (&name[..i], &name[i + 1..]),
        };
        if key_part.is_empty() {
            raise!("Missing key after colon in {}", name);
        }

        // (: obj (quote key))
        let mut s = Scope::new(heap);
        let colon_sym = s.intern(":")?;
        let colon_sym = s.slot(colon_sym);
        let quote_sym = s.intern("quote")?;
        let quote_sym = s.slot(quote_sym);
        let obj_sym = s.intern(obj_part)?;
        let obj_sym = s.slot(obj_sym);
        let key_sym = s.intern(key_part)?;
        let key_sym = s.slot(key_sym);

        let nil = s.slot(ValRef::NIL);
        let quoted = s.cons(key_sym, nil)?;
        let quoted = s.slot(quoted);
        let quoted2 = s.cons(quote_sym, quoted)?;
        s.store(quoted, quoted2);

        let nil = s.slot(ValRef::NIL);
        let args = s.cons(quoted, nil)?;
        let args = s.slot(args);
        let args2 = s.cons(obj_sym, args)?;
        s.store(args, args2);
        s.cons(colon_sym, args)
    }
}

/// Read a whole source text: a single expression comes back as itself,
/// several are wrapped in a `(do ...)` sequence. Stray sentinels at the
/// top level are reader errors.
pub fn read_source(heap: &mut Heap, input: &str) -> Result<ValRef> {
    let mut r = Reader::new(input);
    let mut s = Scope::new(heap);
    let exprs = s.slot(ValRef::NIL);
    loop {
        match r.read_expr(&mut s)? {
            None => break,
            Some(ValRef::CPAREN) => raise!("Stray close parenthesis"),
            Some(ValRef::CCURLY) => raise!("Stray close curly bracket"),
            Some(ValRef::DOT) => raise!("Stray dot"),
            Some(e) => {
                let e = s.slot(e);
                let new_head = s.cons(e, exprs)?;
                s.store(exprs, new_head);
            }
        }
    }
    let list = s.load(exprs);
    if s.heap().list_len(list) == Some(1) {
        return Ok(s.heap().car(list));
    }
    let list = s.heap_mut().reverse(list);
    s.store(exprs, list);
    let do_sym = s.intern("do")?;
    let do_sym = s.slot(do_sym);
    s.cons(do_sym, exprs)
}
