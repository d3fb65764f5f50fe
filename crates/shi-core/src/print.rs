//! Printer Module - Value to Source Text
//!
//! Renders a value back into reader syntax where one exists. Strings get
//! their escape sequences re-applied; opaque values (primitives, closures,
//! objects) print as angle-bracketed descriptions. Printing never
//! allocates on the Shi heap.

use std::fmt::Write;

use crate::heap::Heap;
use crate::value::{Tag, ValRef};

/// Render a value as source text
pub fn pr_str(heap: &Heap, v: ValRef) -> String {
    let mut out = String::new();
    write_value(heap, v, &mut out);
    out
}

fn write_value(heap: &Heap, v: ValRef, out: &mut String) {
    match heap.tag(v) {
        Tag::True => out.push('t'),
        Tag::Nil => out.push_str("()"),
        Tag::Int => {
            let _ = write!(out, "{}", heap.int_value(v));
        }
        Tag::Sym => out.push_str(heap.text(v)),
        Tag::Str => {
            out.push('"');
            escape_into(out, heap.text(v));
            out.push('"');
        }
        Tag::Cell => {
            out.push('(');
            let mut p = v;
            loop {
                write_value(heap, heap.car(p), out);
                let rest = heap.cdr(p);
                if rest == ValRef::NIL {
                    break;
                }
                if heap.tag(rest) != Tag::Cell {
                    out.push_str(" . ");
                    write_value(heap, rest, out);
                    break;
                }
                out.push(' ');
                p = rest;
            }
            out.push(')');
        }
        Tag::Obj => {
            let name = heap
                .find_symbol("*object-name*")
                .and_then(|k| heap.obj_find(v, k).ok().flatten())
                .map(|pair| heap.cdr(pair))
                .filter(|nv| heap.tag(*nv) == Tag::Str)
                .map(|nv| heap.text(nv).to_string());
            let _ = write!(out, "<object {} @{}>", name.as_deref().unwrap_or("nil"), v.raw());
        }
        Tag::Prim => out.push_str("<primitive>"),
        Tag::Fn => out.push_str("<function>"),
        Tag::Mac => out.push_str("<macro>"),
        Tag::Moved => out.push_str("<moved>"),
        // Parser sentinels never escape the reader.
        Tag::Dot | Tag::Cparen | Tag::Ccurly => out.push_str("<reader-sentinel>"),
    }
}

/// Append `s` with string-literal escapes applied. Multi-byte UTF-8
/// sequences pass through unescaped; only ASCII control characters and the
/// delimiters are rewritten.
pub fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
}
