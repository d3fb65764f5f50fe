//! Property test: printing a read value reproduces its canonical source.
//!
//! Generates arbitrary printable values, renders them the way the printer
//! would, reads that text back and checks the printer agrees byte for
//! byte. This pins the reader/printer pair on the whole printable subset
//! (integers, strings, symbols, proper lists and the two constants).

use proptest::prelude::*;
use shi_core::{escape_into, pr_str, Heap, HeapConfig};
use shi_read::Reader;

#[derive(Debug, Clone)]
enum Ast {
    Int(i64),
    Sym(String),
    Str(String),
    True,
    List(Vec<Ast>),
}

fn render(ast: &Ast, out: &mut String) {
    match ast {
        Ast::Int(n) => out.push_str(&n.to_string()),
        Ast::Sym(s) => out.push_str(s),
        Ast::Str(s) => {
            out.push('"');
            escape_into(out, s);
            out.push('"');
        }
        Ast::True => out.push('t'),
        Ast::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                render(item, out);
            }
            out.push(')');
        }
    }
}

fn ast_strategy() -> impl Strategy<Value = Ast> {
    let leaf = prop_oneof![
        any::<i64>()
            .prop_map(|n| Ast::Int(if n == i64::MIN { 0 } else { n })),
        "[a-z~!$%^&*_=+/?<>][a-z0-9~!$%^&*_=+/?<>-]{0,12}".prop_map(Ast::Sym),
        proptest::collection::vec(any::<char>(), 0..12)
            .prop_map(|cs| Ast::Str(cs.into_iter().collect())),
        Just(Ast::True),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        proptest::collection::vec(inner, 0..6).prop_map(Ast::List)
    })
}

proptest! {
    #[test]
    fn printed_form_reads_back_identically(ast in ast_strategy()) {
        let mut source = String::new();
        render(&ast, &mut source);

        let mut heap = Heap::new(HeapConfig::default());
        let mut reader = Reader::new(&source);
        let value = reader
            .read_expr(&mut heap)
            .expect("canonical text must read")
            .expect("expression expected");
        prop_assert_eq!(pr_str(&heap, value), source);
    }

    #[test]
    fn printed_form_survives_a_collection(ast in ast_strategy()) {
        let mut source = String::new();
        render(&ast, &mut source);

        let mut heap = Heap::new(HeapConfig::default());
        let mut s = shi_core::Scope::new(&mut heap);
        let mut reader = Reader::new(&source);
        let value = reader
            .read_expr(&mut s)
            .expect("canonical text must read")
            .expect("expression expected");
        let value = s.slot(value);

        s.heap_mut().collect();

        prop_assert_eq!(pr_str(s.heap(), s.load(value)), source);
    }
}
