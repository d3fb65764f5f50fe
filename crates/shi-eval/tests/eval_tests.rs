//! Evaluator behavior tests: the language surface end to end, from
//! source text through the reader and evaluator.

use shi_core::{pr_str, HeapConfig};
use shi_eval::{eval_source, Interp};

fn interp() -> Interp {
    Interp::new(HeapConfig::default()).expect("interp boots")
}

/// Build an interpreter that collects on every allocation; any test that
/// passes plainly but fails under this has a missing root.
fn shaken_interp() -> Interp {
    Interp::new(HeapConfig {
        always_gc: true,
        ..HeapConfig::default()
    })
    .expect("interp boots")
}

fn eval_str(ip: &mut Interp, src: &str) -> String {
    let v = eval_source(ip, src).expect("evaluation succeeds");
    pr_str(ip, v)
}

#[test]
fn test_arithmetic() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(+ 1 2 3)"), "6");
    assert_eq!(eval_str(&mut ip, "(- 10 1 2)"), "7");
    assert_eq!(eval_str(&mut ip, "(- 5)"), "-5");
    assert_eq!(eval_str(&mut ip, "(+)"), "0");
    assert_eq!(eval_str(&mut ip, "(< 1 2)"), "t");
    assert_eq!(eval_str(&mut ip, "(< 2 1)"), "()");
    assert_eq!(eval_str(&mut ip, "(= 3 3)"), "t");
}

#[test]
fn test_recursive_function() {
    let mut ip = interp();
    eval_source(
        &mut ip,
        "(def sum (fn (n) (if (= n 0) 0 (+ n (sum (- n 1))))))",
    )
    .unwrap();
    assert_eq!(eval_str(&mut ip, "(sum 5)"), "15");
    assert_eq!(eval_str(&mut ip, "(sum 100)"), "5050");
}

#[test]
fn test_quote_and_eval() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(eval (quote (+ 1 2)))"), "3");
    assert_eq!(eval_str(&mut ip, "'(1 2 3)"), "(1 2 3)");
    assert_eq!(eval_str(&mut ip, "(eval '(- 9 4))"), "5");
}

#[test]
fn test_objects() {
    let mut ip = interp();
    eval_source(&mut ip, "(def o (obj nil '((a . 1))))").unwrap();
    assert_eq!(eval_str(&mut ip, "(obj-get o 'a)"), "1");
    eval_source(&mut ip, "(obj-set o 'b 2)").unwrap();
    assert_eq!(eval_str(&mut ip, "(obj-get o 'b)"), "2");
    // A child sees `a` through the prototype chain.
    eval_source(&mut ip, "(def child (obj o '()))").unwrap();
    assert_eq!(eval_str(&mut ip, "(obj-get child 'a)"), "1");
    // Deletion only touches the object's own buckets.
    eval_source(&mut ip, "(obj-del o 'b)").unwrap();
    assert!(eval_source(&mut ip, "(obj-get o 'b)").is_err());
    // obj-proto walks up; obj-proto-set! replaces.
    assert_eq!(eval_str(&mut ip, "(eq? (obj-proto child) o)"), "t");
    eval_source(&mut ip, "(obj-proto-set! child nil)").unwrap();
    assert!(eval_source(&mut ip, "(obj-get child 'a)").is_err());
}

#[test]
fn test_macro() {
    let mut ip = interp();
    eval_source(
        &mut ip,
        "(def when2 (macro (c . body) (cons 'if (cons c (cons (cons 'do body) nil)))))",
    )
    .unwrap();
    assert_eq!(eval_str(&mut ip, "(when2 t 1 2 3)"), "3");
    assert_eq!(eval_str(&mut ip, "(when2 nil 1 2 3)"), "()");
}

#[test]
fn test_macro_expand() {
    let mut ip = interp();
    eval_source(
        &mut ip,
        "(def m (macro (x) (cons '+ (cons x (cons 1 nil)))))",
    )
    .unwrap();
    assert_eq!(eval_str(&mut ip, "(macro-expand '(m 5))"), "(+ 5 1)");
    assert_eq!(eval_str(&mut ip, "(m 5)"), "6");
}

#[test]
fn test_trap_error() {
    let mut ip = interp();
    assert_eq!(
        eval_str(&mut ip, r#"(trap-error (fn () (error "x")) (fn (m) m))"#),
        "\"x\""
    );
    // No error: the trap returns the body's value.
    assert_eq!(
        eval_str(&mut ip, r#"(trap-error (fn () 42) (fn (m) m))"#),
        "42"
    );
}

#[test]
fn test_trap_error_composes() {
    let mut ip = interp();
    // The handler raises; the outer trap sees the new message.
    assert_eq!(
        eval_str(
            &mut ip,
            r#"(trap-error
                 (fn () (trap-error (fn () (error "inner"))
                                    (fn (m) (error (str m "-outer")))))
                 (fn (m) m))"#
        ),
        "\"inner-outer\""
    );
}

#[test]
fn test_untrapped_error_surfaces() {
    let mut ip = interp();
    let err = eval_source(&mut ip, r#"(error "boom")"#).unwrap_err();
    assert_eq!(err.to_string(), "boom");
    let err = eval_source(&mut ip, "nope").unwrap_err();
    assert_eq!(err.to_string(), "eval: undefined symbol: nope");
}

#[test]
fn test_eq_and_interning() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(eq? 'foo 'foo)"), "t");
    assert_eq!(eval_str(&mut ip, r#"(eq? 'foo (sym "foo"))"#), "t");
    // Strings are not interned.
    assert_eq!(eval_str(&mut ip, r#"(eq? "a" "a")"#), "()");
    assert_eq!(eval_str(&mut ip, "(eq? 1 1)"), "t");
    assert_eq!(eval_str(&mut ip, "(eq? 1 2)"), "()");
    assert_eq!(eval_str(&mut ip, "(eq? nil nil)"), "t");
}

#[test]
fn test_gensym_freshness() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(eq? (gensym) (gensym))"), "()");
    // Not eq? to a literal symbol spelled the same way.
    eval_source(&mut ip, "(def g (gensym))").unwrap();
    let printed = eval_str(&mut ip, "g");
    assert!(printed.starts_with("G__"));
    assert_eq!(
        eval_str(&mut ip, &format!("(eq? g '{})", printed)),
        "()"
    );
}

#[test]
fn test_apply() {
    let mut ip = interp();
    eval_source(&mut ip, "(def add3 (fn (a b c) (+ a b c)))").unwrap();
    assert_eq!(eval_str(&mut ip, "(apply add3 '(1 2 3))"), "6");
    // apply does not re-evaluate list elements.
    assert_eq!(
        eval_str(&mut ip, "(apply (fn (x) x) (cons '(+ 1 2) nil))"),
        "(+ 1 2)"
    );
}

#[test]
fn test_params_shapes() {
    let mut ip = interp();
    // Bare symbol binds the whole argument list.
    eval_source(&mut ip, "(def all (fn xs xs))").unwrap();
    assert_eq!(eval_str(&mut ip, "(all 1 2 3)"), "(1 2 3)");
    // Dotted tail binds the rest.
    eval_source(&mut ip, "(def rest (fn (a . more) more))").unwrap();
    assert_eq!(eval_str(&mut ip, "(rest 1 2 3)"), "(2 3)");
    assert_eq!(eval_str(&mut ip, "(rest 1)"), "()");
    // Arity mismatches error both ways.
    eval_source(&mut ip, "(def two (fn (a b) a))").unwrap();
    assert!(eval_source(&mut ip, "(two 1)").is_err());
    assert!(eval_source(&mut ip, "(two 1 2 3)").is_err());
}

#[test]
fn test_if_arity() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(if t 1)"), "1");
    assert_eq!(eval_str(&mut ip, "(if nil 1)"), "()");
    assert_eq!(eval_str(&mut ip, "(if nil 1 2)"), "2");
    assert_eq!(eval_str(&mut ip, "(if nil 1 t 2 3)"), "2");
    assert_eq!(eval_str(&mut ip, "(if nil 1 nil 2 3)"), "3");
    assert_eq!(eval_str(&mut ip, "(if nil 1 nil 2)"), "()");
    // Only the taken branch evaluates.
    assert_eq!(eval_str(&mut ip, r#"(if t 1 (error "no"))"#), "1");
}

#[test]
fn test_while_and_set() {
    let mut ip = interp();
    eval_source(&mut ip, "(def i 0)").unwrap();
    eval_source(&mut ip, "(while (< i 5) (set i (+ i 1)))").unwrap();
    assert_eq!(eval_str(&mut ip, "i"), "5");
    assert!(eval_source(&mut ip, "(set unknown-var 1)").is_err());
}

#[test]
fn test_def_global_and_shadowing() {
    let mut ip = interp();
    eval_source(&mut ip, "(def x 1)").unwrap();
    // A function frame shadows; def-global writes through to the root.
    eval_source(
        &mut ip,
        "(def f (fn (x) (do (def-global y x) (+ x 0))))",
    )
    .unwrap();
    assert_eq!(eval_str(&mut ip, "(f 9)"), "9");
    assert_eq!(eval_str(&mut ip, "y"), "9");
    assert_eq!(eval_str(&mut ip, "x"), "1");
}

#[test]
fn test_type() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(type 1)"), "int");
    assert_eq!(eval_str(&mut ip, "(type \"s\")"), "str");
    assert_eq!(eval_str(&mut ip, "(type 'a)"), "sym");
    assert_eq!(eval_str(&mut ip, "(type t)"), "true");
    assert_eq!(eval_str(&mut ip, "(type nil)"), "nil");
    assert_eq!(eval_str(&mut ip, "(type '(1 2))"), "list");
    assert_eq!(eval_str(&mut ip, "(type (cons 1 2))"), "cons");
    assert_eq!(eval_str(&mut ip, "(type (fn (x) x))"), "fn");
    assert_eq!(eval_str(&mut ip, "(type (macro (x) x))"), "macro");
    assert_eq!(eval_str(&mut ip, "(type type)"), "prim");
    assert_eq!(eval_str(&mut ip, "(type (obj nil '()))"), "obj");
}

#[test]
fn test_strings() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, r#"(str "foo" "bar")"#), "\"foobar\"");
    assert_eq!(eval_str(&mut ip, r#"(str)"#), "\"\"");
    assert_eq!(eval_str(&mut ip, r#"(str-len "héllo")"#), "6");
    assert!(eval_source(&mut ip, r#"(str "a" 1)"#).is_err());
}

#[test]
fn test_lists() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(cons 1 2)"), "(1 . 2)");
    assert_eq!(eval_str(&mut ip, "(car '(1 2))"), "1");
    assert_eq!(eval_str(&mut ip, "(cdr '(1 2))"), "(2)");
    eval_source(&mut ip, "(def c (cons 1 2))").unwrap();
    eval_source(&mut ip, "(set-car! c 9)").unwrap();
    assert_eq!(eval_str(&mut ip, "c"), "(9 . 2)");
    assert!(eval_source(&mut ip, "(car 1)").is_err());
}

#[test]
fn test_read_sexp_and_pr_str() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, r#"(read-sexp "(+ 1 2)")"#), "(+ 1 2)");
    assert_eq!(eval_str(&mut ip, r#"(eval (read-sexp "(+ 1 2)"))"#), "3");
    // Multiple expressions wrap in (do ...).
    assert_eq!(eval_str(&mut ip, r#"(eval (read-sexp "1 2 3"))"#), "3");
    assert_eq!(eval_str(&mut ip, r#"(pr-str '(1 "a" b))"#), "\"(1 \\\"a\\\" b)\"");
}

#[test]
fn test_reader_printer_roundtrip_through_eval() {
    let mut ip = interp();
    for src in ["42", "-7", "foo", "\"a\\nb\"", "(1 2 3)", "t", "()"] {
        let quoted = format!("(read-sexp (pr-str (quote {})))", src);
        assert_eq!(eval_str(&mut ip, &quoted), src);
    }
}

#[test]
fn test_env_pseudo_symbol() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(type *env*)"), "obj");
    // The activation frame's prototype is the defining environment.
    assert_eq!(
        eval_str(&mut ip, "((fn () (eq? (obj-proto *env*) *env*)))"),
        "()"
    );
}

#[test]
fn test_colon_accessor_and_set() {
    let mut ip = interp();
    eval_source(&mut ip, "(def : (fn (o k) (obj-get o k)))").unwrap();
    eval_source(&mut ip, "(def p (obj nil '((x . 1))))").unwrap();
    assert_eq!(eval_str(&mut ip, "p:x"), "1");
    eval_source(&mut ip, "(set (: p 'x) 5)").unwrap();
    assert_eq!(eval_str(&mut ip, "p:x"), "5");
}

#[test]
fn test_obj_to_alist() {
    let mut ip = interp();
    eval_source(&mut ip, "(def o (obj nil '((a . 1) (b . 2))))").unwrap();
    eval_source(&mut ip, "(def al (obj->alist o))").unwrap();
    // Two pairs in unspecified order.
    assert_eq!(eval_str(&mut ip, "(+ (cdr (car al)) (cdr (car (cdr al))))"), "3");
}

#[test]
fn test_closures_capture_their_environment() {
    let mut ip = interp();
    eval_source(
        &mut ip,
        "(def make-counter (fn () (do (def n 0) (fn () (do (set n (+ n 1)) n)))))",
    )
    .unwrap();
    eval_source(&mut ip, "(def c1 (make-counter))").unwrap();
    eval_source(&mut ip, "(def c2 (make-counter))").unwrap();
    assert_eq!(eval_str(&mut ip, "(c1)"), "1");
    assert_eq!(eval_str(&mut ip, "(c1)"), "2");
    assert_eq!(eval_str(&mut ip, "(c2)"), "1");
}

#[test]
fn test_constants_are_bound() {
    let mut ip = interp();
    assert_eq!(eval_str(&mut ip, "(type *system-version*)"), "str");
    assert_eq!(eval_str(&mut ip, "(type PF_INET)"), "int");
    assert_eq!(eval_str(&mut ip, "(type SOCK_STREAM)"), "int");
    for c in ["EV_READ", "EV_WRITE", "EV_TIMER", "EV_SIGNAL"] {
        assert_eq!(eval_str(&mut ip, &format!("(type {})", c)), "int");
    }
}

#[test]
fn test_rand_bounds() {
    let mut ip = interp();
    for _ in 0..50 {
        let v = eval_source(&mut ip, "(rand 10)").unwrap();
        let n = ip.int_value(v);
        assert!((0..10).contains(&n));
    }
    assert!(eval_source(&mut ip, "(rand 0)").is_err());
}

#[test]
fn test_getenv_and_seconds() {
    let mut ip = interp();
    std::env::set_var("SHI_TEST_ENV_VAR", "hello");
    assert_eq!(eval_str(&mut ip, r#"(getenv "SHI_TEST_ENV_VAR")"#), "\"hello\"");
    assert_eq!(eval_str(&mut ip, r#"(getenv "SHI_TEST_ENV_MISSING")"#), "()");
    let v = eval_source(&mut ip, "(seconds)").unwrap();
    assert!(ip.int_value(v) > 1_500_000_000);
}

#[test]
fn test_gc_shake_whole_surface() {
    // The same programs, with a collection forced at every allocation.
    let mut ip = shaken_interp();
    eval_source(
        &mut ip,
        "(def sum (fn (n) (if (= n 0) 0 (+ n (sum (- n 1))))))",
    )
    .unwrap();
    assert_eq!(eval_str(&mut ip, "(sum 10)"), "55");
    eval_source(&mut ip, "(def o (obj nil '((a . 1))))").unwrap();
    eval_source(&mut ip, "(obj-set o 'b 2)").unwrap();
    assert_eq!(eval_str(&mut ip, "(+ (obj-get o 'a) (obj-get o 'b))"), "3");
    assert_eq!(
        eval_str(&mut ip, r#"(trap-error (fn () (error "x")) (fn (m) m))"#),
        "\"x\""
    );
    eval_source(
        &mut ip,
        "(def when2 (macro (c . body) (cons 'if (cons c (cons (cons 'do body) nil)))))",
    )
    .unwrap();
    assert_eq!(eval_str(&mut ip, "(when2 t 1 2 3)"), "3");
    eval_source(&mut ip, "(def list (fn xs xs))").unwrap();
    assert_eq!(eval_str(&mut ip, "{'k 42}"), "((k . 42))");
}

#[test]
fn test_gc_preserves_eq_of_symbols() {
    let mut ip = interp();
    eval_source(&mut ip, "(def a 'marker)").unwrap();
    ip.collect();
    assert_eq!(eval_str(&mut ip, "(eq? a 'marker)"), "t");
}

#[test]
fn test_file_io() {
    let mut ip = interp();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let path_s = path.display().to_string();
    eval_source(
        &mut ip,
        &format!(r#"(def fd (open "{}" "w"))"#, path_s),
    )
    .unwrap();
    eval_source(&mut ip, r#"(write fd "hello file")"#).unwrap();
    eval_source(&mut ip, "(close fd)").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello file");

    eval_source(&mut ip, &format!(r#"(def rfd (open "{}"))"#, path_s)).unwrap();
    assert_eq!(eval_str(&mut ip, "(read rfd 1024)"), "\"hello file\"");
    // At end of file read returns the empty string.
    assert_eq!(eval_str(&mut ip, "(read rfd 1024)"), "\"\"");
    eval_source(&mut ip, "(close rfd)").unwrap();
    assert!(eval_source(&mut ip, r#"(open "/definitely/not/here")"#).is_err());
}

#[test]
fn test_isatty_on_pipe() {
    let mut ip = interp();
    let mut fds = [0i32; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    assert_eq!(
        eval_str(&mut ip, &format!("(isatty {})", fds[0])),
        "()"
    );
    unsafe {
        libc::close(fds[0]);
        libc::close(fds[1]);
    }
}

#[test]
fn test_trap_depth_is_released_on_success() {
    let mut ip = interp();
    // Far more successful traps than the depth cap: depth must unwind.
    for _ in 0..100 {
        assert_eq!(
            eval_str(&mut ip, "(trap-error (fn () 1) (fn (m) m))"),
            "1"
        );
    }
}

#[test]
fn test_heads_must_be_functions() {
    let mut ip = interp();
    let err = eval_source(&mut ip, "(1 2 3)").unwrap_err();
    assert_eq!(err.to_string(), "The head of a list must be a function");
}

#[test]
fn test_obj_printing_uses_object_name() {
    let mut ip = interp();
    eval_source(
        &mut ip,
        r#"(def named (obj nil (cons (cons '*object-name* "point") nil)))"#,
    )
    .unwrap();
    let out = eval_str(&mut ip, "(pr-str named)");
    assert!(out.contains("<object point"), "got {}", out);
}
