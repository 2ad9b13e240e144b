// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the seed bindings.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use crate::io::StringSink;
use crate::ops::builtins::bind_value;
use crate::types::CellPtr;
use crate::vm::Vm;

fn eval(source: &str) -> String {
    let mut vm = Vm::new();
    vm.eval_to_string(source)
}

/// A machine whose `*out*` stream collects into the returned sink.
fn vm_with_sink() -> (Vm, StringSink) {
    let mut vm = Vm::new();
    let sink = StringSink::new();
    let output = vm
        .heap
        .make_write_stream(Box::new(sink.clone()), CellPtr::NIL);
    bind_value(&mut vm, "*out*", output);
    (vm, sink)
}

/// A unique temporary file seeded with this content.
fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// --- Stores: assoc and keys ----------------------------------------------

#[test]
fn assoc_walks_a_cons_chain_store() {
    assert_eq!(eval("(assoc 'b '((a . 1) (b . 2)))"), "2");
    assert_eq!(eval("(assoc 'missing '((a . 1)))"), "nil");
}

#[test]
fn assoc_walks_a_hashmap_store() {
    assert_eq!(eval("(assoc :b {:a 1, :b 2})"), "2");
    assert_eq!(eval("(assoc :missing {:a 1})"), "nil");
}

#[test]
fn keys_of_a_cons_chain_store() {
    assert_eq!(eval("(keys '((a . 1) (b . 2)))"), "(b a)");
    assert_eq!(eval("(keys nil)"), "nil");
}

#[test]
fn keys_of_a_hashmap_store() {
    assert_eq!(eval("(keys {:a 1})"), "(:a)");
}

// --- eq versus equal ------------------------------------------------------

#[test]
fn eq_is_pointer_identity_only() {
    // Two separately read literals are distinct cells.
    assert_eq!(eval("(eq \"a\" \"a\")"), "nil");
    assert_eq!(eval("(eq '(1) '(1))"), "nil");
    // The same cell is eq to itself.
    assert_eq!(eval("(set! s \"a\") (eq s s)"), "t");
    assert_eq!(eval("(eq nil nil)"), "t");
}

#[test]
fn equal_compares_structure() {
    assert_eq!(eval("(equal \"a\" \"a\")"), "t");
    assert_eq!(eval("(equal '(1 (2 . 3)) '(1 (2 . 3)))"), "t");
    assert_eq!(eval("(equal '(1 2) '(1 3))"), "nil");
    // Numbers compare across the tower.
    assert_eq!(eval("(equal 3 3.0)"), "t");
    assert_eq!(eval("(equal 1/2 2/4)"), "t");
}

// --- Streams: open, slurp, read-char, close, print -----------------------

#[test]
fn open_then_slurp_reads_the_whole_file() {
    let path = temp_file("copia-builtins-test-slurp.lisp", "hello, file");
    let mut vm = Vm::new();
    let source = format!("(slurp (open \"{}\"))", path.display());
    assert_eq!(vm.eval_to_string(&source), "\"hello, file\"");
    std::fs::remove_file(&path).ok();
}

#[test]
fn open_attaches_path_metadata() {
    let path = temp_file("copia-builtins-test-meta.lisp", "");
    let mut vm = Vm::new();
    let source = format!("(open \"{}\")", path.display());
    let text = vm.eval_to_string(&source);
    assert!(text.starts_with("<Input stream: "));
    assert!(text.contains(":path"));
    assert!(text.contains("copia-builtins-test-meta.lisp"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn open_of_a_missing_file_throws() {
    let text = eval("(open \"/no/such/copia-file\")");
    assert!(text.contains("Exception"));
    assert!(text.contains("Could not open"));
}

#[test]
fn read_char_takes_one_character_at_a_time() {
    let path = temp_file("copia-builtins-test-chars.lisp", "he");
    let mut vm = Vm::new();
    vm.eval_to_string(&format!("(set! s (open \"{}\"))", path.display()));
    assert_eq!(vm.eval_to_string("(read-char s)"), "\"h\"");
    assert_eq!(vm.eval_to_string("(read-char s)"), "\"e\"");
    let text = vm.eval_to_string("(read-char s)");
    assert!(text.contains("End of file"), "exhausted stream throws");
    std::fs::remove_file(&path).ok();
}

#[test]
fn close_finalises_the_stream_early() {
    let path = temp_file("copia-builtins-test-close.lisp", "unread");
    let mut vm = Vm::new();
    vm.eval_to_string(&format!("(set! s (open \"{}\"))", path.display()));
    assert_eq!(vm.eval_to_string("(close s)"), "nil");
    let text = vm.eval_to_string("(read-char s)");
    assert!(text.contains("Exception"), "a closed stream reads nothing");
    std::fs::remove_file(&path).ok();
}

#[test]
fn printing_to_a_write_stream_round_trips_through_the_file() {
    let path = std::env::temp_dir().join("copia-builtins-test-write.lisp");
    let mut vm = Vm::new();
    vm.eval_to_string(&format!(
        "(set! o (open \"{}\" t)) (print \"data\" o) (close o)",
        path.display()
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "\"data\"");
    std::fs::remove_file(&path).ok();
}

#[test]
fn println_appends_a_newline_and_returns_its_argument() {
    let (mut vm, sink) = vm_with_sink();
    assert_eq!(vm.eval_to_string("(println 42)"), "42");
    assert_eq!(sink.contents(), "42\n");
}

// --- Reflection: oblist, source, inspect ----------------------------------

#[test]
fn oblist_returns_the_root_environment() {
    assert_eq!(eval("(assoc 'car (oblist))"), "<Function: \"car\">");
    assert_eq!(eval("(type (oblist))"), "\"CONS\"");
}

#[test]
fn oblist_sees_fresh_bindings() {
    assert_eq!(eval("(set! brand-new 7) (assoc 'brand-new (oblist))"), "7");
}

#[test]
fn source_of_a_primitive_is_nil() {
    assert_eq!(eval("(source car)"), "nil");
    assert_eq!(eval("(source 42)"), "nil");
}

#[test]
fn source_of_an_interpretable_function_reconstructs_it() {
    assert_eq!(
        eval("(set! f (lambda (x) (* x x))) (source f)"),
        "(lambda (x) (* x x))"
    );
    assert_eq!(
        eval("(set! g (nlambda (x) x)) (source g)"),
        "(nlambda (x) x)"
    );
}

#[test]
fn inspect_dumps_the_internal_representation() {
    let (mut vm, sink) = vm_with_sink();
    assert_eq!(vm.eval_to_string("(inspect 9)"), "nil");
    let dump = sink.contents();
    assert!(dump.starts_with("INTR"), "the tag leads the dump");
    assert!(dump.contains("value: 9"));
}

// --- apply -----------------------------------------------------------------

#[test]
fn apply_spreads_a_pre_evaluated_argument_list() {
    assert_eq!(eval("(apply + '(4 5))"), "9");
    assert_eq!(eval("(apply list '(1 2 3))"), "(1 2 3)");
    assert_eq!(eval("(apply car '(nil))"), "nil");
}

#[test]
fn apply_accepts_a_computed_function() {
    assert_eq!(eval("(apply (lambda (a b) (- a b)) '(10 4))"), "6");
}

// --- exception and try -----------------------------------------------------

#[test]
fn exception_constructs_a_throwable_value() {
    assert_eq!(eval("(type (exception \"boom\"))"), "\"EXEP\"");
    assert_eq!(eval("(:message (exception \"boom\"))"), "\"boom\"");
}

#[test]
fn exception_passes_an_existing_exception_through() {
    assert_eq!(eval("(:message (exception (exception \"inner\")))"), "\"inner\"");
}

#[test]
fn a_thrown_exception_retains_its_frame() {
    assert_eq!(
        eval("(try ((car 1)) ((type (:frame *exception*))))"),
        "\"VECP\""
    );
}

#[test]
fn try_runs_a_multi_form_handler_in_order() {
    let (mut vm, sink) = vm_with_sink();
    assert_eq!(
        vm.eval_to_string("(try ((exception \"lost\")) ((println \"recovering\") 99))"),
        "99"
    );
    assert_eq!(sink.contents(), "\"recovering\"\n");
}

// --- Arithmetic helpers ----------------------------------------------------

#[test]
fn absolute_strips_the_sign() {
    assert_eq!(eval("(absolute -5)"), "5");
    assert_eq!(eval("(absolute 5)"), "5");
    assert_eq!(eval("(absolute -1/2)"), "1/2");
    assert_eq!(eval("(absolute -2.5)"), "2.5");
}

#[test]
fn negative_is_the_additive_inverse() {
    assert_eq!(eval("(negative 5)"), "-5");
    assert_eq!(eval("(negative -5)"), "5");
    assert_eq!(eval("(negative 1/2)"), "-1/2");
    assert_eq!(eval("(negative 0)"), "0");
}

// --- set -------------------------------------------------------------------

#[test]
fn set_binds_an_evaluated_name() {
    assert_eq!(eval("(set 'x 9) (+ x 1)"), "10");
}

#[test]
fn set_refuses_a_non_symbol_name() {
    let text = eval("(set 1 2)");
    assert!(text.contains("Exception"));
    assert!(text.contains("not a symbol"));
}

// --- type ------------------------------------------------------------------

#[test]
fn type_names_the_tag() {
    assert_eq!(eval("(type nil)"), "\"NIL\"");
    assert_eq!(eval("(type 't)"), "\"TRUE\"");
    assert_eq!(eval("(type \"s\")"), "\"STRG\"");
    assert_eq!(eval("(type 1/2)"), "\"RTIO\"");
    assert_eq!(eval("(type (lambda (x) x))"), "\"LMDA\"");
}
