// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the printer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::print::{dump_object, print_to_string};
use crate::arith::integer::make_integer;
use crate::arith::ratio::make_ratio;
use crate::arith::tower::make_real;
use crate::memory::conspage::Heap;
use crate::types::CellPtr;
use crate::vm::Vm;

#[test]
fn singletons_print_their_names() {
    let heap = Heap::new();
    assert_eq!(print_to_string(&heap, CellPtr::NIL), "nil");
    assert_eq!(print_to_string(&heap, CellPtr::T), "t");
}

#[test]
fn integers_print_with_thousands_separators() {
    let mut heap = Heap::new();
    let n = make_integer(&mut heap, 1_234_567, CellPtr::NIL);
    assert_eq!(print_to_string(&heap, n), "1,234,567");
}

#[test]
fn ratios_print_dividend_slash_divisor() {
    let mut heap = Heap::new();
    let d = make_integer(&mut heap, 5, CellPtr::NIL);
    let v = make_integer(&mut heap, 6, CellPtr::NIL);
    let r = make_ratio(&mut heap, CellPtr::NIL, d, v);
    assert_eq!(print_to_string(&heap, r), "5/6");
}

#[test]
fn whole_reals_keep_a_decimal_place() {
    let mut heap = Heap::new();
    let r = make_real(&mut heap, 3.0);
    assert_eq!(print_to_string(&heap, r), "3.0");
    let r = make_real(&mut heap, 2.5);
    assert_eq!(print_to_string(&heap, r), "2.5");
}

#[test]
fn strings_are_quoted_and_symbols_are_not() {
    let mut heap = Heap::new();
    let s = heap.string_from_str("text");
    let sym = heap.symbol_from_str("text");
    let kw = heap.keyword_from_str("text");
    assert_eq!(print_to_string(&heap, s), "\"text\"");
    assert_eq!(print_to_string(&heap, sym), "text");
    assert_eq!(print_to_string(&heap, kw), ":text");
}

#[test]
fn lists_print_with_dotted_tails() {
    let mut heap = Heap::new();
    let b = heap.symbol_from_str("b");
    let a = heap.symbol_from_str("a");
    let pair = heap.cons(a, b);
    assert_eq!(print_to_string(&heap, pair), "(a . b)");

    let one = make_integer(&mut heap, 1, CellPtr::NIL);
    let two = make_integer(&mut heap, 2, CellPtr::NIL);
    let tail = heap.cons(two, CellPtr::NIL);
    let list = heap.cons(one, tail);
    assert_eq!(print_to_string(&heap, list), "(1 2)");
}

#[test]
fn functions_print_their_metadata() {
    let mut vm = Vm::new();
    assert_eq!(vm.eval_to_string("(eval 'car)"), "<Function: \"car\">");
    assert_eq!(vm.eval_to_string("(eval 'quote)"), "<Special form: \"quote\">");
}

#[test]
fn lambdas_print_with_the_lambda_marker() {
    let mut vm = Vm::new();
    let text = vm.eval_to_string("(lambda (x) (* x x))");
    assert_eq!(text, "<Anonymous Function: (\u{3bb} (x) (* x x))>");
}

#[test]
fn exceptions_print_message_and_frames() {
    let mut vm = Vm::new();
    let text = vm.eval_to_string("(car 1)");
    assert!(text.starts_with("\nException: Attempt to take CAR of non sequence"));
    assert!(text.contains("in "), "the frame chain is listed");
}

#[test]
fn hashmaps_print_key_value_pairs() {
    let mut vm = Vm::new();
    let text = vm.eval_to_string("{:a 1}");
    assert_eq!(text, "{:a 1}");
}

#[test]
fn dump_shows_tag_and_count() {
    let mut heap = Heap::new();
    let n = make_integer(&mut heap, 9, CellPtr::NIL);
    heap.inc_ref(n);
    let text = dump_object(&heap, n);
    assert!(text.starts_with("INTR"));
    assert!(text.contains("count: 1"));
    assert!(text.contains("value: 9"));
}

#[test]
fn data_round_trips_through_print_and_read() {
    let mut vm = Vm::new();
    for source in [
        "(1 2 3)",
        "(a . b)",
        "\"string\"",
        ":keyword",
        "123,456,789",
        "5/6",
        "-2.5",
        "(nested (lists (here)))",
    ] {
        let printed = vm.eval_to_string(&format!("'{source}")[..]);
        let reprinted = vm.eval_to_string(&format!("'{printed}")[..]);
        assert_eq!(printed, reprinted, "round-trip failed for {source}");
    }
}
