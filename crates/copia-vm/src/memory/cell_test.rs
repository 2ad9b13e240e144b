// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for cell constructors, accessors and predicates.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::cell::Tag;
use super::conspage::Heap;
use crate::types::CellPtr;

#[test]
fn cons_holds_its_pair() {
    let mut heap = Heap::new();
    let a = heap.string_from_str("a");
    let b = heap.string_from_str("b");
    let pair = heap.cons(a, b);

    assert!(heap.consp(pair));
    assert_eq!(heap.car(pair), a);
    assert_eq!(heap.cdr(pair), b);
    assert_eq!(heap.count(a), 1, "cons retains its car");
    assert_eq!(heap.count(b), 1, "cons retains its cdr");
}

#[test]
fn string_round_trips_through_the_heap() {
    let mut heap = Heap::new();
    let s = heap.string_from_str("hello, world");
    assert!(heap.stringp(s));
    assert_eq!(heap.string_to_host(s), "hello, world");
}

#[test]
fn empty_string_is_a_single_sentinel_cell() {
    let mut heap = Heap::new();
    let s = heap.string_from_str("");
    assert!(heap.stringp(s));
    assert!(heap.end_of_stringp(s));
    assert_eq!(heap.string_to_host(s), "");
}

#[test]
fn symbols_and_strings_differ_only_by_tag() {
    let mut heap = Heap::new();
    let string = heap.string_from_str("quote");
    let symbol = heap.symbol_from_str("quote");
    let keyword = heap.keyword_from_str("quote");

    assert_eq!(heap.tag(string), Tag::String);
    assert_eq!(heap.tag(symbol), Tag::Symbol);
    assert_eq!(heap.tag(keyword), Tag::Keyword);
    assert_eq!(heap.string_to_host(string), heap.string_to_host(symbol));
    assert_eq!(heap.string_to_host(symbol), heap.string_to_host(keyword));
}

#[test]
fn equal_chains_carry_equal_hashes() {
    let mut heap = Heap::new();
    let a = heap.symbol_from_str("lambda");
    let b = heap.symbol_from_str("lambda");
    let c = heap.symbol_from_str("lambdb");

    assert_eq!(heap.chain_hash_of(a), heap.chain_hash_of(b));
    assert_ne!(heap.chain_hash_of(a), heap.chain_hash_of(c));
}

#[test]
fn terminated_and_unterminated_strings_hash_alike() {
    let mut heap = Heap::new();
    let plain = heap.string_from_str("ab");
    // The same text with an explicit sentinel cell at the end.
    let sentinel = heap.make_string('\0', CellPtr::NIL);
    let b = heap.make_string('b', sentinel);
    let terminated = heap.make_string('a', b);

    assert_eq!(heap.chain_hash_of(plain), heap.chain_hash_of(terminated));
}

#[test]
fn lambda_retains_formals_and_body() {
    let mut heap = Heap::new();
    let args = heap.symbol_from_str("x");
    let body = heap.cons(CellPtr::NIL, CellPtr::NIL);
    let lambda = heap.make_lambda(args, body);

    assert!(heap.lambdap(lambda));
    assert_eq!(heap.lambda_parts(lambda), Some((args, body)));
    assert_eq!(heap.count(args), 1);
    assert_eq!(heap.count(body), 1);
}

#[test]
fn exception_retains_message_and_frame() {
    let mut heap = Heap::new();
    let message = heap.string_from_str("boom");
    let exception = heap.make_exception(message, CellPtr::NIL);

    assert!(heap.exceptionp(exception));
    assert_eq!(heap.exception_parts(exception), Some((message, CellPtr::NIL)));
    assert_eq!(heap.count(message), 1);
}

#[test]
fn numberp_covers_the_tower() {
    let mut heap = Heap::new();
    let n = crate::arith::integer::make_integer(&mut heap, 5, CellPtr::NIL);
    let r = crate::arith::tower::make_real(&mut heap, 2.5);
    let s = heap.string_from_str("5");

    assert!(heap.numberp(n));
    assert!(heap.numberp(r));
    assert!(!heap.numberp(s));
    assert!(heap.sequencep(s));
    assert!(!heap.sequencep(n));
}

#[test]
fn access_pointer_is_reserved_and_nil() {
    let mut heap = Heap::new();
    let pair = heap.cons(CellPtr::NIL, CellPtr::NIL);
    assert_eq!(heap.cell(pair).access, CellPtr::NIL);
}
