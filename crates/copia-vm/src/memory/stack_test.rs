// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for stack-frame construction and argument binding.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::conspage::Heap;
use super::stack::{make_special_frame, make_stack_frame};
use super::vectorspace::FRAME_REGISTERS;
use crate::arith::integer::{make_integer, single_limb_value};
use crate::types::CellPtr;
use crate::vm::Vm;

/// Build a Lisp list of small integer literals.
fn integer_list(heap: &mut Heap, values: &[i64]) -> CellPtr {
    let mut result = CellPtr::NIL;
    for &v in values.iter().rev() {
        let cell = make_integer(heap, v, CellPtr::NIL);
        result = heap.cons(cell, result);
    }
    result
}

#[test]
fn registers_hold_evaluated_arguments() {
    let mut vm = Vm::new();
    let args = integer_list(&mut vm.heap, &[10, 20, 30]);
    vm.heap.inc_ref(args);

    let oblist = vm.oblist;
    let frame = make_stack_frame(&mut vm, CellPtr::NIL, args, oblist);
    assert!(vm.heap.framep(frame));

    assert_eq!(
        single_limb_value(&vm.heap, vm.heap.fetch_arg(frame, 0)),
        Some(10)
    );
    assert_eq!(
        single_limb_value(&vm.heap, vm.heap.fetch_arg(frame, 2)),
        Some(30)
    );
    assert_eq!(vm.heap.frame_ref(frame).unwrap().args_count, 3);

    vm.heap.dec_ref(frame);
    vm.heap.dec_ref(args);
}

#[test]
fn ninth_and_later_arguments_overflow() {
    let mut vm = Vm::new();
    let args = integer_list(&mut vm.heap, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    vm.heap.inc_ref(args);

    let oblist = vm.oblist;
    let frame = make_stack_frame(&mut vm, CellPtr::NIL, args, oblist);
    assert_eq!(vm.heap.frame_ref(frame).unwrap().args_count, 10);

    // The first eight land in registers, the rest on the overflow list.
    assert_eq!(
        single_limb_value(&vm.heap, vm.heap.fetch_arg(frame, 7)),
        Some(8)
    );
    assert_eq!(
        single_limb_value(&vm.heap, vm.heap.fetch_arg(frame, 8)),
        Some(9)
    );
    assert_eq!(
        single_limb_value(&vm.heap, vm.heap.fetch_arg(frame, 9)),
        Some(10)
    );

    let more = vm.heap.frame_ref(frame).unwrap().more;
    assert!(vm.heap.consp(more));

    vm.heap.dec_ref(frame);
    vm.heap.dec_ref(args);
}

#[test]
fn argument_exception_abandons_the_frame() {
    let mut vm = Vm::new();
    // `boom` is unbound, so evaluating it throws.
    let boom = vm.heap.symbol_from_str("boom");
    let args = vm.heap.cons(boom, CellPtr::NIL);
    vm.heap.inc_ref(args);

    let oblist = vm.oblist;
    let result = make_stack_frame(&mut vm, CellPtr::NIL, args, oblist);
    assert!(vm.heap.exceptionp(result));

    vm.heap.dec_ref(result);
    vm.heap.dec_ref(args);
}

#[test]
fn special_frames_store_raw_forms() {
    let mut vm = Vm::new();
    // `boom` is unbound; a special frame must not evaluate it.
    let boom = vm.heap.symbol_from_str("boom");
    let args = vm.heap.cons(boom, CellPtr::NIL);
    vm.heap.inc_ref(args);

    let oblist = vm.oblist;
    let frame = make_special_frame(&mut vm, CellPtr::NIL, args, oblist);
    assert!(vm.heap.framep(frame));
    assert_eq!(vm.heap.fetch_arg(frame, 0), boom);

    vm.heap.dec_ref(frame);
    vm.heap.dec_ref(args);
}

#[test]
fn frame_args_list_walks_registers_and_overflow() {
    let mut vm = Vm::new();
    let args = integer_list(&mut vm.heap, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    vm.heap.inc_ref(args);

    let oblist = vm.oblist;
    let frame = make_stack_frame(&mut vm, CellPtr::NIL, args, oblist);
    let list = vm.heap.frame_args_list(frame);
    vm.heap.inc_ref(list);

    let mut count = 0;
    let mut cursor = list;
    while vm.heap.consp(cursor) {
        count += 1;
        cursor = vm.heap.cdr(cursor);
    }
    assert_eq!(count, 9);
    assert!(count > FRAME_REGISTERS);

    vm.heap.dec_ref(list);
    vm.heap.dec_ref(frame);
    vm.heap.dec_ref(args);
}

#[test]
fn setting_a_register_swaps_reference_counts() {
    let mut heap = Heap::new();
    let frame = heap.make_empty_frame(CellPtr::NIL);
    heap.inc_ref(frame);

    let first = heap.string_from_str("first");
    heap.inc_ref(first);
    let second = heap.string_from_str("second");
    heap.inc_ref(second);

    heap.set_register(frame, 0, first);
    assert_eq!(heap.count(first), 2);

    heap.set_register(frame, 0, second);
    assert_eq!(heap.count(first), 1, "overwritten value is released");
    assert_eq!(heap.count(second), 2);

    heap.dec_ref(frame);
    heap.dec_ref(first);
    heap.dec_ref(second);
}
