// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for rational arithmetic.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::integer::{make_integer, single_limb_value};
use super::ratio::{
    add_ratio_ratio, divide_ratio_ratio, equal_ratio_ratio, greatest_common_divisor, make_ratio,
    multiply_ratio_ratio, simplify_ratio, subtract_ratio_ratio,
};
use crate::memory::conspage::Heap;
use crate::types::CellPtr;

fn ratio(heap: &mut Heap, dividend: i64, divisor: i64) -> CellPtr {
    let d = make_integer(heap, dividend, CellPtr::NIL);
    let v = make_integer(heap, divisor, CellPtr::NIL);
    let frame = CellPtr::NIL;
    make_ratio(heap, frame, d, v)
}

fn parts(heap: &Heap, p: CellPtr) -> (i64, i64) {
    let (dividend, divisor) = heap.ratio_parts(p).unwrap();
    (
        single_limb_value(heap, dividend).unwrap(),
        single_limb_value(heap, divisor).unwrap(),
    )
}

#[test]
fn gcd_is_euclid() {
    assert_eq!(greatest_common_divisor(12, 18), 6);
    assert_eq!(greatest_common_divisor(7, 3), 1);
    assert_eq!(greatest_common_divisor(-12, 18), 6);
    assert_eq!(greatest_common_divisor(0, 5), 5);
}

#[test]
fn make_ratio_requires_integers() {
    let mut heap = Heap::new();
    let s = heap.string_from_str("x");
    let one = make_integer(&mut heap, 1, CellPtr::NIL);
    let result = make_ratio(&mut heap, CellPtr::NIL, s, one);
    assert!(heap.exceptionp(result));
}

#[test]
fn zero_divisor_throws() {
    let mut heap = Heap::new();
    let result = ratio(&mut heap, 1, 0);
    assert!(heap.exceptionp(result));
}

#[test]
fn one_third_stays_one_third() {
    let mut heap = Heap::new();
    let r = ratio(&mut heap, 1, 3);
    assert!(heap.ratiop(r));
    assert_eq!(parts(&heap, r), (1, 3));
}

#[test]
fn simplify_divides_by_the_gcd() {
    let mut heap = Heap::new();
    let r = ratio(&mut heap, 4, 6);
    let simplified = simplify_ratio(&mut heap, CellPtr::NIL, r);
    assert_eq!(parts(&heap, simplified), (2, 3));
}

#[test]
fn simplify_collapses_to_an_integer() {
    let mut heap = Heap::new();
    let r = ratio(&mut heap, 6, 3);
    let simplified = simplify_ratio(&mut heap, CellPtr::NIL, r);
    assert!(heap.integerp(simplified));
    assert_eq!(single_limb_value(&heap, simplified), Some(2));
}

#[test]
fn half_plus_third_is_five_sixths() {
    let mut heap = Heap::new();
    let half = ratio(&mut heap, 1, 2);
    let third = ratio(&mut heap, 1, 3);
    let sum = add_ratio_ratio(&mut heap, CellPtr::NIL, half, third);
    assert_eq!(parts(&heap, sum), (5, 6));
}

#[test]
fn addition_simplifies() {
    let mut heap = Heap::new();
    let a = ratio(&mut heap, 1, 4);
    let b = ratio(&mut heap, 1, 4);
    let sum = add_ratio_ratio(&mut heap, CellPtr::NIL, a, b);
    assert_eq!(parts(&heap, sum), (1, 2));
}

#[test]
fn multiplication_cross_cancels() {
    let mut heap = Heap::new();
    let a = ratio(&mut heap, 2, 3);
    let b = ratio(&mut heap, 3, 4);
    let product = multiply_ratio_ratio(&mut heap, CellPtr::NIL, a, b);
    assert_eq!(parts(&heap, product), (1, 2));
}

#[test]
fn division_multiplies_by_the_reciprocal() {
    let mut heap = Heap::new();
    let a = ratio(&mut heap, 1, 2);
    let b = ratio(&mut heap, 1, 3);
    let quotient = divide_ratio_ratio(&mut heap, CellPtr::NIL, a, b);
    assert!(heap.integerp(quotient) || heap.ratiop(quotient));
    assert_eq!(parts(&heap, quotient), (3, 2));
}

#[test]
fn division_by_a_zero_ratio_throws() {
    let mut heap = Heap::new();
    let a = ratio(&mut heap, 1, 2);
    let zero = ratio(&mut heap, 0, 5);
    let result = divide_ratio_ratio(&mut heap, CellPtr::NIL, a, zero);
    assert!(heap.exceptionp(result));
}

#[test]
fn subtraction_adds_the_inverse() {
    let mut heap = Heap::new();
    let a = ratio(&mut heap, 5, 6);
    let b = ratio(&mut heap, 1, 3);
    let difference = subtract_ratio_ratio(&mut heap, CellPtr::NIL, a, b);
    assert_eq!(parts(&heap, difference), (1, 2));
}

#[test]
fn negative_results_keep_the_divisor_positive() {
    let mut heap = Heap::new();
    let a = ratio(&mut heap, 1, 3);
    let b = ratio(&mut heap, 2, 3);
    let difference = subtract_ratio_ratio(&mut heap, CellPtr::NIL, a, b);
    assert_eq!(parts(&heap, difference), (-1, 3));
}

#[test]
fn cross_multiplication_equality() {
    let mut heap = Heap::new();
    let a = ratio(&mut heap, 1, 2);
    let b = ratio(&mut heap, 2, 4);
    let c = ratio(&mut heap, 2, 3);
    assert!(equal_ratio_ratio(&heap, a, b));
    assert!(!equal_ratio_ratio(&heap, a, c));
}
