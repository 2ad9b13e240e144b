// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Coercions across the numeric tower: integer ≺ ratio ≺ real.
//!
//! Binary operations promote both operands to the higher type in the
//! ladder and dispatch on the result type. Every function here follows the
//! evaluator's result convention: the returned pointer arrives with one
//! reference owned by the caller, and exceptions pass straight through.

use crate::arith::integer::{
    add_integers, integer_is_negative, integer_is_zero, integer_to_f64, make_integer,
    multiply_integers, negate_integer,
};
use crate::arith::ratio::{
    add_integer_ratio, add_ratio_ratio, divide_ratio_ratio, make_ratio, multiply_integer_ratio,
    multiply_ratio_ratio, ratio_to_f64, simplify_ratio, subtract_ratio_ratio,
};
use crate::memory::cell::{Payload, Tag};
use crate::memory::conspage::Heap;
use crate::ops::eval::throw_exception;
use crate::types::CellPtr;

/// Allocate a real-number cell.
pub fn make_real(heap: &mut Heap, value: f64) -> CellPtr {
    heap.allocate(Payload::Real { value })
}

/// True if this number is zero.
#[must_use]
pub fn zerop(heap: &Heap, p: CellPtr) -> bool {
    match heap.tag(p) {
        Tag::Integer => integer_is_zero(heap, p),
        Tag::Ratio => heap
            .ratio_parts(p)
            .is_some_and(|(dividend, _)| integer_is_zero(heap, dividend)),
        Tag::Real => heap.real_value(p) == Some(0.0),
        _ => false,
    }
}

/// True if this number is negative.
#[must_use]
pub fn is_negative(heap: &Heap, p: CellPtr) -> bool {
    match heap.tag(p) {
        Tag::Integer => integer_is_negative(heap, p),
        Tag::Ratio => heap
            .ratio_parts(p)
            .is_some_and(|(dividend, _)| integer_is_negative(heap, dividend)),
        Tag::Real => heap.real_value(p).is_some_and(|v| v < 0.0),
        _ => false,
    }
}

/// Convert any number to a host float; not-a-number for anything else.
#[must_use]
pub fn to_f64(heap: &Heap, p: CellPtr) -> f64 {
    match heap.tag(p) {
        Tag::Integer => integer_to_f64(heap, p),
        Tag::Ratio => ratio_to_f64(heap, p),
        Tag::Real => heap.real_value(p).unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn throw_string(heap: &mut Heap, message: &str, frame: CellPtr) -> CellPtr {
    let message = heap.string_from_str(message);
    throw_exception(heap, message, frame)
}

fn owned(heap: &mut Heap, p: CellPtr) -> CellPtr {
    heap.inc_ref(p);
    p
}

fn owned_real(heap: &mut Heap, value: f64) -> CellPtr {
    let result = make_real(heap, value);
    heap.inc_ref(result);
    result
}

/// The additive inverse of `arg`; NIL and T invert into each other.
pub fn negative(heap: &mut Heap, frame: CellPtr, arg: CellPtr) -> CellPtr {
    match heap.tag(arg) {
        Tag::Exception => owned(heap, arg),
        Tag::Nil => owned(heap, CellPtr::T),
        Tag::True => CellPtr::NIL,
        Tag::Integer => negate_integer(heap, arg),
        Tag::Ratio => {
            let Some((dividend, divisor)) = heap.ratio_parts(arg) else {
                return CellPtr::NIL;
            };
            let negated = negate_integer(heap, dividend);
            let result = make_ratio(heap, frame, negated, divisor);
            heap.dec_ref(negated);
            result
        }
        Tag::Real => {
            let value = heap.real_value(arg).unwrap_or(f64::NAN);
            owned_real(heap, -value)
        }
        _ => throw_string(heap, "Cannot negate: not a number", frame),
    }
}

/// The absolute value of `arg`.
pub fn absolute(heap: &mut Heap, frame: CellPtr, arg: CellPtr) -> CellPtr {
    if heap.numberp(arg) && is_negative(heap, arg) {
        negative(heap, frame, arg)
    } else if heap.numberp(arg) || heap.exceptionp(arg) {
        owned(heap, arg)
    } else {
        throw_string(heap, "Cannot take absolute value: not a number", frame)
    }
}

/// The sum of the numbers `arg1` and `arg2`.
pub fn add_2(heap: &mut Heap, frame: CellPtr, arg1: CellPtr, arg2: CellPtr) -> CellPtr {
    if heap.exceptionp(arg1) {
        return owned(heap, arg1);
    }
    if heap.exceptionp(arg2) {
        return owned(heap, arg2);
    }
    if zerop(heap, arg1) && heap.numberp(arg2) {
        return owned(heap, arg2);
    }
    if zerop(heap, arg2) && heap.numberp(arg1) {
        return owned(heap, arg1);
    }

    match (heap.tag(arg1), heap.tag(arg2)) {
        (Tag::Integer, Tag::Integer) => add_integers(heap, arg1, arg2),
        (Tag::Integer, Tag::Ratio) => add_integer_ratio(heap, frame, arg1, arg2),
        (Tag::Ratio, Tag::Integer) => add_integer_ratio(heap, frame, arg2, arg1),
        (Tag::Ratio, Tag::Ratio) => add_ratio_ratio(heap, frame, arg1, arg2),
        (Tag::Real, tag) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) + to_f64(heap, arg2))
        }
        (tag, Tag::Real) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) + to_f64(heap, arg2))
        }
        _ => throw_string(heap, "Cannot add: not a number", frame),
    }
}

/// The product of the numbers `arg1` and `arg2`.
pub fn multiply_2(heap: &mut Heap, frame: CellPtr, arg1: CellPtr, arg2: CellPtr) -> CellPtr {
    if heap.exceptionp(arg1) {
        return owned(heap, arg1);
    }
    if heap.exceptionp(arg2) {
        return owned(heap, arg2);
    }

    match (heap.tag(arg1), heap.tag(arg2)) {
        (Tag::Integer, Tag::Integer) => multiply_integers(heap, arg1, arg2),
        (Tag::Integer, Tag::Ratio) => multiply_integer_ratio(heap, frame, arg1, arg2),
        (Tag::Ratio, Tag::Integer) => multiply_integer_ratio(heap, frame, arg2, arg1),
        (Tag::Ratio, Tag::Ratio) => multiply_ratio_ratio(heap, frame, arg1, arg2),
        (Tag::Real, tag) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) * to_f64(heap, arg2))
        }
        (tag, Tag::Real) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) * to_f64(heap, arg2))
        }
        _ => throw_string(heap, "Cannot multiply: not a number", frame),
    }
}

/// The difference of the numbers `arg1` and `arg2`.
pub fn subtract_2(heap: &mut Heap, frame: CellPtr, arg1: CellPtr, arg2: CellPtr) -> CellPtr {
    if heap.exceptionp(arg1) {
        return owned(heap, arg1);
    }
    if heap.exceptionp(arg2) {
        return owned(heap, arg2);
    }

    match (heap.tag(arg1), heap.tag(arg2)) {
        (Tag::Integer, Tag::Integer) => {
            let negated = negate_integer(heap, arg2);
            let result = add_integers(heap, arg1, negated);
            heap.dec_ref(negated);
            result
        }
        (Tag::Integer, Tag::Ratio) => {
            let one = make_integer(heap, 1, CellPtr::NIL);
            let as_ratio = make_ratio(heap, frame, arg1, one);
            if heap.exceptionp(as_ratio) {
                return as_ratio;
            }
            let result = subtract_ratio_ratio(heap, frame, as_ratio, arg2);
            heap.dec_ref(as_ratio);
            result
        }
        (Tag::Ratio, Tag::Integer) => {
            let one = make_integer(heap, 1, CellPtr::NIL);
            let as_ratio = make_ratio(heap, frame, arg2, one);
            if heap.exceptionp(as_ratio) {
                return as_ratio;
            }
            let result = subtract_ratio_ratio(heap, frame, arg1, as_ratio);
            heap.dec_ref(as_ratio);
            result
        }
        (Tag::Ratio, Tag::Ratio) => subtract_ratio_ratio(heap, frame, arg1, arg2),
        (Tag::Real, tag) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) - to_f64(heap, arg2))
        }
        (tag, Tag::Real) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) - to_f64(heap, arg2))
        }
        _ => throw_string(heap, "Cannot subtract: not a number", frame),
    }
}

/// The quotient of the numbers `arg1` and `arg2`.
///
/// Integer division builds a ratio and simplifies it, so `(/ 4 2)` is the
/// integer 2 while `(/ 1 3)` stays `1/3`.
pub fn divide_2(heap: &mut Heap, frame: CellPtr, arg1: CellPtr, arg2: CellPtr) -> CellPtr {
    if heap.exceptionp(arg1) {
        return owned(heap, arg1);
    }
    if heap.exceptionp(arg2) {
        return owned(heap, arg2);
    }

    match (heap.tag(arg1), heap.tag(arg2)) {
        (Tag::Integer, Tag::Integer) => {
            let unsimplified = make_ratio(heap, frame, arg1, arg2);
            if heap.exceptionp(unsimplified) {
                return unsimplified;
            }
            let result = simplify_ratio(heap, frame, unsimplified);
            heap.dec_ref(unsimplified);
            result
        }
        (Tag::Integer, Tag::Ratio) => {
            let one = make_integer(heap, 1, CellPtr::NIL);
            let as_ratio = make_ratio(heap, frame, arg1, one);
            if heap.exceptionp(as_ratio) {
                return as_ratio;
            }
            let result = divide_ratio_ratio(heap, frame, as_ratio, arg2);
            heap.dec_ref(as_ratio);
            result
        }
        (Tag::Ratio, Tag::Integer) => {
            let one = make_integer(heap, 1, CellPtr::NIL);
            let as_ratio = make_ratio(heap, frame, arg2, one);
            if heap.exceptionp(as_ratio) {
                return as_ratio;
            }
            let result = divide_ratio_ratio(heap, frame, arg1, as_ratio);
            heap.dec_ref(as_ratio);
            result
        }
        (Tag::Ratio, Tag::Ratio) => divide_ratio_ratio(heap, frame, arg1, arg2),
        (Tag::Real, tag) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) / to_f64(heap, arg2))
        }
        (tag, Tag::Real) if is_number_tag(tag) => {
            owned_real(heap, to_f64(heap, arg1) / to_f64(heap, arg2))
        }
        _ => throw_string(heap, "Cannot divide: not a number", frame),
    }
}

const fn is_number_tag(tag: Tag) -> bool {
    matches!(tag, Tag::Integer | Tag::Ratio | Tag::Real)
}
