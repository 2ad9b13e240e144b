// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shallow and deep equality.

use crate::arith::integer::integers_equal;
use crate::arith::ratio::equal_ratio_ratio;
use crate::arith::tower::to_f64;
use crate::memory::cell::Tag;
use crate::memory::conspage::Heap;
use crate::types::CellPtr;

/// Shallow, and thus cheap, equality: true if these two pointers indicate
/// the same object.
#[must_use]
pub fn eq(a: CellPtr, b: CellPtr) -> bool {
    a == b
}

/// True if the objects at these two pointers have the same tag.
#[must_use]
pub fn same_type(heap: &Heap, a: CellPtr, b: CellPtr) -> bool {
    heap.tag(a) == heap.tag(b)
}

/// Reals compare with relative tolerance: not more different than one
/// part in a million of the larger magnitude is close enough.
fn reals_equal(a: f64, b: f64) -> bool {
    let max = a.abs().max(b.abs());
    (a - b).abs() < max / 1_000_000.0 || a == b
}

/// Compare two string-like chains character by character, treating a NIL
/// tail and a sentinel-character tail as the same end of string.
fn chains_equal(heap: &Heap, mut a: CellPtr, mut b: CellPtr) -> bool {
    loop {
        let a_end = heap.end_of_stringp(a);
        let b_end = heap.end_of_stringp(b);
        if a_end || b_end {
            return a_end && b_end;
        }
        let (Some((a_ch, a_hash, a_cdr)), Some((b_ch, b_hash, b_cdr))) =
            (heap.string_parts(a), heap.string_parts(b))
        else {
            return false;
        };
        if a_ch != b_ch || a_hash != b_hash {
            return false;
        }
        a = a_cdr;
        b = b_cdr;
    }
}

/// Deep, and thus expensive, equality: true if these two objects have
/// identical structure.
///
/// Numbers compare across the tower: integers limb by limb, ratios by
/// cross-multiplication, reals within tolerance, and a mixed integer/real
/// pair by converting the integer.
#[must_use]
pub fn equal(heap: &Heap, a: CellPtr, b: CellPtr) -> bool {
    if eq(a, b) {
        return true;
    }

    if same_type(heap, a, b) {
        match heap.tag(a) {
            Tag::Cons => {
                // Iterate on the cdr so list length costs no host stack;
                // recursion is only as deep as the tree.
                let mut a = a;
                let mut b = b;
                loop {
                    if !heap.consp(a) || !heap.consp(b) {
                        return equal(heap, a, b);
                    }
                    if !equal(heap, heap.car(a), heap.car(b)) {
                        return false;
                    }
                    a = heap.cdr(a);
                    b = heap.cdr(b);
                    if eq(a, b) {
                        return true;
                    }
                }
            }
            Tag::Lambda | Tag::NLambda => {
                let (Some((a_args, a_body)), Some((b_args, b_body))) =
                    (heap.lambda_parts(a), heap.lambda_parts(b))
                else {
                    return false;
                };
                equal(heap, a_args, b_args) && equal(heap, a_body, b_body)
            }
            Tag::String | Tag::Symbol | Tag::Keyword => chains_equal(heap, a, b),
            Tag::Integer => integers_equal(heap, a, b),
            Tag::Ratio => equal_ratio_ratio(heap, a, b),
            Tag::Real => reals_equal(to_f64(heap, a), to_f64(heap, b)),
            _ => false,
        }
    } else if heap.numberp(a) && heap.numberp(b) {
        // There's only supposed ever to be one T and one NIL cell, so each
        // is caught by eq above; mixed-type numbers fall through to here.
        if heap.integerp(a) && heap.realp(b) || heap.realp(a) && heap.integerp(b) {
            reals_equal(to_f64(heap, a), to_f64(heap, b))
        } else {
            false
        }
    } else {
        false
    }
}
