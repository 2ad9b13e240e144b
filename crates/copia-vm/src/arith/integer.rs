// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Arbitrary-precision integers as chains of 60-bit limbs.
//!
//! A chain is least-significant limb first; each cell holds one limb and a
//! `more` pointer to the next more significant cell, NIL at the end. The
//! sign of the whole number rides on the least significant non-zero limb;
//! every limb above it holds a value in `[0, 2^60)`.
//!
//! 60-bit limbs mean two limbs multiply into a 128-bit intermediate
//! without overflow during multiply-accumulate.

use tracing::trace;

use crate::memory::cell::Payload;
use crate::memory::conspage::Heap;
use crate::types::CellPtr;

/// Bits per limb.
pub const LIMB_BITS: u32 = 60;

/// The largest value a single limb can carry.
pub const MAX_LIMB_VALUE: i64 = (1 << LIMB_BITS) - 1;

const LIMB_BASE: u128 = 1 << LIMB_BITS;
const LIMB_MASK: u128 = LIMB_BASE - 1;

/// Allocate an integer cell with this limb `value` and `more` pointing to
/// the more significant cells, or NIL.
///
/// If `more` is not NIL, `value` must not exceed [`MAX_LIMB_VALUE`].
/// Returns NIL when `more` is neither an integer nor NIL.
pub fn make_integer(heap: &mut Heap, value: i64, more: CellPtr) -> CellPtr {
    if !more.is_nil() && !heap.integerp(more) {
        return CellPtr::NIL;
    }
    heap.inc_ref(more);
    heap.allocate(Payload::Integer { value, more })
}

/// Read a chain into sign and magnitude limbs, least significant first.
///
/// Returns `None` when the pointer does not indicate an integer.
fn to_limbs(heap: &Heap, mut p: CellPtr) -> Option<(bool, Vec<u64>)> {
    if !heap.integerp(p) {
        return None;
    }
    let mut negative = false;
    let mut limbs = Vec::new();
    while let Some((value, more)) = heap.integer_parts(p) {
        if value < 0 {
            negative = true;
        }
        limbs.push(value.unsigned_abs());
        p = more;
    }
    Some((negative, limbs))
}

/// Build a chain from sign and magnitude limbs.
///
/// Leading zero limbs are stripped; the sign is stored on the least
/// significant non-zero limb, keeping every other limb in `[0, 2^60)`.
fn from_limbs(heap: &mut Heap, negative: bool, limbs: &[u64]) -> CellPtr {
    let mut significant = limbs.len();
    while significant > 1 && limbs[significant - 1] == 0 {
        significant -= 1;
    }
    let limbs = &limbs[..significant];

    let sign_index = limbs.iter().position(|&limb| limb != 0);

    let mut more = CellPtr::NIL;
    for (index, &limb) in limbs.iter().enumerate().rev() {
        let mut value = limb as i64;
        if negative && Some(index) == sign_index {
            value = -value;
        }
        let cell = make_integer(heap, value, more);
        if heap.exceptionp(cell) {
            return cell;
        }
        more = cell;
    }
    more
}

/// True if every limb of this integer is zero.
#[must_use]
pub fn integer_is_zero(heap: &Heap, mut p: CellPtr) -> bool {
    while let Some((value, more)) = heap.integer_parts(p) {
        if value != 0 {
            return false;
        }
        p = more;
    }
    true
}

/// True if this integer is negative.
#[must_use]
pub fn integer_is_negative(heap: &Heap, mut p: CellPtr) -> bool {
    while let Some((value, more)) = heap.integer_parts(p) {
        if value < 0 {
            return true;
        }
        p = more;
    }
    false
}

/// The value of a one-cell integer, or `None` for longer chains.
#[must_use]
pub fn single_limb_value(heap: &Heap, p: CellPtr) -> Option<i64> {
    match heap.integer_parts(p) {
        Some((value, more)) if more.is_nil() => Some(value),
        _ => None,
    }
}

/// Compare two magnitudes.
fn compare_magnitude(a: &[u64], b: &[u64]) -> std::cmp::Ordering {
    let a_len = a.iter().rposition(|&limb| limb != 0).map_or(0, |i| i + 1);
    let b_len = b.iter().rposition(|&limb| limb != 0).map_or(0, |i| i + 1);
    if a_len != b_len {
        return a_len.cmp(&b_len);
    }
    for index in (0..a_len).rev() {
        if a[index] != b[index] {
            return a[index].cmp(&b[index]);
        }
    }
    std::cmp::Ordering::Equal
}

/// Add two magnitudes, walking both in lockstep with a 128-bit carry.
fn add_magnitudes(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut result = Vec::with_capacity(a.len().max(b.len()) + 1);
    let mut carry: u128 = 0;
    let mut index = 0;

    while index < a.len() || index < b.len() || carry != 0 {
        let av = a.get(index).copied().unwrap_or(0) as u128;
        let bv = b.get(index).copied().unwrap_or(0) as u128;
        let acc = av + bv + carry;
        result.push((acc & LIMB_MASK) as u64);
        carry = acc >> LIMB_BITS;
        index += 1;
    }

    result
}

/// Subtract the smaller magnitude `b` from the larger magnitude `a`.
fn subtract_magnitudes(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut result = Vec::with_capacity(a.len());
    let mut borrow: i128 = 0;

    for index in 0..a.len() {
        let av = a[index] as i128;
        let bv = b.get(index).copied().unwrap_or(0) as i128;
        let mut acc = av - bv - borrow;
        if acc < 0 {
            acc += LIMB_BASE as i128;
            borrow = 1;
        } else {
            borrow = 0;
        }
        result.push(acc as u64);
    }

    result
}

/// Return a pointer to an integer representing the sum of the integers
/// pointed to by `a` and `b`; NIL if either is not an integer.
///
/// The result arrives with one reference owned by the caller.
pub fn add_integers(heap: &mut Heap, a: CellPtr, b: CellPtr) -> CellPtr {
    let (Some((a_neg, a_mag)), Some((b_neg, b_mag))) = (to_limbs(heap, a), to_limbs(heap, b))
    else {
        return CellPtr::NIL;
    };

    trace!(target: "copia::arith", "add_integers: {} limbs plus {} limbs", a_mag.len(), b_mag.len());

    let result = if a_neg == b_neg {
        // Signs agree: add magnitudes, keep the shared sign.
        from_limbs(heap, a_neg, &add_magnitudes(&a_mag, &b_mag))
    } else {
        // Signs differ: subtract the smaller magnitude from the larger and
        // take the sign of the larger.
        match compare_magnitude(&a_mag, &b_mag) {
            std::cmp::Ordering::Equal => make_integer(heap, 0, CellPtr::NIL),
            std::cmp::Ordering::Greater => {
                from_limbs(heap, a_neg, &subtract_magnitudes(&a_mag, &b_mag))
            }
            std::cmp::Ordering::Less => {
                from_limbs(heap, b_neg, &subtract_magnitudes(&b_mag, &a_mag))
            }
        }
    };

    heap.inc_ref(result);
    result
}

/// Return a pointer to an integer representing the product of the integers
/// pointed to by `a` and `b`; NIL if either is not an integer.
///
/// Schoolbook multiplication: each limb of `b` multiplies through `a` with
/// a 128-bit accumulator, offset by its position. The final sign is the
/// exclusive-or of the operand signs.
///
/// The result arrives with one reference owned by the caller.
pub fn multiply_integers(heap: &mut Heap, a: CellPtr, b: CellPtr) -> CellPtr {
    let (Some((a_neg, a_mag)), Some((b_neg, b_mag))) = (to_limbs(heap, a), to_limbs(heap, b))
    else {
        return CellPtr::NIL;
    };

    trace!(target: "copia::arith", "multiply_integers: {} limbs by {} limbs", a_mag.len(), b_mag.len());

    let mut product = vec![0u64; a_mag.len() + b_mag.len() + 1];
    for (j, &bv) in b_mag.iter().enumerate() {
        let mut carry: u128 = 0;
        for (i, &av) in a_mag.iter().enumerate() {
            let acc = av as u128 * bv as u128 + product[i + j] as u128 + carry;
            product[i + j] = (acc & LIMB_MASK) as u64;
            carry = acc >> LIMB_BITS;
        }
        let mut k = j + a_mag.len();
        while carry != 0 {
            let acc = product[k] as u128 + carry;
            product[k] = (acc & LIMB_MASK) as u64;
            carry = acc >> LIMB_BITS;
            k += 1;
        }
    }

    let negative = a_neg != b_neg && product.iter().any(|&limb| limb != 0);
    let result = from_limbs(heap, negative, &product);
    heap.inc_ref(result);
    result
}

/// Return the additive inverse of this integer.
///
/// The result arrives with one reference owned by the caller.
pub fn negate_integer(heap: &mut Heap, p: CellPtr) -> CellPtr {
    let Some((negative, magnitude)) = to_limbs(heap, p) else {
        return CellPtr::NIL;
    };
    let flipped = !negative && !magnitude.iter().all(|&limb| limb == 0);
    let result = from_limbs(heap, flipped, &magnitude);
    heap.inc_ref(result);
    result
}

/// Build an integer chain from a host 128-bit value.
pub fn integer_from_i128(heap: &mut Heap, value: i128) -> CellPtr {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut limbs = Vec::new();
    loop {
        limbs.push((magnitude & LIMB_MASK as u128) as u64);
        magnitude >>= LIMB_BITS;
        if magnitude == 0 {
            break;
        }
    }
    from_limbs(heap, negative, &limbs)
}

/// Sum the chain into a host float; overflow to infinity is acceptable.
#[must_use]
pub fn integer_to_f64(heap: &Heap, p: CellPtr) -> f64 {
    let Some((negative, magnitude)) = to_limbs(heap, p) else {
        return f64::NAN;
    };
    let mut result = 0.0f64;
    let mut scale = 1.0f64;
    for &limb in &magnitude {
        result += limb as f64 * scale;
        scale *= LIMB_BASE as f64;
    }
    if negative { -result } else { result }
}

/// Divide the magnitude in place by a small base, returning the remainder.
fn divide_magnitude_in_place(magnitude: &mut [u64], base: u64) -> u64 {
    let mut remainder: u128 = 0;
    for limb in magnitude.iter_mut().rev() {
        let acc = (remainder << LIMB_BITS) | *limb as u128;
        *limb = (acc / base as u128) as u64;
        remainder = acc % base as u128;
    }
    remainder as u64
}

/// Render this integer in the given base.
///
/// The general principle of printing a bignum is that you print the least
/// significant digit in whatever base you're dealing with, divide the
/// whole chain through by the base, and carry on until nothing is left.
/// Dividing the whole chain, rather than cell by cell, is what keeps the
/// digits right when the number crosses a limb boundary. A thousands
/// separator is inserted every three digits, and a minus sign prepended
/// for negative numbers.
#[must_use]
pub fn integer_to_string(heap: &Heap, p: CellPtr, base: u32) -> String {
    let Some((negative, mut magnitude)) = to_limbs(heap, p) else {
        return String::new();
    };

    if magnitude.iter().all(|&limb| limb == 0) {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while magnitude.iter().any(|&limb| limb != 0) {
        let digit = divide_magnitude_in_place(&mut magnitude, u64::from(base));
        digits.push(char::from_digit(digit as u32, base).unwrap_or('?'));
    }

    let mut result = String::new();
    if negative {
        result.push('-');
    }
    for (position, digit) in digits.iter().rev().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            result.push(',');
        }
        result.push(*digit);
    }
    result
}

/// Compare two integer chains for numeric equality.
#[must_use]
pub fn integers_equal(heap: &Heap, a: CellPtr, b: CellPtr) -> bool {
    match (to_limbs(heap, a), to_limbs(heap, b)) {
        (Some((a_neg, a_mag)), Some((b_neg, b_mag))) => {
            if integer_is_zero(heap, a) && integer_is_zero(heap, b) {
                return true;
            }
            a_neg == b_neg && compare_magnitude(&a_mag, &b_mag) == std::cmp::Ordering::Equal
        }
        _ => false,
    }
}
