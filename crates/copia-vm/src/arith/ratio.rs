// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Rational number cells.
//!
//! A ratio holds pointers to two integers. After any arithmetic the result
//! is simplified: both parts are divided by their greatest common divisor,
//! the divisor is kept positive, and a divisor of one collapses the ratio
//! to a plain integer. Ratio component arithmetic operates on one-cell
//! integer values; a result too large for a single limb raises an
//! exception rather than silently truncating.

use crate::arith::integer::{
    integer_from_i128, integer_is_zero, integer_to_f64, make_integer, single_limb_value,
};
use crate::memory::cell::Payload;
use crate::memory::conspage::Heap;
use crate::ops::eval::throw_exception;
use crate::types::CellPtr;

/// The greatest common divisor of `m` and `n`.
#[must_use]
pub const fn greatest_common_divisor(m: i64, n: i64) -> i64 {
    let mut m = m.abs();
    let mut n = n.abs();
    while m != 0 {
        let o = m;
        m = n % m;
        n = o;
    }
    n
}

/// The one-cell values of a ratio's dividend and divisor.
fn ratio_values(heap: &Heap, p: CellPtr) -> Option<(i64, i64)> {
    let (dividend, divisor) = heap.ratio_parts(p)?;
    Some((
        single_limb_value(heap, dividend)?,
        single_limb_value(heap, divisor)?,
    ))
}

fn throw_string(heap: &mut Heap, message: &str, frame: CellPtr) -> CellPtr {
    let message = heap.string_from_str(message);
    throw_exception(heap, message, frame)
}

/// Construct a ratio from these two pointers, expected to be integers.
///
/// The result arrives with one reference owned by the caller. A zero
/// divisor raises the division-by-zero exception; non-integer parts, or
/// parts too large for one limb, raise a type exception.
pub fn make_ratio(
    heap: &mut Heap,
    frame: CellPtr,
    dividend: CellPtr,
    divisor: CellPtr,
) -> CellPtr {
    if !heap.integerp(dividend) || !heap.integerp(divisor) {
        return throw_string(
            heap,
            "Dividend and divisor of a ratio must be integers",
            frame,
        );
    }
    if integer_is_zero(heap, divisor) {
        return throw_string(heap, "Division by zero", frame);
    }
    if single_limb_value(heap, dividend).is_none() || single_limb_value(heap, divisor).is_none() {
        return throw_string(heap, "Ratio arithmetic overflow", frame);
    }

    heap.inc_ref(dividend);
    heap.inc_ref(divisor);
    let result = heap.allocate(Payload::Ratio { dividend, divisor });
    heap.inc_ref(result);
    result
}

/// Build the simplified number `numerator/denominator`.
///
/// The result arrives with one reference owned by the caller: an integer
/// when the reduced denominator is one, otherwise a reduced ratio with a
/// positive divisor.
fn reduced(heap: &mut Heap, frame: CellPtr, numerator: i128, denominator: i128) -> CellPtr {
    if denominator == 0 {
        return throw_string(heap, "Division by zero", frame);
    }

    let divisor = gcd_i128(numerator, denominator);
    let mut numerator = numerator / divisor;
    let mut denominator = denominator / divisor;
    if denominator < 0 {
        numerator = -numerator;
        denominator = -denominator;
    }

    if denominator == 1 {
        let result = integer_from_i128(heap, numerator);
        heap.inc_ref(result);
        return result;
    }

    let (Ok(num), Ok(den)) = (i64::try_from(numerator), i64::try_from(denominator)) else {
        return throw_string(heap, "Ratio arithmetic overflow", frame);
    };
    let dividend = make_integer(heap, num, CellPtr::NIL);
    let divisor = make_integer(heap, den, CellPtr::NIL);
    make_ratio(heap, frame, dividend, divisor)
}

const fn gcd_i128(m: i128, n: i128) -> i128 {
    let mut m = m.abs();
    let mut n = n.abs();
    while m != 0 {
        let o = m;
        m = n % m;
        n = o;
    }
    if n == 0 { 1 } else { n }
}

/// Return a number of the same value as `arg` but in simplified
/// representation. Raises an exception when `arg` is not a ratio.
///
/// The result arrives with one reference owned by the caller.
pub fn simplify_ratio(heap: &mut Heap, frame: CellPtr, arg: CellPtr) -> CellPtr {
    let Some((dividend, divisor)) = ratio_values(heap, arg) else {
        return throw_string(heap, "Shouldn't happen: bad arg to simplify_ratio", frame);
    };
    reduced(heap, frame, i128::from(dividend), i128::from(divisor))
}

/// The sum of the ratios `arg1` and `arg2`.
///
/// `a/b + c/d = (a·d + c·b)/(b·d)`, then simplify.
pub fn add_ratio_ratio(heap: &mut Heap, frame: CellPtr, arg1: CellPtr, arg2: CellPtr) -> CellPtr {
    let (Some((a, b)), Some((c, d))) = (ratio_values(heap, arg1), ratio_values(heap, arg2)) else {
        return throw_string(heap, "Shouldn't happen: bad arg to add_ratio_ratio", frame);
    };
    let numerator = i128::from(a) * i128::from(d) + i128::from(c) * i128::from(b);
    let denominator = i128::from(b) * i128::from(d);
    reduced(heap, frame, numerator, denominator)
}

/// The product of the ratios `arg1` and `arg2`.
///
/// `a/b × c/d = (a·c)/(b·d)`, then simplify.
pub fn multiply_ratio_ratio(
    heap: &mut Heap,
    frame: CellPtr,
    arg1: CellPtr,
    arg2: CellPtr,
) -> CellPtr {
    let (Some((a, b)), Some((c, d))) = (ratio_values(heap, arg1), ratio_values(heap, arg2)) else {
        return throw_string(
            heap,
            "Shouldn't happen: bad arg to multiply_ratio_ratio",
            frame,
        );
    };
    reduced(
        heap,
        frame,
        i128::from(a) * i128::from(c),
        i128::from(b) * i128::from(d),
    )
}

/// The quotient of the ratios `arg1` and `arg2`: multiply by the
/// reciprocal.
pub fn divide_ratio_ratio(
    heap: &mut Heap,
    frame: CellPtr,
    arg1: CellPtr,
    arg2: CellPtr,
) -> CellPtr {
    let (Some((a, b)), Some((c, d))) = (ratio_values(heap, arg1), ratio_values(heap, arg2)) else {
        return throw_string(
            heap,
            "Shouldn't happen: bad arg to divide_ratio_ratio",
            frame,
        );
    };
    if c == 0 {
        return throw_string(heap, "Division by zero", frame);
    }
    reduced(
        heap,
        frame,
        i128::from(a) * i128::from(d),
        i128::from(b) * i128::from(c),
    )
}

/// The difference of the ratios `arg1` and `arg2`: add the additive
/// inverse.
pub fn subtract_ratio_ratio(
    heap: &mut Heap,
    frame: CellPtr,
    arg1: CellPtr,
    arg2: CellPtr,
) -> CellPtr {
    let (Some((a, b)), Some((c, d))) = (ratio_values(heap, arg1), ratio_values(heap, arg2)) else {
        return throw_string(
            heap,
            "Shouldn't happen: bad arg to subtract_ratio_ratio",
            frame,
        );
    };
    let numerator = i128::from(a) * i128::from(d) - i128::from(c) * i128::from(b);
    reduced(heap, frame, numerator, i128::from(b) * i128::from(d))
}

/// The sum of the integer `intarg` and the ratio `ratarg`: treat the
/// integer `n` as `n/1`.
pub fn add_integer_ratio(
    heap: &mut Heap,
    frame: CellPtr,
    intarg: CellPtr,
    ratarg: CellPtr,
) -> CellPtr {
    let (Some(n), Some((c, d))) = (single_limb_value(heap, intarg), ratio_values(heap, ratarg))
    else {
        return throw_string(heap, "Ratio arithmetic overflow", frame);
    };
    let numerator = i128::from(n) * i128::from(d) + i128::from(c);
    reduced(heap, frame, numerator, i128::from(d))
}

/// The product of the integer `intarg` and the ratio `ratarg`.
pub fn multiply_integer_ratio(
    heap: &mut Heap,
    frame: CellPtr,
    intarg: CellPtr,
    ratarg: CellPtr,
) -> CellPtr {
    let (Some(n), Some((c, d))) = (single_limb_value(heap, intarg), ratio_values(heap, ratarg))
    else {
        return throw_string(heap, "Ratio arithmetic overflow", frame);
    };
    reduced(heap, frame, i128::from(n) * i128::from(c), i128::from(d))
}

/// Compare two ratios by cross-multiplication.
#[must_use]
pub fn equal_ratio_ratio(heap: &Heap, arg1: CellPtr, arg2: CellPtr) -> bool {
    match (ratio_values(heap, arg1), ratio_values(heap, arg2)) {
        (Some((a, b)), Some((c, d))) => i128::from(a) * i128::from(d) == i128::from(c) * i128::from(b),
        _ => false,
    }
}

/// Convert a ratio to a host float.
#[must_use]
pub fn ratio_to_f64(heap: &Heap, p: CellPtr) -> f64 {
    let Some((dividend, divisor)) = heap.ratio_parts(p) else {
        return f64::NAN;
    };
    integer_to_f64(heap, dividend) / integer_to_f64(heap, divisor)
}
