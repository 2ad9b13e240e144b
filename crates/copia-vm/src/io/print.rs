// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The printer.
//!
//! For every tag there is exactly one textual form, and for data (lists,
//! strings, symbols, keywords, numbers, NIL and T) the reader accepts
//! that form back. Functions, streams, exceptions and frames render as
//! angle-bracketed descriptions which do not round-trip.

use crate::arith::integer::integer_to_string;
use crate::memory::cell::Tag;
use crate::memory::conspage::Heap;
use crate::memory::vectorspace::VectorObject;
use crate::types::CellPtr;

/// Render any value to its textual form.
#[must_use]
pub fn print_to_string(heap: &Heap, p: CellPtr) -> String {
    let mut out = String::new();
    print(heap, p, &mut out);
    out
}

/// Print the object indicated by `p` onto this buffer.
pub fn print(heap: &Heap, p: CellPtr, out: &mut String) {
    match heap.tag(p) {
        Tag::Nil => out.push_str("nil"),
        Tag::True => out.push('t'),
        Tag::Free => out.push_str("<Free cell>"),
        Tag::Cons => print_list(heap, p, out),
        Tag::String => print_string(heap, p, out),
        Tag::Symbol => print_string_contents(heap, p, out),
        Tag::Keyword => {
            out.push(':');
            print_string_contents(heap, p, out);
        }
        Tag::Integer => out.push_str(&integer_to_string(heap, p, 10)),
        Tag::Ratio => {
            if let Some((dividend, divisor)) = heap.ratio_parts(p) {
                print(heap, dividend, out);
                out.push('/');
                print(heap, divisor, out);
            }
        }
        Tag::Real => print_real(heap.real_value(p).unwrap_or(f64::NAN), out),
        Tag::Lambda => {
            out.push_str("<Anonymous Function: ");
            print_interpretable(heap, p, "\u{3bb}", out);
            out.push('>');
        }
        Tag::NLambda => {
            out.push_str("<Anonymous Special Form: ");
            print_interpretable(heap, p, "n\u{3bb}", out);
            out.push('>');
        }
        Tag::Function => {
            out.push_str("<Function: ");
            if let Some((meta, _)) = heap.function_parts(p) {
                print(heap, meta, out);
            }
            out.push('>');
        }
        Tag::Special => {
            out.push_str("<Special form: ");
            if let Some((meta, _)) = heap.function_parts(p) {
                print(heap, meta, out);
            }
            out.push('>');
        }
        Tag::Read => {
            out.push_str("<Input stream: ");
            if let Some(meta) = heap.stream_meta(p) {
                print(heap, meta, out);
            }
            out.push('>');
        }
        Tag::Write => {
            out.push_str("<Output stream: ");
            if let Some(meta) = heap.stream_meta(p) {
                print(heap, meta, out);
            }
            out.push('>');
        }
        Tag::Exception => print_exception(heap, p, out),
        Tag::VecPointer => print_vector_object(heap, p, out),
    }
}

/// Print all the characters of a string-like chain, without delimiters.
fn print_string_contents(heap: &Heap, mut p: CellPtr, out: &mut String) {
    while let Some((ch, _, cdr)) = heap.string_parts(p) {
        if ch != '\0' {
            out.push(ch);
        }
        p = cdr;
    }
}

/// Print a string with its double quotes.
fn print_string(heap: &Heap, p: CellPtr, out: &mut String) {
    out.push('"');
    print_string_contents(heap, p, out);
    out.push('"');
}

/// Print a list, parenthesized, space-separated, with a dotted tail when
/// the final cdr is neither NIL nor a cons.
fn print_list(heap: &Heap, p: CellPtr, out: &mut String) {
    out.push('(');
    let mut cursor = p;
    let mut first = true;
    loop {
        match heap.tag(cursor) {
            Tag::Cons => {
                if !first {
                    out.push(' ');
                }
                first = false;
                print(heap, heap.car(cursor), out);
                cursor = heap.cdr(cursor);
            }
            Tag::Nil => break,
            _ => {
                out.push_str(" . ");
                print(heap, cursor, out);
                break;
            }
        }
    }
    out.push(')');
}

/// Reals print with enough precision to round-trip; a whole-number real
/// keeps one decimal place so it reads back as a real.
fn print_real(value: f64, out: &mut String) {
    if value.is_finite() && value.fract() == 0.0 {
        out.push_str(&format!("{value:.1}"));
    } else {
        out.push_str(&format!("{value}"));
    }
}

/// Print a lambda or nlambda as `(λ args body…)`.
fn print_interpretable(heap: &Heap, p: CellPtr, marker: &str, out: &mut String) {
    out.push('(');
    out.push_str(marker);
    if let Some((args, body)) = heap.lambda_parts(p) {
        out.push(' ');
        print(heap, args, out);
        let mut cursor = body;
        while heap.consp(cursor) {
            out.push(' ');
            print(heap, heap.car(cursor), out);
            cursor = heap.cdr(cursor);
        }
    }
    out.push(')');
}

/// Print an exception: its message, then the chain of frames it retained.
fn print_exception(heap: &Heap, p: CellPtr, out: &mut String) {
    out.push_str("\nException: ");
    let Some((message, frame)) = heap.exception_parts(p) else {
        return;
    };
    if heap.stringp(message) {
        print_string_contents(heap, message, out);
    } else {
        print(heap, message, out);
    }

    let mut cursor = frame;
    while let Some(f) = heap.frame_ref(cursor) {
        let function = f.function;
        let previous = f.previous;
        out.push_str("\n\tin ");
        if function.is_nil() {
            out.push_str("<anonymous frame>");
        } else {
            print(heap, function, out);
        }
        cursor = previous;
    }
}

/// Print a vector-space object.
fn print_vector_object(heap: &Heap, p: CellPtr, out: &mut String) {
    match heap.vector_object(p) {
        Some(VectorObject::Hashmap(map)) => {
            out.push('{');
            let mut first = true;
            for &bucket in &map.buckets {
                let mut cursor = bucket;
                while heap.consp(cursor) {
                    let entry = heap.car(cursor);
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    print(heap, heap.car(entry), out);
                    out.push(' ');
                    print(heap, heap.cdr(entry), out);
                    cursor = heap.cdr(cursor);
                }
            }
            out.push('}');
        }
        Some(VectorObject::Frame(frame)) => {
            out.push_str(&format!("<Stack frame: {} args>", frame.args_count));
        }
        None => {
            if let Some((tag, address)) = heap.vecp_parts(p) {
                out.push_str(&format!(
                    "<Dangling vector pointer: {} at {address}>",
                    tag.name()
                ));
            }
        }
    }
}

/// Dump the internal representation of the object at this pointer: tag,
/// reference count, and payload, one line per owned cell where useful.
#[must_use]
pub fn dump_object(heap: &Heap, p: CellPtr) -> String {
    let tag = heap.tag(p);
    let mut out = format!(
        "{} (at {p}) count: {} value: ",
        tag.name(),
        heap.count(p)
    );
    print(heap, p, &mut out);
    out.push('\n');

    if tag == Tag::VecPointer {
        if let (Some((vtag, address)), Some((vecp, size))) =
            (heap.vecp_parts(p), heap.vector_object_header(p))
        {
            out.push_str(&format!(
                "\tvector space: {} at {address}, {size} payload bytes, back-pointer {vecp}\n",
                vtag.name()
            ));
        }
        if let Some(frame) = heap.frame_ref(p) {
            for (index, &arg) in frame.args.iter().enumerate() {
                out.push_str(&format!("\targ {index}:\t{}\tcount: {:10}\tvalue: ", heap.tag(arg).name(), heap.count(arg)));
                print(heap, arg, &mut out);
                out.push('\n');
            }
            out.push_str("\tmore: ");
            print(heap, frame.more, &mut out);
            out.push('\n');
        }
    }

    out
}
