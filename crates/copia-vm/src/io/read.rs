// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The reader: a character-at-a-time s-expression parser.
//!
//! Things which may be read are strings, numbers (integer, ratio or
//! real), lists, maps, keywords, quoted forms, path expressions and
//! atoms. The reader pulls decoded characters from a stream cell with one
//! character of pushback, so local files, strings and URL-backed streams
//! all behave identically.

use tracing::trace;

use crate::arith::integer::{add_integers, integer_to_f64, make_integer, multiply_integers};
use crate::arith::ratio::make_ratio;
use crate::arith::tower::{make_real, negative};
use crate::memory::cell::Tag;
use crate::memory::vectorspace::DEFAULT_HASHMAP_BUCKETS;
use crate::ops::eval::{eval_form, owned, throw_message, throw_with_value};
use crate::types::CellPtr;
use crate::vm::Vm;

/// Read the next object on this input stream.
///
/// The result, like every evaluator-path result, arrives with one
/// reference owned by the caller.
pub fn read(vm: &mut Vm, frame: CellPtr, env: CellPtr, input: CellPtr) -> CellPtr {
    let initial = vm.heap.stream_getwc(input);
    read_continuation(vm, frame, env, input, initial)
}

/// True for characters which end a symbol or keyword token.
const fn is_token_break(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '{' | '}' | '"' | '\'' | ':' | '/' | ';'
    )
}

/// Skip whitespace and control characters, returning the first meaningful
/// character, or `None` at end of input.
fn skip_blanks(vm: &mut Vm, input: CellPtr, initial: Option<char>) -> Option<char> {
    let mut c = initial;
    loop {
        match c {
            Some(ch) if ch == '\0' || ch.is_whitespace() || ch.is_control() => {
                c = vm.heap.stream_getwc(input);
            }
            _ => return c,
        }
    }
}

/// Wrap a form in `(quote …)`.
fn c_quote(vm: &mut Vm, arg: CellPtr) -> CellPtr {
    let quote = vm.heap.symbol_from_str("quote");
    let inner = vm.heap.cons(arg, CellPtr::NIL);
    let outer = vm.heap.cons(quote, inner);
    let result = owned(&mut vm.heap, outer);
    vm.heap.dec_ref(arg);
    result
}

/// Read the next object, treating `initial` as its first character.
pub fn read_continuation(
    vm: &mut Vm,
    frame: CellPtr,
    env: CellPtr,
    input: CellPtr,
    initial: Option<char>,
) -> CellPtr {
    trace!(target: "copia::io", "entering read_continuation");

    let Some(c) = skip_blanks(vm, input, initial) else {
        return throw_message(&mut vm.heap, "End of file while reading", frame);
    };

    match c {
        ';' => {
            // Skip all characters from semicolon to the end of the line.
            loop {
                match vm.heap.stream_getwc(input) {
                    Some('\n') | None => break,
                    Some(_) => {}
                }
            }
            let next = vm.heap.stream_getwc(input);
            read_continuation(vm, frame, env, input, next)
        }
        '\'' => {
            let next = vm.heap.stream_getwc(input);
            let inner = read_continuation(vm, frame, env, input, next);
            if vm.heap.exceptionp(inner) {
                return inner;
            }
            c_quote(vm, inner)
        }
        '(' => {
            let next = vm.heap.stream_getwc(input);
            read_list(vm, frame, env, input, next)
        }
        '{' => read_map(vm, frame, env, input),
        '"' => read_string_chain(vm, frame, input),
        '-' => {
            let next = vm.heap.stream_getwc(input);
            if next.is_some_and(|n| n.is_ascii_digit()) {
                if let Some(n) = next {
                    vm.heap.stream_ungetwc(input, n);
                }
                read_number(vm, frame, input, '-', false)
            } else {
                if let Some(n) = next {
                    vm.heap.stream_ungetwc(input, n);
                }
                read_symbol_or_key(vm, input, Tag::Symbol, '-')
            }
        }
        '.' => {
            let next = vm.heap.stream_getwc(input);
            match next {
                Some(n) if n.is_ascii_digit() => {
                    vm.heap.stream_ungetwc(input, n);
                    read_number(vm, frame, input, '.', false)
                }
                Some(n) if n.is_whitespace() => {
                    // A bare period reads as the following form; dotted
                    // pairs are handled inside read_list.
                    read_continuation(vm, frame, env, input, Some(n))
                }
                _ => {
                    if let Some(n) = next {
                        vm.heap.stream_ungetwc(input, n);
                    }
                    read_symbol_or_key(vm, input, Tag::Symbol, '.')
                }
            }
        }
        ':' => match vm.heap.stream_getwc(input) {
            Some(n) => read_symbol_or_key(vm, input, Tag::Keyword, n),
            None => throw_message(&mut vm.heap, "End of file while reading", frame),
        },
        '/' => {
            // A slash followed by whitespace is the division operator;
            // anything else starts a path expression.
            let next = vm.heap.stream_getwc(input);
            match next {
                None => {
                    let result = vm.heap.symbol_from_str("/");
                    owned(&mut vm.heap, result)
                }
                Some(n) if n.is_whitespace() || n.is_control() => {
                    vm.heap.stream_ungetwc(input, n);
                    let result = vm.heap.symbol_from_str("/");
                    owned(&mut vm.heap, result)
                }
                Some(n) => {
                    vm.heap.stream_ungetwc(input, n);
                    read_path(vm, frame, input, c)
                }
            }
        }
        ')' | '}' => {
            let value = vm.heap.make_string(c, CellPtr::NIL);
            throw_with_value(
                &mut vm.heap,
                "Unexpected close bracket while reading",
                value,
                frame,
            )
        }
        '$' | '\u{a7}' => read_path(vm, frame, input, c),
        _ if c.is_ascii_digit() => read_number(vm, frame, input, c, false),
        _ if !c.is_control() => read_symbol_or_key(vm, input, Tag::Symbol, c),
        _ => {
            let value = vm.heap.make_string(c, CellPtr::NIL);
            throw_with_value(
                &mut vm.heap,
                "Unrecognised start of input character",
                value,
                frame,
            )
        }
    }
}

/// Read a number, given this initial character.
///
/// Accepts digits with ignored thousands commas, one optional period for
/// a real, or one slash separating the two integer parts of a ratio. The
/// value is accumulated with chain arithmetic, so literals of any
/// magnitude are exact.
fn read_number(
    vm: &mut Vm,
    frame: CellPtr,
    input: CellPtr,
    initial: char,
    mut seen_period: bool,
) -> CellPtr {
    trace!(target: "copia::io", "entering read_number");

    let negative_number = initial == '-';
    let mut c = if negative_number {
        vm.heap.stream_getwc(input)
    } else {
        Some(initial)
    };

    let zero = make_integer(&mut vm.heap, 0, CellPtr::NIL);
    let mut result = owned(&mut vm.heap, zero);
    let ten = make_integer(&mut vm.heap, 10, CellPtr::NIL);
    let base = owned(&mut vm.heap, ten);
    let mut dividend = CellPtr::NIL;
    let mut places_of_decimals = 0i32;

    loop {
        let Some(ch) = c else { break };
        if !ch.is_ascii_digit() && ch != '.' && ch != '/' && ch != ',' {
            break;
        }
        match ch {
            '.' => {
                if seen_period || dividend.is_truthy() {
                    vm.heap.dec_ref(result);
                    vm.heap.dec_ref(base);
                    if dividend.is_truthy() {
                        vm.heap.dec_ref(dividend);
                    }
                    return throw_message(
                        &mut vm.heap,
                        "Malformed number: too many periods",
                        frame,
                    );
                }
                seen_period = true;
            }
            '/' => {
                if seen_period || dividend.is_truthy() {
                    vm.heap.dec_ref(result);
                    vm.heap.dec_ref(base);
                    if dividend.is_truthy() {
                        vm.heap.dec_ref(dividend);
                    }
                    return throw_message(
                        &mut vm.heap,
                        "Malformed number: dividend of rational must be integer",
                        frame,
                    );
                }
                dividend = result;
                let zero = make_integer(&mut vm.heap, 0, CellPtr::NIL);
                result = owned(&mut vm.heap, zero);
            }
            ',' => {
                // A thousands separator; silently discard it.
            }
            digit => {
                let value = i64::from(digit.to_digit(10).unwrap_or(0));
                let scaled = multiply_integers(&mut vm.heap, result, base);
                vm.heap.dec_ref(result);
                let addend = make_integer(&mut vm.heap, value, CellPtr::NIL);
                vm.heap.inc_ref(addend);
                result = add_integers(&mut vm.heap, scaled, addend);
                vm.heap.dec_ref(scaled);
                vm.heap.dec_ref(addend);
                if seen_period {
                    places_of_decimals += 1;
                }
            }
        }
        c = vm.heap.stream_getwc(input);
    }

    // Push back the character which was not part of the number.
    if let Some(ch) = c {
        vm.heap.stream_ungetwc(input, ch);
    }
    vm.heap.dec_ref(base);

    if seen_period {
        let mut value = integer_to_f64(&vm.heap, result) / 10f64.powi(places_of_decimals);
        if negative_number {
            value = -value;
        }
        vm.heap.dec_ref(result);
        let real = make_real(&mut vm.heap, value);
        return owned(&mut vm.heap, real);
    }

    if dividend.is_truthy() {
        let ratio = make_ratio(&mut vm.heap, frame, dividend, result);
        vm.heap.dec_ref(dividend);
        vm.heap.dec_ref(result);
        if negative_number && !vm.heap.exceptionp(ratio) {
            let negated = negative(&mut vm.heap, frame, ratio);
            vm.heap.dec_ref(ratio);
            return negated;
        }
        return ratio;
    }

    if negative_number {
        let negated = negative(&mut vm.heap, frame, result);
        vm.heap.dec_ref(result);
        return negated;
    }
    result
}

/// Read a list; the opening parenthesis is already consumed.
fn read_list(
    vm: &mut Vm,
    frame: CellPtr,
    env: CellPtr,
    input: CellPtr,
    initial: Option<char>,
) -> CellPtr {
    let Some(c) = skip_blanks(vm, input, initial) else {
        return throw_message(&mut vm.heap, "End of file while reading a list", frame);
    };
    if c == ')' {
        return owned(&mut vm.heap, CellPtr::NIL);
    }

    let car = read_continuation(vm, frame, env, input, Some(c));
    if vm.heap.exceptionp(car) {
        return car;
    }

    let next = vm.heap.stream_getwc(input);
    let Some(after) = skip_blanks(vm, input, next) else {
        vm.heap.dec_ref(car);
        return throw_message(&mut vm.heap, "End of file while reading a list", frame);
    };

    if after == '.' {
        let peek = vm.heap.stream_getwc(input);
        if peek.is_none_or(|p| p.is_whitespace() || p.is_control()) {
            // A lone period: the next form is the dotted tail.
            let rest = read_list(vm, frame, env, input, peek);
            if vm.heap.exceptionp(rest) {
                vm.heap.dec_ref(car);
                return rest;
            }
            let tail = vm.heap.car(rest);
            vm.heap.inc_ref(tail);
            vm.heap.dec_ref(rest);
            let pair = vm.heap.cons(car, tail);
            let result = owned(&mut vm.heap, pair);
            vm.heap.dec_ref(car);
            vm.heap.dec_ref(tail);
            return result;
        }
        if let Some(p) = peek {
            vm.heap.stream_ungetwc(input, p);
        }
    }

    let rest = read_list(vm, frame, env, input, Some(after));
    if vm.heap.exceptionp(rest) {
        vm.heap.dec_ref(car);
        return rest;
    }
    let pair = vm.heap.cons(car, rest);
    let result = owned(&mut vm.heap, pair);
    vm.heap.dec_ref(car);
    vm.heap.dec_ref(rest);
    result
}

/// Read a hashmap literal; the opening brace is already consumed.
///
/// Key and value forms alternate until the closing brace; commas are
/// whitespace. Value forms are evaluated as they are read. The map is
/// open for in-place update while it is being built and sealed before it
/// is returned.
fn read_map(vm: &mut Vm, frame: CellPtr, env: CellPtr, input: CellPtr) -> CellPtr {
    let map = vm
        .heap
        .make_hashmap(DEFAULT_HASHMAP_BUCKETS, CellPtr::NIL, CellPtr::T);
    if vm.heap.exceptionp(map) {
        return owned(&mut vm.heap, map);
    }
    vm.heap.inc_ref(map);

    loop {
        let next = vm.heap.stream_getwc(input);
        let Some(c) = skip_commas_and_blanks(vm, input, next) else {
            vm.heap.dec_ref(map);
            return throw_message(&mut vm.heap, "End of file while reading a map", frame);
        };
        if c == '}' {
            break;
        }

        let key = read_continuation(vm, frame, env, input, Some(c));
        if vm.heap.exceptionp(key) {
            vm.heap.dec_ref(map);
            return key;
        }

        let next = vm.heap.stream_getwc(input);
        let Some(c) = skip_blanks(vm, input, next) else {
            vm.heap.dec_ref(key);
            vm.heap.dec_ref(map);
            return throw_message(&mut vm.heap, "End of file while reading a map", frame);
        };
        let value_form = read_continuation(vm, frame, env, input, Some(c));
        if vm.heap.exceptionp(value_form) {
            vm.heap.dec_ref(key);
            vm.heap.dec_ref(map);
            return value_form;
        }

        let value = eval_form(vm, frame, value_form, env);
        vm.heap.dec_ref(value_form);
        if vm.heap.exceptionp(value) {
            vm.heap.dec_ref(key);
            vm.heap.dec_ref(map);
            return value;
        }

        vm.heap.hashmap_put(map, key, value);
        vm.heap.dec_ref(key);
        vm.heap.dec_ref(value);
    }

    vm.heap.seal_hashmap(map);
    map
}

/// Skip whitespace, control characters and commas.
fn skip_commas_and_blanks(vm: &mut Vm, input: CellPtr, initial: Option<char>) -> Option<char> {
    let mut c = initial;
    loop {
        match c {
            Some(ch) if ch == ',' || ch == '\0' || ch.is_whitespace() || ch.is_control() => {
                c = vm.heap.stream_getwc(input);
            }
            _ => return c,
        }
    }
}

/// Read a string delimited by double quotes; the opening quote is already
/// consumed. An empty string is a single cell holding the sentinel
/// character.
fn read_string_chain(vm: &mut Vm, frame: CellPtr, input: CellPtr) -> CellPtr {
    let mut text = String::new();
    loop {
        match vm.heap.stream_getwc(input) {
            Some('"') => break,
            Some(ch) => text.push(ch),
            None => {
                return throw_message(&mut vm.heap, "End of file while reading a string", frame);
            }
        }
    }
    let result = vm.heap.string_from_str(&text);
    owned(&mut vm.heap, result)
}

/// Read a symbol or keyword, given its first character.
///
/// Symbols and keywords may not include parentheses, braces, quotation
/// marks, colons or slashes; the terminating character is pushed back.
fn read_symbol_or_key(vm: &mut Vm, input: CellPtr, tag: Tag, initial: char) -> CellPtr {
    let mut text = String::new();
    let mut c = Some(initial);

    loop {
        match c {
            Some(ch) if ch.is_whitespace() || ch.is_control() || is_token_break(ch) => {
                vm.heap.stream_ungetwc(input, ch);
                break;
            }
            Some(ch) => {
                text.push(ch);
                c = vm.heap.stream_getwc(input);
            }
            None => break,
        }
    }

    if text.is_empty() {
        return owned(&mut vm.heap, CellPtr::NIL);
    }

    let result = match tag {
        Tag::Keyword => vm.heap.keyword_from_str(&text),
        Tag::String => vm.heap.string_from_str(&text),
        _ => vm.heap.symbol_from_str(&text),
    };
    owned(&mut vm.heap, result)
}

/// Read a path expression.
///
/// A path is a leading `/` (the oblist) or `$`/`§` (the session),
/// followed by keywords with leading colons and symbols prefixed by
/// slashes, without intervening spaces. It desugars to a `(-> …)` form.
fn read_path(vm: &mut Vm, _frame: CellPtr, input: CellPtr, initial: char) -> CellPtr {
    let prefix = match initial {
        '/' => {
            let p = vm.heap.symbol_from_str("oblist");
            Some(p)
        }
        '$' | '\u{a7}' => {
            let p = vm.heap.symbol_from_str("session");
            Some(p)
        }
        _ => None,
    };
    if let Some(p) = prefix {
        vm.heap.inc_ref(p);
    }

    let mut reversed = CellPtr::NIL;
    vm.heap.inc_ref(reversed);

    loop {
        let c = vm.heap.stream_getwc(input);
        let component = match c {
            None => break,
            Some(ch) if ch.is_whitespace() || ch.is_control() => break,
            Some(':') => match vm.heap.stream_getwc(input) {
                Some(n) => read_symbol_or_key(vm, input, Tag::Keyword, n),
                None => break,
            },
            Some('/') => match vm.heap.stream_getwc(input) {
                Some(n) => {
                    let symbol = read_symbol_or_key(vm, input, Tag::Symbol, n);
                    c_quote(vm, symbol)
                }
                None => break,
            },
            Some(ch) if ch.is_alphabetic() => read_symbol_or_key(vm, input, Tag::Symbol, ch),
            Some(ch) => {
                vm.heap.stream_ungetwc(input, ch);
                break;
            }
        };

        let next = vm.heap.cons(component, reversed);
        vm.heap.inc_ref(next);
        vm.heap.dec_ref(component);
        vm.heap.dec_ref(reversed);
        reversed = next;
    }

    // The path is reversed in `reversed`; put it back in source order.
    let mut list = CellPtr::NIL;
    vm.heap.inc_ref(list);
    let mut cursor = reversed;
    while vm.heap.consp(cursor) {
        let item = vm.heap.car(cursor);
        let next = vm.heap.cons(item, list);
        vm.heap.inc_ref(next);
        vm.heap.dec_ref(list);
        list = next;
        cursor = vm.heap.cdr(cursor);
    }
    vm.heap.dec_ref(reversed);

    if let Some(p) = prefix {
        let next = vm.heap.cons(p, list);
        vm.heap.inc_ref(next);
        vm.heap.dec_ref(p);
        vm.heap.dec_ref(list);
        list = next;
    }

    let arrow = vm.heap.symbol_from_str("->");
    let result = vm.heap.cons(arrow, list);
    let result = owned(&mut vm.heap, result);
    vm.heap.dec_ref(list);
    result
}
