// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The seed bindings installed into the oblist at startup.

use std::io::Write;

use crate::arith::integer::make_integer;
use crate::arith::tower::{absolute, add_2, divide_2, multiply_2, negative, subtract_2};
use crate::io::print::{dump_object, print_to_string};
use crate::io::read;
use crate::io::{ReaderSource, StringSource, WriterSink};
use crate::memory::cell::{Executable, Tag};
use crate::memory::conspage::Heap;
use crate::memory::vectorspace::DEFAULT_HASHMAP_BUCKETS;
use crate::ops::equal::{eq, equal};
use crate::ops::eval::{
    eval_form, lisp_apply, lisp_cond, lisp_eval_fn, lisp_exception, lisp_lambda, lisp_let,
    lisp_nlambda, lisp_progn, lisp_quote, lisp_set, lisp_set_shriek, lisp_try, owned,
    throw_message, throw_with_value,
};
use crate::ops::intern::{c_assoc, deep_bind};
use crate::repl::lisp_repl;
use crate::types::CellPtr;
use crate::vm::Vm;

/// Bind a built-in function under this name in the oblist.
fn bind_function(vm: &mut Vm, name: &str, executable: Executable) {
    let meta = vm.heap.string_from_str(name);
    let function = vm.heap.make_function(meta, executable);
    let symbol = vm.heap.symbol_from_str(name);
    deep_bind(vm, symbol, function);
}

/// Bind a built-in special form under this name in the oblist.
fn bind_special(vm: &mut Vm, name: &str, executable: Executable) {
    let meta = vm.heap.string_from_str(name);
    let special = vm.heap.make_special(meta, executable);
    let symbol = vm.heap.symbol_from_str(name);
    deep_bind(vm, symbol, special);
}

/// Bind a plain value under this name in the oblist.
pub fn bind_value(vm: &mut Vm, name: &str, value: CellPtr) {
    let symbol = vm.heap.symbol_from_str(name);
    deep_bind(vm, symbol, value);
}

/// Install the standard bindings into a fresh machine's oblist.
pub fn install(vm: &mut Vm) {
    bind_value(vm, "nil", CellPtr::NIL);
    bind_value(vm, "t", CellPtr::T);
    let prompt = vm.heap.string_from_str(":: ");
    bind_value(vm, "*prompt*", prompt);

    bind_special(vm, "quote", lisp_quote);
    bind_special(vm, "cond", lisp_cond);
    bind_special(vm, "set!", lisp_set_shriek);
    bind_special(vm, "lambda", lisp_lambda);
    bind_special(vm, "nlambda", lisp_nlambda);
    bind_special(vm, "let", lisp_let);
    bind_special(vm, "progn", lisp_progn);
    bind_special(vm, "try", lisp_try);

    bind_function(vm, "cons", lisp_cons);
    bind_function(vm, "car", lisp_car);
    bind_function(vm, "cdr", lisp_cdr);
    bind_function(vm, "assoc", lisp_assoc);
    bind_function(vm, "keys", lisp_keys);
    bind_function(vm, "eq", lisp_eq);
    bind_function(vm, "equal", lisp_equal);
    bind_function(vm, "=", lisp_equal);
    bind_function(vm, "+", lisp_add);
    bind_function(vm, "-", lisp_subtract);
    bind_function(vm, "*", lisp_multiply);
    bind_function(vm, "/", lisp_divide);
    bind_function(vm, "absolute", lisp_absolute);
    bind_function(vm, "negative", lisp_negative);
    bind_function(vm, "set", lisp_set);
    bind_function(vm, "list", lisp_list);
    bind_function(vm, "append", lisp_append);
    bind_function(vm, "reverse", lisp_reverse);
    bind_function(vm, "length", lisp_length);
    bind_function(vm, "mapcar", lisp_mapcar);
    bind_function(vm, "type", lisp_type);
    bind_function(vm, "exception", lisp_exception);
    bind_function(vm, "print", lisp_print);
    bind_function(vm, "println", lisp_println);
    bind_function(vm, "read", lisp_read);
    bind_function(vm, "read-from-string", lisp_read_from_string);
    bind_function(vm, "read-char", lisp_read_char);
    bind_function(vm, "slurp", lisp_slurp);
    bind_function(vm, "open", lisp_open);
    bind_function(vm, "close", lisp_close);
    bind_function(vm, "eval", lisp_eval_fn);
    bind_function(vm, "apply", lisp_apply);
    bind_function(vm, "oblist", lisp_oblist);
    bind_function(vm, "source", lisp_source);
    bind_function(vm, "inspect", lisp_inspect);
    bind_function(vm, "repl", lisp_repl);
}

fn args_count(heap: &Heap, frame: CellPtr) -> usize {
    heap.frame_ref(frame).map_or(0, |f| f.args_count as usize)
}

// --- Pairs and sequences -------------------------------------------------

/// Function: `(cons a b)`.
///
/// If `a` is a one-character string and `b` a string, the result is a new
/// string cell; otherwise an ordinary cons.
pub fn lisp_cons(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let car = vm.heap.fetch_arg(frame, 0);
    let cdr = vm.heap.fetch_arg(frame, 1);

    if car.is_nil() && cdr.is_nil() {
        return owned(&mut vm.heap, CellPtr::NIL);
    }

    let one_char_string = vm.heap.stringp(car)
        && vm.heap.stringp(cdr)
        && vm.heap.end_of_stringp(vm.heap.cdr(car));

    let result = if one_char_string {
        let (ch, _, _) = vm.heap.string_parts(car).unwrap_or(('\0', 0, CellPtr::NIL));
        vm.heap.make_string(ch, cdr)
    } else {
        vm.heap.cons(car, cdr)
    };

    owned(&mut vm.heap, result)
}

/// Function: `(car sequence)` returns the head of a sequence.
///
/// Valid for cons cells, strings, and read streams (where it reads one
/// character).
pub fn lisp_car(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);

    match vm.heap.tag(arg) {
        Tag::Cons => {
            let result = vm.heap.car(arg);
            owned(&mut vm.heap, result)
        }
        Tag::Nil => owned(&mut vm.heap, CellPtr::NIL),
        Tag::String => {
            let (ch, _, _) = vm.heap.string_parts(arg).unwrap_or(('\0', 0, CellPtr::NIL));
            let result = vm.heap.make_string(ch, CellPtr::NIL);
            owned(&mut vm.heap, result)
        }
        Tag::Read => match vm.heap.stream_getwc(arg) {
            Some(ch) => {
                let result = vm.heap.make_string(ch, CellPtr::NIL);
                owned(&mut vm.heap, result)
            }
            None => throw_message(&mut vm.heap, "End of file while reading", frame),
        },
        _ => throw_message(&mut vm.heap, "Attempt to take CAR of non sequence", frame),
    }
}

/// Function: `(cdr sequence)` returns the remainder of a sequence when
/// the head is removed.
///
/// For an input stream, the first character is removed and discarded and
/// the stream itself returned.
pub fn lisp_cdr(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);

    match vm.heap.tag(arg) {
        Tag::Cons | Tag::String => {
            let result = vm.heap.cdr(arg);
            owned(&mut vm.heap, result)
        }
        Tag::Nil => owned(&mut vm.heap, CellPtr::NIL),
        Tag::Read => {
            let _ = vm.heap.stream_getwc(arg);
            owned(&mut vm.heap, arg)
        }
        _ => throw_message(&mut vm.heap, "Attempt to take CDR of non sequence", frame),
    }
}

/// Function: `(assoc key store)` looks up `key` in a store.
pub fn lisp_assoc(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let key = vm.heap.fetch_arg(frame, 0);
    let store = vm.heap.fetch_arg(frame, 1);
    let result = c_assoc(&vm.heap, key, store);
    owned(&mut vm.heap, result)
}

/// Return a fresh list of the keys in this store.
pub fn c_keys(heap: &mut Heap, store: CellPtr) -> CellPtr {
    if heap.hashmapp(store) {
        let result = heap.hashmap_keys(store);
        return owned(heap, result);
    }

    let mut result = CellPtr::NIL;
    heap.inc_ref(result);
    let mut next = store;
    while heap.consp(next) {
        let key = heap.car(heap.car(next));
        let cell = heap.cons(key, result);
        heap.inc_ref(cell);
        heap.dec_ref(result);
        result = cell;
        next = heap.cdr(next);
    }
    result
}

/// Function: `(keys store)`.
pub fn lisp_keys(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let store = vm.heap.fetch_arg(frame, 0);
    c_keys(&mut vm.heap, store)
}

/// Function: `(eq a b)` - shallow, cheap equality.
pub fn lisp_eq(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let a = vm.heap.fetch_arg(frame, 0);
    let b = vm.heap.fetch_arg(frame, 1);
    let result = if eq(a, b) { CellPtr::T } else { CellPtr::NIL };
    owned(&mut vm.heap, result)
}

/// Function: `(equal a b)` - deep, expensive equality.
pub fn lisp_equal(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let a = vm.heap.fetch_arg(frame, 0);
    let b = vm.heap.fetch_arg(frame, 1);
    let result = if equal(&vm.heap, a, b) {
        CellPtr::T
    } else {
        CellPtr::NIL
    };
    owned(&mut vm.heap, result)
}

/// Reverse a sequence; anything which is not a sequence is returned
/// unchanged.
pub fn c_reverse(heap: &mut Heap, arg: CellPtr) -> CellPtr {
    if !heap.sequencep(arg) {
        return owned(heap, arg);
    }

    let mut result = CellPtr::NIL;
    heap.inc_ref(result);
    let mut p = arg;
    while heap.sequencep(p) {
        let tag = heap.tag(p);
        let next = match tag {
            Tag::Cons => {
                let car = heap.car(p);
                heap.cons(car, result)
            }
            _ => {
                let (ch, _, _) = heap.string_parts(p).unwrap_or(('\0', 0, CellPtr::NIL));
                if ch == '\0' {
                    p = heap.cdr(p);
                    continue;
                }
                heap.make_string_like(ch, result, tag)
            }
        };
        heap.inc_ref(next);
        heap.dec_ref(result);
        result = next;
        p = heap.cdr(p);
    }
    result
}

/// Function: `(reverse sequence)`.
pub fn lisp_reverse(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    c_reverse(&mut vm.heap, arg)
}

/// The length of a sequence, or zero for anything else.
#[must_use]
pub fn c_length(heap: &Heap, arg: CellPtr) -> i64 {
    let mut length = 0;
    let mut p = arg;
    loop {
        match heap.tag(p) {
            Tag::Cons => length += 1,
            Tag::String | Tag::Symbol | Tag::Keyword => {
                if heap.end_of_stringp(p) {
                    break;
                }
                length += 1;
            }
            _ => break,
        }
        p = heap.cdr(p);
    }
    length
}

/// Function: `(length sequence)`.
pub fn lisp_length(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    let length = c_length(&vm.heap, arg);
    let result = make_integer(&mut vm.heap, length, CellPtr::NIL);
    owned(&mut vm.heap, result)
}

/// Append two sequences of the same type.
pub fn c_append(heap: &mut Heap, frame: CellPtr, l1: CellPtr, l2: CellPtr) -> CellPtr {
    if l1.is_nil() {
        return owned(heap, l2);
    }

    match heap.tag(l1) {
        Tag::Cons => {
            if !heap.consp(l2) && !l2.is_nil() {
                return throw_message(heap, "Can't append: not same type", frame);
            }
            let rest = if heap.cdr(l1).is_nil() {
                owned(heap, l2)
            } else {
                let tail = heap.cdr(l1);
                c_append(heap, frame, tail, l2)
            };
            if heap.exceptionp(rest) {
                return rest;
            }
            let car = heap.car(l1);
            let result = heap.cons(car, rest);
            heap.inc_ref(result);
            heap.dec_ref(rest);
            result
        }
        tag @ (Tag::String | Tag::Symbol | Tag::Keyword) => {
            if heap.tag(l2) != tag {
                return throw_message(heap, "Can't append: not same type", frame);
            }
            if heap.end_of_stringp(l1) {
                return owned(heap, l2);
            }
            let tail = heap.cdr(l1);
            let rest = if heap.end_of_stringp(tail) {
                owned(heap, l2)
            } else {
                c_append(heap, frame, tail, l2)
            };
            if heap.exceptionp(rest) {
                return rest;
            }
            let (ch, _, _) = heap.string_parts(l1).unwrap_or(('\0', 0, CellPtr::NIL));
            let result = heap.make_string_like(ch, rest, tag);
            heap.inc_ref(result);
            heap.dec_ref(rest);
            result
        }
        _ => throw_message(heap, "Can't append: not a sequence", frame),
    }
}

/// Function: `(append sequences…)`.
pub fn lisp_append(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let count = args_count(&vm.heap, frame);
    if count == 0 {
        return owned(&mut vm.heap, CellPtr::NIL);
    }

    let last = vm.heap.fetch_arg(frame, count - 1);
    let mut result = owned(&mut vm.heap, last);
    for index in (0..count - 1).rev() {
        let item = vm.heap.fetch_arg(frame, index);
        let next = c_append(&mut vm.heap, frame, item, result);
        vm.heap.dec_ref(result);
        result = next;
        if vm.heap.exceptionp(result) {
            break;
        }
    }
    result
}

/// Function: `(list members…)` returns a list of its arguments.
pub fn lisp_list(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let result = vm.heap.frame_args_list(frame);
    owned(&mut vm.heap, result)
}

/// Function: `(mapcar fn list)` applies `fn` to each member of `list` and
/// returns the list of results.
pub fn lisp_mapcar(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let function = vm.heap.fetch_arg(frame, 0);
    let mut cursor = vm.heap.fetch_arg(frame, 1);

    let mut reversed = CellPtr::NIL;
    vm.heap.inc_ref(reversed);

    while vm.heap.consp(cursor) {
        let item = vm.heap.car(cursor);
        let quoted = quote_form(&mut vm.heap, item);
        let call = {
            let inner = vm.heap.cons(quoted, CellPtr::NIL);
            vm.heap.cons(function, inner)
        };
        vm.heap.inc_ref(call);

        let value = eval_form(vm, frame, call, env);
        vm.heap.dec_ref(call);

        if vm.heap.exceptionp(value) {
            vm.heap.dec_ref(reversed);
            return value;
        }

        let next = vm.heap.cons(value, reversed);
        vm.heap.inc_ref(next);
        vm.heap.dec_ref(value);
        vm.heap.dec_ref(reversed);
        reversed = next;

        cursor = vm.heap.cdr(cursor);
    }

    let result = c_reverse(&mut vm.heap, reversed);
    vm.heap.dec_ref(reversed);
    result
}

/// Wrap a value in `(quote …)` so re-evaluation yields the value itself.
fn quote_form(heap: &mut Heap, value: CellPtr) -> CellPtr {
    let quote = heap.symbol_from_str("quote");
    let inner = heap.cons(value, CellPtr::NIL);
    heap.cons(quote, inner)
}

/// Function: `(type expression)` returns the tag of the expression as a
/// string.
pub fn lisp_type(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    let name = vm.heap.tag(arg).name().trim_end().to_string();
    let result = vm.heap.string_from_str(&name);
    owned(&mut vm.heap, result)
}

// --- Arithmetic ----------------------------------------------------------

/// Function: `(+ numbers…)` adds an indefinite number of numbers.
pub fn lisp_add(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let count = args_count(&vm.heap, frame);
    let zero = make_integer(&mut vm.heap, 0, CellPtr::NIL);
    let mut result = owned(&mut vm.heap, zero);

    for index in 0..count {
        let arg = vm.heap.fetch_arg(frame, index);
        let next = add_2(&mut vm.heap, frame, result, arg);
        vm.heap.dec_ref(result);
        result = next;
        if vm.heap.exceptionp(result) {
            break;
        }
    }

    result
}

/// Function: `(* numbers…)` multiplies an indefinite number of numbers.
pub fn lisp_multiply(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let count = args_count(&vm.heap, frame);
    let one = make_integer(&mut vm.heap, 1, CellPtr::NIL);
    let mut result = owned(&mut vm.heap, one);

    for index in 0..count {
        let arg = vm.heap.fetch_arg(frame, index);
        let next = multiply_2(&mut vm.heap, frame, result, arg);
        vm.heap.dec_ref(result);
        result = next;
        if vm.heap.exceptionp(result) {
            break;
        }
    }

    result
}

/// Function: `(- a b)` subtracts one number from another.
pub fn lisp_subtract(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let a = vm.heap.fetch_arg(frame, 0);
    let b = vm.heap.fetch_arg(frame, 1);
    subtract_2(&mut vm.heap, frame, a, b)
}

/// Function: `(/ a b)` divides one number by another.
pub fn lisp_divide(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let a = vm.heap.fetch_arg(frame, 0);
    let b = vm.heap.fetch_arg(frame, 1);
    divide_2(&mut vm.heap, frame, a, b)
}

/// Function: `(absolute n)`.
pub fn lisp_absolute(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    absolute(&mut vm.heap, frame, arg)
}

/// Function: `(negative n)` - the additive inverse.
pub fn lisp_negative(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    negative(&mut vm.heap, frame, arg)
}

// --- Input and output ----------------------------------------------------

/// The stream bound to `*in*` (for input) or `*out*` (for output) in this
/// environment, or NIL when nothing suitable is bound.
pub fn get_default_stream(heap: &mut Heap, inputp: bool, env: CellPtr) -> CellPtr {
    let name = if inputp { "*in*" } else { "*out*" };
    let symbol = heap.symbol_from_str(name);
    heap.inc_ref(symbol);
    let value = c_assoc(heap, symbol, env);
    heap.dec_ref(symbol);

    if inputp && heap.readp(value) || !inputp && heap.writep(value) {
        value
    } else {
        CellPtr::NIL
    }
}

/// Write this text to the stream, or to the host's standard output when
/// no stream is given.
fn emit(heap: &mut Heap, out: CellPtr, text: &str) {
    if heap.writep(out) {
        heap.sink_write_str(out, text);
        heap.sink_flush(out);
    } else {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Function: `(print expr)` / `(print expr write-stream)` prints one
/// expression and returns it.
pub fn lisp_print(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    let explicit = vm.heap.fetch_arg(frame, 1);
    let out = if vm.heap.writep(explicit) {
        explicit
    } else {
        get_default_stream(&mut vm.heap, false, env)
    };

    let text = print_to_string(&vm.heap, arg);
    emit(&mut vm.heap, out, &text);
    owned(&mut vm.heap, arg)
}

/// Function: `(println expr)` prints one expression followed by a
/// newline, and returns it.
pub fn lisp_println(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    let explicit = vm.heap.fetch_arg(frame, 1);
    let out = if vm.heap.writep(explicit) {
        explicit
    } else {
        get_default_stream(&mut vm.heap, false, env)
    };

    let mut text = print_to_string(&vm.heap, arg);
    text.push('\n');
    emit(&mut vm.heap, out, &text);
    owned(&mut vm.heap, arg)
}

/// Function: `(inspect expr)` dumps the internal representation of the
/// expression.
pub fn lisp_inspect(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    let explicit = vm.heap.fetch_arg(frame, 1);
    let out = if vm.heap.writep(explicit) {
        explicit
    } else {
        get_default_stream(&mut vm.heap, false, env)
    };

    let text = dump_object(&vm.heap, arg);
    emit(&mut vm.heap, out, &text);
    owned(&mut vm.heap, CellPtr::NIL)
}

/// Function: `(read)` / `(read read-stream)` reads one complete form.
pub fn lisp_read(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let explicit = vm.heap.fetch_arg(frame, 0);
    let input = if vm.heap.readp(explicit) {
        explicit
    } else {
        get_default_stream(&mut vm.heap, true, env)
    };

    if !vm.heap.readp(input) {
        return throw_message(&mut vm.heap, "No input stream to read from", frame);
    }

    vm.heap.inc_ref(input);
    let result = read::read(vm, frame, env, input);
    vm.heap.dec_ref(input);
    result
}

/// Function: `(read-from-string string)` reads one complete form from a
/// string.
pub fn lisp_read_from_string(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    if !vm.heap.stringp(arg) {
        return throw_with_value(
            &mut vm.heap,
            "read-from-string expects a string",
            arg,
            frame,
        );
    }

    let text = vm.heap.string_to_host(arg);
    let stream = vm
        .heap
        .make_read_stream(Box::new(StringSource::new(&text)), CellPtr::NIL);
    vm.heap.inc_ref(stream);
    let result = read::read(vm, frame, env, stream);
    vm.heap.dec_ref(stream);
    result
}

/// Function: `(read-char)` / `(read-char read-stream)` reads a single
/// character and returns it as a one-character string.
pub fn lisp_read_char(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let explicit = vm.heap.fetch_arg(frame, 0);
    let input = if vm.heap.readp(explicit) {
        explicit
    } else {
        get_default_stream(&mut vm.heap, true, env)
    };

    match vm.heap.stream_getwc(input) {
        Some(ch) => {
            let result = vm.heap.make_string(ch, CellPtr::NIL);
            owned(&mut vm.heap, result)
        }
        None => throw_message(&mut vm.heap, "End of file while reading", frame),
    }
}

/// Function: `(slurp read-stream)` reads the whole remaining stream into
/// a string.
pub fn lisp_slurp(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let explicit = vm.heap.fetch_arg(frame, 0);
    let input = if vm.heap.readp(explicit) {
        explicit
    } else {
        get_default_stream(&mut vm.heap, true, env)
    };
    if !vm.heap.readp(input) {
        return throw_message(&mut vm.heap, "No input stream to slurp", frame);
    }

    let mut text = String::new();
    while let Some(ch) = vm.heap.stream_getwc(input) {
        text.push(ch);
    }
    let result = vm.heap.string_from_str(&text);
    owned(&mut vm.heap, result)
}

/// Build the metadata hashmap for a freshly opened stream.
fn stream_meta_map(heap: &mut Heap, key: &str, value: &str, status: Option<i64>) -> CellPtr {
    let map = heap.make_hashmap(DEFAULT_HASHMAP_BUCKETS, CellPtr::NIL, CellPtr::T);
    heap.inc_ref(map);

    let k = heap.keyword_from_str(key);
    let v = heap.string_from_str(value);
    heap.hashmap_put(map, k, v);

    if let Some(code) = status {
        let k = heap.keyword_from_str("status-code");
        let v = make_integer(heap, code, CellPtr::NIL);
        heap.hashmap_put(map, k, v);
    }

    heap.seal_hashmap(map);
    map
}

/// Function: `(open path-or-url)` / `(open path write?)`.
///
/// Opens a local file, or, when the name carries a scheme, asks the
/// installed URL transport for a stream. The returned stream cell carries
/// a metadata hashmap with `:path`, or `:url` and `:status-code`.
pub fn lisp_open(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    if !vm.heap.stringp(arg) {
        return throw_with_value(&mut vm.heap, "open expects a string", arg, frame);
    }
    let name = vm.heap.string_to_host(arg);
    let writing = vm.heap.fetch_arg(frame, 1).is_truthy();

    if name.contains("://") {
        if writing {
            return throw_message(&mut vm.heap, "Cannot open a URL for writing", frame);
        }
        let opened = match vm.url_opener.as_ref() {
            Some(opener) => opener(&name),
            None => {
                return throw_message(&mut vm.heap, "No URL transport installed", frame);
            }
        };
        return match opened {
            Ok(url_stream) => {
                let meta = stream_meta_map(&mut vm.heap, "url", &name, url_stream.status_code);
                let cell = vm.heap.make_read_stream(url_stream.stream, meta);
                vm.heap.dec_ref(meta);
                owned(&mut vm.heap, cell)
            }
            Err(error) => {
                let message = format!("Could not open URL {name}: {error}");
                throw_message(&mut vm.heap, &message, frame)
            }
        };
    }

    if writing {
        match std::fs::File::create(&name) {
            Ok(file) => {
                let meta = stream_meta_map(&mut vm.heap, "path", &name, None);
                let cell = vm
                    .heap
                    .make_write_stream(Box::new(WriterSink::new(file)), meta);
                vm.heap.dec_ref(meta);
                owned(&mut vm.heap, cell)
            }
            Err(error) => {
                let message = format!("Could not open {name} for writing: {error}");
                throw_message(&mut vm.heap, &message, frame)
            }
        }
    } else {
        match std::fs::File::open(&name) {
            Ok(file) => {
                let meta = stream_meta_map(&mut vm.heap, "path", &name, None);
                let cell = vm
                    .heap
                    .make_read_stream(Box::new(ReaderSource::new(file)), meta);
                vm.heap.dec_ref(meta);
                owned(&mut vm.heap, cell)
            }
            Err(error) => {
                let message = format!("Could not open {name}: {error}");
                throw_message(&mut vm.heap, &message, frame)
            }
        }
    }
}

/// Function: `(close stream)` closes a stream early; the cascading free
/// would otherwise close it when the cell dies.
pub fn lisp_close(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    vm.heap.stream_close(arg);
    owned(&mut vm.heap, CellPtr::NIL)
}

// --- Reflection ----------------------------------------------------------

/// Function: `(oblist)` returns the root namespace.
pub fn lisp_oblist(vm: &mut Vm, _frame: CellPtr, _env: CellPtr) -> CellPtr {
    let oblist = vm.oblist;
    owned(&mut vm.heap, oblist)
}

/// Function: `(source object)` returns the source of an interpretable
/// function, or NIL for primitives.
pub fn lisp_source(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);

    match vm.heap.tag(arg) {
        Tag::Lambda | Tag::NLambda => {
            let name = if vm.heap.lambdap(arg) {
                "lambda"
            } else {
                "nlambda"
            };
            let Some((args, body)) = vm.heap.lambda_parts(arg) else {
                return owned(&mut vm.heap, CellPtr::NIL);
            };
            let symbol = vm.heap.symbol_from_str(name);
            let tail = vm.heap.cons(args, body);
            let result = vm.heap.cons(symbol, tail);
            owned(&mut vm.heap, result)
        }
        _ => owned(&mut vm.heap, CellPtr::NIL),
    }
}
