// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The evaluator and applier.
//!
//! Evaluation is built around explicit stack frames: `eval` of a cons
//! builds a frame for the combination, dispatches on the tag of the
//! evaluated head, and invokes the callee with that frame. Exceptions are
//! ordinary cells of tag `EXEP` which short-circuit every enclosing
//! computation until a `try` catches them; the throwing frame is retained
//! by the exception cell itself.
//!
//! Result convention: every function on the evaluation path returns a
//! pointer which arrives with one reference owned by the caller. Consumers
//! release that reference when they are done with the value. Raw cell
//! constructors, by contrast, return count-zero cells.

use tracing::trace;

use crate::memory::cell::Tag;
use crate::memory::conspage::Heap;
use crate::memory::stack::{make_special_frame, make_stack_frame};
use crate::memory::vectorspace::VecTag;
use crate::ops::intern::{c_assoc, deep_bind, internedp, set};
use crate::types::CellPtr;
use crate::vm::Vm;

/// Retain `p` on behalf of the caller.
pub(crate) fn owned(heap: &mut Heap, p: CellPtr) -> CellPtr {
    heap.inc_ref(p);
    p
}

/// Wrap a message in an exception thrown at this frame.
///
/// If the message is itself an exception it propagates unchanged, so
/// exceptions never nest by accident.
pub fn throw_exception(heap: &mut Heap, message: CellPtr, frame: CellPtr) -> CellPtr {
    trace!(target: "copia::eval", "throwing exception");

    if heap.exceptionp(message) {
        return owned(heap, message);
    }
    let result = heap.make_exception(message, frame);
    owned(heap, result)
}

/// Convenience: throw an exception whose message is this host string.
pub fn throw_message(heap: &mut Heap, message: &str, frame: CellPtr) -> CellPtr {
    let message = heap.string_from_str(message);
    throw_exception(heap, message, frame)
}

/// Throw an exception whose message is a cons of this host string and the
/// offending value.
pub fn throw_with_value(heap: &mut Heap, message: &str, value: CellPtr, frame: CellPtr) -> CellPtr {
    let text = heap.string_from_str(message);
    let message = heap.cons(text, value);
    throw_exception(heap, message, frame)
}

/// Evaluate this single form in the context of this parent frame and this
/// environment.
pub fn eval_form(vm: &mut Vm, parent: CellPtr, form: CellPtr, env: CellPtr) -> CellPtr {
    let frame = vm.heap.make_empty_frame(parent);
    if vm.heap.exceptionp(frame) {
        return owned(&mut vm.heap, frame);
    }
    vm.heap.inc_ref(frame);
    vm.heap.set_register(frame, 0, form);
    vm.heap.set_frame_args_count(frame, 1);

    let result = lisp_eval(vm, frame, env);

    // The throwing frame survives inside any exception; releasing our
    // reference here is safe either way.
    vm.heap.dec_ref(frame);
    result
}

/// Evaluate all the forms in this list and return a list of their values.
///
/// If any evaluation yields an exception, the partial list is released and
/// the exception returned instead. If the argument is not a list, the
/// result is NIL.
pub fn eval_forms(vm: &mut Vm, frame: CellPtr, mut list: CellPtr, env: CellPtr) -> CellPtr {
    let mut reversed = CellPtr::NIL;
    vm.heap.inc_ref(reversed);

    while vm.heap.consp(list) {
        let value = eval_form(vm, frame, vm.heap.car(list), env);
        if vm.heap.exceptionp(value) {
            vm.heap.dec_ref(reversed);
            return value;
        }
        let next = vm.heap.cons(value, reversed);
        vm.heap.inc_ref(next);
        vm.heap.dec_ref(value);
        vm.heap.dec_ref(reversed);
        reversed = next;
        list = vm.heap.cdr(list);
    }

    // Values were consed up backwards; put them in argument order.
    let result = reverse_list(&mut vm.heap, reversed);
    vm.heap.dec_ref(reversed);
    result
}

/// Build a fresh list with the members of this list in reverse order.
fn reverse_list(heap: &mut Heap, mut list: CellPtr) -> CellPtr {
    let mut result = CellPtr::NIL;
    heap.inc_ref(result);
    while heap.consp(list) {
        let next = heap.cons(heap.car(list), result);
        heap.inc_ref(next);
        heap.dec_ref(result);
        result = next;
        list = heap.cdr(list);
    }
    result
}

/// Evaluate the expression in register zero of this frame.
///
/// - NIL, T, numbers, strings, keywords, callables and streams evaluate
///   to themselves.
/// - A symbol evaluates to the value it is bound to in `env`; an unbound
///   symbol throws.
/// - A cons is a combination and is applied.
/// - An exception propagates unchanged.
pub fn lisp_eval(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let expression = vm.heap.fetch_arg(frame, 0);

    match vm.heap.tag(expression) {
        Tag::Cons => c_apply(vm, frame, env),
        Tag::Symbol => {
            let canonical = internedp(&vm.heap, expression, env);
            if canonical.is_nil() {
                throw_with_value(
                    &mut vm.heap,
                    "Attempt to take value of unbound symbol.",
                    expression,
                    frame,
                )
            } else {
                let result = c_assoc(&vm.heap, canonical, env);
                owned(&mut vm.heap, result)
            }
        }
        _ => owned(&mut vm.heap, expression),
    }
}

/// Internal guts of apply: the expression in register zero is a
/// combination; evaluate its head and dispatch on the result's tag.
pub fn c_apply(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let expression = vm.heap.fetch_arg(frame, 0);
    let head = eval_form(vm, frame, vm.heap.car(expression), env);
    if vm.heap.exceptionp(head) {
        return head;
    }
    let args = vm.heap.cdr(expression);

    let result = match vm.heap.tag(head) {
        Tag::Function => {
            let next = make_stack_frame(vm, frame, args, env);
            if vm.heap.exceptionp(next) {
                vm.heap.dec_ref(head);
                return next;
            }
            vm.heap.set_frame_function(next, head);
            let Some((_, executable)) = vm.heap.function_parts(head) else {
                unreachable!("function cell without executable");
            };
            let result = executable(vm, next, env);
            vm.heap.dec_ref(next);
            result
        }
        Tag::Special => {
            let next = make_special_frame(vm, frame, args, env);
            if vm.heap.exceptionp(next) {
                vm.heap.dec_ref(head);
                return next;
            }
            vm.heap.set_frame_function(next, head);
            let Some((_, executable)) = vm.heap.function_parts(head) else {
                unreachable!("special-form cell without executable");
            };
            let result = executable(vm, next, env);
            vm.heap.dec_ref(next);
            result
        }
        Tag::Lambda => {
            let next = make_stack_frame(vm, frame, args, env);
            if vm.heap.exceptionp(next) {
                vm.heap.dec_ref(head);
                return next;
            }
            vm.heap.set_frame_function(next, head);
            let result = eval_lambda(vm, head, next, env);
            vm.heap.dec_ref(next);
            result
        }
        Tag::NLambda => {
            let next = make_special_frame(vm, frame, args, env);
            if vm.heap.exceptionp(next) {
                vm.heap.dec_ref(head);
                return next;
            }
            vm.heap.set_frame_function(next, head);
            let result = eval_lambda(vm, head, next, env);
            vm.heap.dec_ref(next);
            result
        }
        Tag::Keyword => {
            // A keyword is a function from a store to a value.
            let value = eval_form(vm, frame, vm.heap.car(args), env);
            let result = keyword_lookup(&vm.heap, head, value);
            let result = owned(&mut vm.heap, result);
            vm.heap.dec_ref(value);
            result
        }
        Tag::VecPointer if matches!(vm.heap.vecp_parts(head), Some((VecTag::Hash, _))) => {
            // A hashmap is a function from a key to a value.
            let key = eval_form(vm, frame, vm.heap.car(args), env);
            if vm.heap.exceptionp(key) {
                vm.heap.dec_ref(head);
                return key;
            }
            let result = vm.heap.assoc_in_map(key, head);
            let result = owned(&mut vm.heap, result);
            vm.heap.dec_ref(key);
            result
        }
        Tag::Exception => {
            // Just pass exceptions straight back.
            owned(&mut vm.heap, head)
        }
        tag => throw_with_value(
            &mut vm.heap,
            &format!("Unexpected cell with tag {} in function position", tag.name().trim_end()),
            head,
            frame,
        ),
    };

    vm.heap.dec_ref(head);
    result
}

/// Look a keyword up in a store, treating an exception as a store whose
/// `:message` and `:frame` keys project its payload.
fn keyword_lookup(heap: &Heap, key: CellPtr, store: CellPtr) -> CellPtr {
    if let Some((message, frame)) = heap.exception_parts(store) {
        let name = heap.string_to_host(key);
        return match name.as_str() {
            "message" => message,
            "frame" => frame,
            _ => CellPtr::NIL,
        };
    }
    c_assoc(heap, key, store)
}

/// Evaluate a lambda or nlambda whose arguments are already bound in this
/// frame.
///
/// Each formal parameter is bound in a fresh environment extension to the
/// corresponding frame slot. If the formal-parameter list is a single
/// symbol instead, it is bound to the list of all arguments. The body
/// forms then evaluate sequentially and the last value is returned.
pub fn eval_lambda(vm: &mut Vm, lambda: CellPtr, frame: CellPtr, env: CellPtr) -> CellPtr {
    trace!(target: "copia::eval", "eval_lambda");

    let Some((mut names, body)) = vm.heap.lambda_parts(lambda) else {
        return throw_message(&mut vm.heap, "Not an interpretable function", frame);
    };

    let mut new_env = env;
    if vm.heap.consp(names) {
        let count = vm
            .heap
            .frame_ref(frame)
            .map_or(0, |f| f.args_count as usize);
        let mut index = 0;
        while index < count && vm.heap.consp(names) {
            let name = vm.heap.car(names);
            let value = vm.heap.fetch_arg(frame, index);
            new_env = set(&mut vm.heap, name, value, new_env);
            names = vm.heap.cdr(names);
            index += 1;
        }
    } else if vm.heap.symbolp(names) {
        // A single symbol binds the whole argument list.
        let values = vm.heap.frame_args_list(frame);
        new_env = set(&mut vm.heap, names, values, new_env);
    }
    vm.heap.inc_ref(new_env);

    let result = c_progn(vm, frame, body, new_env);

    vm.heap.dec_ref(new_env);
    result
}

/// Evaluate each of these expressions in order and return the value of
/// the last; an exception stops the walk and propagates.
pub fn c_progn(vm: &mut Vm, frame: CellPtr, mut expressions: CellPtr, env: CellPtr) -> CellPtr {
    let mut result = CellPtr::NIL;
    vm.heap.inc_ref(result);

    while vm.heap.consp(expressions) {
        vm.heap.dec_ref(result);
        result = eval_form(vm, frame, vm.heap.car(expressions), env);
        if vm.heap.exceptionp(result) {
            break;
        }
        expressions = vm.heap.cdr(expressions);
    }

    result
}

// --- Special forms -------------------------------------------------------

/// Special form: `(quote a)` returns its first argument unevaluated.
pub fn lisp_quote(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let arg = vm.heap.fetch_arg(frame, 0);
    owned(&mut vm.heap, arg)
}

/// Special form: `(cond clauses…)`.
///
/// Each clause is a list; when a clause's first form evaluates to non-NIL
/// the remaining forms of that clause are evaluated and the last value
/// returned. With no successful clause the result is NIL.
pub fn lisp_cond(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let count = vm
        .heap
        .frame_ref(frame)
        .map_or(0, |f| f.args_count as usize);

    for index in 0..count {
        let clause = vm.heap.fetch_arg(frame, index);
        if vm.heap.consp(clause) {
            let test = eval_form(vm, frame, vm.heap.car(clause), env);
            if vm.heap.exceptionp(test) {
                return test;
            }
            let succeeded = test.is_truthy();
            vm.heap.dec_ref(test);
            if succeeded {
                return c_progn(vm, frame, vm.heap.cdr(clause), env);
            }
        } else if clause.is_nil() {
            break;
        } else {
            return throw_message(&mut vm.heap, "Arguments to `cond` must be lists", frame);
        }
    }

    owned(&mut vm.heap, CellPtr::NIL)
}

/// Special form: `(set! symbol value)` binds `symbol` in the oblist to the
/// value of `value` and returns that value.
pub fn lisp_set_shriek(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let name = vm.heap.fetch_arg(frame, 0);
    if !vm.heap.symbolp(name) {
        return throw_with_value(
            &mut vm.heap,
            "The first argument to `set!` is not a symbol: ",
            name,
            frame,
        );
    }

    let value = eval_form(vm, frame, vm.heap.fetch_arg(frame, 1), env);
    if vm.heap.exceptionp(value) {
        return value;
    }
    deep_bind(vm, name, value);
    value
}

/// Function: `(set name value)` binds the already-evaluated `name` in the
/// oblist to `value` and returns the value.
pub fn lisp_set(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let name = vm.heap.fetch_arg(frame, 0);
    if !vm.heap.symbolp(name) {
        return throw_with_value(
            &mut vm.heap,
            "The first argument to `set` is not a symbol: ",
            name,
            frame,
        );
    }
    let value = vm.heap.fetch_arg(frame, 1);
    deep_bind(vm, name, value);
    owned(&mut vm.heap, value)
}

/// Used to construct the body for `lambda` and `nlambda` expressions from
/// the registers and overflow list of a special frame.
fn compose_body(vm: &mut Vm, frame: CellPtr) -> CellPtr {
    let mut body = vm
        .heap
        .frame_ref(frame)
        .map_or(CellPtr::NIL, |f| f.more);

    for index in (1..crate::memory::vectorspace::FRAME_REGISTERS).rev() {
        let form = vm.heap.fetch_arg(frame, index);
        if body.is_truthy() || form.is_truthy() {
            body = vm.heap.cons(form, body);
        }
    }

    body
}

/// Special form: `(lambda args body…)` constructs an interpretable
/// function. If `args` is a single symbol rather than a list, a varargs
/// function is created.
pub fn lisp_lambda(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let args = vm.heap.fetch_arg(frame, 0);
    let body = compose_body(vm, frame);
    let result = vm.heap.make_lambda(args, body);
    owned(&mut vm.heap, result)
}

/// Special form: `(nlambda args body…)` constructs an interpretable
/// special form; to `lambda` as a special form is to a function.
pub fn lisp_nlambda(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let args = vm.heap.fetch_arg(frame, 0);
    let body = compose_body(vm, frame);
    let result = vm.heap.make_nlambda(args, body);
    owned(&mut vm.heap, result)
}

/// Special form: `(let bindings body…)` evaluates the body in an
/// environment extended with each binding in turn, so later bindings see
/// earlier ones.
///
/// A binding is `(symbol . form)` or `(symbol form)`.
pub fn lisp_let(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let mut bindings = env;
    let mut cursor = vm.heap.fetch_arg(frame, 0);

    while cursor.is_truthy() {
        let pair = vm.heap.car(cursor);
        let symbol = vm.heap.car(pair);
        if !vm.heap.symbolp(symbol) {
            return throw_message(&mut vm.heap, "Let: cannot bind, not a symbol", frame);
        }

        let tail = vm.heap.cdr(pair);
        let form = if vm.heap.consp(tail) && vm.heap.cdr(tail).is_nil() {
            vm.heap.car(tail)
        } else {
            tail
        };

        let value = eval_form(vm, frame, form, bindings);
        if vm.heap.exceptionp(value) {
            return value;
        }
        bindings = set(&mut vm.heap, symbol, value, bindings);
        vm.heap.dec_ref(value);

        cursor = vm.heap.cdr(cursor);
    }

    vm.heap.inc_ref(bindings);

    let count = vm
        .heap
        .frame_ref(frame)
        .map_or(0, |f| f.args_count as usize);
    let mut result = CellPtr::NIL;
    vm.heap.inc_ref(result);
    for index in 1..count {
        vm.heap.dec_ref(result);
        result = eval_form(vm, frame, vm.heap.fetch_arg(frame, index), bindings);
        if vm.heap.exceptionp(result) {
            break;
        }
    }

    vm.heap.dec_ref(bindings);
    result
}

/// Special form: `(progn expressions…)` evaluates the expressions
/// sequentially and returns the value of the last.
pub fn lisp_progn(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let count = vm
        .heap
        .frame_ref(frame)
        .map_or(0, |f| f.args_count as usize);
    let more = vm.heap.frame_ref(frame).map_or(CellPtr::NIL, |f| f.more);

    let mut result = CellPtr::NIL;
    vm.heap.inc_ref(result);

    for index in 0..count.min(crate::memory::vectorspace::FRAME_REGISTERS) {
        vm.heap.dec_ref(result);
        result = eval_form(vm, frame, vm.heap.fetch_arg(frame, index), env);
        if vm.heap.exceptionp(result) {
            return result;
        }
    }

    if vm.heap.consp(more) {
        vm.heap.dec_ref(result);
        result = c_progn(vm, frame, more, env);
    }

    result
}

/// Special form: `(try body catch)`.
///
/// Forms from `body` (a list) are evaluated in turn until one returns an
/// exception or the list is exhausted. On an exception, `*exception*` is
/// bound to it in a fresh environment extension and the `catch` handler
/// is evaluated; its last value is returned.
///
/// The handler is a list of forms, or, when it starts with a symbol or a
/// keyword, a single application form such as `(:message *exception*)`.
pub fn lisp_try(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let body = vm.heap.fetch_arg(frame, 0);
    let result = c_progn(vm, frame, body, env);
    if !vm.heap.exceptionp(result) {
        return result;
    }

    let name = vm.heap.symbol_from_str("*exception*");
    let handler_env = set(&mut vm.heap, name, result, env);
    vm.heap.inc_ref(handler_env);

    let catch = vm.heap.fetch_arg(frame, 1);
    let head = vm.heap.car(catch);
    let recovered = if vm.heap.symbolp(head) || vm.heap.keywordp(head) {
        eval_form(vm, frame, catch, handler_env)
    } else {
        c_progn(vm, frame, catch, handler_env)
    };

    vm.heap.dec_ref(handler_env);
    vm.heap.dec_ref(result);
    recovered
}

// --- Functions with evaluator access -------------------------------------

/// Function: `(eval expression)` evaluates its (already evaluated)
/// argument once more.
pub fn lisp_eval_fn(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let expression = vm.heap.fetch_arg(frame, 0);
    eval_form(vm, frame, expression, env)
}

/// Function: `(apply fn args)` applies the function to the list of
/// arguments.
pub fn lisp_apply(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    let function = vm.heap.fetch_arg(frame, 0);
    let args = vm.heap.fetch_arg(frame, 1);
    let combination = vm.heap.cons(function, args);
    vm.heap.set_register(frame, 0, combination);
    vm.heap.set_register(frame, 1, CellPtr::NIL);

    c_apply(vm, frame, env)
}

/// Function: `(exception message)` constructs an exception whose frame is
/// the caller's; if `message` is already an exception it is returned
/// instead.
pub fn lisp_exception(vm: &mut Vm, frame: CellPtr, _env: CellPtr) -> CellPtr {
    let message = vm.heap.fetch_arg(frame, 0);
    if vm.heap.exceptionp(message) {
        return owned(&mut vm.heap, message);
    }
    let previous = vm
        .heap
        .frame_ref(frame)
        .map_or(CellPtr::NIL, |f| f.previous);
    throw_exception(&mut vm.heap, message, previous)
}
