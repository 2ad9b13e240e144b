// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The read/eval/print loop and batch evaluation.


use tracing::trace;

use crate::io::print::print_to_string;
use crate::io::read;
use crate::io::{ReaderSource, SessionError, WriterSink};
use crate::memory::conspage::Heap;
use crate::ops::builtins::get_default_stream;
use crate::ops::eval::{eval_form, owned};
use crate::ops::intern::c_assoc;
use crate::types::CellPtr;
use crate::vm::Vm;

/// Fetch the prompt string bound to `*prompt*`, if any.
fn prompt_text(heap: &mut Heap, env: CellPtr) -> Option<String> {
    let name = heap.symbol_from_str("*prompt*");
    heap.inc_ref(name);
    let prompt = c_assoc(heap, name, env);
    heap.dec_ref(name);
    if heap.stringp(prompt) {
        Some(heap.string_to_host(prompt))
    } else {
        None
    }
}

/// The read/eval/print loop over this frame's environment streams.
///
/// Reads from the stream bound to `*in*` and prints to the one bound to
/// `*out*`, until end of input. Each iteration evaluates against the
/// current oblist, so `set!` from one form is visible to the next. The
/// value of the last expression read is returned.
pub fn lisp_repl(vm: &mut Vm, frame: CellPtr, env: CellPtr) -> CellPtr {
    trace!(target: "copia::repl", "entering repl");

    let input = get_default_stream(&mut vm.heap, true, env);
    let output = get_default_stream(&mut vm.heap, false, env);
    if !vm.heap.readp(input) || !vm.heap.writep(output) {
        return owned(&mut vm.heap, CellPtr::NIL);
    }
    vm.heap.inc_ref(input);
    vm.heap.inc_ref(output);

    let mut last = CellPtr::NIL;
    vm.heap.inc_ref(last);

    while !vm.heap.stream_feof(input) {
        // Anything bound since the last iteration lives on the new
        // oblist root, so resolve the environment afresh each time.
        let env = vm.oblist;

        if let Some(prompt) = prompt_text(&mut vm.heap, env) {
            vm.heap.sink_write_str(output, &prompt);
            vm.heap.sink_flush(output);
        }

        let expression = read::read(vm, frame, env, input);
        if vm.heap.exceptionp(expression) && vm.heap.stream_feof(input) {
            // Suppress the end-of-stream exception.
            vm.heap.dec_ref(expression);
            break;
        }

        vm.heap.dec_ref(last);
        last = expression;

        let result = eval_form(vm, frame, expression, env);
        let text = print_to_string(&vm.heap, result);
        vm.heap.sink_write_str(output, &text);
        vm.heap.sink_write_str(output, "\n");
        vm.heap.sink_flush(output);
        vm.heap.dec_ref(result);
    }

    vm.heap.dec_ref(input);
    vm.heap.dec_ref(output);
    last
}

/// Run an interactive session over the host's standard streams.
///
/// Binds `*in*` and `*out*` in the oblist, then enters the loop.
pub fn run(vm: &mut Vm) -> Result<(), SessionError> {
    let stdin = vm.heap.make_read_stream(
        Box::new(ReaderSource::new(std::io::stdin())),
        CellPtr::NIL,
    );
    crate::ops::builtins::bind_value(vm, "*in*", stdin);

    let stdout = vm.heap.make_write_stream(
        Box::new(WriterSink::new(std::io::stdout())),
        CellPtr::NIL,
    );
    crate::ops::builtins::bind_value(vm, "*out*", stdout);

    let frame = vm.heap.make_empty_frame(CellPtr::NIL);
    vm.heap.inc_ref(frame);

    let oblist = vm.oblist;
    let last = lisp_repl(vm, frame, oblist);
    vm.heap.dec_ref(last);

    vm.heap.dec_ref(frame);
    Ok(())
}

/// Read and evaluate a source file; the last value is returned rendered.
///
/// An uncaught exception becomes a [`SessionError::Uncaught`] so batch
/// invocations exit non-zero.
pub fn eval_file(vm: &mut Vm, path: &std::path::Path) -> Result<String, SessionError> {
    let source = std::fs::read_to_string(path)?;
    let result = vm.eval_str(&source);
    let text = print_to_string(&vm.heap, result);
    let failed = vm.heap.exceptionp(result);
    vm.heap.dec_ref(result);

    if failed {
        Err(SessionError::Uncaught(text))
    } else {
        Ok(text)
    }
}
