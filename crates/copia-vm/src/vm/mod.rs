// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The machine: heap, oblist, and host hooks.
//!
//! All interpreter state lives here and is threaded through every
//! operation as `&mut Vm`. The runtime is single-threaded: there are no
//! parallel mutators of the heap, the vector space, or the oblist.


use crate::io::print::print_to_string;
use crate::io::read;
use crate::io::{StringSource, UrlOpener};
use crate::memory::conspage::{DEFAULT_MAX_PAGES, Heap};
use crate::ops::builtins;
use crate::ops::eval::eval_form;
use crate::types::CellPtr;

/// The Copia machine.
pub struct Vm {
    /// Cons space and vector space.
    pub heap: Heap,
    /// The process-wide root environment. Rebinding replaces the root;
    /// holders of the old root keep seeing the old bindings.
    pub oblist: CellPtr,
    /// The host's URL transport, when one is installed.
    pub(crate) url_opener: Option<UrlOpener>,
}

impl Vm {
    /// Create a machine with the default heap size and the standard
    /// bindings installed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_pages(DEFAULT_MAX_PAGES)
    }

    /// Create a machine whose heap may grow to at most `max_pages` cons
    /// pages.
    #[must_use]
    pub fn with_max_pages(max_pages: usize) -> Self {
        let mut vm = Self {
            heap: Heap::with_max_pages(max_pages),
            oblist: CellPtr::NIL,
            url_opener: None,
        };
        builtins::install(&mut vm);
        vm
    }

    /// Install a URL transport; `(open "scheme://…")` goes through it.
    pub fn set_url_opener(&mut self, opener: UrlOpener) {
        self.url_opener = Some(opener);
    }

    /// Evaluate every form in this source text against the oblist and
    /// return the last value.
    ///
    /// The result arrives with one reference owned by the caller. An
    /// exception from any form stops evaluation and is returned.
    pub fn eval_str(&mut self, source: &str) -> CellPtr {
        let stream = self
            .heap
            .make_read_stream(Box::new(StringSource::new(source)), CellPtr::NIL);
        self.heap.inc_ref(stream);

        let frame = self.heap.make_empty_frame(CellPtr::NIL);
        self.heap.inc_ref(frame);

        let mut result = CellPtr::NIL;
        self.heap.inc_ref(result);

        loop {
            if self.heap.stream_feof(stream) {
                break;
            }
            let oblist = self.oblist;
            let expression = read::read(self, frame, oblist, stream);
            if self.heap.exceptionp(expression) {
                if self.heap.stream_feof(stream) {
                    // Suppress the end-of-stream exception; the last
                    // value read stands.
                    self.heap.dec_ref(expression);
                } else {
                    self.heap.dec_ref(result);
                    result = expression;
                }
                break;
            }

            self.heap.dec_ref(result);
            let oblist = self.oblist;
            result = eval_form(self, frame, expression, oblist);
            self.heap.dec_ref(expression);
            if self.heap.exceptionp(result) {
                break;
            }
        }

        self.heap.dec_ref(frame);
        self.heap.dec_ref(stream);
        result
    }

    /// Evaluate source text and render the last value.
    pub fn eval_to_string(&mut self, source: &str) -> String {
        let result = self.eval_str(source);
        let text = print_to_string(&self.heap, result);
        self.heap.dec_ref(result);
        text
    }

    /// Render any value.
    #[must_use]
    pub fn print(&self, value: CellPtr) -> String {
        print_to_string(&self.heap, value)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
