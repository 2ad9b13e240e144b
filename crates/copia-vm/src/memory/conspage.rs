// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Cons pages: the paged allocator for fixed-size cells.
//!
//! The heap is a growable array of pages of [`CONS_PAGE_SIZE`] cells each.
//! Free cells are threaded onto a single freelist through their payload.
//! Page 0 reserves offsets 0 and 1 for the NIL and T singletons, which are
//! pinned with the maximum reference count and never freed.
//!
//! Before this goes multi-threaded these functions must become
//! aggressively thread safe; for now the whole heap is single-threaded.

use core::mem;

use tracing::trace;

use crate::memory::cell::{Cell, MAX_REFERENCE, Payload};
use crate::memory::vectorspace::VectorSpace;
use crate::types::CellPtr;

/// Cells per page.
pub const CONS_PAGE_SIZE: usize = 1024;

/// Default limit on the number of pages before allocation reports
/// exhaustion.
pub const DEFAULT_MAX_PAGES: usize = 64;

/// One page of cells.
struct ConsPage {
    cells: Vec<Cell>,
}

/// Allocation counters, kept to check for leakage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapStatistics {
    /// Number of pages initialised so far.
    pub pages: usize,
    /// Total cells handed out since startup.
    pub cells_allocated: u64,
    /// Total cells returned to the freelist since startup.
    pub cells_freed: u64,
}

/// The cons-space heap, together with the vector space it owns.
pub struct Heap {
    pages: Vec<ConsPage>,
    freelist: CellPtr,
    max_pages: usize,
    pub(crate) vectors: VectorSpace,
    oom: CellPtr,
    cells_allocated: u64,
    cells_freed: u64,
}

impl Heap {
    /// Create a heap with the default page cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_pages(DEFAULT_MAX_PAGES)
    }

    /// Create a heap which may grow to at most `max_pages` pages.
    ///
    /// The first page is initialised immediately, with NIL at `(0, 0)` and
    /// T at `(0, 1)`, and the out-of-memory exception is pre-built and
    /// pinned so that it can be returned when no cell can be allocated.
    #[must_use]
    pub fn with_max_pages(max_pages: usize) -> Self {
        let mut heap = Self {
            pages: Vec::new(),
            freelist: CellPtr::NIL,
            max_pages: max_pages.max(1),
            vectors: VectorSpace::new(),
            oom: CellPtr::NIL,
            cells_allocated: 0,
            cells_freed: 0,
        };
        heap.make_cons_page();

        let message = heap.string_from_str("Cons space is exhausted");
        let oom = heap.make_exception(message, CellPtr::NIL);
        heap.pin(oom);
        heap.oom = oom;

        heap
    }

    /// The pre-built, pinned out-of-memory exception.
    #[must_use]
    pub const fn out_of_memory(&self) -> CellPtr {
        self.oom
    }

    /// Allocation counters.
    #[must_use]
    pub fn statistics(&self) -> HeapStatistics {
        HeapStatistics {
            pages: self.pages.len(),
            cells_allocated: self.cells_allocated,
            cells_freed: self.cells_freed,
        }
    }

    /// Borrow the cell at this pointer.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not indicate an initialised cell; cell
    /// pointers are only ever produced by this heap, so an out-of-range
    /// pointer is a logic error.
    #[must_use]
    pub fn cell(&self, p: CellPtr) -> &Cell {
        &self.pages[p.page() as usize].cells[p.offset() as usize]
    }

    /// Mutably borrow the cell at this pointer.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not indicate an initialised cell.
    pub fn cell_mut(&mut self, p: CellPtr) -> &mut Cell {
        &mut self.pages[p.page() as usize].cells[p.offset() as usize]
    }

    /// The reference count of the cell at this pointer.
    #[must_use]
    pub fn count(&self, p: CellPtr) -> u32 {
        self.cell(p).count
    }

    /// True if the cell at this pointer is on the freelist.
    #[must_use]
    pub fn freep(&self, p: CellPtr) -> bool {
        matches!(self.cell(p).payload, Payload::Free { .. })
    }

    /// Pin the cell at this pointer so it is never decremented nor freed.
    pub fn pin(&mut self, p: CellPtr) {
        self.cell_mut(p).count = MAX_REFERENCE;
    }

    /// Make a cons page, threading every new cell onto the freelist.
    ///
    /// On the very first page, cells 0 and 1 are instead initialised as the
    /// NIL and T singletons.
    fn make_cons_page(&mut self) {
        let page_index = u32::try_from(self.pages.len()).unwrap_or(u32::MAX);
        let mut cells = Vec::with_capacity(CONS_PAGE_SIZE);

        for offset in 0..CONS_PAGE_SIZE {
            if page_index == 0 && offset == 0 {
                cells.push(Cell {
                    count: MAX_REFERENCE,
                    access: CellPtr::NIL,
                    payload: Payload::Nil,
                });
                trace!(target: "copia::alloc", "allocated special cell NIL");
            } else if page_index == 0 && offset == 1 {
                cells.push(Cell {
                    count: MAX_REFERENCE,
                    access: CellPtr::NIL,
                    payload: Payload::True,
                });
                trace!(target: "copia::alloc", "allocated special cell T");
            } else {
                cells.push(Cell {
                    count: 0,
                    access: CellPtr::NIL,
                    payload: Payload::Free {
                        next: self.freelist,
                    },
                });
                self.freelist = CellPtr::new(page_index, offset as u32);
            }
        }

        self.pages.push(ConsPage { cells });
        trace!(target: "copia::alloc", page = page_index, "initialised cons page");
    }

    /// Allocate a cell with this payload.
    ///
    /// Pops the head of the freelist; if the freelist is empty, initialises
    /// a fresh page and retries. When the page cap is reached the payload
    /// is disposed of (its child references released) and the pre-built
    /// out-of-memory exception is returned instead.
    pub fn allocate(&mut self, payload: Payload) -> CellPtr {
        if self.freelist.is_nil() {
            if self.pages.len() >= self.max_pages {
                trace!(target: "copia::alloc", "cons space exhausted");
                self.dispose_payload(payload);
                return self.oom;
            }
            self.make_cons_page();
        }

        let result = self.freelist;
        let tag = payload.tag();
        let next_free = match self.cell(result).payload {
            Payload::Free { next } => Some(next),
            _ => None,
        };
        match next_free {
            Some(next) => self.freelist = next,
            None => {
                // A non-free cell on the freelist is a corrupted heap.
                trace!(target: "copia::alloc", pointer = %result, "allocating non-free cell");
            }
        }
        let cell = self.cell_mut(result);
        cell.count = 0;
        cell.access = CellPtr::NIL;
        cell.payload = payload;
        self.cells_allocated += 1;

        trace!(target: "copia::alloc", tag = tag.name(), pointer = %result, "allocated cell");

        result
    }

    /// Increment the reference count of the object at this pointer.
    ///
    /// Pinned cells (NIL, T, the out-of-memory exception) are unaffected.
    pub fn inc_ref(&mut self, p: CellPtr) {
        let cell = self.cell_mut(p);
        if cell.count != MAX_REFERENCE {
            cell.count += 1;
        }
    }

    /// Decrement the reference count of the object at this pointer,
    /// freeing it when the count reaches zero.
    ///
    /// Freeing cascades: every cell the freed payload owns is decremented
    /// in turn. The cascade is driven by an explicit worklist, so freeing
    /// an arbitrarily long chain cannot overflow the host stack.
    pub fn dec_ref(&mut self, p: CellPtr) {
        let mut work = vec![p];

        while let Some(q) = work.pop() {
            let cell = self.cell_mut(q);
            if cell.count == MAX_REFERENCE {
                continue;
            }
            if cell.count == 0 {
                trace!(
                    target: "copia::alloc",
                    pointer = %q,
                    "attempt to decrement cell whose count is already zero"
                );
                continue;
            }
            cell.count -= 1;
            if cell.count == 0 {
                self.free_cell(q, &mut work);
            }
        }
    }

    /// Free the cell at this pointer, cascading the decrement to every
    /// cell its payload owns. Dangerous, primitive, low level.
    fn free_cell(&mut self, p: CellPtr, work: &mut Vec<CellPtr>) {
        {
            let cell = self.cell_mut(p);
            if matches!(cell.payload, Payload::Free { .. }) {
                trace!(target: "copia::alloc", pointer = %p, "attempt to free cell which is already free");
                return;
            }
            if cell.count > 0 {
                trace!(
                    target: "copia::alloc",
                    pointer = %p,
                    count = cell.count,
                    "attempt to free cell with dangling references"
                );
                return;
            }
        }

        let next = self.freelist;
        let cell = self.cell_mut(p);
        let payload = mem::replace(&mut cell.payload, Payload::Free { next });
        let access = mem::replace(&mut cell.access, CellPtr::NIL);
        self.freelist = p;
        self.cells_freed += 1;
        work.push(access);

        trace!(target: "copia::alloc", tag = payload.tag().name(), pointer = %p, "freeing cell");

        self.cascade_payload(payload, work);
    }

    /// Release a payload which never made it into a cell.
    fn dispose_payload(&mut self, payload: Payload) {
        let mut work = Vec::new();
        self.cascade_payload(payload, &mut work);
        for q in work {
            self.dec_ref(q);
        }
    }

    /// Push every cell pointer owned by this payload onto the worklist,
    /// running stream finalisers on the way.
    fn cascade_payload(&mut self, payload: Payload, work: &mut Vec<CellPtr>) {
        match payload {
            Payload::Cons { car, cdr } => {
                work.push(car);
                work.push(cdr);
            }
            Payload::String { cdr, .. }
            | Payload::Symbol { cdr, .. }
            | Payload::Keyword { cdr, .. } => work.push(cdr),
            Payload::Integer { more, .. } => work.push(more),
            Payload::Ratio { dividend, divisor } => {
                work.push(dividend);
                work.push(divisor);
            }
            Payload::Lambda { args, body } | Payload::NLambda { args, body } => {
                work.push(args);
                work.push(body);
            }
            Payload::Function { meta, .. } | Payload::Special { meta, .. } => work.push(meta),
            Payload::Exception { message, frame } => {
                work.push(message);
                work.push(frame);
            }
            Payload::Read { mut stream, meta } => {
                stream.close();
                work.push(meta);
            }
            Payload::Write { mut sink, meta } => {
                sink.close();
                work.push(meta);
            }
            Payload::VecPointer { address, .. } => self.free_vector_object(address, work),
            Payload::Nil | Payload::True | Payload::Free { .. } | Payload::Real { .. } => {}
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
