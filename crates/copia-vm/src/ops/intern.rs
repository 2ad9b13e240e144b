// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The oblist and shallow binding.
//!
//! An environment is a value: NIL, a cons of a `(key . value)` binding
//! onto another environment, or a hashmap. Doctrine is that cons cells are
//! immutable, so when a symbol is rebound in the oblist we construct a new
//! oblist with the new binding consed onto the front. Anything which held
//! a pointer to the old oblist continues to see the old bindings.

use tracing::trace;

use crate::memory::conspage::Heap;
use crate::ops::equal::equal;
use crate::types::CellPtr;
use crate::vm::Vm;

/// If this key is lexically identical to a key in this store, return the
/// canonical key cell from the store, so that a later `eq` test works;
/// otherwise NIL.
#[must_use]
pub fn internedp(heap: &Heap, key: CellPtr, store: CellPtr) -> CellPtr {
    if !heap.symbolp(key) && !heap.keywordp(key) {
        trace!(target: "copia::bind", "internedp: key is not a symbol or keyword");
        return CellPtr::NIL;
    }

    if heap.hashmapp(store) {
        // A map binds its canonical keys directly; find the entry's key.
        let mut next = heap.hashmap_keys_of_bucket(key, store);
        while heap.consp(next) {
            let entry = heap.car(next);
            if equal(heap, key, heap.car(entry)) {
                return heap.car(entry);
            }
            next = heap.cdr(next);
        }
        return CellPtr::NIL;
    }

    let mut next = store;
    while heap.consp(next) {
        let entry = heap.car(next);
        if equal(heap, key, heap.car(entry)) {
            return heap.car(entry);
        }
        next = heap.cdr(next);
    }

    CellPtr::NIL
}

/// If this key is lexically identical to a key in this store, return the
/// value bound to it; otherwise NIL.
#[must_use]
pub fn c_assoc(heap: &Heap, key: CellPtr, store: CellPtr) -> CellPtr {
    if heap.vectorpointp(store) {
        return heap.assoc_in_map(key, store);
    }

    let mut next = store;
    while heap.consp(next) {
        let entry = heap.car(next);
        if equal(heap, key, heap.car(entry)) {
            return heap.cdr(entry);
        }
        next = heap.cdr(next);
    }

    CellPtr::NIL
}

/// Return a new store containing all the key/value pairs in this store
/// with this binding added to the front.
///
/// The result follows the constructor convention: it arrives with count
/// zero and the caller retains it if it keeps it.
pub fn set(heap: &mut Heap, key: CellPtr, value: CellPtr, store: CellPtr) -> CellPtr {
    trace!(target: "copia::bind", "binding key in store");

    if heap.vectorpointp(store) {
        return heap.hashmap_put(store, key, value);
    }

    let binding = heap.cons(key, value);
    heap.cons(binding, store)
}

/// Ensure a canonical copy of this key is bound in this environment, and
/// return that environment; if there is no binding yet, create one with
/// the value NIL.
pub fn intern(heap: &mut Heap, key: CellPtr, environment: CellPtr) -> CellPtr {
    if internedp(heap, key, environment).is_nil() {
        set(heap, key, CellPtr::NIL, environment)
    } else {
        environment
    }
}

/// Bind this key to this value in the global oblist.
///
/// Replacing the oblist root is a single indivisible step; environments
/// captured before the bind keep seeing the old bindings.
pub fn deep_bind(vm: &mut Vm, key: CellPtr, value: CellPtr) -> CellPtr {
    trace!(target: "copia::bind", "deep_bind");

    let old = vm.oblist;
    let new = set(&mut vm.heap, key, value, old);
    vm.heap.inc_ref(new);
    vm.heap.dec_ref(old);
    vm.oblist = new;
    new
}

impl Heap {
    /// The bucket association list a key would live in, for interning
    /// against hashmap stores.
    #[must_use]
    pub(crate) fn hashmap_keys_of_bucket(&self, key: CellPtr, map: CellPtr) -> CellPtr {
        let Some(source) = self.hashmap_ref(map) else {
            return CellPtr::NIL;
        };
        let n = source.buckets.len();
        let index = {
            // Same selection as assoc_in_map.
            let hash = self.get_hash(key);
            (hash ^ crate::memory::hashmap::key_tag_mix(self, key)) as usize % n.max(1)
        };
        source.buckets[index]
    }
}
