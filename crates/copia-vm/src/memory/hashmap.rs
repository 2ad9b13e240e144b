// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Immutable hashmaps in vector space.
//!
//! A map holds a fixed array of buckets, each NIL or an association list
//! of `(key . value)` pairs. `put` on a sealed map returns a new map which
//! shares the unaffected bucket chains; only the reader, while building a
//! map literal, mutates a map in place (marked by a T write ACL).

use crate::memory::conspage::Heap;
use crate::memory::vectorspace::{DEFAULT_HASHMAP_BUCKETS, Hashmap, VectorObject};
use crate::ops::equal::equal;
use crate::types::CellPtr;

/// Per-tag mixing constants, so that keys of different tags never collide
/// conceptually even when their character chains match.
pub(crate) fn key_tag_mix(heap: &Heap, key: CellPtr) -> u32 {
    match heap.tag(key) {
        crate::memory::cell::Tag::String => 0x9e37_79b9,
        crate::memory::cell::Tag::Symbol => 0x85eb_ca6b,
        crate::memory::cell::Tag::Keyword => 0xc2b2_ae35,
        _ => 0,
    }
}

impl Heap {
    /// Get the hash value for this key.
    ///
    /// String-like cells carry their hash, computed at construction;
    /// hashing is thus far implemented only for keys, symbols and strings,
    /// and everything else hashes to zero.
    #[must_use]
    pub fn get_hash(&self, key: CellPtr) -> u32 {
        self.string_parts(key).map_or(0, |(_, hash, _)| hash)
    }

    /// Select the bucket for this key in a map with `n_buckets` buckets.
    fn bucket_index(&self, key: CellPtr, n_buckets: usize) -> usize {
        let hash = self.get_hash(key) ^ key_tag_mix(self, key);
        hash as usize % n_buckets.max(1)
    }

    /// Make a hashmap with this number of buckets.
    ///
    /// `hash_fn` is a custom hash function or NIL for the built-in one;
    /// `write_acl` is T to leave the fresh map open for in-place updates.
    pub fn make_hashmap(
        &mut self,
        n_buckets: usize,
        hash_fn: CellPtr,
        write_acl: CellPtr,
    ) -> CellPtr {
        self.inc_ref(hash_fn);
        self.inc_ref(write_acl);
        self.make_vector_object(VectorObject::Hashmap(Hashmap {
            hash_fn,
            write_acl,
            buckets: vec![CellPtr::NIL; n_buckets.max(1)],
        }))
    }

    /// Make a hashmap with the default bucket count.
    pub fn make_default_hashmap(&mut self) -> CellPtr {
        self.make_hashmap(DEFAULT_HASHMAP_BUCKETS, CellPtr::NIL, CellPtr::NIL)
    }

    /// Make a new map sharing this map's hash function and bucket chains.
    pub fn clone_hashmap(&mut self, map: CellPtr) -> CellPtr {
        let Some(source) = self.hashmap_ref(map) else {
            return CellPtr::NIL;
        };
        let hash_fn = source.hash_fn;
        let write_acl = source.write_acl;
        let buckets = source.buckets.clone();

        self.inc_ref(hash_fn);
        self.inc_ref(write_acl);
        for &bucket in &buckets {
            self.inc_ref(bucket);
        }

        self.make_vector_object(VectorObject::Hashmap(Hashmap {
            hash_fn,
            write_acl,
            buckets,
        }))
    }

    /// Return a map containing this binding in addition to everything in
    /// `map`.
    ///
    /// On a sealed map this returns a fresh map sharing the unaffected
    /// buckets; on a map whose write ACL is truthy (under construction by
    /// the reader) the binding is prepended in place and `map` itself is
    /// returned.
    pub fn hashmap_put(&mut self, map: CellPtr, key: CellPtr, value: CellPtr) -> CellPtr {
        let Some(source) = self.hashmap_ref(map) else {
            return CellPtr::NIL;
        };
        let writable = source.write_acl.is_truthy();

        let target = if writable { map } else { self.clone_hashmap(map) };
        if self.exceptionp(target) {
            return target;
        }

        let Some(n_buckets) = self.hashmap_ref(target).map(|m| m.buckets.len()) else {
            return CellPtr::NIL;
        };
        let index = self.bucket_index(key, n_buckets);
        let old_bucket = self
            .hashmap_ref(target)
            .map_or(CellPtr::NIL, |m| m.buckets[index]);

        let pair = self.cons(key, value);
        let chain = self.cons(pair, old_bucket);
        if self.exceptionp(chain) {
            return chain;
        }
        self.inc_ref(chain);
        if let Some(m) = self.hashmap_mut(target) {
            m.buckets[index] = chain;
        }
        self.dec_ref(old_bucket);

        target
    }

    /// Seal a map after construction: reset its write ACL to NIL.
    pub fn seal_hashmap(&mut self, map: CellPtr) {
        let Some(source) = self.hashmap_ref(map) else {
            return;
        };
        let old_acl = source.write_acl;
        if let Some(m) = self.hashmap_mut(map) {
            m.write_acl = CellPtr::NIL;
        }
        self.dec_ref(old_acl);
    }

    /// Look up the value of `key` in this map, walking the selected
    /// bucket's association list with deep equality on keys.
    #[must_use]
    pub fn assoc_in_map(&self, key: CellPtr, map: CellPtr) -> CellPtr {
        let Some(source) = self.hashmap_ref(map) else {
            return CellPtr::NIL;
        };
        let index = self.bucket_index(key, source.buckets.len());
        let mut next = source.buckets[index];

        while self.consp(next) {
            let entry = self.car(next);
            if equal(self, key, self.car(entry)) {
                return self.cdr(entry);
            }
            next = self.cdr(next);
        }

        CellPtr::NIL
    }

    /// Return a fresh list of all keys in this map.
    pub fn hashmap_keys(&mut self, map: CellPtr) -> CellPtr {
        let Some(source) = self.hashmap_ref(map) else {
            return CellPtr::NIL;
        };
        let buckets = source.buckets.clone();

        let mut result = CellPtr::NIL;
        for bucket in buckets {
            let mut next = bucket;
            while self.consp(next) {
                let key = self.car(self.car(next));
                result = self.cons(key, result);
                next = self.cdr(next);
            }
        }

        result
    }
}
