// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Vector space: variable-size tagged objects.
//!
//! Objects too large or too irregular for a fixed cell (hashmaps and stack
//! frames) live here. Each object is reachable through exactly one `VECP`
//! cell in cons space; the slot stores a back-pointer to that cell, and
//! the `VECP` cell caches the vector-space tag so typechecks on the cell
//! alone are sufficient. Freeing the `VECP` cell frees the backing object
//! and cascades the decrement to everything it references.

use tracing::trace;

use crate::memory::cell::Payload;
use crate::memory::conspage::Heap;
use crate::types::CellPtr;

/// Number of argument registers in a stack frame.
pub const FRAME_REGISTERS: usize = 8;

/// Default number of buckets in a hashmap.
pub const DEFAULT_HASHMAP_BUCKETS: usize = 256;

/// Vector-space tags. Values must not collide with cons-space tags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VecTag {
    /// A hashmap.
    Hash,
    /// A stack frame.
    Frame,
}

impl VecTag {
    /// The legacy four-byte tag string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Frame => "STFR",
        }
    }
}

/// An immutable hashmap.
///
/// Each bucket is NIL or an association list of `(key . value)` pairs.
#[derive(Debug)]
pub struct Hashmap {
    /// Custom hash function, or NIL for the built-in string hash.
    pub hash_fn: CellPtr,
    /// Write ACL; T while a map is under construction by the reader,
    /// NIL once it is sealed.
    pub write_acl: CellPtr,
    /// The buckets.
    pub buckets: Vec<CellPtr>,
}

/// A stack frame.
///
/// Frames live in vector space so that exceptions can retain the throwing
/// frame past its dynamic extent.
#[derive(Debug)]
pub struct StackFrame {
    /// The previous frame, or NIL at the bottom of the stack.
    pub previous: CellPtr,
    /// The first eight argument bindings.
    pub args: [CellPtr; FRAME_REGISTERS],
    /// List of any further argument bindings.
    pub more: CellPtr,
    /// The function being called, for diagnostics.
    pub function: CellPtr,
    /// Number of arguments bound in this frame.
    pub args_count: u32,
}

/// An object in vector space.
#[derive(Debug)]
pub enum VectorObject {
    /// A hashmap.
    Hashmap(Hashmap),
    /// A stack frame.
    Frame(StackFrame),
}

impl VectorObject {
    /// The vector-space tag of this object.
    #[must_use]
    pub const fn tag(&self) -> VecTag {
        match self {
            Self::Hashmap(_) => VecTag::Hash,
            Self::Frame(_) => VecTag::Frame,
        }
    }

    /// The payload size in bytes, recorded in the slot header.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        match self {
            Self::Hashmap(map) => {
                (map.buckets.len() + 2) * size_of::<CellPtr>() + size_of::<u32>()
            }
            Self::Frame(_) => size_of::<StackFrame>(),
        }
    }
}

/// A vector-space slot: header plus object.
pub(crate) struct VsoSlot {
    /// Back-pointer to the unique `VECP` cell pointing at this object.
    pub vecp: CellPtr,
    /// Payload size in bytes.
    pub size: usize,
    /// The object itself.
    pub object: VectorObject,
}

/// The vector-space arena: a slab of slots with a free-slot list.
pub(crate) struct VectorSpace {
    slots: Vec<Option<VsoSlot>>,
    free: Vec<usize>,
}

impl VectorSpace {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn insert(&mut self, slot: VsoSlot) -> usize {
        if let Some(address) = self.free.pop() {
            self.slots[address] = Some(slot);
            address
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn remove(&mut self, address: usize) -> Option<VsoSlot> {
        let slot = self.slots.get_mut(address)?.take();
        if slot.is_some() {
            self.free.push(address);
        }
        slot
    }

    fn get(&self, address: usize) -> Option<&VsoSlot> {
        self.slots.get(address)?.as_ref()
    }

    fn get_mut(&mut self, address: usize) -> Option<&mut VsoSlot> {
        self.slots.get_mut(address)?.as_mut()
    }
}

impl Heap {
    /// Allocate a vector-space object and return the `VECP` cell which
    /// points to it.
    ///
    /// The object must arrive with its child references already counted;
    /// on cons-space exhaustion the object is disposed of again and the
    /// out-of-memory exception is returned.
    pub fn make_vector_object(&mut self, object: VectorObject) -> CellPtr {
        let tag = object.tag();
        let size = object.payload_size();
        let address = self.vectors.insert(VsoSlot {
            vecp: CellPtr::NIL,
            size,
            object,
        });

        let vecp = self.allocate(Payload::VecPointer { tag, address });
        if self.exceptionp(vecp) {
            let mut work = Vec::new();
            self.free_vector_object(address, &mut work);
            for q in work {
                self.dec_ref(q);
            }
            return vecp;
        }

        if let Some(slot) = self.vectors.get_mut(address) {
            slot.vecp = vecp;
        }

        trace!(
            target: "copia::alloc",
            tag = tag.name(),
            address,
            size,
            "allocated vector-space object"
        );

        vecp
    }

    /// Free the vector-space object at this address, pushing everything it
    /// references onto the cascade worklist.
    pub(crate) fn free_vector_object(&mut self, address: usize, work: &mut Vec<CellPtr>) {
        let Some(slot) = self.vectors.remove(address) else {
            trace!(target: "copia::alloc", address, "attempt to free unallocated vector-space object");
            return;
        };

        match slot.object {
            VectorObject::Hashmap(map) => {
                work.push(map.hash_fn);
                work.push(map.write_acl);
                work.extend(map.buckets);
            }
            VectorObject::Frame(frame) => {
                work.push(frame.previous);
                work.push(frame.function);
                work.push(frame.more);
                work.extend(frame.args);
            }
        }
    }

    /// Borrow the vector-space object behind a `VECP` cell.
    #[must_use]
    pub fn vector_object(&self, p: CellPtr) -> Option<&VectorObject> {
        let (_, address) = self.vecp_parts(p)?;
        self.vectors.get(address).map(|slot| &slot.object)
    }

    /// The slot header behind a `VECP` cell: the back-pointer to the cell
    /// itself, and the payload size in bytes.
    #[must_use]
    pub fn vector_object_header(&self, p: CellPtr) -> Option<(CellPtr, usize)> {
        let (_, address) = self.vecp_parts(p)?;
        self.vectors.get(address).map(|slot| (slot.vecp, slot.size))
    }

    /// Mutably borrow the vector-space object behind a `VECP` cell.
    pub fn vector_object_mut(&mut self, p: CellPtr) -> Option<&mut VectorObject> {
        let (_, address) = self.vecp_parts(p)?;
        self.vectors.get_mut(address).map(|slot| &mut slot.object)
    }

    /// Borrow the hashmap behind a `VECP` cell, if it is one.
    #[must_use]
    pub fn hashmap_ref(&self, p: CellPtr) -> Option<&Hashmap> {
        match self.vector_object(p)? {
            VectorObject::Hashmap(map) => Some(map),
            VectorObject::Frame(_) => None,
        }
    }

    /// Mutably borrow the hashmap behind a `VECP` cell, if it is one.
    pub fn hashmap_mut(&mut self, p: CellPtr) -> Option<&mut Hashmap> {
        match self.vector_object_mut(p)? {
            VectorObject::Hashmap(map) => Some(map),
            VectorObject::Frame(_) => None,
        }
    }

    /// Borrow the stack frame behind a `VECP` cell, if it is one.
    #[must_use]
    pub fn frame_ref(&self, p: CellPtr) -> Option<&StackFrame> {
        match self.vector_object(p)? {
            VectorObject::Frame(frame) => Some(frame),
            VectorObject::Hashmap(_) => None,
        }
    }

    /// Mutably borrow the stack frame behind a `VECP` cell, if it is one.
    pub fn frame_mut(&mut self, p: CellPtr) -> Option<&mut StackFrame> {
        match self.vector_object_mut(p)? {
            VectorObject::Frame(frame) => Some(frame),
            VectorObject::Hashmap(_) => None,
        }
    }
}
