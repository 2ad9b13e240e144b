// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for vector-space allocation and the VECP back-pointer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::cell::Tag;
use super::conspage::Heap;
use super::vectorspace::{FRAME_REGISTERS, VecTag};
use crate::types::CellPtr;

#[test]
fn hashmap_gets_a_vecp_cell() {
    let mut heap = Heap::new();
    let map = heap.make_default_hashmap();

    assert_eq!(heap.tag(map), Tag::VecPointer);
    assert!(heap.hashmapp(map));
    assert!(!heap.framep(map));
    assert_eq!(heap.vecp_parts(map).unwrap().0, VecTag::Hash);
}

#[test]
fn frame_gets_a_vecp_cell() {
    let mut heap = Heap::new();
    let frame = heap.make_empty_frame(CellPtr::NIL);

    assert!(heap.framep(frame));
    let f = heap.frame_ref(frame).unwrap();
    assert_eq!(f.previous, CellPtr::NIL);
    assert_eq!(f.args, [CellPtr::NIL; FRAME_REGISTERS]);
    assert_eq!(f.args_count, 0);
}

#[test]
fn the_back_pointer_names_the_unique_vecp_cell() {
    let mut heap = Heap::new();
    let map = heap.make_default_hashmap();
    let (vecp, size) = heap.vector_object_header(map).unwrap();
    assert_eq!(vecp, map, "one canonical VECP cell per object");
    assert!(size > 0);
}

#[test]
fn freeing_the_vecp_cell_frees_the_backing_object() {
    let mut heap = Heap::new();
    let map = heap.make_default_hashmap();
    heap.inc_ref(map);

    assert!(heap.vector_object(map).is_some());
    heap.dec_ref(map);
    assert!(heap.freep(map));
}

#[test]
fn freeing_a_frame_releases_its_registers() {
    let mut heap = Heap::new();
    let value = heap.string_from_str("kept");
    heap.inc_ref(value);

    let frame = heap.make_empty_frame(CellPtr::NIL);
    heap.inc_ref(frame);
    heap.set_register(frame, 0, value);
    assert_eq!(heap.count(value), 2);

    heap.dec_ref(frame);
    assert_eq!(heap.count(value), 1, "the frame's reference is gone");
    assert!(!heap.freep(value), "our own reference keeps it alive");
}

#[test]
fn frame_retains_its_previous_frame() {
    let mut heap = Heap::new();
    let bottom = heap.make_empty_frame(CellPtr::NIL);
    heap.inc_ref(bottom);
    let top = heap.make_empty_frame(bottom);
    heap.inc_ref(top);
    assert_eq!(heap.count(bottom), 2);

    heap.dec_ref(top);
    assert_eq!(heap.count(bottom), 1);
}

#[test]
fn slots_are_reused_after_free() {
    let mut heap = Heap::new();
    let first = heap.make_default_hashmap();
    let (_, first_address) = heap.vecp_parts(first).unwrap();
    heap.inc_ref(first);
    heap.dec_ref(first);

    let second = heap.make_default_hashmap();
    let (_, second_address) = heap.vecp_parts(second).unwrap();
    assert_eq!(first_address, second_address);
}
