// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Core type definitions for the Copia runtime.
//!
//! This module provides the opaque cell pointer used throughout the
//! interpreter. Keeping the `(page, offset)` pair behind a newtype lets the
//! heap relocate or grow without invalidating held references, and stops
//! anything outside the memory subsystem from treating it as an address.

#[cfg(test)]
mod pointer_test;

mod pointer;

pub use pointer::CellPtr;
