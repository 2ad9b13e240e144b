// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Copia
//!
//! A Lisp interpreter with an unusual memory architecture:
//!
//! - a paged, fixed-cell heap ("cons space") with a freelist and
//!   reference-count lifetimes, including cascading free;
//! - a variable-size object heap ("vector space") hosting hashmaps and
//!   first-class stack frames;
//! - exact arithmetic over arbitrary-precision integer chains and ratios,
//!   with coercion to reals;
//! - an evaluator built around explicit stack frames rather than the host
//!   call stack, with exceptions as ordinary propagating values;
//! - a character-at-a-time reader and a round-tripping printer.
//!
//! The crate provides the `copia_vm` library plus the `copia` binary, an
//! interactive read/eval/print loop that can also evaluate source files in
//! batch mode.

pub mod arith;
pub mod io;
pub mod memory;
pub mod ops;
pub mod repl;
pub mod types;
pub mod vm;

// Re-export commonly used types at crate root
pub use memory::conspage::Heap;
pub use types::CellPtr;
pub use vm::Vm;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
