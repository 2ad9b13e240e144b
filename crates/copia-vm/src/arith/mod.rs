// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Arithmetic: integer chains, ratios, and the numeric tower.
//!
//! Doctrine is that all integers are bignums; it's just that integers of
//! fewer than 61 bits are bignums of one cell only. Ratios are pairs of
//! integers kept in lowest terms. Binary operations promote their operands
//! along integer ≺ ratio ≺ real and dispatch on the promoted type.

#[cfg(test)]
mod ratio_test;

pub mod integer;
pub mod ratio;
pub mod tower;
