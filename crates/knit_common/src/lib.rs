//! Shared foundational types used across the knit workspace.
//!
//! This crate provides interned identifiers and the 4-state logic values used
//! when reading back what a wired signal carries.

#![warn(missing_docs)]

pub mod ident;
pub mod logic;
pub mod logic_vec;

pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
