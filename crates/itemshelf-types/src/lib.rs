//! Itemshelf Types - Pure type definitions
//!
//! This crate contains only plain data types with no async runtime
//! dependencies, so every layer (and its tests) can depend on it cheaply.

pub mod item;

pub use item::*;
