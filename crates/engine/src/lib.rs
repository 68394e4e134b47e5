//! In-memory spreadsheet engine.
//!
//! A [`sheet::Sheet`] is a resizable two-dimensional grid of cells. A cell
//! holds literal text or an arithmetic formula (`=A1+3`) referring to other
//! cells by position. The engine parses formulas into expression trees,
//! maintains the bidirectional dependency graph between cells, rejects
//! assignments that would introduce a circular reference, and evaluates
//! formulas lazily with transitive cache invalidation on change.

pub mod cell;
pub mod dep_graph;
pub mod error;
pub mod formula;
pub mod position;
pub mod recalc;
pub mod sheet;

#[cfg(test)]
pub mod harness;
