//! Symbolic method bodies
//!
//! A method body is a flat sequence of [`CodeItem`]s: instructions interspersed with the
//! placements of [`Label`]s. Jumps, switches, and [`ExceptionHandler`]s refer to labels rather
//! than to offsets, which is what a textual assembler naturally produces (and what a
//! disassembler can print back).
//!
//! Turning this into the bytes of a `Code` attribute (computing offsets, choosing between `goto`
//! and `goto_w`, etc.) happens elsewhere. The frame analysis in [`crate::analysis`] works
//! directly on this representation.

mod instructions;
mod label;
mod method_body;

pub use instructions::*;
pub use label::*;
pub use method_body::*;
