//! Small helpers shared across the crate

mod ref_id;

pub use ref_id::*;

/// Elements with a width, measured in JVM slots
///
/// Most values occupy one slot, but `long` and `double` take two (both on the operand stack and in
/// the local variables).
pub trait Width {
    fn width(&self) -> usize;
}
