//! Abstract interpretation of method bodies
//!
//! The analysis replays a method body on abstract [`Frame`]s, starting from a frame holding the
//! method parameters. Whenever two paths meet at a label, their frames are merged, and the label
//! is revisited if its frame changed. Since merging only ever moves cells up a lattice of finite
//! height, this always terminates.
//!
//! There are two flavors of frame cell:
//!
//!   - [`VerificationType`]: just the type of each slot, which is what `StackMapTable` needs
//!   - [`Value`]: the type, or a compile-time constant when one is known
//!
//! Both flavors share everything except what happens when an operation has known inputs.

mod errors;
mod execution;
mod frame;
mod intrinsics;
mod lookup;
mod results;
mod settings;
mod simulation;
mod types;
mod value;

pub use errors::*;
pub use execution::*;
pub use frame::*;
pub use intrinsics::*;
pub use lookup::*;
pub use results::*;
pub use settings::*;
pub use simulation::*;
pub use types::*;
pub use value::*;
