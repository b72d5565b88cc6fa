//! Symbolic model of JVM classes and method bodies
//!
//! This is the vocabulary that the rest of the crate is written in: names, type descriptors,
//! constants, access flags, instructions, and the class hierarchy.
//!
//! ```
//! use jasm::jvm::*;
//! use jasm::jvm::code::*;
//!
//! # fn build() -> Result<(), Error> {
//! let descriptor = MethodDescriptor::<BinaryName>::parse("(IJ)Ljava/lang/String;")?;
//! assert_eq!(descriptor.parameter_length(false), 3);
//!
//! let mut body = MethodBody::new();
//! let done = body.fresh_label();
//! body.push(Instruction::ILoad(0));
//! body.push(Instruction::If(OrdComparison::EQ, done));
//! body.push(Instruction::Ldc(Constant::String(String::from("nonzero"))));
//! body.push(Instruction::AReturn);
//! body.place_label(done);
//! body.push(Instruction::AConstNull);
//! body.push(Instruction::AReturn);
//! body.validate()?;
//! # Ok(())
//! # }
//! # build().unwrap();
//! ```

mod access_flags;
pub mod class_graph;
pub mod code;
mod constant;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use constant::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
