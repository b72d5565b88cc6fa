//! Frame analysis for a textual JVM bytecode assembler
//!
//! Given a method body (a flat list of instructions and label placements, along with exception
//! handlers), [`analysis::Analyzer`] computes the operand stack and local variables at every
//! reachable point. This is what an assembler needs to emit `StackMapTable` frames and a local
//! variable table, and what a disassembler needs to annotate its output.
//!
//! ```
//! use jasm::analysis::{Analyzer, Settings, Value};
//! use jasm::jvm::class_graph::{ClassGraph, ClassGraphArenas};
//! use jasm::jvm::code::{Instruction, MethodBody, MethodSignature};
//! use jasm::jvm::{BinaryName, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor};
//! use jasm::jvm::UnqualifiedName;
//!
//! let arenas = ClassGraphArenas::new();
//! let graph = ClassGraph::new(&arenas);
//! graph.insert_java_library_types();
//!
//! let signature = MethodSignature {
//!     owner: BinaryName::from_string(String::from("demo/Adder")).unwrap(),
//!     name: UnqualifiedName::from_string(String::from("seven")).unwrap(),
//!     descriptor: MethodDescriptor::parse("()I").unwrap(),
//!     access_flags: MethodAccessFlags::STATIC,
//! };
//! let mut body = MethodBody::new();
//! body.push(Instruction::IConst3);
//! body.push(Instruction::IConst4);
//! body.push(Instruction::IAdd);
//! body.push(Instruction::IReturn);
//!
//! let settings = Settings::new();
//! let results = Analyzer::new(&settings, &graph).analyze_valued(&signature, &body);
//! let (_, frame) = results.terminal_frames().next().unwrap();
//! assert_eq!(frame.peek(), Ok(&Value::int(7)));
//! ```

pub mod analysis;
pub mod jvm;
pub mod util;
