use crate::jvm::code::{Instruction, Label};
use std::fmt;

/// Ways in which replaying a method body can fail
///
/// These all point to a malformed instruction stream (or a malformed control-flow graph built
/// from it), never to something that a better analysis could have recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisErrorKind {
    /// Popped from an empty operand stack
    #[error("operand stack is empty")]
    EmptyStack,

    /// Popped a wide value, but the top slot was not the second half of one
    #[error("expected the second slot of a wide value on top of the stack")]
    MissingFiller,

    /// Popped a narrow value, but the top slot was the second half of a wide value
    #[error("the top of the stack is the second slot of a wide value")]
    UnexpectedFiller,

    /// Stack shuffle or pop would split a wide value in half
    #[error("cannot split a wide value with a window of width {0}")]
    InvalidWidth(usize),

    /// Two paths reach the same label with different stack shapes
    #[error("incompatible stacks at merge point: {existing} vs. {incoming}")]
    StackSizeMismatch { existing: String, incoming: String },

    /// A jump, switch, or exception handler targets a label that is never placed
    #[error("label {0:?} is never placed")]
    UndefinedLabel(Label),

    /// An exception handler's protected range ends before (or where) it starts
    #[error("exception range {start:?}..{end:?} is empty or reversed")]
    InvertedExceptionRange { start: Label, end: Label },

    /// A label is placed more than once
    #[error("label {0:?} is placed more than once")]
    DuplicateLabel(Label),

    /// Loaded a local that no path has defined yet
    #[error("local variable {0} is not defined")]
    UndefinedLocal(u16),

    /// Operation needs an object reference, but got a primitive
    #[error("expected a reference, but found {0}")]
    NotAReference(String),

    /// Constant used where it cannot appear (eg. `ldc` of a `null`)
    #[error("invalid constant {0}")]
    InvalidConstant(String),
}

/// Fatal analysis failure, located at the instruction that triggered it
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisError {
    /// Index (into the method body items) of the offending item
    pub index: usize,

    /// Offending instruction, if the failure is tied to one
    pub instruction: Option<Instruction>,

    pub kind: AnalysisErrorKind,
}

impl AnalysisError {
    pub fn new(index: usize, instruction: Option<&Instruction>, kind: AnalysisErrorKind) -> Self {
        AnalysisError {
            index,
            instruction: instruction.cloned(),
            kind,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instruction {
            Some(instruction) => write!(f, "at #{} ({:?}): {}", self.index, instruction, self.kind),
            None => write!(f, "at #{}: {}", self.index, self.kind),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
