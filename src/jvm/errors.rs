use super::code::Label;

/// Errors from building or validating the symbolic JVM model
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Class, method, or field name is not valid
    #[error("malformed name: {0}")]
    MalformedName(String),

    /// Type or method descriptor could not be parsed
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// Two label markers claim to be the same label
    #[error("label {0:?} is placed more than once")]
    DuplicateLabel(Label),

    /// A jump, switch, or exception handler refers to a label that is never placed
    #[error("label {0:?} is referenced but never placed")]
    UnplacedLabel(Label),

    /// An exception handler range ends before it starts
    #[error("exception range {start:?}..{end:?} is empty or reversed")]
    InvertedExceptionRange { start: Label, end: Label },
}
