use super::{InheritanceChecker, VerificationType};
use crate::jvm::Constant;
use crate::util::Width;
use std::fmt;

/// Abstract value of a stack slot or local variable
///
/// This is a lattice whose bottom elements are the specific constants and whose top is
/// `Unknown(Top)`. Merging can only move up the lattice: two different constants merge into an
/// unknown value of their joined type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Value whose type is known, but not its contents
    Unknown(VerificationType),

    /// Compile-time constant
    Known(Constant),
}

impl Value {
    pub const fn int(value: i32) -> Value {
        Value::Known(Constant::Integer(value))
    }

    pub const fn long(value: i64) -> Value {
        Value::Known(Constant::Long(value))
    }

    pub const fn float(value: f32) -> Value {
        Value::Known(Constant::Float(value))
    }

    pub const fn double(value: f64) -> Value {
        Value::Known(Constant::Double(value))
    }

    /// Static type of the value
    pub fn verification_type(&self) -> VerificationType {
        match self {
            Value::Unknown(verification_type) => verification_type.clone(),
            Value::Known(constant) => VerificationType::of_constant(constant),
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Value::Known(constant) => Some(constant),
            Value::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    /// Join of two values
    ///
    /// Equal values merge to themselves, anything else merges to an unknown value of the joined
    /// type. In particular, a known `null` merged with a reference is never `null` again.
    pub fn merge(&self, other: &Value, checker: &dyn InheritanceChecker) -> Value {
        if self == other {
            self.clone()
        } else {
            let merged = self
                .verification_type()
                .merge(&other.verification_type(), checker);
            Value::Unknown(merged)
        }
    }
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Value {
        Value::Known(constant)
    }
}

impl From<VerificationType> for Value {
    fn from(verification_type: VerificationType) -> Value {
        Value::Unknown(verification_type)
    }
}

impl Width for Value {
    fn width(&self) -> usize {
        match self {
            Value::Unknown(verification_type) => verification_type.width(),
            Value::Known(constant) => constant.width(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown(verification_type) => write!(f, "{}", verification_type),
            Value::Known(constant) => write!(f, "{}", constant),
        }
    }
}
