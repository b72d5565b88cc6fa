use super::{BinaryName, RefType};
use crate::util::Width;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Compile-time constant as it can appear in a constant-load instruction or be recovered by the
/// value analysis
///
/// Floating point constants compare by bit pattern, so `NaN` is equal to itself and `0.0` is not
/// equal to `-0.0`. This keeps equality reflexive, which the frame merge relies on.
#[derive(Clone, Debug)]
pub enum Constant {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Class(RefType<BinaryName>),
    Null,
}

impl Constant {
    /// Is this a floating point `NaN`?
    pub fn is_nan(&self) -> bool {
        match self {
            Constant::Float(f) => f.is_nan(),
            Constant::Double(d) => d.is_nan(),
            _ => false,
        }
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Integer(i1), Constant::Integer(i2)) => i1 == i2,
            (Constant::Long(l1), Constant::Long(l2)) => l1 == l2,
            (Constant::Float(f1), Constant::Float(f2)) => f1.to_bits() == f2.to_bits(),
            (Constant::Double(d1), Constant::Double(d2)) => d1.to_bits() == d2.to_bits(),
            (Constant::String(s1), Constant::String(s2)) => s1 == s2,
            (Constant::Class(c1), Constant::Class(c2)) => c1 == c2,
            (Constant::Null, Constant::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Integer(i) => i.hash(state),
            Constant::Long(l) => l.hash(state),
            Constant::Float(f) => f.to_bits().hash(state),
            Constant::Double(d) => d.to_bits().hash(state),
            Constant::String(s) => s.hash(state),
            Constant::Class(c) => c.hash(state),
            Constant::Null => (),
        }
    }
}

impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Renders the constant the way it would be written as a Java literal
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Integer(i) => write!(f, "{}", i),
            Constant::Long(l) => write!(f, "{}L", l),
            Constant::Float(x) => write!(f, "{:?}f", x),
            Constant::Double(x) => write!(f, "{:?}d", x),
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::Class(RefType::Object(name)) => write!(f, "{}.class", name),
            Constant::Class(array) => write!(f, "{}.class", array),
            Constant::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Constant::Float(f32::NAN), Constant::Float(f32::NAN));
        assert_eq!(Constant::Double(f64::NAN), Constant::Double(f64::NAN));
        assert_ne!(Constant::Double(0.0), Constant::Double(-0.0));
        assert_ne!(Constant::Integer(1), Constant::Long(1));
    }

    #[test]
    fn literals() {
        assert_eq!(Constant::Integer(-3).to_string(), "-3");
        assert_eq!(Constant::Long(7).to_string(), "7L");
        assert_eq!(Constant::Float(1.5).to_string(), "1.5f");
        assert_eq!(Constant::Double(2.0).to_string(), "2.0d");
        assert_eq!(Constant::String(String::from("a\"b")).to_string(), "\"a\\\"b\"");
        assert_eq!(
            Constant::Class(RefType::object(BinaryName::STRING)).to_string(),
            "java/lang/String.class"
        );
        assert_eq!(Constant::Null.to_string(), "null");
    }
}
