//! Collaborators supplied by the embedding compiler

use super::Value;
use crate::jvm::code::{FieldRef, MethodRef};
use crate::jvm::BinaryName;

/// Answers questions about the class hierarchy
///
/// Implementations must be side-effect free: the analysis may ask the same question many times
/// and in any order. [`crate::jvm::class_graph::ClassGraph`] is a static implementation.
pub trait InheritanceChecker {
    /// Closest common superclass of two classes, or `java/lang/Object` if they are unrelated (or
    /// unknown)
    fn common_superclass(&self, first: &BinaryName, second: &BinaryName) -> BinaryName;

    /// Is `child` the same as, or a subtype of, `parent`?
    fn is_subclass_of(&self, child: &BinaryName, parent: &BinaryName) -> bool;
}

/// Names local variables, for frame inspection and the local variable table
pub trait VariableNameLookup {
    fn name_of(&self, index: u16) -> String;
}

impl<F: Fn(u16) -> String> VariableNameLookup for F {
    fn name_of(&self, index: u16) -> String {
        self(index)
    }
}

/// Names `this` for instance methods and `v<index>` for everything else
#[derive(Copy, Clone, Debug)]
pub struct DefaultVariableNames {
    pub has_this: bool,
}

impl VariableNameLookup for DefaultVariableNames {
    fn name_of(&self, index: u16) -> String {
        if self.has_this && index == 0 {
            String::from("this")
        } else {
            format!("v{}", index)
        }
    }
}

/// Supplies known values for static field reads
pub trait FieldValueLookup {
    /// Value of the field, if it is known to be constant
    fn field_value(&self, field: &FieldRef) -> Option<Value>;
}

impl<F: Fn(&FieldRef) -> Option<Value>> FieldValueLookup for F {
    fn field_value(&self, field: &FieldRef) -> Option<Value> {
        self(field)
    }
}

/// Supplies known results for static method calls
pub trait MethodValueLookup {
    /// Result of calling the method with the given arguments, if it is known
    fn method_value(&self, method: &MethodRef, arguments: &[Value]) -> Option<Value>;
}

impl<F: Fn(&MethodRef, &[Value]) -> Option<Value>> MethodValueLookup for F {
    fn method_value(&self, method: &MethodRef, arguments: &[Value]) -> Option<Value> {
        self(method, arguments)
    }
}
