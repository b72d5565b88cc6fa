use super::InheritanceChecker;
use crate::jvm::class_graph::is_array_type_assignable;
use crate::jvm::{ArrayType, BaseType, BinaryName, Constant, FieldType, RefType};
use crate::util::Width;
use std::cmp::min;
use std::fmt;

/// Types tracked for stack slots and local variables
///
/// These are the types from [this hierarchy][0], plus `Top` for when two incompatible types meet
/// at a merge point. `boolean`, `byte`, `char`, and `short` are all just `Integer`.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType {
    /// Unusable value (eg. a local that is an `int` on one path and a `float` on another)
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// State of an object after `new` has been called but `<init>` has not been called
    Uninitialized(UninitializedRefType),

    /// Object type
    Object(RefType<BinaryName>),
}

/// Result of a `new` instruction that hasn't been initialized yet
///
/// Two `new`s of the same class produce distinct uninitialized types, which is why the position
/// of the `new` instruction is part of the type.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct UninitializedRefType {
    /// Once the type is initialized, what will it be?
    pub class: BinaryName,

    /// Index (in the method body items) of the `new` instruction
    pub new_index: usize,
}

impl VerificationType {
    pub const fn object(class: BinaryName) -> VerificationType {
        VerificationType::Object(RefType::Object(class))
    }

    /// Is this type is a reference type?
    pub fn is_reference(&self) -> bool {
        match self {
            VerificationType::Top
            | VerificationType::Integer
            | VerificationType::Float
            | VerificationType::Double
            | VerificationType::Long => false,

            VerificationType::Null
            | VerificationType::UninitializedThis
            | VerificationType::Object(_)
            | VerificationType::Uninitialized(_) => true,
        }
    }

    /// Static type of a constant
    pub fn of_constant(constant: &Constant) -> VerificationType {
        match constant {
            Constant::Integer(_) => VerificationType::Integer,
            Constant::Long(_) => VerificationType::Long,
            Constant::Float(_) => VerificationType::Float,
            Constant::Double(_) => VerificationType::Double,
            Constant::String(_) => VerificationType::object(BinaryName::STRING),
            Constant::Class(_) => VerificationType::object(BinaryName::CLASS),
            Constant::Null => VerificationType::Null,
        }
    }

    /// Join of two types: the most specific type to which both types are assignable
    ///
    /// This is commutative and idempotent. Incompatible types join to `Top`.
    pub fn merge(
        &self,
        other: &VerificationType,
        checker: &dyn InheritanceChecker,
    ) -> VerificationType {
        match (self, other) {
            _ if self == other => self.clone(),
            (VerificationType::Null, VerificationType::Object(_)) => other.clone(),
            (VerificationType::Object(_), VerificationType::Null) => self.clone(),
            (VerificationType::Object(ref1), VerificationType::Object(ref2)) => {
                VerificationType::Object(merge_ref_types(ref1, ref2, checker))
            }
            _ => VerificationType::Top,
        }
    }

    /// Check if one verification type is assignable to another
    pub fn is_assignable(
        &self,
        super_type: &VerificationType,
        checker: &dyn InheritanceChecker,
    ) -> bool {
        match (self, super_type) {
            (_, VerificationType::Top) => true,
            _ if self == super_type => true,
            (VerificationType::Null, VerificationType::Object(_)) => true,
            (VerificationType::Object(ref1), VerificationType::Object(ref2)) => {
                is_ref_assignable(ref1, ref2, checker)
            }
            _ => false,
        }
    }
}

/// Reference assignability, with the usual (unsound) array covariance
fn is_ref_assignable(
    sub_type: &RefType<BinaryName>,
    super_type: &RefType<BinaryName>,
    checker: &dyn InheritanceChecker,
) -> bool {
    match (sub_type, super_type) {
        (RefType::Object(class1), RefType::Object(class2)) => {
            checker.is_subclass_of(class1, class2)
        }

        // Special superclass and interfaces of all arrays
        (RefType::PrimitiveArray(_) | RefType::ObjectArray(_), RefType::Object(class)) => {
            is_array_type_assignable(class)
        }

        // Primitive arrays must match in dimension and type
        (RefType::PrimitiveArray(arr1), RefType::PrimitiveArray(arr2)) => arr1 == arr2,

        // `int[][]` is an `Object[]`, since `int[]` is an `Object`
        (RefType::PrimitiveArray(arr1), RefType::ObjectArray(arr2)) => {
            arr1.additional_dimensions > arr2.additional_dimensions
                && is_array_type_assignable(&arr2.element_type)
        }

        (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2)) => {
            if arr1.additional_dimensions < arr2.additional_dimensions {
                false
            } else if arr1.additional_dimensions == arr2.additional_dimensions {
                checker.is_subclass_of(&arr1.element_type, &arr2.element_type)
            } else {
                is_array_type_assignable(&arr2.element_type)
            }
        }

        (RefType::Object(_), _) | (RefType::ObjectArray(_), RefType::PrimitiveArray(_)) => false,
    }
}

/// Join of two reference types
fn merge_ref_types(
    ref1: &RefType<BinaryName>,
    ref2: &RefType<BinaryName>,
    checker: &dyn InheritanceChecker,
) -> RefType<BinaryName> {
    let object_array = |additional_dimensions: usize| {
        RefType::ObjectArray(ArrayType {
            additional_dimensions,
            element_type: BinaryName::OBJECT,
        })
    };

    match (ref1, ref2) {
        _ if ref1 == ref2 => ref1.clone(),

        (RefType::Object(class1), RefType::Object(class2)) => {
            RefType::Object(checker.common_superclass(class1, class2))
        }

        (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2)) => {
            if arr1.additional_dimensions == arr2.additional_dimensions {
                RefType::ObjectArray(ArrayType {
                    additional_dimensions: arr1.additional_dimensions,
                    element_type: checker
                        .common_superclass(&arr1.element_type, &arr2.element_type),
                })
            } else {
                object_array(min(arr1.additional_dimensions, arr2.additional_dimensions))
            }
        }

        // `int[][]` and `String[]` are both `Object[]`, but `int[]` and `String[]` are not
        (RefType::PrimitiveArray(prim), RefType::ObjectArray(obj))
        | (RefType::ObjectArray(obj), RefType::PrimitiveArray(prim)) => {
            if prim.additional_dimensions == 0 {
                RefType::Object(BinaryName::OBJECT)
            } else {
                object_array(min(prim.additional_dimensions - 1, obj.additional_dimensions))
            }
        }

        (RefType::PrimitiveArray(arr1), RefType::PrimitiveArray(arr2)) => {
            match min(arr1.additional_dimensions, arr2.additional_dimensions) {
                0 => RefType::Object(BinaryName::OBJECT),
                n => object_array(n - 1),
            }
        }

        // Arrays are only ever `Object`, `Cloneable`, or `Serializable`
        (RefType::Object(class), _) | (_, RefType::Object(class)) => {
            if is_array_type_assignable(class) {
                RefType::Object(class.clone())
            } else {
                RefType::Object(BinaryName::OBJECT)
            }
        }
    }
}

impl From<FieldType<BinaryName>> for VerificationType {
    fn from(field_type: FieldType<BinaryName>) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Ref(ref_type) => VerificationType::Object(ref_type),
        }
    }
}

impl Width for VerificationType {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationType::Top => f.write_str("top"),
            VerificationType::Integer => f.write_str("int"),
            VerificationType::Float => f.write_str("float"),
            VerificationType::Double => f.write_str("double"),
            VerificationType::Long => f.write_str("long"),
            VerificationType::Null => f.write_str("null"),
            VerificationType::UninitializedThis => f.write_str("uninitializedThis"),
            VerificationType::Uninitialized(uninit) => {
                write!(f, "uninitialized({}@{})", uninit.class, uninit.new_index)
            }
            VerificationType::Object(ref_type) => write!(f, "{}", ref_type),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas};

    fn int_array(additional_dimensions: usize) -> VerificationType {
        VerificationType::Object(RefType::PrimitiveArray(ArrayType {
            additional_dimensions,
            element_type: BaseType::Int,
        }))
    }

    fn object_array(additional_dimensions: usize, element_type: BinaryName) -> VerificationType {
        VerificationType::Object(RefType::ObjectArray(ArrayType {
            additional_dimensions,
            element_type,
        }))
    }

    #[test]
    fn merge_primitives() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);

        let int = VerificationType::Integer;
        assert_eq!(int.merge(&int, &graph), int);
        assert_eq!(int.merge(&VerificationType::Float, &graph), VerificationType::Top);
        assert_eq!(int.merge(&VerificationType::Null, &graph), VerificationType::Top);
        assert_eq!(
            VerificationType::Long.merge(&VerificationType::Top, &graph),
            VerificationType::Top
        );
    }

    #[test]
    fn merge_references() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();

        let integer = VerificationType::object(BinaryName::INTEGER);
        let double = VerificationType::object(BinaryName::DOUBLE);
        let number = VerificationType::object(BinaryName::NUMBER);
        let object = VerificationType::object(BinaryName::OBJECT);

        assert_eq!(integer.merge(&double, &graph), number);
        assert_eq!(double.merge(&integer, &graph), number);
        assert_eq!(VerificationType::Null.merge(&integer, &graph), integer);
        assert_eq!(integer.merge(&VerificationType::Null, &graph), integer);

        assert_eq!(
            object_array(0, BinaryName::INTEGER).merge(&object_array(0, BinaryName::LONG), &graph),
            object_array(0, BinaryName::NUMBER)
        );
        assert_eq!(int_array(0).merge(&object_array(0, BinaryName::STRING), &graph), object);
        assert_eq!(
            int_array(1).merge(&object_array(0, BinaryName::STRING), &graph),
            object_array(0, BinaryName::OBJECT)
        );
        assert_eq!(int_array(2).merge(&int_array(1), &graph), object_array(0, BinaryName::OBJECT));
        assert_eq!(
            int_array(0).merge(&VerificationType::object(BinaryName::CLONEABLE), &graph),
            VerificationType::object(BinaryName::CLONEABLE)
        );
        assert_eq!(int_array(0).merge(&integer, &graph), object);
    }

    #[test]
    fn assignability() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();

        let string = VerificationType::object(BinaryName::STRING);
        let object = VerificationType::object(BinaryName::OBJECT);
        assert!(string.is_assignable(&object, &graph));
        assert!(!object.is_assignable(&string, &graph));
        assert!(VerificationType::Null.is_assignable(&string, &graph));
        assert!(int_array(1).is_assignable(&object_array(0, BinaryName::OBJECT), &graph));
        assert!(!int_array(0).is_assignable(&object_array(0, BinaryName::OBJECT), &graph));
        assert!(object_array(0, BinaryName::STRING)
            .is_assignable(&object_array(0, BinaryName::CHARSEQUENCE), &graph));
        assert!(VerificationType::Integer.is_assignable(&VerificationType::Top, &graph));
    }

    #[test]
    fn field_types() {
        assert_eq!(VerificationType::from(FieldType::boolean()), VerificationType::Integer);
        assert_eq!(VerificationType::from(FieldType::char()), VerificationType::Integer);
        assert_eq!(VerificationType::from(FieldType::long()).width(), 2);
        assert_eq!(
            VerificationType::from(FieldType::object(BinaryName::STRING)).to_string(),
            "java/lang/String"
        );
        assert_eq!(int_array(1).to_string(), "[[I");
    }
}
