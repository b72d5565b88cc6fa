//! Constant folding through pure functions
//!
//! An [`Intrinsic`] wraps a host function of some fixed shape (eg. "two `int`s in, one `int`
//! out"). Folding only calls the function when every argument is a known constant of the right
//! kind; otherwise, or if the function reports a fault (eg. integer division by zero, which
//! would throw `ArithmeticException` at runtime), the result is just an unknown value of the
//! result type.
//!
//! All of the host functions follow Java semantics rather than Rust semantics: integer
//! arithmetic wraps, shift distances are masked, and float-to-integer conversions saturate (with
//! `NaN` going to `0`).

use super::{Value, VerificationType};
use crate::jvm::code::MethodRef;
use crate::jvm::{BinaryName, Constant, FieldType, MethodDescriptor, UnqualifiedName};
use std::collections::HashMap;

/// Pure function of a fixed shape
///
/// Fallible shapes return `None` when the operation would fault.
#[derive(Copy, Clone, Debug)]
pub enum Intrinsic {
    IntUnary(fn(i32) -> i32),
    IntBinary(fn(i32, i32) -> Option<i32>),
    LongUnary(fn(i64) -> i64),
    LongBinary(fn(i64, i64) -> Option<i64>),
    LongShift(fn(i64, i32) -> i64),
    LongCompare(fn(i64, i64) -> i32),
    FloatUnary(fn(f32) -> f32),
    FloatBinary(fn(f32, f32) -> f32),
    FloatCompare(fn(f32, f32) -> i32),
    DoubleUnary(fn(f64) -> f64),
    DoubleBinary(fn(f64, f64) -> f64),
    DoubleCompare(fn(f64, f64) -> i32),
    IntToLong(fn(i32) -> i64),
    IntToFloat(fn(i32) -> f32),
    IntToDouble(fn(i32) -> f64),
    LongToInt(fn(i64) -> i32),
    LongToFloat(fn(i64) -> f32),
    LongToDouble(fn(i64) -> f64),
    FloatToInt(fn(f32) -> i32),
    FloatToLong(fn(f32) -> i64),
    FloatToDouble(fn(f32) -> f64),
    DoubleToInt(fn(f64) -> i32),
    DoubleToLong(fn(f64) -> i64),
    DoubleToFloat(fn(f64) -> f32),
}

impl Intrinsic {
    /// Types of the arguments, in the order they are pushed
    pub fn parameter_types(&self) -> Vec<VerificationType> {
        use VerificationType::{Double, Float, Integer, Long};
        match self {
            Intrinsic::IntUnary(_)
            | Intrinsic::IntToLong(_)
            | Intrinsic::IntToFloat(_)
            | Intrinsic::IntToDouble(_) => vec![Integer],
            Intrinsic::IntBinary(_) => vec![Integer, Integer],
            Intrinsic::LongUnary(_)
            | Intrinsic::LongToInt(_)
            | Intrinsic::LongToFloat(_)
            | Intrinsic::LongToDouble(_) => vec![Long],
            Intrinsic::LongBinary(_) | Intrinsic::LongCompare(_) => vec![Long, Long],
            Intrinsic::LongShift(_) => vec![Long, Integer],
            Intrinsic::FloatUnary(_)
            | Intrinsic::FloatToInt(_)
            | Intrinsic::FloatToLong(_)
            | Intrinsic::FloatToDouble(_) => vec![Float],
            Intrinsic::FloatBinary(_) | Intrinsic::FloatCompare(_) => vec![Float, Float],
            Intrinsic::DoubleUnary(_)
            | Intrinsic::DoubleToInt(_)
            | Intrinsic::DoubleToLong(_)
            | Intrinsic::DoubleToFloat(_) => vec![Double],
            Intrinsic::DoubleBinary(_) | Intrinsic::DoubleCompare(_) => vec![Double, Double],
        }
    }

    /// Type of the result
    pub fn result_type(&self) -> VerificationType {
        match self {
            Intrinsic::IntUnary(_)
            | Intrinsic::IntBinary(_)
            | Intrinsic::LongCompare(_)
            | Intrinsic::FloatCompare(_)
            | Intrinsic::DoubleCompare(_)
            | Intrinsic::LongToInt(_)
            | Intrinsic::FloatToInt(_)
            | Intrinsic::DoubleToInt(_) => VerificationType::Integer,
            Intrinsic::LongUnary(_)
            | Intrinsic::LongBinary(_)
            | Intrinsic::LongShift(_)
            | Intrinsic::IntToLong(_)
            | Intrinsic::FloatToLong(_)
            | Intrinsic::DoubleToLong(_) => VerificationType::Long,
            Intrinsic::FloatUnary(_)
            | Intrinsic::FloatBinary(_)
            | Intrinsic::IntToFloat(_)
            | Intrinsic::LongToFloat(_)
            | Intrinsic::DoubleToFloat(_) => VerificationType::Float,
            Intrinsic::DoubleUnary(_)
            | Intrinsic::DoubleBinary(_)
            | Intrinsic::IntToDouble(_)
            | Intrinsic::LongToDouble(_)
            | Intrinsic::FloatToDouble(_) => VerificationType::Double,
        }
    }

    /// Apply the intrinsic to abstract arguments
    pub fn fold(&self, arguments: &[Value]) -> Value {
        match self.try_fold(arguments) {
            Some(constant) => Value::Known(constant),
            None => Value::Unknown(self.result_type()),
        }
    }

    fn try_fold(&self, arguments: &[Value]) -> Option<Constant> {
        let constant = match (*self, arguments) {
            (Intrinsic::IntUnary(f), [a]) => Constant::Integer(f(int(a)?)),
            (Intrinsic::IntBinary(f), [a, b]) => Constant::Integer(f(int(a)?, int(b)?)?),
            (Intrinsic::LongUnary(f), [a]) => Constant::Long(f(long(a)?)),
            (Intrinsic::LongBinary(f), [a, b]) => Constant::Long(f(long(a)?, long(b)?)?),
            (Intrinsic::LongShift(f), [a, b]) => Constant::Long(f(long(a)?, int(b)?)),
            (Intrinsic::LongCompare(f), [a, b]) => Constant::Integer(f(long(a)?, long(b)?)),
            (Intrinsic::FloatUnary(f), [a]) => Constant::Float(f(float(a)?)),
            (Intrinsic::FloatBinary(f), [a, b]) => Constant::Float(f(float(a)?, float(b)?)),
            (Intrinsic::FloatCompare(f), [a, b]) => Constant::Integer(f(float(a)?, float(b)?)),
            (Intrinsic::DoubleUnary(f), [a]) => Constant::Double(f(double(a)?)),
            (Intrinsic::DoubleBinary(f), [a, b]) => Constant::Double(f(double(a)?, double(b)?)),
            (Intrinsic::DoubleCompare(f), [a, b]) => {
                Constant::Integer(f(double(a)?, double(b)?))
            }
            (Intrinsic::IntToLong(f), [a]) => Constant::Long(f(int(a)?)),
            (Intrinsic::IntToFloat(f), [a]) => Constant::Float(f(int(a)?)),
            (Intrinsic::IntToDouble(f), [a]) => Constant::Double(f(int(a)?)),
            (Intrinsic::LongToInt(f), [a]) => Constant::Integer(f(long(a)?)),
            (Intrinsic::LongToFloat(f), [a]) => Constant::Float(f(long(a)?)),
            (Intrinsic::LongToDouble(f), [a]) => Constant::Double(f(long(a)?)),
            (Intrinsic::FloatToInt(f), [a]) => Constant::Integer(f(float(a)?)),
            (Intrinsic::FloatToLong(f), [a]) => Constant::Long(f(float(a)?)),
            (Intrinsic::FloatToDouble(f), [a]) => Constant::Double(f(float(a)?)),
            (Intrinsic::DoubleToInt(f), [a]) => Constant::Integer(f(double(a)?)),
            (Intrinsic::DoubleToLong(f), [a]) => Constant::Long(f(double(a)?)),
            (Intrinsic::DoubleToFloat(f), [a]) => Constant::Float(f(double(a)?)),
            _ => return None,
        };
        Some(constant)
    }
}

fn int(value: &Value) -> Option<i32> {
    match value {
        Value::Known(Constant::Integer(i)) => Some(*i),
        _ => None,
    }
}

fn long(value: &Value) -> Option<i64> {
    match value {
        Value::Known(Constant::Long(l)) => Some(*l),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f32> {
    match value {
        Value::Known(Constant::Float(f)) => Some(*f),
        _ => None,
    }
}

fn double(value: &Value) -> Option<f64> {
    match value {
        Value::Known(Constant::Double(d)) => Some(*d),
        _ => None,
    }
}

// `MIN / -1` overflows back to `MIN` on the JVM (and `MIN % -1` is `0`)
pub(super) fn int_div(a: i32, b: i32) -> Option<i32> {
    if b == 0 {
        None
    } else {
        Some(a.wrapping_div(b))
    }
}

pub(super) fn int_rem(a: i32, b: i32) -> Option<i32> {
    if b == 0 {
        None
    } else {
        Some(a.wrapping_rem(b))
    }
}

pub(super) fn long_div(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        None
    } else {
        Some(a.wrapping_div(b))
    }
}

pub(super) fn long_rem(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        None
    } else {
        Some(a.wrapping_rem(b))
    }
}

fn int_floor_div(a: i32, b: i32) -> Option<i32> {
    let quotient = int_div(a, b)?;
    if (a ^ b) < 0 && quotient.wrapping_mul(b) != a {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

fn int_floor_mod(a: i32, b: i32) -> Option<i32> {
    let remainder = int_rem(a, b)?;
    if (a ^ b) < 0 && remainder != 0 {
        Some(remainder + b)
    } else {
        Some(remainder)
    }
}

fn long_floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = long_div(a, b)?;
    if (a ^ b) < 0 && quotient.wrapping_mul(b) != a {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

fn long_floor_mod(a: i64, b: i64) -> Option<i64> {
    let remainder = long_rem(a, b)?;
    if (a ^ b) < 0 && remainder != 0 {
        Some(remainder + b)
    } else {
        Some(remainder)
    }
}

// `Math.max`/`Math.min` propagate `NaN` and order `-0.0` below `0.0`
fn float_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        f32::from_bits(a.to_bits() & b.to_bits())
    } else {
        a.max(b)
    }
}

fn float_min(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        f32::from_bits(a.to_bits() | b.to_bits())
    } else {
        a.min(b)
    }
}

fn double_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        f64::from_bits(a.to_bits() & b.to_bits())
    } else {
        a.max(b)
    }
}

fn double_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        f64::from_bits(a.to_bits() | b.to_bits())
    } else {
        a.min(b)
    }
}

/// Pure library methods that `invokestatic` can be folded through
#[derive(Clone, Debug)]
pub struct IntrinsicTable {
    methods: HashMap<MethodRef, Intrinsic>,
}

impl IntrinsicTable {
    /// Table with no methods in it
    pub fn empty() -> IntrinsicTable {
        IntrinsicTable {
            methods: HashMap::new(),
        }
    }

    /// Table with the pure `java/lang/Math`, `Integer`, `Long`, `Float`, and `Double` helpers
    pub fn new() -> IntrinsicTable {
        use FieldType as FT;

        let mut table = IntrinsicTable::empty();
        let int = FT::int();
        let long = FT::long();
        let float = FT::float();
        let double = FT::double();

        // `java/lang/Math`
        let math = BinaryName::MATH;
        let (max, min, abs) = (UnqualifiedName::MAX, UnqualifiedName::MIN, UnqualifiedName::ABS);
        table.insert(&math, &max, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(|a, b| Some(a.max(b))));
        table.insert(&math, &min, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(|a, b| Some(a.min(b))));
        table.insert(&math, &abs, &[FT::int()], int.clone(), Intrinsic::IntUnary(i32::wrapping_abs));
        table.insert(&math, &max, &[FT::long(), FT::long()], long.clone(), Intrinsic::LongBinary(|a, b| Some(a.max(b))));
        table.insert(&math, &min, &[FT::long(), FT::long()], long.clone(), Intrinsic::LongBinary(|a, b| Some(a.min(b))));
        table.insert(&math, &abs, &[FT::long()], long.clone(), Intrinsic::LongUnary(i64::wrapping_abs));
        table.insert(&math, &max, &[FT::float(), FT::float()], float.clone(), Intrinsic::FloatBinary(float_max));
        table.insert(&math, &min, &[FT::float(), FT::float()], float.clone(), Intrinsic::FloatBinary(float_min));
        table.insert(&math, &abs, &[FT::float()], float.clone(), Intrinsic::FloatUnary(f32::abs));
        table.insert(&math, &max, &[FT::double(), FT::double()], double.clone(), Intrinsic::DoubleBinary(double_max));
        table.insert(&math, &min, &[FT::double(), FT::double()], double.clone(), Intrinsic::DoubleBinary(double_min));
        table.insert(&math, &abs, &[FT::double()], double.clone(), Intrinsic::DoubleUnary(f64::abs));
        table.insert(&math, &UnqualifiedName::FLOORDIV, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(int_floor_div));
        table.insert(&math, &UnqualifiedName::FLOORMOD, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(int_floor_mod));
        table.insert(&math, &UnqualifiedName::FLOORDIV, &[FT::long(), FT::long()], long.clone(), Intrinsic::LongBinary(long_floor_div));
        table.insert(&math, &UnqualifiedName::FLOORMOD, &[FT::long(), FT::long()], long.clone(), Intrinsic::LongBinary(long_floor_mod));

        // `java/lang/Integer` and `java/lang/Long`
        let integer = BinaryName::INTEGER;
        table.insert(&integer, &UnqualifiedName::SUM, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(|a, b| Some(a.wrapping_add(b))));
        table.insert(&integer, &max, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(|a, b| Some(a.max(b))));
        table.insert(&integer, &min, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(|a, b| Some(a.min(b))));
        table.insert(&integer, &UnqualifiedName::ROTATELEFT, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(|a, b| Some(a.rotate_left((b & 31) as u32))));
        table.insert(&integer, &UnqualifiedName::ROTATERIGHT, &[FT::int(), FT::int()], int.clone(), Intrinsic::IntBinary(|a, b| Some(a.rotate_right((b & 31) as u32))));
        let long_class = BinaryName::LONG;
        table.insert(&long_class, &UnqualifiedName::SUM, &[FT::long(), FT::long()], long.clone(), Intrinsic::LongBinary(|a, b| Some(a.wrapping_add(b))));
        table.insert(&long_class, &max, &[FT::long(), FT::long()], long.clone(), Intrinsic::LongBinary(|a, b| Some(a.max(b))));
        table.insert(&long_class, &min, &[FT::long(), FT::long()], long.clone(), Intrinsic::LongBinary(|a, b| Some(a.min(b))));
        table.insert(&long_class, &UnqualifiedName::ROTATELEFT, &[FT::long(), FT::int()], long.clone(), Intrinsic::LongShift(|a, b| a.rotate_left((b & 63) as u32)));
        table.insert(&long_class, &UnqualifiedName::ROTATERIGHT, &[FT::long(), FT::int()], long.clone(), Intrinsic::LongShift(|a, b| a.rotate_right((b & 63) as u32)));

        // `java/lang/Float` and `java/lang/Double` bit conversions
        table.insert(&BinaryName::FLOAT, &UnqualifiedName::FLOATTORAWINTBITS, &[FT::float()], int.clone(), Intrinsic::FloatToInt(|a| a.to_bits() as i32));
        table.insert(&BinaryName::FLOAT, &UnqualifiedName::INTBITSTOFLOAT, &[FT::int()], float, Intrinsic::IntToFloat(|a| f32::from_bits(a as u32)));
        table.insert(&BinaryName::DOUBLE, &UnqualifiedName::DOUBLETORAWLONGBITS, &[FT::double()], long, Intrinsic::DoubleToLong(|a| a.to_bits() as i64));
        table.insert(&BinaryName::DOUBLE, &UnqualifiedName::LONGBITSTODOUBLE, &[FT::long()], double, Intrinsic::LongToDouble(|a| f64::from_bits(a as u64)));

        table
    }

    /// Register a static method as an intrinsic
    pub fn insert(
        &mut self,
        owner: &BinaryName,
        name: &UnqualifiedName,
        parameters: &[FieldType<BinaryName>],
        return_type: FieldType<BinaryName>,
        intrinsic: Intrinsic,
    ) {
        let method = MethodRef {
            owner: owner.clone(),
            name: name.clone(),
            descriptor: MethodDescriptor {
                parameters: parameters.to_vec(),
                return_type: Some(return_type),
            },
        };
        self.methods.insert(method, intrinsic);
    }

    pub fn lookup(&self, method: &MethodRef) -> Option<Intrinsic> {
        self.methods.get(method).copied()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Default for IntrinsicTable {
    fn default() -> IntrinsicTable {
        IntrinsicTable::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::ParseDescriptor;

    #[test]
    fn division_by_zero_is_unknown() {
        let div = Intrinsic::IntBinary(int_div);
        assert_eq!(div.fold(&[Value::int(7), Value::int(2)]), Value::int(3));
        assert_eq!(div.fold(&[Value::int(i32::MIN), Value::int(-1)]), Value::int(i32::MIN));
        assert_eq!(
            div.fold(&[Value::int(1), Value::int(0)]),
            Value::Unknown(VerificationType::Integer)
        );
        assert_eq!(
            Intrinsic::LongBinary(long_rem).fold(&[Value::long(1), Value::long(0)]),
            Value::Unknown(VerificationType::Long)
        );
        assert_eq!(
            Intrinsic::IntBinary(int_rem).fold(&[Value::int(i32::MIN), Value::int(-1)]),
            Value::int(0)
        );
    }

    #[test]
    fn unknown_or_mismatched_inputs_are_not_folded() {
        let add = Intrinsic::IntBinary(|a, b| Some(a.wrapping_add(b)));
        assert_eq!(
            add.fold(&[Value::int(1), Value::Unknown(VerificationType::Integer)]),
            Value::Unknown(VerificationType::Integer)
        );
        assert_eq!(
            add.fold(&[Value::int(1), Value::long(1)]),
            Value::Unknown(VerificationType::Integer)
        );
        assert_eq!(add.fold(&[Value::int(1)]), Value::Unknown(VerificationType::Integer));

        let widen = Intrinsic::LongToDouble(|a| a as f64);
        assert_eq!(widen.fold(&[Value::int(1)]), Value::Unknown(VerificationType::Double));
        assert_eq!(widen.parameter_types(), vec![VerificationType::Long]);
        assert_eq!(widen.result_type(), VerificationType::Double);
    }

    #[test]
    fn library_methods() {
        let table = IntrinsicTable::new();
        let lookup = |owner: BinaryName, name: UnqualifiedName, descriptor: &str| {
            let method = MethodRef {
                owner,
                name,
                descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            };
            table.lookup(&method)
        };

        let max = lookup(BinaryName::MATH, UnqualifiedName::MAX, "(II)I").unwrap();
        assert_eq!(max.fold(&[Value::int(3), Value::int(5)]), Value::int(5));
        assert_eq!(max.parameter_types(), vec![VerificationType::Integer; 2]);

        let fmax = lookup(BinaryName::MATH, UnqualifiedName::MAX, "(FF)F").unwrap();
        assert_eq!(fmax.fold(&[Value::float(-0.0), Value::float(0.0)]), Value::float(0.0));
        assert_eq!(fmax.fold(&[Value::float(f32::NAN), Value::float(0.0)]), Value::float(f32::NAN));
        let dmin = lookup(BinaryName::MATH, UnqualifiedName::MIN, "(DD)D").unwrap();
        assert_eq!(dmin.fold(&[Value::double(0.0), Value::double(-0.0)]), Value::double(-0.0));

        let floor_mod = lookup(BinaryName::MATH, UnqualifiedName::FLOORMOD, "(II)I").unwrap();
        assert_eq!(floor_mod.fold(&[Value::int(-7), Value::int(2)]), Value::int(1));
        let floor_div = lookup(BinaryName::MATH, UnqualifiedName::FLOORDIV, "(II)I").unwrap();
        assert_eq!(floor_div.fold(&[Value::int(-7), Value::int(2)]), Value::int(-4));
        assert_eq!(
            floor_div.fold(&[Value::int(-7), Value::int(0)]),
            Value::Unknown(VerificationType::Integer)
        );

        let abs = lookup(BinaryName::MATH, UnqualifiedName::ABS, "(I)I").unwrap();
        assert_eq!(abs.fold(&[Value::int(i32::MIN)]), Value::int(i32::MIN));

        let rotate = lookup(BinaryName::LONG, UnqualifiedName::ROTATELEFT, "(JI)J").unwrap();
        assert_eq!(rotate.fold(&[Value::long(i64::MIN), Value::int(65)]), Value::long(1));

        let bits = lookup(BinaryName::FLOAT, UnqualifiedName::FLOATTORAWINTBITS, "(F)I").unwrap();
        assert_eq!(bits.fold(&[Value::float(1.0)]), Value::int(0x3f80_0000));

        assert!(lookup(BinaryName::MATH, UnqualifiedName::MAX, "(IJ)J").is_none());
        assert!(!table.is_empty());
        assert!(IntrinsicTable::empty().lookup(&MethodRef {
            owner: BinaryName::MATH,
            name: UnqualifiedName::MAX,
            descriptor: MethodDescriptor::parse("(II)I").unwrap(),
        }).is_none());
    }
}
