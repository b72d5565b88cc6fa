//! Symbolic JVM instructions, as produced by the assembler front end and consumed by the frame
//! analysis. The representation is slightly different from the class file encoding:
//!
//!   - The "wide" prefix doesn't show up at all, but instead gets merged into the instructions it
//!     is allowed to modify
//!
//!   - Families of instructions (like the shifts and the branches) get folded into one variant
//!     with a field, which keeps pattern matches short
//!
//!   - `ldc`, `ldc_w`, and `ldc2_w` are a single `Ldc`, since the constant knows its own width
//!
//!   - Jumps refer to symbolic [`Label`]s, not offsets
//!
//!   - `jsr`/`ret` are omitted since modern class files never contain them

use super::Label;
use crate::jvm::{BaseType, BinaryName, Constant, FieldType, MethodDescriptor, RefType};
use crate::jvm::{RenderDescriptor, UnqualifiedName};
use std::fmt;
use std::ops::Not;

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant), // covers `ldc`, `ldc_w`, and `ldc2_w`
    ILoad(u16),    // covers `iload`, `iload{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    If(OrdComparison, Label), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Label), // covers `if_icmpeq`, `if_icmpne`, ... `if_icmple`
    IfACmp(EqComparison, Label), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, Label), // covers `ifnull` (`EQ`) and `ifnonnull` (`NE`)
    Goto(Label),                 // covers `goto` and `goto_w`
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than
        /// `low + targets.len() - 1`
        default: Label,

        /// Value associated with the first jump target
        low: i32,

        /// Jump targets
        targets: Vec<Label>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: Label,

        /// Jump targets keyed by the value that selects them
        targets: Vec<(i32, Label)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke(InvokeType, MethodRef),
    InvokeDynamic(InvokeDynamicCall),
    New(BinaryName),
    NewArray(BaseType),
    ANewArray(RefType<BinaryName>),
    MultiANewArray(RefType<BinaryName>, u8),
    ArrayLength,
    AThrow,
    CheckCast(RefType<BinaryName>),
    InstanceOf(RefType<BinaryName>),
    MonitorEnter,
    MonitorExit,
}

impl Instruction {
    /// Labels this instruction may transfer control to (not counting fall through)
    pub fn jump_targets(&self) -> Vec<Label> {
        match self {
            Instruction::If(_, target)
            | Instruction::IfICmp(_, target)
            | Instruction::IfACmp(_, target)
            | Instruction::IfNull(_, target)
            | Instruction::Goto(target) => vec![*target],
            Instruction::TableSwitch {
                default, targets, ..
            } => {
                let mut all = Vec::with_capacity(targets.len() + 1);
                all.push(*default);
                all.extend(targets.iter().copied());
                all
            }
            Instruction::LookupSwitch { default, targets } => {
                let mut all = Vec::with_capacity(targets.len() + 1);
                all.push(*default);
                all.extend(targets.iter().map(|(_, target)| *target));
                all
            }
            _ => vec![],
        }
    }

    /// Can control continue to the next instruction in the method body?
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Goto(_)
                | Instruction::TableSwitch { .. }
                | Instruction::LookupSwitch { .. }
                | Instruction::IReturn
                | Instruction::LReturn
                | Instruction::FReturn
                | Instruction::DReturn
                | Instruction::AReturn
                | Instruction::Return
                | Instruction::AThrow
        )
    }

    /// Does this instruction leave the method (either by returning or by throwing)?
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Instruction::IReturn
                | Instruction::LReturn
                | Instruction::FReturn
                | Instruction::DReturn
                | Instruction::AReturn
                | Instruction::Return
                | Instruction::AThrow
        )
    }
}

/// Symbolic reference to a field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor.render())
    }
}

/// Symbolic reference to a method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

impl MethodRef {
    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor.render())
    }
}

/// Call site of an `invokedynamic`
///
/// Bootstrap method and its static arguments don't affect the frame, so they aren't tracked.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvokeDynamicCall {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
///
/// Note: `invokedynamic` is kept separate because it has no receiver class and is linked through
/// a bootstrap method instead.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeType {
    /// Does the call pop an object reference in addition to its arguments?
    pub fn has_receiver(&self) -> bool {
        !matches!(self, InvokeType::Static)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{LabelCounter, LabelGenerator};

    #[test]
    fn control_flow_shape() {
        let mut labels = LabelCounter::new();
        let (l0, l1, l2) = (
            labels.fresh_label(),
            labels.fresh_label(),
            labels.fresh_label(),
        );

        let branch = Instruction::IfICmp(OrdComparison::LT, l1);
        assert_eq!(branch.jump_targets(), vec![l1]);
        assert!(branch.falls_through());
        assert!(!branch.is_terminal());

        let switch = Instruction::LookupSwitch {
            default: l0,
            targets: vec![(-1, l1), (10, l2)],
        };
        assert_eq!(switch.jump_targets(), vec![l0, l1, l2]);
        assert!(!switch.falls_through());

        assert!(Instruction::AThrow.is_terminal());
        assert!(!Instruction::AThrow.falls_through());
        assert!(Instruction::IAdd.jump_targets().is_empty());
    }

    #[test]
    fn negated_comparisons() {
        assert_eq!(!OrdComparison::LT, OrdComparison::GE);
        assert_eq!(!!OrdComparison::GT, OrdComparison::GT);
        assert_eq!(!EqComparison::EQ, EqComparison::NE);
    }

    #[test]
    fn member_references_render() {
        let max = MethodRef {
            owner: BinaryName::MATH,
            name: UnqualifiedName::MAX,
            descriptor: MethodDescriptor {
                parameters: vec![FieldType::int(), FieldType::int()],
                return_type: Some(FieldType::int()),
            },
        };
        assert_eq!(max.to_string(), "java/lang/Math.max(II)I");
        assert!(!max.is_constructor());

        let field = FieldRef {
            owner: BinaryName::INTEGER,
            name: UnqualifiedName::MAX,
            descriptor: FieldType::int(),
        };
        assert_eq!(field.to_string(), "java/lang/Integer.max:I");
    }
}
