//! Replaying single instructions
//!
//! Every [`Instruction`] is decoded by [`dispatch`] into exactly one call on an
//! [`ExecutionEngine`]. Instructions that share a shape (eg. all of the binary arithmetic ones)
//! share an engine method, with the differences between them pushed into the arguments. This
//! keeps engines small, and it means that adding an engine can't accidentally forget an
//! instruction.
//!
//! [`FrameExecutor`] is the engine used by the analysis: it replays instructions on a [`Frame`].
//! Control flow is not its concern: jumps and switches only pop their operands, and it is up to
//! the caller to decide where execution continues.

use super::intrinsics::{int_div, int_rem, long_div, long_rem};
use super::{
    AnalysisErrorKind, FieldValueLookup, Frame, FrameCell, InheritanceChecker, Intrinsic, Local,
    MethodValueLookup, Settings, UninitializedRefType, Value, VariableNameLookup,
    VerificationType,
};
use crate::jvm::code::{
    CompareMode, FieldRef, Instruction, InvokeDynamicCall, InvokeType, Label, MethodRef,
    ShiftType,
};
use crate::jvm::{ArrayType, BaseType, BinaryName, Constant, FieldType, RefType};
use crate::util::Width;

type Result<A> = std::result::Result<A, AnalysisErrorKind>;

/// Kind of value a local variable instruction (or return) operates on
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl VariableKind {
    /// Type assumed for a value of this kind when nothing else is known
    pub fn verification_type(&self) -> VerificationType {
        match self {
            VariableKind::Int => VerificationType::Integer,
            VariableKind::Long => VerificationType::Long,
            VariableKind::Float => VerificationType::Float,
            VariableKind::Double => VerificationType::Double,
            VariableKind::Reference => VerificationType::object(BinaryName::OBJECT),
        }
    }

    /// Can a value of this type be used by an instruction of this kind?
    pub fn accepts(&self, verification_type: &VerificationType) -> bool {
        match self {
            VariableKind::Int => *verification_type == VerificationType::Integer,
            VariableKind::Long => *verification_type == VerificationType::Long,
            VariableKind::Float => *verification_type == VerificationType::Float,
            VariableKind::Double => *verification_type == VerificationType::Double,
            VariableKind::Reference => verification_type.is_reference(),
        }
    }
}

impl Width for VariableKind {
    fn width(&self) -> usize {
        match self {
            VariableKind::Long | VariableKind::Double => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariableAccess {
    Load,
    Store,
}

/// Type of the elements of an array load or store
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArrayElement {
    Int,
    Long,
    Float,
    Double,
    Reference,

    /// Covers both `byte` and `boolean` arrays
    Byte,
    Char,
    Short,
}

impl ArrayElement {
    fn verification_type(&self) -> VerificationType {
        match self {
            ArrayElement::Int | ArrayElement::Byte | ArrayElement::Char | ArrayElement::Short => {
                VerificationType::Integer
            }
            ArrayElement::Long => VerificationType::Long,
            ArrayElement::Float => VerificationType::Float,
            ArrayElement::Double => VerificationType::Double,
            ArrayElement::Reference => VerificationType::object(BinaryName::OBJECT),
        }
    }
}

/// Operations that only move slots around, without looking at what is in them
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StackOperation {
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldAccess {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

/// Instructions that create objects or arrays
#[derive(Copy, Clone, Debug)]
pub enum Allocation<'a> {
    New(&'a BinaryName),
    NewArray(BaseType),
    ANewArray(&'a RefType<BinaryName>),
    MultiANewArray(&'a RefType<BinaryName>, u8),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeCheck {
    CheckCast,
    InstanceOf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MonitorAction {
    Enter,
    Exit,
}

/// Operands consumed by a jump before it decides whether to branch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JumpOperands {
    /// `goto`
    None,

    /// `if<cond>`
    Int,

    /// `if_icmp<cond>`
    IntPair,

    /// `ifnull` and `ifnonnull`
    Reference,

    /// `if_acmp<cond>`
    ReferencePair,
}

/// Visitor over the shapes of instructions
///
/// See [`dispatch`] for how instructions map onto these methods.
pub trait ExecutionEngine {
    fn execute_nop(&mut self) -> Result<()>;

    /// Push a constant (covers `aconst_null`, `iconst_<i>`, `bipush`, `ldc`, etc.)
    fn execute_constant(&mut self, constant: &Constant) -> Result<()>;

    fn execute_variable(
        &mut self,
        access: VariableAccess,
        kind: VariableKind,
        index: u16,
    ) -> Result<()>;

    fn execute_array_load(&mut self, element: ArrayElement) -> Result<()>;

    fn execute_array_store(&mut self, element: ArrayElement) -> Result<()>;

    fn execute_stack(&mut self, operation: StackOperation) -> Result<()>;

    /// Arithmetic, bitwise, and shift operations along with negation
    fn execute_arithmetic(&mut self, operation: Intrinsic) -> Result<()>;

    /// Comparisons, along with what they produce if either operand is `NaN`
    fn execute_compare(&mut self, comparison: Intrinsic, nan_result: Option<i32>) -> Result<()>;

    fn execute_conversion(&mut self, conversion: Intrinsic) -> Result<()>;

    fn execute_increment(&mut self, index: u16, delta: i16) -> Result<()>;

    fn execute_field(&mut self, access: FieldAccess, field: &FieldRef) -> Result<()>;

    fn execute_invoke(&mut self, invoke_type: InvokeType, method: &MethodRef) -> Result<()>;

    fn execute_invoke_dynamic(&mut self, call: &InvokeDynamicCall) -> Result<()>;

    fn execute_allocation(&mut self, allocation: Allocation<'_>) -> Result<()>;

    fn execute_array_length(&mut self) -> Result<()>;

    fn execute_type_check(&mut self, check: TypeCheck, ref_type: &RefType<BinaryName>)
        -> Result<()>;

    fn execute_monitor(&mut self, action: MonitorAction) -> Result<()>;

    fn execute_jump(&mut self, operands: JumpOperands, target: Label) -> Result<()>;

    fn execute_switch(&mut self, default: Label, targets: Vec<Label>) -> Result<()>;

    /// Return from the method (`None` is a `void` return)
    fn execute_return(&mut self, kind: Option<VariableKind>) -> Result<()>;

    fn execute_throw(&mut self) -> Result<()>;
}

/// Decode an instruction into a call on the engine
pub fn dispatch<E: ExecutionEngine + ?Sized>(
    engine: &mut E,
    instruction: &Instruction,
) -> Result<()> {
    use ArrayElement as AE;
    use Instruction::*;
    use Intrinsic as I;
    use VariableAccess::{Load, Store};
    use VariableKind as VK;

    match instruction {
        Nop => engine.execute_nop(),

        AConstNull => engine.execute_constant(&Constant::Null),
        IConstM1 => engine.execute_constant(&Constant::Integer(-1)),
        IConst0 => engine.execute_constant(&Constant::Integer(0)),
        IConst1 => engine.execute_constant(&Constant::Integer(1)),
        IConst2 => engine.execute_constant(&Constant::Integer(2)),
        IConst3 => engine.execute_constant(&Constant::Integer(3)),
        IConst4 => engine.execute_constant(&Constant::Integer(4)),
        IConst5 => engine.execute_constant(&Constant::Integer(5)),
        LConst0 => engine.execute_constant(&Constant::Long(0)),
        LConst1 => engine.execute_constant(&Constant::Long(1)),
        FConst0 => engine.execute_constant(&Constant::Float(0.0)),
        FConst1 => engine.execute_constant(&Constant::Float(1.0)),
        FConst2 => engine.execute_constant(&Constant::Float(2.0)),
        DConst0 => engine.execute_constant(&Constant::Double(0.0)),
        DConst1 => engine.execute_constant(&Constant::Double(1.0)),
        BiPush(byte) => engine.execute_constant(&Constant::Integer(*byte as i32)),
        SiPush(short) => engine.execute_constant(&Constant::Integer(*short as i32)),
        Ldc(Constant::Null) => Err(AnalysisErrorKind::InvalidConstant(
            Constant::Null.to_string(),
        )),
        Ldc(constant) => engine.execute_constant(constant),

        ILoad(index) => engine.execute_variable(Load, VK::Int, *index),
        LLoad(index) => engine.execute_variable(Load, VK::Long, *index),
        FLoad(index) => engine.execute_variable(Load, VK::Float, *index),
        DLoad(index) => engine.execute_variable(Load, VK::Double, *index),
        ALoad(index) => engine.execute_variable(Load, VK::Reference, *index),
        IStore(index) => engine.execute_variable(Store, VK::Int, *index),
        LStore(index) => engine.execute_variable(Store, VK::Long, *index),
        FStore(index) => engine.execute_variable(Store, VK::Float, *index),
        DStore(index) => engine.execute_variable(Store, VK::Double, *index),
        AStore(index) => engine.execute_variable(Store, VK::Reference, *index),

        IALoad => engine.execute_array_load(AE::Int),
        LALoad => engine.execute_array_load(AE::Long),
        FALoad => engine.execute_array_load(AE::Float),
        DALoad => engine.execute_array_load(AE::Double),
        AALoad => engine.execute_array_load(AE::Reference),
        BALoad => engine.execute_array_load(AE::Byte),
        CALoad => engine.execute_array_load(AE::Char),
        SALoad => engine.execute_array_load(AE::Short),
        IAStore => engine.execute_array_store(AE::Int),
        LAStore => engine.execute_array_store(AE::Long),
        FAStore => engine.execute_array_store(AE::Float),
        DAStore => engine.execute_array_store(AE::Double),
        AAStore => engine.execute_array_store(AE::Reference),
        BAStore => engine.execute_array_store(AE::Byte),
        CAStore => engine.execute_array_store(AE::Char),
        SAStore => engine.execute_array_store(AE::Short),

        Pop => engine.execute_stack(StackOperation::Pop),
        Pop2 => engine.execute_stack(StackOperation::Pop2),
        Dup => engine.execute_stack(StackOperation::Dup),
        DupX1 => engine.execute_stack(StackOperation::DupX1),
        DupX2 => engine.execute_stack(StackOperation::DupX2),
        Dup2 => engine.execute_stack(StackOperation::Dup2),
        Dup2X1 => engine.execute_stack(StackOperation::Dup2X1),
        Dup2X2 => engine.execute_stack(StackOperation::Dup2X2),
        Swap => engine.execute_stack(StackOperation::Swap),

        IAdd => engine.execute_arithmetic(I::IntBinary(|a, b| Some(a.wrapping_add(b)))),
        LAdd => engine.execute_arithmetic(I::LongBinary(|a, b| Some(a.wrapping_add(b)))),
        FAdd => engine.execute_arithmetic(I::FloatBinary(|a, b| a + b)),
        DAdd => engine.execute_arithmetic(I::DoubleBinary(|a, b| a + b)),
        ISub => engine.execute_arithmetic(I::IntBinary(|a, b| Some(a.wrapping_sub(b)))),
        LSub => engine.execute_arithmetic(I::LongBinary(|a, b| Some(a.wrapping_sub(b)))),
        FSub => engine.execute_arithmetic(I::FloatBinary(|a, b| a - b)),
        DSub => engine.execute_arithmetic(I::DoubleBinary(|a, b| a - b)),
        IMul => engine.execute_arithmetic(I::IntBinary(|a, b| Some(a.wrapping_mul(b)))),
        LMul => engine.execute_arithmetic(I::LongBinary(|a, b| Some(a.wrapping_mul(b)))),
        FMul => engine.execute_arithmetic(I::FloatBinary(|a, b| a * b)),
        DMul => engine.execute_arithmetic(I::DoubleBinary(|a, b| a * b)),
        IDiv => engine.execute_arithmetic(I::IntBinary(int_div)),
        LDiv => engine.execute_arithmetic(I::LongBinary(long_div)),
        FDiv => engine.execute_arithmetic(I::FloatBinary(|a, b| a / b)),
        DDiv => engine.execute_arithmetic(I::DoubleBinary(|a, b| a / b)),
        IRem => engine.execute_arithmetic(I::IntBinary(int_rem)),
        LRem => engine.execute_arithmetic(I::LongBinary(long_rem)),
        FRem => engine.execute_arithmetic(I::FloatBinary(|a, b| a % b)),
        DRem => engine.execute_arithmetic(I::DoubleBinary(|a, b| a % b)),
        INeg => engine.execute_arithmetic(I::IntUnary(i32::wrapping_neg)),
        LNeg => engine.execute_arithmetic(I::LongUnary(i64::wrapping_neg)),
        FNeg => engine.execute_arithmetic(I::FloatUnary(|a| -a)),
        DNeg => engine.execute_arithmetic(I::DoubleUnary(|a| -a)),
        ISh(ShiftType::Left) => {
            engine.execute_arithmetic(I::IntBinary(|a, b| Some(a.wrapping_shl(b as u32))))
        }
        ISh(ShiftType::ArithmeticRight) => {
            engine.execute_arithmetic(I::IntBinary(|a, b| Some(a.wrapping_shr(b as u32))))
        }
        ISh(ShiftType::LogicalRight) => engine.execute_arithmetic(I::IntBinary(|a, b| {
            Some((a as u32).wrapping_shr(b as u32) as i32)
        })),
        LSh(ShiftType::Left) => {
            engine.execute_arithmetic(I::LongShift(|a, b| a.wrapping_shl(b as u32)))
        }
        LSh(ShiftType::ArithmeticRight) => {
            engine.execute_arithmetic(I::LongShift(|a, b| a.wrapping_shr(b as u32)))
        }
        LSh(ShiftType::LogicalRight) => engine.execute_arithmetic(I::LongShift(|a, b| {
            (a as u64).wrapping_shr(b as u32) as i64
        })),
        IAnd => engine.execute_arithmetic(I::IntBinary(|a, b| Some(a & b))),
        LAnd => engine.execute_arithmetic(I::LongBinary(|a, b| Some(a & b))),
        IOr => engine.execute_arithmetic(I::IntBinary(|a, b| Some(a | b))),
        LOr => engine.execute_arithmetic(I::LongBinary(|a, b| Some(a | b))),
        IXor => engine.execute_arithmetic(I::IntBinary(|a, b| Some(a ^ b))),
        LXor => engine.execute_arithmetic(I::LongBinary(|a, b| Some(a ^ b))),
        IInc(index, delta) => engine.execute_increment(*index, *delta),

        // `as` casts from floating point saturate and send `NaN` to `0`, same as the JVM
        I2L => engine.execute_conversion(I::IntToLong(|a| a as i64)),
        I2F => engine.execute_conversion(I::IntToFloat(|a| a as f32)),
        I2D => engine.execute_conversion(I::IntToDouble(|a| a as f64)),
        L2I => engine.execute_conversion(I::LongToInt(|a| a as i32)),
        L2F => engine.execute_conversion(I::LongToFloat(|a| a as f32)),
        L2D => engine.execute_conversion(I::LongToDouble(|a| a as f64)),
        F2I => engine.execute_conversion(I::FloatToInt(|a| a as i32)),
        F2L => engine.execute_conversion(I::FloatToLong(|a| a as i64)),
        F2D => engine.execute_conversion(I::FloatToDouble(|a| a as f64)),
        D2I => engine.execute_conversion(I::DoubleToInt(|a| a as i32)),
        D2L => engine.execute_conversion(I::DoubleToLong(|a| a as i64)),
        D2F => engine.execute_conversion(I::DoubleToFloat(|a| a as f32)),
        I2B => engine.execute_conversion(I::IntUnary(|a| a as i8 as i32)),
        I2C => engine.execute_conversion(I::IntUnary(|a| a as u16 as i32)),
        I2S => engine.execute_conversion(I::IntUnary(|a| a as i16 as i32)),

        LCmp => engine.execute_compare(I::LongCompare(|a, b| a.cmp(&b) as i32), None),
        FCmp(CompareMode::L) => engine
            .execute_compare(I::FloatCompare(|a, b| float_compare(a, b, -1)), Some(-1)),
        FCmp(CompareMode::G) => {
            engine.execute_compare(I::FloatCompare(|a, b| float_compare(a, b, 1)), Some(1))
        }
        DCmp(CompareMode::L) => engine
            .execute_compare(I::DoubleCompare(|a, b| double_compare(a, b, -1)), Some(-1)),
        DCmp(CompareMode::G) => {
            engine.execute_compare(I::DoubleCompare(|a, b| double_compare(a, b, 1)), Some(1))
        }

        If(_, target) => engine.execute_jump(JumpOperands::Int, *target),
        IfICmp(_, target) => engine.execute_jump(JumpOperands::IntPair, *target),
        IfACmp(_, target) => engine.execute_jump(JumpOperands::ReferencePair, *target),
        IfNull(_, target) => engine.execute_jump(JumpOperands::Reference, *target),
        Goto(target) => engine.execute_jump(JumpOperands::None, *target),
        TableSwitch {
            default, targets, ..
        } => engine.execute_switch(*default, targets.clone()),
        LookupSwitch { default, targets } => engine.execute_switch(
            *default,
            targets.iter().map(|(_, target)| *target).collect(),
        ),

        IReturn => engine.execute_return(Some(VK::Int)),
        LReturn => engine.execute_return(Some(VK::Long)),
        FReturn => engine.execute_return(Some(VK::Float)),
        DReturn => engine.execute_return(Some(VK::Double)),
        AReturn => engine.execute_return(Some(VK::Reference)),
        Return => engine.execute_return(None),

        GetStatic(field) => engine.execute_field(FieldAccess::GetStatic, field),
        PutStatic(field) => engine.execute_field(FieldAccess::PutStatic, field),
        GetField(field) => engine.execute_field(FieldAccess::GetField, field),
        PutField(field) => engine.execute_field(FieldAccess::PutField, field),
        Invoke(invoke_type, method) => engine.execute_invoke(*invoke_type, method),
        InvokeDynamic(call) => engine.execute_invoke_dynamic(call),

        New(class) => engine.execute_allocation(Allocation::New(class)),
        NewArray(base_type) => engine.execute_allocation(Allocation::NewArray(*base_type)),
        ANewArray(element) => engine.execute_allocation(Allocation::ANewArray(element)),
        MultiANewArray(array, dimensions) => {
            engine.execute_allocation(Allocation::MultiANewArray(array, *dimensions))
        }
        ArrayLength => engine.execute_array_length(),
        AThrow => engine.execute_throw(),
        CheckCast(ref_type) => engine.execute_type_check(TypeCheck::CheckCast, ref_type),
        InstanceOf(ref_type) => engine.execute_type_check(TypeCheck::InstanceOf, ref_type),
        MonitorEnter => engine.execute_monitor(MonitorAction::Enter),
        MonitorExit => engine.execute_monitor(MonitorAction::Exit),
    }
}

// `fcmpl`/`dcmpl` produce `-1` when either operand is `NaN`, `fcmpg`/`dcmpg` produce `1`
fn float_compare(a: f32, b: f32, nan_result: i32) -> i32 {
    a.partial_cmp(&b).map_or(nan_result, |ordering| ordering as i32)
}

fn double_compare(a: f64, b: f64, nan_result: i32) -> i32 {
    a.partial_cmp(&b).map_or(nan_result, |ordering| ordering as i32)
}

/// Everything a [`FrameExecutor`] needs besides the frame itself
///
/// This is shared by every instruction of an analysis.
pub struct ExecutionContext<'a> {
    pub settings: &'a Settings,
    pub checker: &'a dyn InheritanceChecker,
    pub names: &'a dyn VariableNameLookup,
    pub field_values: Option<&'a dyn FieldValueLookup>,
    pub method_values: Option<&'a dyn MethodValueLookup>,

    /// Class declaring the method being analyzed (what `this` becomes once initialized)
    pub this_class: &'a BinaryName,
}

/// Engine replaying instructions on a frame
pub struct FrameExecutor<'a, 'f, C> {
    frame: &'f mut Frame<C>,
    context: &'a ExecutionContext<'a>,

    /// Index (into the method body items) of the instruction being executed
    index: usize,
}

impl<'a, 'f, C: FrameCell> FrameExecutor<'a, 'f, C> {
    pub fn new(
        frame: &'f mut Frame<C>,
        context: &'a ExecutionContext<'a>,
        index: usize,
    ) -> FrameExecutor<'a, 'f, C> {
        FrameExecutor {
            frame,
            context,
            index,
        }
    }

    /// Pop a narrow value, which must be a reference
    fn pop_reference(&mut self) -> Result<C> {
        let cell = self.frame.pop()?;
        if cell.verification_type().is_reference() {
            Ok(cell)
        } else {
            Err(AnalysisErrorKind::NotAReference(cell.to_string()))
        }
    }

    fn pop_int(&mut self) -> Result<C> {
        self.frame.pop()
    }

    /// Pop the arguments of an intrinsic (returned in the order they were pushed)
    fn pop_arguments(&mut self, intrinsic: &Intrinsic) -> Result<Vec<C>> {
        let parameter_types = intrinsic.parameter_types();
        let mut arguments = Vec::with_capacity(parameter_types.len());
        for parameter_type in parameter_types.iter().rev() {
            arguments.push(self.frame.pop_typed(parameter_type)?);
        }
        arguments.reverse();
        Ok(arguments)
    }

    fn apply(&mut self, intrinsic: Intrinsic) -> Result<()> {
        let arguments = self.pop_arguments(&intrinsic)?;
        self.frame.push(C::fold(&intrinsic, &arguments));
        Ok(())
    }

    /// Pop the arguments of a method (returned in the order they were pushed)
    fn pop_parameters(&mut self, parameters: &[FieldType<BinaryName>]) -> Result<Vec<C>> {
        let mut arguments = Vec::with_capacity(parameters.len());
        for parameter in parameters.iter().rev() {
            arguments.push(self.frame.pop_width(parameter.width())?);
        }
        arguments.reverse();
        Ok(arguments)
    }

    /// Value of a local about to be loaded, or `None` if the load should push an unknown
    fn loaded_local(&self, kind: VariableKind, index: u16) -> Result<Option<C>> {
        match self.frame.get_local(index) {
            Some(local) if kind.accepts(&local.value.verification_type()) => {
                Ok(Some(local.value.clone()))
            }
            Some(local) => {
                log::warn!(
                    "Local {} ({}) holds {}, which is not a {:?}",
                    index,
                    local.name,
                    local.value,
                    kind
                );
                Ok(None)
            }
            None if self.context.settings.strict_locals => {
                Err(AnalysisErrorKind::UndefinedLocal(index))
            }
            None => {
                log::warn!("Loading local {} before any path defines it", index);
                Ok(None)
            }
        }
    }

    /// Result of a static call, if it can be computed
    fn static_call_result(&self, method: &MethodRef, arguments: &[C]) -> Option<C> {
        if let Some(lookup) = self.context.method_values {
            let values: Vec<Value> = arguments.iter().map(|arg| arg.as_value()).collect();
            if let Some(value) = lookup.method_value(method, &values) {
                log::debug!("Call to {} has known result {}", method, value);
                return Some(C::from_value(value));
            }
        }
        if self.context.settings.fold_intrinsic_methods {
            if let Some(intrinsic) = self.context.settings.intrinsics.lookup(method) {
                return Some(C::fold(&intrinsic, arguments));
            }
        }
        None
    }
}

impl<'a, 'f, C: FrameCell> ExecutionEngine for FrameExecutor<'a, 'f, C> {
    fn execute_nop(&mut self) -> Result<()> {
        Ok(())
    }

    fn execute_constant(&mut self, constant: &Constant) -> Result<()> {
        self.frame.push(C::from_value(Value::Known(constant.clone())));
        Ok(())
    }

    fn execute_variable(
        &mut self,
        access: VariableAccess,
        kind: VariableKind,
        index: u16,
    ) -> Result<()> {
        match access {
            VariableAccess::Load => {
                let cell = self
                    .loaded_local(kind, index)?
                    .unwrap_or_else(|| C::unknown(kind.verification_type()));
                self.frame.push(cell);
            }
            VariableAccess::Store => {
                let value = self.frame.pop_width(kind.width())?;
                if kind == VariableKind::Reference && !value.verification_type().is_reference() {
                    return Err(AnalysisErrorKind::NotAReference(value.to_string()));
                }
                let name = self.context.names.name_of(index);
                self.frame.set_local(Local { index, name, value });
            }
        }
        Ok(())
    }

    fn execute_array_load(&mut self, element: ArrayElement) -> Result<()> {
        self.pop_int()?;
        let array = self.pop_reference()?;
        let loaded = match (element, array.verification_type()) {
            (ArrayElement::Reference, VerificationType::Object(array_type)) => {
                match array_type.element_type() {
                    Some(element_type @ FieldType::Ref(_)) => VerificationType::from(element_type),
                    _ => element.verification_type(),
                }
            }
            _ => element.verification_type(),
        };
        self.frame.push(C::unknown(loaded));
        Ok(())
    }

    fn execute_array_store(&mut self, element: ArrayElement) -> Result<()> {
        let width = element.verification_type().width();
        self.frame.pop_width(width)?;
        self.pop_int()?;
        self.pop_reference()?;
        Ok(())
    }

    fn execute_stack(&mut self, operation: StackOperation) -> Result<()> {
        match operation {
            StackOperation::Pop => self.frame.pop().map(|_| ()),
            StackOperation::Pop2 => self.frame.pop_slots(2).map(|_| ()),
            StackOperation::Dup => self.frame.dup_slots(1, 0),
            StackOperation::DupX1 => self.frame.dup_slots(1, 1),
            StackOperation::DupX2 => self.frame.dup_slots(1, 2),
            StackOperation::Dup2 => self.frame.dup_slots(2, 0),
            StackOperation::Dup2X1 => self.frame.dup_slots(2, 1),
            StackOperation::Dup2X2 => self.frame.dup_slots(2, 2),
            StackOperation::Swap => self.frame.swap(),
        }
    }

    fn execute_arithmetic(&mut self, operation: Intrinsic) -> Result<()> {
        self.apply(operation)
    }

    fn execute_compare(&mut self, comparison: Intrinsic, nan_result: Option<i32>) -> Result<()> {
        let arguments = self.pop_arguments(&comparison)?;
        let result = match nan_result {
            Some(nan_result) if arguments.iter().any(|arg| arg.is_nan()) => {
                C::from_value(Value::int(nan_result))
            }
            _ => C::fold(&comparison, &arguments),
        };
        self.frame.push(result);
        Ok(())
    }

    fn execute_conversion(&mut self, conversion: Intrinsic) -> Result<()> {
        self.apply(conversion)
    }

    fn execute_increment(&mut self, index: u16, delta: i16) -> Result<()> {
        let (name, current) = match self.loaded_local(VariableKind::Int, index)? {
            Some(current) => {
                let name = self
                    .frame
                    .get_local(index)
                    .map(|local| local.name.clone())
                    .unwrap_or_else(|| self.context.names.name_of(index));
                (name, current)
            }
            None => (
                self.context.names.name_of(index),
                C::unknown(VerificationType::Integer),
            ),
        };
        let add = Intrinsic::IntBinary(|a, b| Some(a.wrapping_add(b)));
        let value = C::fold(&add, &[current, C::from_value(Value::int(delta as i32))]);
        self.frame.set_local(Local { index, name, value });
        Ok(())
    }

    fn execute_field(&mut self, access: FieldAccess, field: &FieldRef) -> Result<()> {
        let field_type = VerificationType::from(field.descriptor.clone());
        match access {
            FieldAccess::GetStatic => {
                let known = self
                    .context
                    .field_values
                    .and_then(|lookup| lookup.field_value(field));
                let cell = match known {
                    Some(value) => {
                        log::debug!("Field {} has known value {}", field, value);
                        C::from_value(value)
                    }
                    None => C::unknown(field_type),
                };
                self.frame.push(cell);
            }
            FieldAccess::PutStatic => {
                self.frame.pop_width(field_type.width())?;
            }
            FieldAccess::GetField => {
                self.pop_reference()?;
                self.frame.push(C::unknown(field_type));
            }
            FieldAccess::PutField => {
                self.frame.pop_width(field_type.width())?;
                self.pop_reference()?;
            }
        }
        Ok(())
    }

    fn execute_invoke(&mut self, invoke_type: InvokeType, method: &MethodRef) -> Result<()> {
        let arguments = self.pop_parameters(&method.descriptor.parameters)?;

        if invoke_type.has_receiver() {
            let receiver = self.pop_reference()?;
            if invoke_type == InvokeType::Special && method.is_constructor() {
                let uninitialized = receiver.verification_type();
                let initialized = match &uninitialized {
                    VerificationType::UninitializedThis => {
                        VerificationType::object(self.context.this_class.clone())
                    }
                    VerificationType::Uninitialized(UninitializedRefType { class, .. }) => {
                        VerificationType::object(class.clone())
                    }
                    _ => uninitialized.clone(),
                };
                self.frame
                    .replace_uninitialized(&uninitialized, &initialized);
            }
        }

        if let Some(return_type) = &method.descriptor.return_type {
            let known = if invoke_type == InvokeType::Static {
                self.static_call_result(method, &arguments)
            } else {
                None
            };
            let result =
                known.unwrap_or_else(|| C::unknown(VerificationType::from(return_type.clone())));
            self.frame.push(result);
        }
        Ok(())
    }

    fn execute_invoke_dynamic(&mut self, call: &InvokeDynamicCall) -> Result<()> {
        self.pop_parameters(&call.descriptor.parameters)?;
        if let Some(return_type) = &call.descriptor.return_type {
            self.frame
                .push(C::unknown(VerificationType::from(return_type.clone())));
        }
        Ok(())
    }

    fn execute_allocation(&mut self, allocation: Allocation<'_>) -> Result<()> {
        let allocated = match allocation {
            Allocation::New(class) => VerificationType::Uninitialized(UninitializedRefType {
                class: class.clone(),
                new_index: self.index,
            }),
            Allocation::NewArray(base_type) => {
                self.pop_int()?;
                VerificationType::Object(RefType::PrimitiveArray(ArrayType {
                    additional_dimensions: 0,
                    element_type: base_type,
                }))
            }
            Allocation::ANewArray(element_type) => {
                self.pop_int()?;
                VerificationType::Object(RefType::array(FieldType::Ref(element_type.clone())))
            }
            Allocation::MultiANewArray(array_type, dimensions) => {
                for _ in 0..dimensions {
                    self.pop_int()?;
                }
                VerificationType::Object(array_type.clone())
            }
        };
        self.frame.push(C::unknown(allocated));
        Ok(())
    }

    fn execute_array_length(&mut self) -> Result<()> {
        self.pop_reference()?;
        self.frame.push(C::unknown(VerificationType::Integer));
        Ok(())
    }

    fn execute_type_check(
        &mut self,
        check: TypeCheck,
        ref_type: &RefType<BinaryName>,
    ) -> Result<()> {
        let checker = self.context.checker;
        let value = self.pop_reference()?;
        let target = VerificationType::Object(ref_type.clone());

        let result = match check {
            // Casting can only make the type more precise, and a cast that is known to succeed
            // doesn't change anything
            TypeCheck::CheckCast => {
                if value.verification_type().is_assignable(&target, checker) {
                    value
                } else {
                    C::unknown(target)
                }
            }

            // Constants have an exact runtime class, so their checks can be decided
            TypeCheck::InstanceOf => match value.as_value() {
                Value::Known(Constant::Null) => C::from_value(Value::int(0)),
                Value::Known(constant) => {
                    let is_instance =
                        VerificationType::of_constant(&constant).is_assignable(&target, checker);
                    C::from_value(Value::int(is_instance as i32))
                }
                Value::Unknown(_) => C::unknown(VerificationType::Integer),
            },
        };
        self.frame.push(result);
        Ok(())
    }

    fn execute_monitor(&mut self, _action: MonitorAction) -> Result<()> {
        self.pop_reference()?;
        Ok(())
    }

    fn execute_jump(&mut self, operands: JumpOperands, _target: Label) -> Result<()> {
        match operands {
            JumpOperands::None => (),
            JumpOperands::Int => {
                self.pop_int()?;
            }
            JumpOperands::IntPair => {
                self.pop_int()?;
                self.pop_int()?;
            }
            JumpOperands::Reference => {
                self.pop_reference()?;
            }
            JumpOperands::ReferencePair => {
                self.pop_reference()?;
                self.pop_reference()?;
            }
        }
        Ok(())
    }

    fn execute_switch(&mut self, _default: Label, _targets: Vec<Label>) -> Result<()> {
        self.pop_int()?;
        Ok(())
    }

    fn execute_return(&mut self, kind: Option<VariableKind>) -> Result<()> {
        match kind {
            None => (),
            Some(VariableKind::Reference) => {
                self.pop_reference()?;
            }
            Some(kind) => {
                self.frame.pop_width(kind.width())?;
            }
        }
        Ok(())
    }

    fn execute_throw(&mut self) -> Result<()> {
        self.pop_reference()?;
        Ok(())
    }
}
