use super::{AnalysisErrorKind, InheritanceChecker, Intrinsic, Value, VerificationType};
use crate::util::Width;
use std::collections::BTreeMap;
use std::fmt;

/// What a frame tracks for each stack slot and local variable
///
/// There are two flavors of analysis: a typed one where cells are [`VerificationType`]s and a
/// valued one where cells are [`Value`]s (types plus compile-time constants). Everything about
/// stack discipline, locals, and merging is shared; only what happens to the cells differs.
pub trait FrameCell: Clone + PartialEq + fmt::Debug + fmt::Display + Width {
    /// Static type of the cell
    fn verification_type(&self) -> VerificationType;

    /// Join of two cells
    fn merge(&self, other: &Self, checker: &dyn InheritanceChecker) -> Self;

    /// Cell of the given type, about which nothing else is known
    fn unknown(verification_type: VerificationType) -> Self;

    /// Cell for a value (the typed flavor only keeps the type)
    fn from_value(value: Value) -> Self;

    /// Cell as a value (the typed flavor is always unknown)
    fn as_value(&self) -> Value;

    /// Result of applying an intrinsic to cells
    fn fold(intrinsic: &Intrinsic, arguments: &[Self]) -> Self;

    /// Is this a known floating point `NaN`?
    fn is_nan(&self) -> bool;
}

impl FrameCell for VerificationType {
    fn verification_type(&self) -> VerificationType {
        self.clone()
    }

    fn merge(&self, other: &Self, checker: &dyn InheritanceChecker) -> Self {
        VerificationType::merge(self, other, checker)
    }

    fn unknown(verification_type: VerificationType) -> Self {
        verification_type
    }

    fn from_value(value: Value) -> Self {
        value.verification_type()
    }

    fn as_value(&self) -> Value {
        Value::Unknown(self.clone())
    }

    fn fold(intrinsic: &Intrinsic, _arguments: &[Self]) -> Self {
        intrinsic.result_type()
    }

    fn is_nan(&self) -> bool {
        false
    }
}

impl FrameCell for Value {
    fn verification_type(&self) -> VerificationType {
        Value::verification_type(self)
    }

    fn merge(&self, other: &Self, checker: &dyn InheritanceChecker) -> Self {
        Value::merge(self, other, checker)
    }

    fn unknown(verification_type: VerificationType) -> Self {
        Value::Unknown(verification_type)
    }

    fn from_value(value: Value) -> Self {
        value
    }

    fn as_value(&self) -> Value {
        self.clone()
    }

    fn fold(intrinsic: &Intrinsic, arguments: &[Self]) -> Self {
        intrinsic.fold(arguments)
    }

    fn is_nan(&self) -> bool {
        self.as_constant().map_or(false, |constant| constant.is_nan())
    }
}

/// Slot on the operand stack
///
/// Wide values are a `Value` slot immediately followed by a `Filler` slot.
#[derive(Debug, Clone, PartialEq)]
pub enum StackSlot<C> {
    Value(C),
    Filler,
}

/// Local variable
#[derive(Debug, Clone, PartialEq)]
pub struct Local<C> {
    pub index: u16,
    pub name: String,
    pub value: C,
}

/// Snapshot of the operand stack and local variables at a point in a method body
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<C> {
    /// Slots on the stack (top of the stack is last)
    pub stack: Vec<StackSlot<C>>,

    /// Local variables that are known at this point, keyed by index
    ///
    /// A missing index means "not yet known". This is different from a local whose type is
    /// `Top`, which is known to be unusable.
    pub locals: BTreeMap<u16, Local<C>>,
}

/// Frame tracking only types
pub type TypedFrame = Frame<VerificationType>;

/// Frame tracking types and compile-time constants
pub type ValuedFrame = Frame<Value>;

type Result<A> = std::result::Result<A, AnalysisErrorKind>;

impl<C: FrameCell> Frame<C> {
    /// Frame with an empty stack and no locals
    pub fn new() -> Frame<C> {
        Frame {
            stack: vec![],
            locals: BTreeMap::new(),
        }
    }

    /// Push a value (along with a filler slot if it is wide)
    pub fn push(&mut self, cell: C) {
        let is_wide = cell.width() == 2;
        self.stack.push(StackSlot::Value(cell));
        if is_wide {
            self.stack.push(StackSlot::Filler);
        }
    }

    /// Pop a narrow value
    pub fn pop(&mut self) -> Result<C> {
        match self.stack.pop() {
            None => Err(AnalysisErrorKind::EmptyStack),
            Some(StackSlot::Value(cell)) => Ok(cell),
            Some(StackSlot::Filler) => {
                self.stack.push(StackSlot::Filler);
                Err(AnalysisErrorKind::UnexpectedFiller)
            }
        }
    }

    /// Pop a wide value: the filler, then the value itself
    pub fn pop2(&mut self) -> Result<C> {
        match self.stack.last() {
            None => return Err(AnalysisErrorKind::EmptyStack),
            Some(StackSlot::Value(_)) => return Err(AnalysisErrorKind::MissingFiller),
            Some(StackSlot::Filler) => (),
        }
        self.stack.pop();
        match self.stack.pop() {
            None => Err(AnalysisErrorKind::EmptyStack),
            Some(StackSlot::Value(cell)) => Ok(cell),
            Some(StackSlot::Filler) => Err(AnalysisErrorKind::UnexpectedFiller),
        }
    }

    /// Pop a value of the given width
    pub fn pop_width(&mut self, width: usize) -> Result<C> {
        match width {
            1 => self.pop(),
            2 => self.pop2(),
            other => Err(AnalysisErrorKind::InvalidWidth(other)),
        }
    }

    /// Pop a value whose width is determined by its static type
    pub fn pop_typed(&mut self, expected: &VerificationType) -> Result<C> {
        self.pop_width(expected.width())
    }

    /// Pop the top `count` slots, as long as doing so doesn't split a wide value
    pub fn pop_slots(&mut self, count: usize) -> Result<Vec<StackSlot<C>>> {
        let bottom = self.window_start(count)?;
        Ok(self.stack.split_off(bottom))
    }

    /// Duplicate the top `copied` slots, inserting the copy beneath the `skipped` slots
    /// underneath them
    ///
    /// This covers all of the `dup*` instructions. Neither the duplicated window nor the skipped
    /// window can start in the middle of a wide value.
    pub fn dup_slots(&mut self, copied: usize, skipped: usize) -> Result<()> {
        let copy_start = self.window_start(copied)?;
        let insert_at = self.window_start(copied + skipped)?;
        let copy: Vec<StackSlot<C>> = self.stack[copy_start..].to_vec();
        self.stack.splice(insert_at..insert_at, copy);
        Ok(())
    }

    /// Swap the top two narrow values
    pub fn swap(&mut self) -> Result<()> {
        let top = self.pop()?;
        let below = self.pop()?;
        self.push(top);
        self.push(below);
        Ok(())
    }

    /// Index of the bottom of a window of `width` slots at the top of the stack
    fn window_start(&self, width: usize) -> Result<usize> {
        let start = self
            .stack
            .len()
            .checked_sub(width)
            .ok_or(AnalysisErrorKind::EmptyStack)?;
        match self.stack.get(start) {
            Some(StackSlot::Filler) => Err(AnalysisErrorKind::InvalidWidth(width)),
            _ => Ok(start),
        }
    }

    /// Top logical value of the stack (skipping the filler of a wide value)
    pub fn peek(&self) -> Result<&C> {
        self.stack
            .iter()
            .rev()
            .find_map(|slot| match slot {
                StackSlot::Value(cell) => Some(cell),
                StackSlot::Filler => None,
            })
            .ok_or(AnalysisErrorKind::EmptyStack)
    }

    /// Logical values on the stack, from bottom to top
    pub fn stack_values(&self) -> impl Iterator<Item = &C> {
        self.stack.iter().filter_map(|slot| match slot {
            StackSlot::Value(cell) => Some(cell),
            StackSlot::Filler => None,
        })
    }

    /// Depth of the stack, in slots
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Set a local variable
    ///
    /// Wide locals also occupy the next index, so writing a wide local removes the local after
    /// it and writing any local removes a wide local right before it.
    pub fn set_local(&mut self, local: Local<C>) {
        let index = local.index;
        if let Some(previous) = index.checked_sub(1) {
            if self
                .locals
                .get(&previous)
                .map_or(false, |prev| prev.value.width() == 2)
            {
                self.locals.remove(&previous);
            }
        }
        if local.value.width() == 2 {
            if let Some(next) = index.checked_add(1) {
                self.locals.remove(&next);
            }
        }
        self.locals.insert(index, local);
    }

    pub fn get_local(&self, index: u16) -> Option<&Local<C>> {
        self.locals.get(&index)
    }

    /// Copy of this frame for entering an exception handler: same locals, but the stack holds
    /// only the exception
    pub fn with_exception(&self, exception: C) -> Frame<C> {
        let mut frame = Frame {
            stack: Vec::with_capacity(1),
            locals: self.locals.clone(),
        };
        frame.push(exception);
        frame
    }

    /// Replace every cell of type `uninitialized` with `initialized`, on the stack and in the
    /// locals
    pub fn replace_uninitialized(
        &mut self,
        uninitialized: &VerificationType,
        initialized: &VerificationType,
    ) {
        for slot in &mut self.stack {
            if let StackSlot::Value(cell) = slot {
                if cell.verification_type() == *uninitialized {
                    *cell = C::unknown(initialized.clone());
                }
            }
        }
        for local in self.locals.values_mut() {
            if local.value.verification_type() == *uninitialized {
                local.value = C::unknown(initialized.clone());
            }
        }
    }

    /// Merge another frame into this one, reporting whether this frame changed
    ///
    /// Stacks must have the same shape. Locals that only one side has are kept, but adopting a
    /// local does not count as a change.
    pub fn merge(&mut self, other: &Frame<C>, checker: &dyn InheritanceChecker) -> Result<bool> {
        let mismatch = || AnalysisErrorKind::StackSizeMismatch {
            existing: self.to_string(),
            incoming: other.to_string(),
        };
        if self.stack.len() != other.stack.len() {
            return Err(mismatch());
        }

        let mut changed = false;
        let mut merged_stack = Vec::with_capacity(self.stack.len());
        for (mine, theirs) in self.stack.iter().zip(&other.stack) {
            let merged = match (mine, theirs) {
                (StackSlot::Filler, StackSlot::Filler) => StackSlot::Filler,
                (StackSlot::Value(mine), StackSlot::Value(theirs)) => {
                    let merged = mine.merge(theirs, checker);
                    changed |= merged != *mine;
                    StackSlot::Value(merged)
                }
                _ => return Err(mismatch()),
            };
            merged_stack.push(merged);
        }
        self.stack = merged_stack;

        for (index, theirs) in &other.locals {
            let overlaps = !self.locals.contains_key(index) && self.overlaps_wide_local(theirs);
            match self.locals.get_mut(index) {
                Some(mine) => {
                    let merged = mine.value.merge(&theirs.value, checker);
                    if merged != mine.value {
                        mine.value = merged;
                        changed = true;
                    }
                }
                None if overlaps => {
                    log::trace!("Not adopting local {} since it overlaps a wide local", index);
                }
                None => {
                    self.locals.insert(*index, theirs.clone());
                }
            }
        }

        Ok(changed)
    }

    /// Would inserting this local clobber half of a wide local?
    fn overlaps_wide_local(&self, local: &Local<C>) -> bool {
        let previous_is_wide = local
            .index
            .checked_sub(1)
            .and_then(|previous| self.locals.get(&previous))
            .map_or(false, |previous| previous.value.width() == 2);
        let next_is_taken = local.value.width() == 2
            && local
                .index
                .checked_add(1)
                .map_or(false, |next| self.locals.contains_key(&next));
        previous_is_wide || next_is_taken
    }
}

impl<C: FrameCell> Default for Frame<C> {
    fn default() -> Self {
        Frame::new()
    }
}

/// Renders as `[stack values...] {index name: value, ...}`
impl<C: FrameCell> fmt::Display for Frame<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, cell) in self.stack_values().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", cell)?;
        }
        f.write_str("] {")?;
        for (i, local) in self.locals.values().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}: {}", local.index, local.name, local.value)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas};
    use crate::jvm::{BinaryName, Constant};

    fn local<C>(index: u16, value: C) -> Local<C> {
        Local {
            index,
            name: format!("v{}", index),
            value,
        }
    }

    #[test]
    fn wide_push_pop() {
        let mut frame: ValuedFrame = Frame::new();
        frame.push(Value::long(42));
        assert_eq!(frame.stack_depth(), 2);
        assert_eq!(frame.peek(), Ok(&Value::long(42)));
        assert_eq!(frame.pop(), Err(AnalysisErrorKind::UnexpectedFiller));
        assert_eq!(frame.pop2(), Ok(Value::long(42)));
        assert_eq!(frame.pop2(), Err(AnalysisErrorKind::EmptyStack));

        frame.push(Value::int(1));
        assert_eq!(frame.pop2(), Err(AnalysisErrorKind::MissingFiller));
        assert_eq!(frame.pop_width(3), Err(AnalysisErrorKind::InvalidWidth(3)));
    }

    #[test]
    fn dup_forms() {
        // dup2 on a wide value copies both slots together
        let mut frame: ValuedFrame = Frame::new();
        frame.push(Value::double(1.5));
        frame.dup_slots(2, 0).unwrap();
        assert_eq!(frame.stack_depth(), 4);
        assert_eq!(frame.pop2(), Ok(Value::double(1.5)));
        assert_eq!(frame.pop2(), Ok(Value::double(1.5)));

        // dup_x1
        let mut frame: ValuedFrame = Frame::new();
        frame.push(Value::int(1));
        frame.push(Value::int(2));
        frame.dup_slots(1, 1).unwrap();
        let values: Vec<_> = frame.stack_values().cloned().collect();
        assert_eq!(values, vec![Value::int(2), Value::int(1), Value::int(2)]);

        // dup2_x2 with a wide value above a wide value
        let mut frame: TypedFrame = Frame::new();
        frame.push(VerificationType::Long);
        frame.push(VerificationType::Double);
        frame.dup_slots(2, 2).unwrap();
        let types: Vec<_> = frame.stack_values().cloned().collect();
        assert_eq!(
            types,
            vec![VerificationType::Double, VerificationType::Long, VerificationType::Double]
        );
    }

    #[test]
    fn shuffles_never_split_wide_values() {
        let mut frame: TypedFrame = Frame::new();
        frame.push(VerificationType::Long);
        assert_eq!(frame.dup_slots(1, 0), Err(AnalysisErrorKind::InvalidWidth(1)));

        frame.push(VerificationType::Integer);
        // skipping one slot would land in the middle of the `long`
        assert_eq!(frame.dup_slots(1, 1), Err(AnalysisErrorKind::InvalidWidth(2)));
        assert_eq!(frame.pop_slots(2), Err(AnalysisErrorKind::InvalidWidth(2)));
        assert_eq!(frame.swap(), Err(AnalysisErrorKind::UnexpectedFiller));
        assert_eq!(frame.dup_slots(4, 0), Err(AnalysisErrorKind::EmptyStack));
    }

    #[test]
    fn wide_locals_overlap() {
        let mut frame: TypedFrame = Frame::new();
        frame.set_local(local(1, VerificationType::Integer));
        frame.set_local(local(2, VerificationType::Integer));
        frame.set_local(local(1, VerificationType::Long));
        assert!(frame.get_local(2).is_none());

        frame.set_local(local(2, VerificationType::Float));
        assert!(frame.get_local(1).is_none());
        assert_eq!(frame.get_local(2).map(|l| &l.value), Some(&VerificationType::Float));
    }

    #[test]
    fn merge_reports_changes() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);

        let mut frame: ValuedFrame = Frame::new();
        frame.push(Value::int(1));
        frame.set_local(local(0, Value::int(3)));

        // merging a frame with a copy of itself changes nothing
        let copy = frame.clone();
        assert_eq!(frame.merge(&copy, &graph), Ok(false));
        assert_eq!(frame, copy);

        // extra locals are adopted without counting as a change
        let mut other = frame.clone();
        other.set_local(local(4, Value::float(1.0)));
        assert_eq!(frame.merge(&other, &graph), Ok(false));
        assert!(frame.get_local(4).is_some());

        // different constants widen to unknown
        let mut other = frame.clone();
        other.set_local(local(0, Value::int(4)));
        assert_eq!(frame.merge(&other, &graph), Ok(true));
        assert_eq!(
            frame.get_local(0).map(|l| &l.value),
            Some(&Value::Unknown(VerificationType::Integer))
        );
        assert_eq!(frame.merge(&other, &graph), Ok(false));
    }

    #[test]
    fn merge_skips_locals_overlapping_wide_ones() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);

        let mut frame: TypedFrame = Frame::new();
        frame.set_local(local(1, VerificationType::Long));
        frame.set_local(local(4, VerificationType::Integer));

        // `2` is the second half of the `long` at `1`, and a `double` at `3` would cover `4`
        let mut other: TypedFrame = Frame::new();
        other.set_local(local(2, VerificationType::Integer));
        other.set_local(local(3, VerificationType::Double));
        other.set_local(local(6, VerificationType::Float));

        assert_eq!(frame.merge(&other, &graph), Ok(false));
        assert!(frame.get_local(2).is_none());
        assert!(frame.get_local(3).is_none());
        assert_eq!(frame.get_local(1).map(|l| &l.value), Some(&VerificationType::Long));
        assert_eq!(frame.get_local(4).map(|l| &l.value), Some(&VerificationType::Integer));
        assert_eq!(frame.get_local(6).map(|l| &l.value), Some(&VerificationType::Float));
    }

    #[test]
    fn merge_mismatched_stacks() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);

        let mut frame: ValuedFrame = Frame::new();
        frame.push(Value::int(1));
        let mut other: ValuedFrame = Frame::new();
        other.push(Value::int(1));
        other.push(Value::Known(Constant::String(String::from("x"))));

        match frame.merge(&other, &graph) {
            Err(AnalysisErrorKind::StackSizeMismatch { existing, incoming }) => {
                assert_eq!(existing, "[1] {}");
                assert_eq!(incoming, "[1, \"x\"] {}");
            }
            other => panic!("Expected stack size mismatch, got {:?}", other),
        }

        // Same depth, but a wide value lines up against two narrow ones
        let mut frame: TypedFrame = Frame::new();
        frame.push(VerificationType::Long);
        let mut other: TypedFrame = Frame::new();
        other.push(VerificationType::Integer);
        other.push(VerificationType::Integer);
        assert!(matches!(
            frame.merge(&other, &graph),
            Err(AnalysisErrorKind::StackSizeMismatch { .. })
        ));
    }

    #[test]
    fn exception_frames_and_initialization() {
        let mut frame: TypedFrame = Frame::new();
        frame.set_local(local(0, VerificationType::UninitializedThis));
        frame.push(VerificationType::UninitializedThis);
        frame.push(VerificationType::Integer);

        let handler = frame.with_exception(VerificationType::object(BinaryName::THROWABLE));
        assert_eq!(handler.stack_depth(), 1);
        assert_eq!(handler.locals, frame.locals);

        let object = VerificationType::object(BinaryName::OBJECT);
        frame.replace_uninitialized(&VerificationType::UninitializedThis, &object);
        assert_eq!(frame.get_local(0).map(|l| &l.value), Some(&object));
        assert_eq!(frame.to_string(), "[java/lang/Object, int] {0 v0: java/lang/Object}");
    }
}
