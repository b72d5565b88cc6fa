use super::{Instruction, Label, LabelCounter, LabelGenerator};
use crate::jvm::{BinaryName, Error, MethodAccessFlags, MethodDescriptor, UnqualifiedName};
use std::collections::HashMap;

/// Element of a method body: either an instruction or the position of a label
#[derive(Clone, Debug, PartialEq)]
pub enum CodeItem {
    Label(Label),
    Instruction(Instruction),
}

/// Protected range and the handler it transfers control to
///
/// Every instruction strictly between the placement of `start` and the placement of `end` is
/// covered (labels are not instructions, so this is the usual `[start, end)` range).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,

    /// Type of exception caught (`None` catches anything)
    pub catch_type: Option<BinaryName>,
}

/// Instructions of a method along with label placements and exception handlers
#[derive(Clone, Debug)]
pub struct MethodBody {
    pub items: Vec<CodeItem>,
    pub exception_handlers: Vec<ExceptionHandler>,
    labels: LabelCounter,
}

impl MethodBody {
    pub fn new() -> MethodBody {
        MethodBody {
            items: vec![],
            exception_handlers: vec![],
            labels: LabelCounter::new(),
        }
    }

    /// Append an instruction
    pub fn push(&mut self, instruction: Instruction) {
        self.items.push(CodeItem::Instruction(instruction));
    }

    /// Mark the current end of the body as the position of a label
    pub fn place_label(&mut self, label: Label) {
        self.items.push(CodeItem::Label(label));
    }

    pub fn add_exception_handler(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<BinaryName>,
    ) {
        self.exception_handlers.push(ExceptionHandler {
            start,
            end,
            handler,
            catch_type,
        });
    }

    /// Position (in `items`) at which each label is placed
    pub fn label_positions(&self) -> Result<HashMap<Label, usize>, Error> {
        let mut positions = HashMap::new();
        for (index, item) in self.items.iter().enumerate() {
            if let CodeItem::Label(label) = item {
                if positions.insert(*label, index).is_some() {
                    return Err(Error::DuplicateLabel(*label));
                }
            }
        }
        Ok(positions)
    }

    /// Check that every label referenced is placed exactly once and that exception ranges are
    /// well-formed
    pub fn validate(&self) -> Result<(), Error> {
        let positions = self.label_positions()?;
        let position_of = |label: &Label| -> Result<usize, Error> {
            positions
                .get(label)
                .copied()
                .ok_or(Error::UnplacedLabel(*label))
        };

        for item in &self.items {
            if let CodeItem::Instruction(insn) = item {
                for target in insn.jump_targets() {
                    position_of(&target)?;
                }
            }
        }

        for handler in &self.exception_handlers {
            let start = position_of(&handler.start)?;
            let end = position_of(&handler.end)?;
            position_of(&handler.handler)?;
            if end <= start {
                return Err(Error::InvertedExceptionRange {
                    start: handler.start,
                    end: handler.end,
                });
            }
        }

        Ok(())
    }

    /// Iterate through the instructions, along with their item indices
    pub fn instructions(&self) -> impl Iterator<Item = (usize, &Instruction)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                CodeItem::Instruction(insn) => Some((index, insn)),
                CodeItem::Label(_) => None,
            })
    }
}

impl Default for MethodBody {
    fn default() -> MethodBody {
        MethodBody::new()
    }
}

impl LabelGenerator for MethodBody {
    fn fresh_label(&mut self) -> Label {
        self.labels.fresh_label()
    }
}

/// Declaration of the method whose body is being analyzed
#[derive(Clone, Debug)]
pub struct MethodSignature {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub access_flags: MethodAccessFlags,
}

impl MethodSignature {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Instance initializers start with an uninitialized `this`
    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }

    /// Number of local slots taken by the parameters (including `this`)
    pub fn parameter_slots(&self) -> usize {
        self.descriptor.parameter_length(!self.is_static())
    }
}
