use super::{
    dispatch, AnalysisError, AnalysisErrorKind, AnalysisResults, DefaultVariableNames,
    ExecutionContext, FieldValueLookup, Frame, FrameCell, FrameExecutor, InheritanceChecker,
    Local, MethodValueLookup, Settings, Value, VariableNameLookup, VerificationType,
};
use crate::jvm::code::{CodeItem, ExceptionHandler, Label, MethodBody, MethodSignature};
use crate::jvm::RenderDescriptor;
use crate::util::Width;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};

/// Computes the frames of method bodies
///
/// The analyzer only holds shared references, so one can be reused for any number of methods.
pub struct Analyzer<'a> {
    settings: &'a Settings,
    checker: &'a dyn InheritanceChecker,
    names: Option<&'a dyn VariableNameLookup>,
    field_values: Option<&'a dyn FieldValueLookup>,
    method_values: Option<&'a dyn MethodValueLookup>,
}

impl<'a> Analyzer<'a> {
    pub fn new(settings: &'a Settings, checker: &'a dyn InheritanceChecker) -> Analyzer<'a> {
        Analyzer {
            settings,
            checker,
            names: None,
            field_values: None,
            method_values: None,
        }
    }

    /// Name local variables with this lookup (instead of [`DefaultVariableNames`])
    pub fn with_names(mut self, names: &'a dyn VariableNameLookup) -> Analyzer<'a> {
        self.names = Some(names);
        self
    }

    pub fn with_field_values(mut self, field_values: &'a dyn FieldValueLookup) -> Analyzer<'a> {
        self.field_values = Some(field_values);
        self
    }

    pub fn with_method_values(
        mut self,
        method_values: &'a dyn MethodValueLookup,
    ) -> Analyzer<'a> {
        self.method_values = Some(method_values);
        self
    }

    /// Analysis tracking only types
    pub fn analyze_typed(
        &self,
        signature: &MethodSignature,
        body: &MethodBody,
    ) -> AnalysisResults<VerificationType> {
        self.analyze(signature, body)
    }

    /// Analysis tracking types and compile-time constants
    pub fn analyze_valued(
        &self,
        signature: &MethodSignature,
        body: &MethodBody,
    ) -> AnalysisResults<Value> {
        self.analyze(signature, body)
    }

    /// Compute the frame at every reachable point of a method body
    ///
    /// Failures don't get returned as errors: they are recorded in the results, alongside
    /// whatever frames were computed before the failure. Use [`AnalysisResults::into_result`] to
    /// turn them into errors.
    pub fn analyze<C: FrameCell>(
        &self,
        signature: &MethodSignature,
        body: &MethodBody,
    ) -> AnalysisResults<C> {
        log::debug!(
            "Analyzing {}.{}{}",
            signature.owner,
            signature.name,
            signature.descriptor.render()
        );

        let default_names = DefaultVariableNames {
            has_this: !signature.is_static(),
        };
        let names: &dyn VariableNameLookup = match self.names {
            Some(names) => names,
            None => &default_names,
        };
        let context = ExecutionContext {
            settings: self.settings,
            checker: self.checker,
            names,
            field_values: self.field_values,
            method_values: self.method_values,
            this_class: &signature.owner,
        };

        let mut simulation = Simulation {
            body,
            context: &context,
            positions: HashMap::new(),
            handlers: vec![],
            worklist: VecDeque::new(),
            queued: HashSet::new(),
            walks: 0,
            results: AnalysisResults::new(body.items.len()),
        };
        let entry = entry_frame(signature, names);
        match simulation.run(entry) {
            Ok(()) => log::debug!(
                "Reached a fixpoint after {} block walks",
                simulation.walks
            ),
            Err(error) => {
                log::error!(
                    "Analysis of {}.{} failed: {}",
                    signature.owner,
                    signature.name,
                    error
                );
                simulation.results.failure = Some(error);
            }
        }
        simulation.finish()
    }
}

/// Frame on entry to the method: `this` (if there is one) followed by the parameters
fn entry_frame<C: FrameCell>(
    signature: &MethodSignature,
    names: &dyn VariableNameLookup,
) -> Frame<C> {
    let mut frame = Frame::new();
    let mut index: u16 = 0;

    if !signature.is_static() {
        let this = if signature.is_constructor() {
            VerificationType::UninitializedThis
        } else {
            VerificationType::object(signature.owner.clone())
        };
        frame.set_local(Local {
            index,
            name: names.name_of(index),
            value: C::unknown(this),
        });
        index += 1;
    }

    for parameter in &signature.descriptor.parameters {
        let parameter_type = VerificationType::from(parameter.clone());
        let width = parameter_type.width() as u16;
        frame.set_local(Local {
            index,
            name: names.name_of(index),
            value: C::unknown(parameter_type),
        });
        index = index.saturating_add(width);
    }

    frame
}

/// State of an in-progress analysis
struct Simulation<'s, C> {
    body: &'s MethodBody,
    context: &'s ExecutionContext<'s>,

    /// Position of every label in the body items
    positions: HashMap<Label, usize>,

    /// Handlers covering each item (indexed like the body items)
    handlers: Vec<Vec<&'s ExceptionHandler>>,

    /// Labels whose frames changed since they were last walked
    worklist: VecDeque<Label>,
    queued: HashSet<Label>,

    walks: usize,
    results: AnalysisResults<C>,
}

impl<'s, C: FrameCell> Simulation<'s, C> {
    fn run(&mut self, entry: Frame<C>) -> Result<(), AnalysisError> {
        self.index_labels()?;
        self.index_handlers()?;

        self.walk(0, entry)?;
        while let Some(label) = self.worklist.pop_front() {
            self.queued.remove(&label);
            let frame = match self.results.label_frames.get(&label) {
                Some(frame) => frame.clone(),
                None => continue,
            };
            let position = self.position_of(label, 0)?;
            log::trace!("Walking from {} with {}", label, frame);
            self.walk(position + 1, frame)?;
        }
        Ok(())
    }

    /// Record label positions, and check that every label used is placed
    fn index_labels(&mut self) -> Result<(), AnalysisError> {
        for (index, item) in self.body.items.iter().enumerate() {
            if let CodeItem::Label(label) = item {
                if self.positions.insert(*label, index).is_some() {
                    let kind = AnalysisErrorKind::DuplicateLabel(*label);
                    return Err(AnalysisError::new(index, None, kind));
                }
            }
        }

        for (index, instruction) in self.body.instructions() {
            for target in instruction.jump_targets() {
                if !self.positions.contains_key(&target) {
                    let kind = AnalysisErrorKind::UndefinedLabel(target);
                    return Err(AnalysisError::new(index, Some(instruction), kind));
                }
            }
        }
        Ok(())
    }

    /// Work out which handlers cover each instruction
    fn index_handlers(&mut self) -> Result<(), AnalysisError> {
        let body = self.body;
        self.handlers = vec![vec![]; body.items.len()];
        for handler in &body.exception_handlers {
            let start = self.position_of(handler.start, 0)?;
            let end = self.position_of(handler.end, 0)?;
            self.position_of(handler.handler, 0)?;
            if end <= start {
                let kind = AnalysisErrorKind::InvertedExceptionRange {
                    start: handler.start,
                    end: handler.end,
                };
                return Err(AnalysisError::new(start, None, kind));
            }

            for index in (start + 1)..end {
                if let Some(CodeItem::Instruction(_)) = body.items.get(index) {
                    self.handlers[index].push(handler);
                }
            }
        }
        Ok(())
    }

    fn position_of(&self, label: Label, used_at: usize) -> Result<usize, AnalysisError> {
        self.positions.get(&label).copied().ok_or_else(|| {
            AnalysisError::new(used_at, None, AnalysisErrorKind::UndefinedLabel(label))
        })
    }

    /// Replay the body from a starting item until control leaves the block
    fn walk(&mut self, start: usize, mut frame: Frame<C>) -> Result<(), AnalysisError> {
        self.walks += 1;
        let body = self.body;
        let context = self.context;

        for (index, item) in body.items.iter().enumerate().skip(start) {
            let instruction = match item {
                CodeItem::Label(label) => {
                    return self
                        .arrive(*label, &frame)
                        .map_err(|kind| AnalysisError::new(index, None, kind));
                }
                CodeItem::Instruction(instruction) => instruction,
            };
            let fail = |kind| AnalysisError::new(index, Some(instruction), kind);

            log::trace!("#{} {:?} with {}", index, instruction, frame);
            self.results.instruction_frames[index] = Some(frame.clone());

            let handlers = self.handlers[index].clone();
            for handler in handlers {
                let caught = handler
                    .catch_type
                    .clone()
                    .unwrap_or_else(|| context.settings.throwable_class.clone());
                let exception = C::unknown(VerificationType::object(caught));
                self.arrive(handler.handler, &frame.with_exception(exception))
                    .map_err(fail)?;
            }

            if instruction.is_terminal() {
                self.results.terminal_frames.insert(index, frame.clone());
            }

            dispatch(&mut FrameExecutor::new(&mut frame, context, index), instruction)
                .map_err(fail)?;

            for target in instruction.jump_targets() {
                self.arrive(target, &frame).map_err(fail)?;
            }
            if !instruction.falls_through() {
                return Ok(());
            }
        }

        log::warn!("Execution falls off the end of the method body");
        Ok(())
    }

    /// Merge a frame into the frame at a label, queueing the label if its frame changed
    fn arrive(&mut self, label: Label, frame: &Frame<C>) -> Result<(), AnalysisErrorKind> {
        let changed = match self.results.label_frames.entry(label) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().merge(frame, self.context.checker)?
            }
            Entry::Vacant(vacant) => {
                vacant.insert(frame.clone());
                true
            }
        };
        if changed && self.queued.insert(label) {
            self.worklist.push_back(label);
        }
        Ok(())
    }

    /// Fill in the frames of labels and hand back the results
    fn finish(mut self) -> AnalysisResults<C> {
        for (label, position) in &self.positions {
            if let Some(frame) = self.results.label_frames.get(label) {
                self.results.instruction_frames[*position] = Some(frame.clone());
            }
        }
        self.results
    }
}
