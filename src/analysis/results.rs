use super::{AnalysisError, Frame, FrameCell, VerificationType};
use crate::jvm::code::Label;
use std::collections::{BTreeMap, HashMap};

/// Everything learned from analyzing a method body
///
/// When the analysis fails, this still holds whatever was gathered up to the failure.
#[derive(Debug, Clone)]
pub struct AnalysisResults<C> {
    /// Merged frame at each reachable label
    pub label_frames: HashMap<Label, Frame<C>>,

    /// Frame before each item of the body, indexed like the body items
    ///
    /// Items that were never reached have no frame. Labels get the merged frame at the label.
    pub instruction_frames: Vec<Option<Frame<C>>>,

    /// Frame right before each return or `athrow`, keyed by item index
    pub terminal_frames: BTreeMap<usize, Frame<C>>,

    pub failure: Option<AnalysisError>,
}

impl<C: FrameCell> AnalysisResults<C> {
    pub(super) fn new(item_count: usize) -> AnalysisResults<C> {
        AnalysisResults {
            label_frames: HashMap::new(),
            instruction_frames: vec![None; item_count],
            terminal_frames: BTreeMap::new(),
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure(&self) -> Option<&AnalysisError> {
        self.failure.as_ref()
    }

    pub fn label_frame(&self, label: Label) -> Option<&Frame<C>> {
        self.label_frames.get(&label)
    }

    /// Frame before the item at the given index
    pub fn frame_before(&self, index: usize) -> Option<&Frame<C>> {
        self.instruction_frames.get(index).and_then(Option::as_ref)
    }

    /// Frames right before returns and throws, in the order they appear in the body
    pub fn terminal_frames(&self) -> impl Iterator<Item = (usize, &Frame<C>)> {
        self.terminal_frames
            .iter()
            .map(|(index, frame)| (*index, frame))
    }

    /// Turn a failed analysis into an error
    pub fn into_result(mut self) -> Result<AnalysisResults<C>, AnalysisError> {
        match self.failure.take() {
            Some(failure) => Err(failure),
            None => Ok(self),
        }
    }

    /// Compute the local variable table
    ///
    /// Each entry covers a maximal run of consecutive items whose frames all have the same local
    /// (same name and type) at the same index. Unreachable items break runs, and locals that are
    /// `Top` never get an entry. Entries are sorted by index, then start.
    pub fn local_variables(&self) -> Vec<LocalVariable> {
        let mut open: BTreeMap<u16, LocalVariable> = BTreeMap::new();
        let mut finished = vec![];

        for (position, frame) in self.instruction_frames.iter().enumerate() {
            let frame = match frame {
                Some(frame) => frame,
                None => {
                    finished.extend(close_all(&mut open, position));
                    continue;
                }
            };

            let ended: Vec<u16> = open
                .iter()
                .filter(|(index, variable)| {
                    frame.get_local(**index).map_or(true, |local| {
                        local.name != variable.name
                            || local.value.verification_type() != variable.ty
                    })
                })
                .map(|(index, _)| *index)
                .collect();
            for index in ended {
                if let Some(mut variable) = open.remove(&index) {
                    variable.end = position;
                    finished.push(variable);
                }
            }

            for (index, local) in &frame.locals {
                let ty = local.value.verification_type();
                if ty == VerificationType::Top || open.contains_key(index) {
                    continue;
                }
                open.insert(
                    *index,
                    LocalVariable {
                        index: *index,
                        name: local.name.clone(),
                        ty,
                        start: position,
                        end: position,
                    },
                );
            }
        }

        finished.extend(close_all(&mut open, self.instruction_frames.len()));
        finished.sort_by_key(|variable| (variable.index, variable.start));
        finished
    }
}

fn close_all(open: &mut BTreeMap<u16, LocalVariable>, end: usize) -> Vec<LocalVariable> {
    let mut closed: Vec<LocalVariable> = std::mem::take(open).into_values().collect();
    for variable in &mut closed {
        variable.end = end;
    }
    closed
}

/// Entry of the local variable table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub index: u16,
    pub name: String,
    pub ty: VerificationType,

    /// Index of the first item for which the variable is live
    pub start: usize,

    /// Index of the item after the last one for which the variable is live
    pub end: usize,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analysis::{AnalysisErrorKind, Local, TypedFrame};

    fn frame_with(locals: &[(u16, &str, VerificationType)]) -> TypedFrame {
        let mut frame = Frame::new();
        for (index, name, value) in locals {
            frame.set_local(Local {
                index: *index,
                name: String::from(*name),
                value: value.clone(),
            });
        }
        frame
    }

    #[test]
    fn variable_runs() {
        use VerificationType::{Float, Integer, Top};

        let mut results: AnalysisResults<VerificationType> = AnalysisResults::new(6);
        results.instruction_frames = vec![
            Some(frame_with(&[(0, "x", Integer)])),
            Some(frame_with(&[(0, "x", Integer), (1, "y", Float)])),
            Some(frame_with(&[(0, "x", Float), (1, "y", Float)])),
            None,
            Some(frame_with(&[(0, "x", Float), (2, "z", Top)])),
            Some(frame_with(&[(0, "x", Float)])),
        ];

        let variable = |index: u16, name: &str, ty: VerificationType, start: usize, end: usize| {
            LocalVariable {
                index,
                name: String::from(name),
                ty,
                start,
                end,
            }
        };
        assert_eq!(
            results.local_variables(),
            vec![
                variable(0, "x", Integer, 0, 2),
                variable(0, "x", Float, 2, 3),
                variable(0, "x", Float, 4, 6),
                variable(1, "y", Float, 1, 3),
            ]
        );
    }

    #[test]
    fn failures() {
        let mut results: AnalysisResults<VerificationType> = AnalysisResults::new(1);
        assert!(results.is_success());
        assert!(results.frame_before(0).is_none());
        assert!(results.frame_before(10).is_none());

        results.failure = Some(AnalysisError::new(0, None, AnalysisErrorKind::EmptyStack));
        assert!(!results.is_success());
        assert_eq!(
            results.into_result().map(|_| ()),
            Err(AnalysisError::new(0, None, AnalysisErrorKind::EmptyStack))
        );
    }
}
