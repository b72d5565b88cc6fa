use std::fmt;

/// Opaque control-flow join point inside a method body
///
/// Labels are only meaningful relative to the [`super::MethodBody`] that generated them.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(usize);

impl Label {
    /// Get the next fresh label
    pub fn next(&self) -> Label {
        Label(self.0 + 1)
    }
}

/// Generates new labels
pub trait LabelGenerator {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

/// Label generator counting up from some starting label
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, Debug)]
pub struct LabelCounter(Label);

impl LabelCounter {
    pub fn new() -> LabelCounter {
        LabelCounter(Label(0))
    }
}

impl Default for LabelCounter {
    fn default() -> LabelCounter {
        LabelCounter::new()
    }
}

impl LabelGenerator for LabelCounter {
    fn fresh_label(&mut self) -> Label {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counter_is_fresh() {
        let mut counter = LabelCounter::new();
        let l0 = counter.fresh_label();
        let l1 = counter.fresh_label();
        assert_ne!(l0, l1);
        assert_eq!(format!("{:?} {}", l0, l1), "l0 l1");

        let mut copy = counter.clone();
        assert_eq!(copy.fresh_label(), counter.fresh_label());
    }
}
