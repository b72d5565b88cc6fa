use super::IntrinsicTable;
use crate::jvm::BinaryName;

/// Knobs for the frame analysis
pub struct Settings {
    /// Type pushed when entering an exception handler that catches anything
    pub throwable_class: BinaryName,

    /// Fold `invokestatic` calls of known pure library methods
    ///
    /// When this is set and every argument is a known constant, calls to the methods in
    /// `intrinsics` (eg. `java/lang/Math.max(II)I`) push a known result. Only the valued analysis
    /// ever has known arguments.
    pub fold_intrinsic_methods: bool,

    /// Methods that can be folded
    pub intrinsics: IntrinsicTable,

    /// Fail on loads from locals that no path has defined
    ///
    /// When this is not set, such a load pushes an unknown value of the type implied by the load
    /// instruction (and logs a warning). Assembler input frequently relies on this, since the
    /// assembler can't always tell which locals the author meant to declare.
    pub strict_locals: bool,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            throwable_class: BinaryName::THROWABLE,
            fold_intrinsic_methods: true,
            intrinsics: IntrinsicTable::new(),
            strict_locals: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
