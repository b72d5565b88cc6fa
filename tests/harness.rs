use jasm::analysis::{AnalysisError, Analyzer, Settings};
use jasm::jvm::class_graph::{ClassData, ClassGraph, ClassGraphArenas, ClassId, LangClasses};
use jasm::jvm::code::MethodSignature;
use jasm::jvm::{
    self, BinaryName, ClassAccessFlags, MethodAccessFlags, MethodDescriptor, Name,
    ParseDescriptor, UnqualifiedName,
};
use std::fmt;

/// Class hierarchy and settings shared by the methods of a test
pub struct TestHarness<'g> {
    pub graph: ClassGraph<'g>,

    /// Core `java/lang` classes
    pub java: LangClasses<'g>,

    pub settings: Settings,
}

impl<'g> TestHarness<'g> {
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> TestHarness<'g> {
        let _ = env_logger::builder().is_test(true).try_init();

        let graph = ClassGraph::new(arenas);
        let java = graph.insert_java_library_types();
        TestHarness {
            graph,
            java,
            settings: Settings::new(),
        }
    }

    /// Declare a public class
    pub fn add_class(
        &self,
        name: &str,
        superclass: ClassId<'g>,
    ) -> Result<ClassId<'g>, TestError> {
        let data = ClassData::new(binary_name(name)?, superclass, ClassAccessFlags::PUBLIC);
        Ok(self.graph.add_class(data))
    }

    pub fn analyzer(&self) -> Analyzer<'_> {
        Analyzer::new(&self.settings, &self.graph)
    }
}

pub fn binary_name(name: &str) -> Result<BinaryName, TestError> {
    Ok(BinaryName::from_string(name.to_owned())?)
}

/// Declaration of a method, from its owner, name, and descriptor
pub fn signature(
    owner: &str,
    name: &str,
    descriptor: &str,
    access_flags: MethodAccessFlags,
) -> Result<MethodSignature, TestError> {
    Ok(MethodSignature {
        owner: binary_name(owner)?,
        name: UnqualifiedName::from_string(name.to_owned())?,
        descriptor: MethodDescriptor::parse(descriptor)?,
        access_flags,
    })
}

/// Ways a test can go wrong
#[derive(Debug)]
pub enum TestError {
    MalformedName(String),
    Jvm(jvm::Error),
    Analysis(AnalysisError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::MalformedName(err) => write!(f, "malformed name: {}", err),
            TestError::Jvm(err) => write!(f, "{}", err),
            TestError::Analysis(err) => write!(f, "analysis failed {}", err),
        }
    }
}

impl From<String> for TestError {
    fn from(err: String) -> TestError {
        TestError::MalformedName(err)
    }
}

impl From<jvm::Error> for TestError {
    fn from(err: jvm::Error) -> TestError {
        TestError::Jvm(err)
    }
}

impl From<AnalysisError> for TestError {
    fn from(err: AnalysisError) -> TestError {
        TestError::Analysis(err)
    }
}
