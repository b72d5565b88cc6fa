//! Static, offline index of the class hierarchy
//!
//! The frame analysis needs to answer two questions about reference types: is one class a subtype
//! of another, and what is the closest common superclass of two classes. An embedding compiler
//! can answer these however it likes (see [`InheritanceChecker`]), but it is often convenient to
//! just declare the handful of classes involved up front. [`ClassGraph`] is that declaration.
//!
//! Classes are allocated in an arena and then only ever referred to by reference, so adding a
//! class only needs `&self`:
//!
//! ```
//! use jasm::jvm::class_graph::*;
//! use jasm::jvm::{BinaryName, ClassAccessFlags, Name};
//! use jasm::analysis::InheritanceChecker;
//!
//! let class_graph_arenas = ClassGraphArenas::new();
//! let class_graph = ClassGraph::new(&class_graph_arenas);
//! let java = class_graph.insert_java_library_types();
//!
//! let animal = BinaryName::from_string(String::from("zoo/Animal")).unwrap();
//! let dog = BinaryName::from_string(String::from("zoo/Dog")).unwrap();
//! let cat = BinaryName::from_string(String::from("zoo/Cat")).unwrap();
//!
//! let animal_class = class_graph.add_class(ClassData::new(
//!     animal.clone(),
//!     java.object,
//!     ClassAccessFlags::PUBLIC,
//! ));
//! class_graph.add_class(ClassData::new(dog.clone(), animal_class, ClassAccessFlags::PUBLIC));
//! class_graph.add_class(ClassData::new(cat.clone(), animal_class, ClassAccessFlags::PUBLIC));
//!
//! assert_eq!(class_graph.common_superclass(&dog, &cat), animal);
//! assert!(class_graph.is_subclass_of(&dog, &BinaryName::OBJECT));
//! ```

use super::{BinaryName, ClassAccessFlags};
use crate::analysis::InheritanceChecker;
use crate::util::RefId;
use elsa::map::FrozenMap;
use elsa::FrozenVec;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

mod assignable;
mod java_classes;

pub use assignable::*;
pub use java_classes::*;

/// Handle to a class allocated in the class graph, compared by identity
pub type ClassId<'g> = RefId<'g, ClassData<'g>>;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassGraphArenas<'g> {
    fn default() -> Self {
        ClassGraphArenas::new()
    }
}

/// Tracks the relationships between classes/interfaces
///
/// Classes that are never added are treated as direct subclasses of `java/lang/Object`. This is
/// always sound for computing common superclasses (`java/lang/Object` is a supertype of
/// everything), just not always precise.
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
    classes: FrozenMap<&'g BinaryName, ClassId<'g>>,
}

impl<'g> ClassGraph<'g> {
    /// New empty graph
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph {
            arenas,
            classes: FrozenMap::new(),
        }
    }

    pub fn lookup_class(&self, name: &BinaryName) -> Option<&ClassData<'g>> {
        self.classes.get(name)
    }

    /// Add a new class to the class graph
    pub fn add_class(&self, data: ClassData<'g>) -> ClassId<'g> {
        let data: &'g ClassData<'g> = self.arenas.class_arena.alloc(data);
        self.classes.insert(&data.name, RefId(data));
        RefId(data)
    }

    /// Add standard types to the class graph
    pub fn insert_java_library_types(&self) -> LangClasses<'g> {
        LangClasses::add_to_graph(self)
    }
}

impl<'g> InheritanceChecker for ClassGraph<'g> {
    fn common_superclass(&self, first: &BinaryName, second: &BinaryName) -> BinaryName {
        if first == second {
            return first.clone();
        }
        let (first_class, second_class) =
            match (self.lookup_class(first), self.lookup_class(second)) {
                (Some(first_class), Some(second_class)) => {
                    (RefId(first_class), RefId(second_class))
                }
                _ => return BinaryName::OBJECT,
            };

        if first_class.is_assignable(&second_class) {
            return second.clone();
        }
        if second_class.is_assignable(&first_class) {
            return first.clone();
        }

        // Interfaces don't form a tree, so there is no unique closest supertype to pick
        if first_class.is_interface() || second_class.is_interface() {
            return BinaryName::OBJECT;
        }

        for superclass in first_class.superclasses() {
            if second_class.is_assignable(&RefId(superclass)) {
                return superclass.name.clone();
            }
        }
        BinaryName::OBJECT
    }

    fn is_subclass_of(&self, child: &BinaryName, parent: &BinaryName) -> bool {
        if child == parent || parent == &BinaryName::OBJECT {
            return true;
        }
        match (self.lookup_class(child), self.lookup_class(parent)) {
            (Some(child), Some(parent)) => RefId(child).is_assignable(&RefId(parent)),
            _ => false,
        }
    }
}

pub struct ClassData<'g> {
    /// Name of the class
    pub name: BinaryName,

    /// Superclass is only ever missing for `java/lang/Object` itself
    pub superclass: Option<ClassId<'g>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: FrozenVec<ClassId<'g>>,

    /// Access flags (only `INTERFACE` matters for the hierarchy)
    pub access_flags: ClassAccessFlags,
}

impl<'g> ClassData<'g> {
    pub fn new(
        name: BinaryName,
        superclass: ClassId<'g>,
        access_flags: ClassAccessFlags,
    ) -> ClassData<'g> {
        ClassData {
            name,
            superclass: Some(superclass),
            interfaces: FrozenVec::new(),
            access_flags,
        }
    }

    /// Is this an interface?
    pub fn is_interface(&self) -> bool {
        self.access_flags.is_interface()
    }

    /// Record that this class implements (or this interface extends) another interface
    pub fn add_interface(&self, interface: ClassId<'g>) {
        self.interfaces.push(interface);
    }

    /// Chain of superclasses, starting with the class itself and ending with `java/lang/Object`
    pub fn superclasses<'a>(&'a self) -> impl Iterator<Item = &'a ClassData<'g>> + 'a {
        std::iter::successors(Some(self), |class: &&'a ClassData<'g>| {
            class.superclass.map(|superclass| -> &'a ClassData<'g> { superclass.0 })
        })
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::Name;

    fn name(s: &str) -> BinaryName {
        BinaryName::from_string(String::from(s)).unwrap()
    }

    #[test]
    fn library_hierarchy() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let java = graph.insert_java_library_types();

        assert_eq!(
            graph.common_superclass(&BinaryName::INTEGER, &BinaryName::LONG),
            BinaryName::NUMBER
        );
        assert_eq!(
            graph.common_superclass(&BinaryName::ARITHMETICEXCEPTION, &BinaryName::NULLPOINTEREXCEPTION),
            BinaryName::RUNTIMEEXCEPTION
        );
        assert_eq!(
            graph.common_superclass(&BinaryName::ERROR, &BinaryName::RUNTIMEEXCEPTION),
            BinaryName::THROWABLE
        );
        assert_eq!(
            graph.common_superclass(&BinaryName::STRING, &BinaryName::INTEGER),
            BinaryName::OBJECT
        );
        assert_eq!(
            graph.common_superclass(&BinaryName::STRING, &BinaryName::CHARSEQUENCE),
            BinaryName::CHARSEQUENCE
        );
        assert_eq!(
            java.string.superclasses().map(|c| c.name.clone()).collect::<Vec<_>>(),
            vec![BinaryName::STRING, BinaryName::OBJECT]
        );
    }

    #[test]
    fn subclass_queries() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        graph.insert_java_library_types();

        assert!(graph.is_subclass_of(&BinaryName::ARITHMETICEXCEPTION, &BinaryName::EXCEPTION));
        assert!(graph.is_subclass_of(&BinaryName::STRING, &BinaryName::SERIALIZABLE));
        assert!(graph.is_subclass_of(&BinaryName::INTEGER, &BinaryName::COMPARABLE));
        assert!(!graph.is_subclass_of(&BinaryName::EXCEPTION, &BinaryName::ARITHMETICEXCEPTION));
        assert!(!graph.is_subclass_of(&BinaryName::STRING, &BinaryName::NUMBER));
    }

    #[test]
    fn unknown_and_interface_classes_fall_back_to_object() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let java = graph.insert_java_library_types();

        let shape = graph.add_class(ClassData::new(
            name("geo/Shape"),
            java.object,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
        ));
        let circle = graph.add_class(ClassData::new(
            name("geo/Circle"),
            java.object,
            ClassAccessFlags::PUBLIC,
        ));
        circle.add_interface(shape);

        assert_eq!(
            graph.common_superclass(&name("geo/Circle"), &name("geo/Shape")),
            name("geo/Shape")
        );
        assert_eq!(
            graph.common_superclass(&name("geo/Shape"), &BinaryName::STRING),
            BinaryName::OBJECT
        );
        assert_eq!(
            graph.common_superclass(&name("geo/Circle"), &name("geo/Unknown")),
            BinaryName::OBJECT
        );
        assert!(!graph.is_subclass_of(&name("geo/Unknown"), &name("geo/Shape")));
    }
}
