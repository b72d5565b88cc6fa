use super::ClassData;
use crate::jvm::BinaryName;
use crate::util::RefId;
use std::collections::HashSet;

/// Subtyping relationship between types
pub trait Assignable {
    /// Is the first type assignable to the second?
    fn is_assignable(&self, super_type: &Self) -> bool;
}

/// This does a traversal of super types in the class graph to determine assignability
impl<'a, 'g> Assignable for RefId<'a, ClassData<'g>> {
    fn is_assignable(&self, super_type: &RefId<'a, ClassData<'g>>) -> bool {
        let mut supertypes_to_visit: Vec<RefId<'a, ClassData<'g>>> = vec![*self];
        let mut dont_revisit: HashSet<RefId<'a, ClassData<'g>>> = HashSet::new();
        dont_revisit.insert(*self);

        // Optimization: if the super type is a class, then skip visiting interfaces
        let super_is_class: bool = !super_type.is_interface();

        while let Some(class_data) = supertypes_to_visit.pop() {
            if class_data == *super_type {
                return true;
            }
            let class_data: &'a ClassData<'g> = class_data.0;

            // Enqueue next types to visit
            if let Some(superclass) = class_data.superclass {
                let superclass: RefId<'a, ClassData<'g>> = superclass;
                if dont_revisit.insert(superclass) {
                    supertypes_to_visit.push(superclass);
                }
            }
            if !super_is_class {
                for interface in &class_data.interfaces {
                    let interface = RefId(interface);
                    if dont_revisit.insert(interface) {
                        supertypes_to_visit.push(interface);
                    }
                }
            }
        }

        false
    }
}

/// Check if arrays can be assigned to a super type
///
/// This bakes in knowledge of the small, finite set of super types arrays have.
pub fn is_array_type_assignable(super_type: &BinaryName) -> bool {
    super_type == &BinaryName::OBJECT
        || super_type == &BinaryName::CLONEABLE
        || super_type == &BinaryName::SERIALIZABLE
}
