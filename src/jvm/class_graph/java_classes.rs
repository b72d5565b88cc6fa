use super::{BinaryName, ClassAccessFlags, ClassData, ClassGraph, ClassId};
use elsa::FrozenVec;

/// Classes inside `java.lang.*` (and the couple of `java.io.*` interfaces they implement) that
/// bytecode most commonly mentions
pub struct LangClasses<'g> {
    pub object: ClassId<'g>,
    pub cloneable: ClassId<'g>,
    pub serializable: ClassId<'g>,
    pub comparable: ClassId<'g>,
    pub char_sequence: ClassId<'g>,
    pub string: ClassId<'g>,
    pub class: ClassId<'g>,
    pub number: ClassId<'g>,
    pub integer: ClassId<'g>,
    pub float: ClassId<'g>,
    pub long: ClassId<'g>,
    pub double: ClassId<'g>,
    pub math: ClassId<'g>,
    pub throwable: ClassId<'g>,
    pub error: ClassId<'g>,
    pub exception: ClassId<'g>,
    pub runtime_exception: ClassId<'g>,
    pub arithmetic_exception: ClassId<'g>,
    pub illegal_argument_exception: ClassId<'g>,
    pub null_pointer_exception: ClassId<'g>,
}

impl<'g> LangClasses<'g> {
    pub fn add_to_graph(class_graph: &ClassGraph<'g>) -> LangClasses<'g> {
        let object = class_graph.add_class(ClassData {
            name: BinaryName::OBJECT,
            superclass: None,
            interfaces: FrozenVec::new(),
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        });

        let interface = ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        let final_class = ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER | ClassAccessFlags::FINAL;
        let class = ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER;

        let cloneable = class_graph.add_class(ClassData::new(BinaryName::CLONEABLE, object, interface));
        let serializable = class_graph.add_class(ClassData::new(BinaryName::SERIALIZABLE, object, interface));
        let comparable = class_graph.add_class(ClassData::new(BinaryName::COMPARABLE, object, interface));
        let char_sequence = class_graph.add_class(ClassData::new(BinaryName::CHARSEQUENCE, object, interface));

        let string = class_graph.add_class(ClassData::new(BinaryName::STRING, object, final_class));
        string.add_interface(serializable);
        string.add_interface(comparable);
        string.add_interface(char_sequence);

        let class_class = class_graph.add_class(ClassData::new(BinaryName::CLASS, object, final_class));
        class_class.add_interface(serializable);

        let number = class_graph.add_class(ClassData::new(
            BinaryName::NUMBER,
            object,
            class | ClassAccessFlags::ABSTRACT,
        ));
        number.add_interface(serializable);

        let boxed = |name: BinaryName| -> ClassId<'g> {
            let boxed_class = class_graph.add_class(ClassData::new(name, number, final_class));
            boxed_class.add_interface(comparable);
            boxed_class
        };
        let integer = boxed(BinaryName::INTEGER);
        let float = boxed(BinaryName::FLOAT);
        let long = boxed(BinaryName::LONG);
        let double = boxed(BinaryName::DOUBLE);

        let math = class_graph.add_class(ClassData::new(BinaryName::MATH, object, final_class));

        let throwable = class_graph.add_class(ClassData::new(BinaryName::THROWABLE, object, class));
        throwable.add_interface(serializable);
        let error = class_graph.add_class(ClassData::new(BinaryName::ERROR, throwable, class));
        let exception = class_graph.add_class(ClassData::new(BinaryName::EXCEPTION, throwable, class));
        let runtime_exception = class_graph.add_class(ClassData::new(
            BinaryName::RUNTIMEEXCEPTION,
            exception,
            class,
        ));
        let arithmetic_exception = class_graph.add_class(ClassData::new(
            BinaryName::ARITHMETICEXCEPTION,
            runtime_exception,
            class,
        ));
        let illegal_argument_exception = class_graph.add_class(ClassData::new(
            BinaryName::ILLEGALARGUMENTEXCEPTION,
            runtime_exception,
            class,
        ));
        let null_pointer_exception = class_graph.add_class(ClassData::new(
            BinaryName::NULLPOINTEREXCEPTION,
            runtime_exception,
            class,
        ));

        LangClasses {
            object,
            cloneable,
            serializable,
            comparable,
            char_sequence,
            string,
            class: class_class,
            number,
            integer,
            float,
            long,
            double,
            math,
            throwable,
            error,
            exception,
            runtime_exception,
            arithmetic_exception,
            illegal_argument_exception,
            null_pointer_exception,
        }
    }
}
