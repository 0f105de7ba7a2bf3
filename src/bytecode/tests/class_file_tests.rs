use crate::bytecode::*;

fn sample_class() -> ClassFile {
    ClassFile::new("org/example/plugin/Action")
        .with_super("org/host/AnAction")
        .with_interface("org/host/Disposable")
        .with_field(FieldInfo::new("counter", "I", AccessFlags::PRIVATE))
        .with_method(MethodInfo::new("<init>", "()V", AccessFlags::PUBLIC).with_instruction(Instruction::method(
            0,
            InstructionKind::InvokeSpecial,
            MethodReference::new("org/host/AnAction", "<init>", "()V"),
        )))
        .with_method(
            MethodInfo::new("perform", "(Lorg/host/Event;)V", AccessFlags::PUBLIC)
                .with_instruction(Instruction::class(0, InstructionKind::New, "org/host/Notification"))
                .with_instruction(Instruction::field(
                    0,
                    InstructionKind::GetStatic,
                    FieldReference::new("org/host/Icons", "INFO", "Ljavax/swing/Icon;"),
                ))
                .with_instruction(Instruction::method(
                    0,
                    InstructionKind::InvokeInterface,
                    MethodReference::new("org/host/Disposable", "dispose", "()V"),
                ))
                .with_instruction(Instruction::class(0, InstructionKind::ANewArray, "[Lorg/host/Event;")),
        )
        .with_method(MethodInfo::new(
            "update",
            "()V",
            AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
        ))
}

#[test]
fn test_parse_written_class_header() {
    let bytes = write_class(&sample_class());
    let parsed = ClassFile::parse(&bytes).unwrap();

    assert_eq!(parsed.name, "org/example/plugin/Action");
    assert_eq!(parsed.super_name.as_deref(), Some("org/host/AnAction"));
    assert_eq!(parsed.interfaces, vec!["org/host/Disposable".to_string()]);
    assert_eq!(parsed.major_version, 52);
    assert!(parsed.is_public());
    assert_eq!(parsed.package_name(), "org/example/plugin");

    let field = parsed.find_field("counter", "I").unwrap();
    assert!(field.access.is_private());
}

#[test]
fn test_parse_written_method_bodies() {
    let bytes = write_class(&sample_class());
    let parsed = ClassFile::parse(&bytes).unwrap();

    assert_eq!(parsed.methods.len(), 3);
    let perform = parsed.find_method("perform", "(Lorg/host/Event;)V").unwrap();
    let kinds: Vec<_> = perform.instructions.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InstructionKind::New,
            InstructionKind::GetStatic,
            InstructionKind::InvokeInterface,
            InstructionKind::ANewArray,
        ]
    );

    // offsets ascend in code order
    let offsets: Vec<_> = perform.instructions.iter().map(|i| i.offset).collect();
    assert_eq!(offsets, vec![0, 3, 6, 11]);

    assert!(perform.instructions[2].interface_owner);
    assert_eq!(
        perform.instructions[1].reference,
        SymbolicReference::Field(FieldReference::new("org/host/Icons", "INFO", "Ljavax/swing/Icon;"))
    );

    let update = parsed.find_method("update", "()V").unwrap();
    assert!(update.access.is_abstract());
    assert!(update.instructions.is_empty());
}

#[test]
fn test_parse_nest_attributes() {
    let outer = ClassFile::new("a/Outer").with_nest_member("a/Outer$Inner");
    let inner = ClassFile::new("a/Outer$Inner").with_nest_host("a/Outer");

    let outer = ClassFile::parse(&write_class(&outer)).unwrap();
    let inner = ClassFile::parse(&write_class(&inner)).unwrap();

    assert_eq!(outer.nest_members, vec!["a/Outer$Inner".to_string()]);
    assert_eq!(inner.nest_host.as_deref(), Some("a/Outer"));
    assert!(inner.is_nestmate_of(&outer));
}

#[test]
fn test_truncated_class_is_rejected() {
    let bytes = write_class(&sample_class());
    let error = ClassFile::parse(&bytes[..bytes.len() / 2]).unwrap_err();
    assert!(matches!(error, BytecodeError::UnexpectedEof { .. }));
}

#[test]
fn test_interface_model() {
    let interface = ClassFile::interface("org/host/Listener");
    let parsed = ClassFile::parse(&write_class(&interface)).unwrap();
    assert!(parsed.is_interface());
    assert!(parsed.is_abstract());
}
