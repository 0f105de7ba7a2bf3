//! Verification tests: in-memory plugins and hosts, and on-disk stores for
//! scheduled tasks

mod verifier_tests;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::bytecode::*;
use crate::host::{HostDescriptor, HostVersion};
use crate::plugin::{PluginDescriptor, PluginDetails};
use crate::resolver::FixedClassesResolver;

pub(super) fn host_classes() -> Vec<ClassFile> {
    vec![
        ClassFile::new(JAVA_LANG_OBJECT).with_method(MethodInfo::new("<init>", "()V", AccessFlags::PUBLIC)),
        ClassFile::new("host/Service")
            .with_method(MethodInfo::new("<init>", "()V", AccessFlags::PUBLIC))
            .with_method(MethodInfo::new("run", "()V", AccessFlags::PUBLIC)),
    ]
}

pub(super) fn host(version: &str) -> HostDescriptor {
    HostDescriptor::new(
        HostVersion::parse(version).unwrap(),
        Arc::new(FixedClassesResolver::from_classes("host", host_classes())),
    )
}

/// `plugin/Main` calling `host/Service.run`, plus `host/Service.removed` when `broken`
pub(super) fn main_class(broken: bool) -> ClassFile {
    let mut method = MethodInfo::new("work", "()V", AccessFlags::PUBLIC).with_instruction(Instruction::method(
        0,
        InstructionKind::InvokeVirtual,
        MethodReference::new("host/Service", "run", "()V"),
    ));
    if broken {
        method = method.with_instruction(Instruction::method(
            3,
            InstructionKind::InvokeVirtual,
            MethodReference::new("host/Service", "removed", "()V"),
        ));
    }
    ClassFile::new("plugin/Main").with_method(method)
}

pub(super) fn plugin(descriptor: PluginDescriptor, classes: Vec<ClassFile>) -> Arc<PluginDetails> {
    Arc::new(PluginDetails::new(
        descriptor,
        Arc::new(FixedClassesResolver::from_classes("plugin", classes)),
    ))
}

pub(super) fn write_classes(dir: &Path, classes: &[ClassFile]) {
    for class in classes {
        let path = dir.join("classes").join(format!("{}.class", class.name));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, write_class(class)).unwrap();
    }
}

/// Lay a plugin out as `<root>/<id>/<version>/`
pub(super) fn store_plugin(root: &Path, descriptor: &PluginDescriptor, classes: &[ClassFile]) {
    let dir = root.join(&descriptor.id).join(&descriptor.version);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("plugin.json"), serde_json::to_string(descriptor).unwrap()).unwrap();
    write_classes(&dir, classes);
}

/// Lay a host build out as `<root>/<version>/`
pub(super) fn store_host(root: &Path, version: &str) {
    let dir = root.join(version);
    fs::create_dir_all(&dir).unwrap();
    write_classes(&dir, &host_classes());
}
