//! Checker and filter tests over in-memory class models


use std::sync::Arc;

use crate::bytecode::*;
use crate::host::HostVersion;
use crate::plugin::PluginCoordinate;
use crate::resolver::{FixedClassesResolver, Resolver, UnionResolver};
use crate::verifier::VerificationContext;

/// Host classes shared by the checker tests
pub(super) fn host_classes() -> Vec<ClassFile> {
    vec![
        ClassFile::new(JAVA_LANG_OBJECT)
            .with_method(MethodInfo::new("<init>", "()V", AccessFlags::PUBLIC))
            .with_method(MethodInfo::new("hashCode", "()I", AccessFlags::PUBLIC))
            .with_method(MethodInfo::new("equals", "(Ljava/lang/Object;)Z", AccessFlags::PUBLIC)),
        ClassFile::new("host/Service")
            .with_field(FieldInfo::new("state", "I", AccessFlags::PROTECTED))
            .with_field(FieldInfo::new("INSTANCE", "Lhost/Service;", AccessFlags::PUBLIC | AccessFlags::STATIC))
            .with_method(MethodInfo::new("<init>", "()V", AccessFlags::PUBLIC))
            .with_method(MethodInfo::new("run", "()V", AccessFlags::PUBLIC))
            .with_method(MethodInfo::new("secret", "()V", AccessFlags::PRIVATE))
            .with_method(MethodInfo::new("name", "()Ljava/lang/String;", AccessFlags::PUBLIC | AccessFlags::FINAL)),
        ClassFile::interface("host/Listener")
            .with_method(MethodInfo::new("onEvent", "()V", AccessFlags::PUBLIC | AccessFlags::ABSTRACT))
            .with_method(MethodInfo::new("helper", "()V", AccessFlags::PUBLIC | AccessFlags::STATIC)),
        ClassFile::interface("host/SpecialListener").with_interface("host/Listener"),
        ClassFile::new("host/Hidden").with_access(AccessFlags::SUPER),
    ]
}

pub(super) fn host_resolver() -> Arc<dyn Resolver> {
    Arc::new(FixedClassesResolver::from_classes("host", host_classes()))
}

/// Plugin classes plus the classpath `plugin, host`
pub(super) fn classpath(plugin: Vec<ClassFile>) -> (Arc<dyn Resolver>, Arc<dyn Resolver>) {
    let plugin: Arc<dyn Resolver> = Arc::new(FixedClassesResolver::from_classes("plugin", plugin));
    let classpath: Arc<dyn Resolver> = Arc::new(UnionResolver::new(vec![Arc::clone(&plugin), host_resolver()]));
    (plugin, classpath)
}

pub(super) fn context(classpath: Arc<dyn Resolver>) -> VerificationContext {
    VerificationContext::new(
        PluginCoordinate::new("com.example.plugin", "1.0"),
        HostVersion::parse("IU-163.1").unwrap(),
        classpath,
    )
}

/// A plugin class with one `work()V` method holding `instructions`
pub(super) fn plugin_class(name: &str, instructions: Vec<Instruction>) -> ClassFile {
    let method = instructions
        .into_iter()
        .fold(MethodInfo::new("work", "()V", AccessFlags::PUBLIC), MethodInfo::with_instruction);
    ClassFile::new(name).with_method(method)
}
