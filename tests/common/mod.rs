//! On-disk plugin and host stores for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use plugin_verifier::bytecode::*;
use plugin_verifier::host::HostVersion;
use plugin_verifier::plugin::{PluginDependency, PluginDescriptor};

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        fs::create_dir_all(workspace.plugins_dir()).unwrap();
        fs::create_dir_all(workspace.hosts_dir()).unwrap();
        fs::write(workspace.config_file(), "").unwrap();
        workspace
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.dir.path().join("plugins")
    }

    pub fn hosts_dir(&self) -> PathBuf {
        self.dir.path().join("hosts")
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.path().join("verifier.toml")
    }

    /// Host build with `host/Service.run()`; `with_removed` also keeps `removed()`
    pub fn add_host(&self, version: &str, with_removed: bool) {
        let mut service = ClassFile::new("host/Service")
            .with_method(MethodInfo::new("<init>", "()V", AccessFlags::PUBLIC))
            .with_method(MethodInfo::new("run", "()V", AccessFlags::PUBLIC));
        if with_removed {
            service = service.with_method(MethodInfo::new("removed", "()V", AccessFlags::PUBLIC));
        }
        let classes = vec![
            ClassFile::new(JAVA_LANG_OBJECT).with_method(MethodInfo::new("<init>", "()V", AccessFlags::PUBLIC)),
            service,
        ];
        write_classes(&self.hosts_dir().join(version), &classes);
    }

    /// Plugin calling `host/Service.run()` and `host/Service.removed()`
    pub fn add_plugin(&self, id: &str, version: &str, since: &str, until: &str) {
        let descriptor = PluginDescriptor::new(id, version).with_range(
            Some(HostVersion::parse(since).unwrap()),
            Some(HostVersion::parse(until).unwrap()),
        );
        self.store_plugin(&descriptor, &[caller_class(id)]);
    }

    pub fn add_plugin_with_dependency(&self, id: &str, version: &str, dependency: &str) {
        let descriptor = PluginDescriptor::new(id, version).with_dependency(PluginDependency::plugin(dependency));
        self.store_plugin(&descriptor, &[caller_class(id)]);
    }

    pub fn store_plugin(&self, descriptor: &PluginDescriptor, classes: &[ClassFile]) {
        let dir = self.plugins_dir().join(&descriptor.id).join(&descriptor.version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("plugin.json"), serde_json::to_string(descriptor).unwrap()).unwrap();
        write_classes(&dir, classes);
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

fn caller_class(id: &str) -> ClassFile {
    let name = format!("{}/Main", id.replace('.', "/"));
    ClassFile::new(name).with_method(
        MethodInfo::new("work", "()V", AccessFlags::PUBLIC)
            .with_instruction(Instruction::method(
                0,
                InstructionKind::InvokeVirtual,
                MethodReference::new("host/Service", "run", "()V"),
            ))
            .with_instruction(Instruction::method(
                3,
                InstructionKind::InvokeVirtual,
                MethodReference::new("host/Service", "removed", "()V"),
            )),
    )
}

fn write_classes(dir: &Path, classes: &[ClassFile]) {
    for class in classes {
        let path = dir.join("classes").join(format!("{}.class", class.name));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, write_class(class)).unwrap();
    }
}
