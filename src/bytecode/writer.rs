//! Class File Writer
//!
//! Encodes a [`ClassFile`] model back into class file bytes. Method bodies are
//! emitted as the sequence of reference-carrying instructions followed by a
//! `return`, so offsets are reassigned on the way out.

use std::collections::HashMap;

use super::class_file::{AccessFlags, ClassFile, MethodInfo, CLASS_MAGIC};
use super::constant_pool::MemberRefKind;
use super::instruction::{Instruction, InstructionKind};
use super::reference::SymbolicReference;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Class(String),
    NameAndType(String, String),
    Member(MemberRefKind, String, String, String),
}

#[derive(Default)]
struct PoolWriter {
    bytes: Vec<u8>,
    indices: HashMap<PoolKey, u16>,
    next: u16,
}

impl PoolWriter {
    fn new() -> Self {
        Self {
            next: 1,
            ..Default::default()
        }
    }

    fn intern(&mut self, key: PoolKey, encode: impl FnOnce(&mut Self) -> Vec<u8>) -> u16 {
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }
        let entry = encode(self);
        let index = self.next;
        self.next += 1;
        self.bytes.extend(entry);
        self.indices.insert(key, index);
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        self.intern(PoolKey::Utf8(value.to_string()), |_| {
            let encoded = encode_modified_utf8(value);
            let mut entry = vec![1];
            entry.extend((encoded.len() as u16).to_be_bytes());
            entry.extend(encoded);
            entry
        })
    }

    fn class(&mut self, name: &str) -> u16 {
        self.intern(PoolKey::Class(name.to_string()), |pool| {
            let name_index = pool.utf8(name);
            let mut entry = vec![7];
            entry.extend(name_index.to_be_bytes());
            entry
        })
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        self.intern(PoolKey::NameAndType(name.to_string(), descriptor.to_string()), |pool| {
            let name_index = pool.utf8(name);
            let descriptor_index = pool.utf8(descriptor);
            let mut entry = vec![12];
            entry.extend(name_index.to_be_bytes());
            entry.extend(descriptor_index.to_be_bytes());
            entry
        })
    }

    fn member(&mut self, kind: MemberRefKind, owner: &str, name: &str, descriptor: &str) -> u16 {
        let tag = match kind {
            MemberRefKind::Field => 9,
            MemberRefKind::Method => 10,
            MemberRefKind::InterfaceMethod => 11,
        };
        let key = PoolKey::Member(kind, owner.to_string(), name.to_string(), descriptor.to_string());
        self.intern(key, |pool| {
            let class_index = pool.class(owner);
            let nat_index = pool.name_and_type(name, descriptor);
            let mut entry = vec![tag];
            entry.extend(class_index.to_be_bytes());
            entry.extend(nat_index.to_be_bytes());
            entry
        })
    }
}

/// Serialize a class model to class file bytes
pub fn write_class(class: &ClassFile) -> Vec<u8> {
    let mut pool = PoolWriter::new();
    let mut body = Vec::new();

    body.extend(class.access.bits().to_be_bytes());
    body.extend(pool.class(&class.name).to_be_bytes());
    let super_index = class.super_name.as_deref().map(|s| pool.class(s)).unwrap_or(0);
    body.extend(super_index.to_be_bytes());

    body.extend((class.interfaces.len() as u16).to_be_bytes());
    for interface in &class.interfaces {
        body.extend(pool.class(interface).to_be_bytes());
    }

    body.extend((class.fields.len() as u16).to_be_bytes());
    for field in &class.fields {
        body.extend(field.access.bits().to_be_bytes());
        body.extend(pool.utf8(&field.name).to_be_bytes());
        body.extend(pool.utf8(&field.descriptor).to_be_bytes());
        body.extend(0u16.to_be_bytes());
    }

    body.extend((class.methods.len() as u16).to_be_bytes());
    for method in &class.methods {
        write_method(&mut body, &mut pool, method);
    }

    let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
    if let Some(host) = &class.nest_host {
        let name = pool.utf8("NestHost");
        attributes.push((name, pool.class(host).to_be_bytes().to_vec()));
    }
    if !class.nest_members.is_empty() {
        let name = pool.utf8("NestMembers");
        let mut data = (class.nest_members.len() as u16).to_be_bytes().to_vec();
        for member in &class.nest_members {
            data.extend(pool.class(member).to_be_bytes());
        }
        attributes.push((name, data));
    }
    body.extend((attributes.len() as u16).to_be_bytes());
    for (name, data) in attributes {
        body.extend(name.to_be_bytes());
        body.extend((data.len() as u32).to_be_bytes());
        body.extend(data);
    }

    let mut out = Vec::with_capacity(body.len() + pool.bytes.len() + 10);
    out.extend(CLASS_MAGIC.to_be_bytes());
    out.extend(0u16.to_be_bytes());
    out.extend(class.major_version.to_be_bytes());
    out.extend(pool.next.to_be_bytes());
    out.extend(pool.bytes);
    out.extend(body);
    out
}

fn write_method(body: &mut Vec<u8>, pool: &mut PoolWriter, method: &MethodInfo) {
    body.extend(method.access.bits().to_be_bytes());
    body.extend(pool.utf8(&method.name).to_be_bytes());
    body.extend(pool.utf8(&method.descriptor).to_be_bytes());

    if method.access.intersects(AccessFlags::ABSTRACT | AccessFlags::NATIVE) {
        body.extend(0u16.to_be_bytes());
        return;
    }

    let mut code = Vec::new();
    for instruction in &method.instructions {
        write_instruction(&mut code, pool, instruction);
    }
    code.push(0xb1);

    let code_name = pool.utf8("Code");
    body.extend(1u16.to_be_bytes());
    body.extend(code_name.to_be_bytes());
    body.extend((12 + code.len() as u32).to_be_bytes());
    body.extend(16u16.to_be_bytes()); // max_stack
    body.extend(16u16.to_be_bytes()); // max_locals
    body.extend((code.len() as u32).to_be_bytes());
    body.extend(code);
    body.extend(0u16.to_be_bytes()); // exception table
    body.extend(0u16.to_be_bytes()); // attributes
}

fn write_instruction(code: &mut Vec<u8>, pool: &mut PoolWriter, instruction: &Instruction) {
    let index = match &instruction.reference {
        SymbolicReference::Class(class) => pool.class(&class.class_name),
        SymbolicReference::Field(field) => {
            pool.member(MemberRefKind::Field, &field.owner.class_name, &field.name, &field.descriptor)
        }
        SymbolicReference::Method(method) => {
            let kind = if instruction.interface_owner {
                MemberRefKind::InterfaceMethod
            } else {
                MemberRefKind::Method
            };
            pool.member(kind, &method.owner.class_name, &method.name, &method.descriptor)
        }
    };

    let opcode = match instruction.kind {
        InstructionKind::Ldc => 0x13, // always ldc_w
        InstructionKind::GetStatic => 0xb2,
        InstructionKind::PutStatic => 0xb3,
        InstructionKind::GetField => 0xb4,
        InstructionKind::PutField => 0xb5,
        InstructionKind::InvokeVirtual => 0xb6,
        InstructionKind::InvokeSpecial => 0xb7,
        InstructionKind::InvokeStatic => 0xb8,
        InstructionKind::InvokeInterface => 0xb9,
        InstructionKind::New => 0xbb,
        InstructionKind::ANewArray => 0xbd,
        InstructionKind::CheckCast => 0xc0,
        InstructionKind::InstanceOf => 0xc1,
        InstructionKind::MultiANewArray => 0xc5,
    };
    code.push(opcode);
    code.extend(index.to_be_bytes());
    match instruction.kind {
        InstructionKind::InvokeInterface => code.extend([1, 0]),
        InstructionKind::MultiANewArray => code.push(1),
        _ => {}
    }
}

/// Encode a string in the JVM's modified UTF-8
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::constant_pool::decode_modified_utf8;

    #[test]
    fn test_modified_utf8_encoding() {
        assert_eq!(encode_modified_utf8("\u{0}"), vec![0xC0, 0x80]);
        let text = "a\u{0}é\u{1F600}";
        assert_eq!(decode_modified_utf8(&encode_modified_utf8(text)).unwrap(), text);
    }

    #[test]
    fn test_pool_interning() {
        let mut pool = PoolWriter::new();
        let first = pool.class("a/B");
        let second = pool.class("a/B");
        assert_eq!(first, second);
        // Utf8 at 1, Class at 2
        assert_eq!(first, 2);
        assert_eq!(pool.next, 3);
    }
}
