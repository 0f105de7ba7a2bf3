//! Class File Model
//!
//! The structured view of a class the verifier works with: names, access
//! flags, supertypes, members and the reference-carrying instructions of each
//! method body.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::constant_pool::ConstantPool;
use super::error::{BytecodeError, BytecodeResult};
use super::instruction::{decode_instructions, Instruction};
use super::reader::ByteReader;
use super::reference::package_of;

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;
pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

bitflags! {
    /// Class, field and method access flags
    ///
    /// Some bits mean different things depending on where they appear; the
    /// method-level names are provided as associated constants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl AccessFlags {
    pub const SYNCHRONIZED: Self = Self::SUPER;
    pub const BRIDGE: Self = Self::VOLATILE;
    pub const VARARGS: Self = Self::TRANSIENT;

    pub fn is_public(&self) -> bool {
        self.contains(Self::PUBLIC)
    }

    pub fn is_private(&self) -> bool {
        self.contains(Self::PRIVATE)
    }

    pub fn is_protected(&self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// None of public, private or protected
    pub fn is_package_private(&self) -> bool {
        !self.intersects(Self::PUBLIC | Self::PRIVATE | Self::PROTECTED)
    }

    pub fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.contains(Self::FINAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    pub fn is_interface(&self) -> bool {
        self.contains(Self::INTERFACE)
    }
}

/// A declared method and its decoded instructions
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
    pub instructions: Vec<Instruction>,
}

impl MethodInfo {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, descriptor: D, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            instructions: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>" || self.name == "<clinit>"
    }

    /// `name + descriptor`, used to label locations and errors
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

/// A declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
}

impl FieldInfo {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, descriptor: D, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
        }
    }
}

/// A decoded class or interface
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: AccessFlags,
    pub major_version: u16,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub nest_host: Option<String>,
    pub nest_members: Vec<String>,
}

impl ClassFile {
    /// Decode class file bytes
    pub fn parse(data: &[u8]) -> BytecodeResult<Self> {
        let mut reader = ByteReader::new(data);

        let magic = reader.u32()?;
        if magic != CLASS_MAGIC {
            return Err(BytecodeError::BadMagic { magic });
        }
        let _minor = reader.u16()?;
        let major_version = reader.u16()?;
        let pool = ConstantPool::parse(&mut reader)?;

        let access = AccessFlags::from_bits_retain(reader.u16()?);
        let name = pool.class_name(reader.u16()?)?.to_string();
        let super_index = reader.u16()?;
        let super_name = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index)?.to_string())
        };

        let interface_count = reader.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(reader.u16()?)?.to_string());
        }

        let field_count = reader.u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let access = AccessFlags::from_bits_retain(reader.u16()?);
            let name = pool.utf8(reader.u16()?)?.to_string();
            let descriptor = pool.utf8(reader.u16()?)?.to_string();
            skip_attributes(&mut reader)?;
            fields.push(FieldInfo { name, descriptor, access });
        }

        let method_count = reader.u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(parse_method(&mut reader, &pool)?);
        }

        let mut nest_host = None;
        let mut nest_members = Vec::new();
        let attribute_count = reader.u16()?;
        for _ in 0..attribute_count {
            let attribute_name = pool.utf8(reader.u16()?)?;
            let length = reader.u32()? as usize;
            let body = reader.bytes(length)?;
            match attribute_name {
                "NestHost" => {
                    let mut body = ByteReader::new(body);
                    nest_host = Some(pool.class_name(body.u16()?)?.to_string());
                }
                "NestMembers" => {
                    let mut body = ByteReader::new(body);
                    let count = body.u16()?;
                    for _ in 0..count {
                        nest_members.push(pool.class_name(body.u16()?)?.to_string());
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            name,
            super_name,
            interfaces,
            access,
            major_version,
            fields,
            methods,
            nest_host,
            nest_members,
        })
    }

    /// A public class extending `java/lang/Object`, for building models directly
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        let super_name = if name == JAVA_LANG_OBJECT {
            None
        } else {
            Some(JAVA_LANG_OBJECT.to_string())
        };
        Self {
            name,
            super_name,
            interfaces: Vec::new(),
            access: AccessFlags::PUBLIC | AccessFlags::SUPER,
            major_version: 52,
            fields: Vec::new(),
            methods: Vec::new(),
            nest_host: None,
            nest_members: Vec::new(),
        }
    }

    /// A public interface
    pub fn interface<S: Into<String>>(name: S) -> Self {
        Self::new(name).with_access(AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT)
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_super<S: Into<String>>(mut self, super_name: S) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_interface<S: Into<String>>(mut self, interface: S) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_nest_host<S: Into<String>>(mut self, host: S) -> Self {
        self.nest_host = Some(host.into());
        self
    }

    pub fn with_nest_member<S: Into<String>>(mut self, member: S) -> Self {
        self.nest_members.push(member.into());
        self
    }

    pub fn package_name(&self) -> &str {
        package_of(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.access.is_interface()
    }

    pub fn is_abstract(&self) -> bool {
        self.access.is_abstract()
    }

    pub fn is_public(&self) -> bool {
        self.access.is_public()
    }

    /// Name of the nest this class belongs to (itself when it has no NestHost)
    pub fn nest_host_name(&self) -> &str {
        self.nest_host.as_deref().unwrap_or(&self.name)
    }

    pub fn is_nestmate_of(&self, other: &ClassFile) -> bool {
        self.nest_host_name() == other.nest_host_name()
    }

    /// All declared supertypes: superclass first, then interfaces
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .as_deref()
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.descriptor == descriptor)
    }
}

fn parse_method(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> BytecodeResult<MethodInfo> {
    let access = AccessFlags::from_bits_retain(reader.u16()?);
    let name = pool.utf8(reader.u16()?)?.to_string();
    let descriptor = pool.utf8(reader.u16()?)?.to_string();
    let mut method = MethodInfo::new(name, descriptor, access);

    let attribute_count = reader.u16()?;
    for _ in 0..attribute_count {
        let attribute_name = pool.utf8(reader.u16()?)?;
        let length = reader.u32()? as usize;
        let body = reader.bytes(length)?;
        if attribute_name == "Code" {
            let mut code_reader = ByteReader::new(body);
            code_reader.skip(4)?; // max_stack, max_locals
            let code_length = code_reader.u32()? as usize;
            let code = code_reader.bytes(code_length)?;
            method.instructions = decode_instructions(code, pool, &method.signature())?;
        }
    }

    Ok(method)
}

fn skip_attributes(reader: &mut ByteReader<'_>) -> BytecodeResult<()> {
    let count = reader.u16()?;
    for _ in 0..count {
        reader.skip(2)?;
        let length = reader.u32()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}
