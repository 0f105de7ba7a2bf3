//! Constant Pool
//!
//! Decodes the class file constant pool and resolves the indirections the
//! verifier needs (class names, member references, name-and-type pairs).

use super::error::{BytecodeError, BytecodeResult};
use super::reader::ByteReader;

/// A single constant pool entry
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Slot 0 and the second slot of Long/Double entries
    Unusable,
}

impl Constant {
    fn type_name(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class { .. } => "Class",
            Constant::String { .. } => "String",
            Constant::FieldRef { .. } => "Fieldref",
            Constant::MethodRef { .. } => "Methodref",
            Constant::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::Dynamic { .. } => "Dynamic",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Module { .. } => "Module",
            Constant::Package { .. } => "Package",
            Constant::Unusable => "unusable slot",
        }
    }
}

/// Kind of member a Fieldref/Methodref/InterfaceMethodref points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRefKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A resolved member reference: owner, name and descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub kind: MemberRefKind,
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// Decoded constant pool, indexed from 1 as in the class file
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Parse `constant_pool_count` and the entries that follow it
    pub fn parse(reader: &mut ByteReader<'_>) -> BytecodeResult<Self> {
        let count = reader.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        let mut index: u16 = 1;
        while index < count {
            let tag = reader.u8()?;
            let constant = match tag {
                1 => {
                    let len = reader.u16()? as usize;
                    Constant::Utf8(decode_modified_utf8(reader.bytes(len)?)?)
                }
                3 => Constant::Integer(reader.i32()?),
                4 => Constant::Float(f32::from_bits(reader.u32()?)),
                5 => Constant::Long(reader.u64()? as i64),
                6 => Constant::Double(f64::from_bits(reader.u64()?)),
                7 => Constant::Class { name_index: reader.u16()? },
                8 => Constant::String { string_index: reader.u16()? },
                9 => Constant::FieldRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                10 => Constant::MethodRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                11 => Constant::InterfaceMethodRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                12 => Constant::NameAndType {
                    name_index: reader.u16()?,
                    descriptor_index: reader.u16()?,
                },
                15 => Constant::MethodHandle {
                    reference_kind: reader.u8()?,
                    reference_index: reader.u16()?,
                },
                16 => Constant::MethodType { descriptor_index: reader.u16()? },
                17 => Constant::Dynamic {
                    bootstrap_method_attr_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap_method_attr_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                19 => Constant::Module { name_index: reader.u16()? },
                20 => Constant::Package { name_index: reader.u16()? },
                _ => return Err(BytecodeError::UnknownConstantTag { tag, index }),
            };

            // Long and Double take two slots, both inside the pool
            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            let slots = if wide { 2 } else { 1 };
            let next = index
                .checked_add(slots)
                .filter(|next| *next <= count)
                .ok_or(BytecodeError::BadConstantIndex { index })?;
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
            index = next;
        }

        Ok(Self { entries })
    }

    /// Build a pool from entries (index 0 is inserted automatically)
    pub fn from_entries(entries: Vec<Constant>) -> Self {
        let mut all = Vec::with_capacity(entries.len() + 1);
        all.push(Constant::Unusable);
        all.extend(entries);
        Self { entries: all }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> BytecodeResult<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(BytecodeError::BadConstantIndex { index }),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> BytecodeResult<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    /// Internal name of a CONSTANT_Class entry
    pub fn class_name(&self, index: u16) -> BytecodeResult<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub fn name_and_type(&self, index: u16) -> BytecodeResult<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType { name_index, descriptor_index } => {
                Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            other => Err(mismatch(index, "NameAndType", other)),
        }
    }

    /// Resolve a Fieldref, Methodref or InterfaceMethodref entry
    pub fn member_ref(&self, index: u16) -> BytecodeResult<MemberRef<'_>> {
        let (kind, class_index, nat_index) = match self.get(index)? {
            Constant::FieldRef { class_index, name_and_type_index } => {
                (MemberRefKind::Field, *class_index, *name_and_type_index)
            }
            Constant::MethodRef { class_index, name_and_type_index } => {
                (MemberRefKind::Method, *class_index, *name_and_type_index)
            }
            Constant::InterfaceMethodRef { class_index, name_and_type_index } => {
                (MemberRefKind::InterfaceMethod, *class_index, *name_and_type_index)
            }
            other => return Err(mismatch(index, "member reference", other)),
        };
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef { kind, owner, name, descriptor })
    }
}

fn mismatch(index: u16, expected: &'static str, found: &Constant) -> BytecodeError {
    BytecodeError::ConstantTypeMismatch {
        index,
        expected,
        found: found.type_name(),
    }
}

/// Decode the JVM's modified UTF-8 (null as C0 80, supplementary characters
/// as surrogate pairs).
pub fn decode_modified_utf8(bytes: &[u8]) -> BytecodeResult<String> {
    if bytes.iter().all(|b| *b != 0 && *b < 0x80) {
        // Plain ASCII, the overwhelmingly common case for names and descriptors
        return Ok(bytes.iter().map(|b| *b as char).collect());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            if b == 0 {
                return Err(BytecodeError::invalid_utf8(format!("raw null byte at {}", i)));
            }
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            units.push((((b & 0x1F) as u16) << 6) | b2);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            units.push((((b & 0x0F) as u16) << 12) | (b2 << 6) | b3);
            i += 3;
        } else {
            return Err(BytecodeError::invalid_utf8(format!("unexpected byte {:#04x} at {}", b, i)));
        }
    }

    String::from_utf16(&units).map_err(|e| BytecodeError::invalid_utf8(e.to_string()))
}

fn continuation(bytes: &[u8], at: usize) -> BytecodeResult<u16> {
    match bytes.get(at) {
        Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        Some(b) => Err(BytecodeError::invalid_utf8(format!("bad continuation byte {:#04x} at {}", b, at))),
        None => Err(BytecodeError::invalid_utf8("truncated multi-byte sequence")),
    }
}
