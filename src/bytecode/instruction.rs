//! Instruction Decoding
//!
//! Walks a method's code array and keeps the instructions that carry a
//! symbolic reference. Everything else is decoded only far enough to find the
//! start of the next instruction.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::constant_pool::{Constant, ConstantPool, MemberRefKind};
use super::error::{BytecodeError, BytecodeResult};
use super::reader::ByteReader;
use super::reference::{ClassReference, FieldReference, MethodReference, SymbolicReference};

/// Instructions that reference classes, methods or fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstructionKind {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
    InvokeVirtual,
    InvokeSpecial,
    InvokeStatic,
    InvokeInterface,
    New,
    ANewArray,
    CheckCast,
    InstanceOf,
    MultiANewArray,
    Ldc,
}

impl InstructionKind {
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0x12 | 0x13 => Some(Self::Ldc),
            0xb2 => Some(Self::GetStatic),
            0xb3 => Some(Self::PutStatic),
            0xb4 => Some(Self::GetField),
            0xb5 => Some(Self::PutField),
            0xb6 => Some(Self::InvokeVirtual),
            0xb7 => Some(Self::InvokeSpecial),
            0xb8 => Some(Self::InvokeStatic),
            0xb9 => Some(Self::InvokeInterface),
            0xbb => Some(Self::New),
            0xbd => Some(Self::ANewArray),
            0xc0 => Some(Self::CheckCast),
            0xc1 => Some(Self::InstanceOf),
            0xc5 => Some(Self::MultiANewArray),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::GetStatic => "getstatic",
            Self::PutStatic => "putstatic",
            Self::GetField => "getfield",
            Self::PutField => "putfield",
            Self::InvokeVirtual => "invokevirtual",
            Self::InvokeSpecial => "invokespecial",
            Self::InvokeStatic => "invokestatic",
            Self::InvokeInterface => "invokeinterface",
            Self::New => "new",
            Self::ANewArray => "anewarray",
            Self::CheckCast => "checkcast",
            Self::InstanceOf => "instanceof",
            Self::MultiANewArray => "multianewarray",
            Self::Ldc => "ldc",
        }
    }

    pub fn is_field_access(&self) -> bool {
        matches!(self, Self::GetStatic | Self::PutStatic | Self::GetField | Self::PutField)
    }

    pub fn is_static_field_access(&self) -> bool {
        matches!(self, Self::GetStatic | Self::PutStatic)
    }

    pub fn is_invocation(&self) -> bool {
        matches!(
            self,
            Self::InvokeVirtual | Self::InvokeSpecial | Self::InvokeStatic | Self::InvokeInterface
        )
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A reference-carrying instruction at a code offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub offset: u32,
    pub kind: InstructionKind,
    pub reference: SymbolicReference,
    /// Set when an invoke targets a CONSTANT_InterfaceMethodref
    pub interface_owner: bool,
}

impl Instruction {
    pub fn class(offset: u32, kind: InstructionKind, class_name: &str) -> Self {
        Self {
            offset,
            kind,
            reference: SymbolicReference::Class(ClassReference::new(class_name)),
            interface_owner: false,
        }
    }

    pub fn method(offset: u32, kind: InstructionKind, method: MethodReference) -> Self {
        Self {
            offset,
            kind,
            reference: SymbolicReference::Method(method),
            interface_owner: kind == InstructionKind::InvokeInterface,
        }
    }

    pub fn field(offset: u32, kind: InstructionKind, field: FieldReference) -> Self {
        Self {
            offset,
            kind,
            reference: SymbolicReference::Field(field),
            interface_owner: false,
        }
    }

    /// Mark the referenced method as declared through an InterfaceMethodref
    pub fn with_interface_owner(mut self, interface_owner: bool) -> Self {
        self.interface_owner = interface_owner;
        self
    }
}

/// Decode the reference-carrying instructions of a Code attribute
pub fn decode_instructions(code: &[u8], pool: &ConstantPool, method: &str) -> BytecodeResult<Vec<Instruction>> {
    let mut reader = ByteReader::new(code);
    let mut instructions = Vec::new();

    while !reader.is_empty() {
        let pc = reader.position();
        let opcode = reader.u8()?;

        match opcode {
            0x12 => {
                let index = reader.u8()? as u16;
                push_ldc(&mut instructions, pool, pc, index)?;
            }
            0x13 => {
                let index = reader.u16()?;
                push_ldc(&mut instructions, pool, pc, index)?;
            }
            0xb2..=0xb9 => {
                let index = reader.u16()?;
                if opcode == 0xb9 {
                    reader.skip(2)?; // count, 0
                }
                let member = pool.member_ref(index)?;
                let kind = InstructionKind::from_opcode(opcode)
                    .ok_or_else(|| BytecodeError::malformed_code(method, format!("opcode {:#04x}", opcode)))?;
                let instruction = match member.kind {
                    MemberRefKind::Field => {
                        if !kind.is_field_access() {
                            return Err(BytecodeError::malformed_code(
                                method,
                                format!("{} at {} references a field", kind, pc),
                            ));
                        }
                        Instruction::field(pc as u32, kind, FieldReference::new(member.owner, member.name, member.descriptor))
                    }
                    MemberRefKind::Method | MemberRefKind::InterfaceMethod => {
                        if !kind.is_invocation() {
                            return Err(BytecodeError::malformed_code(
                                method,
                                format!("{} at {} references a method", kind, pc),
                            ));
                        }
                        Instruction::method(pc as u32, kind, MethodReference::new(member.owner, member.name, member.descriptor))
                            .with_interface_owner(member.kind == MemberRefKind::InterfaceMethod)
                    }
                };
                instructions.push(instruction);
            }
            0xbb | 0xbd | 0xc0 | 0xc1 => {
                let index = reader.u16()?;
                let kind = match opcode {
                    0xbb => InstructionKind::New,
                    0xbd => InstructionKind::ANewArray,
                    0xc0 => InstructionKind::CheckCast,
                    _ => InstructionKind::InstanceOf,
                };
                instructions.push(Instruction::class(pc as u32, kind, pool.class_name(index)?));
            }
            0xc5 => {
                let index = reader.u16()?;
                reader.skip(1)?; // dimensions
                instructions.push(Instruction::class(pc as u32, InstructionKind::MultiANewArray, pool.class_name(index)?));
            }
            0xaa => {
                skip_padding(&mut reader, pc)?;
                reader.skip(4)?; // default
                let low = reader.i32()?;
                let high = reader.i32()?;
                if high < low {
                    return Err(BytecodeError::malformed_code(method, format!("tableswitch at {} has high < low", pc)));
                }
                let entries = (high as i64 - low as i64 + 1) as usize;
                reader.skip(entries * 4)?;
            }
            0xab => {
                skip_padding(&mut reader, pc)?;
                reader.skip(4)?; // default
                let pairs = reader.i32()?;
                if pairs < 0 {
                    return Err(BytecodeError::malformed_code(method, format!("lookupswitch at {} has negative npairs", pc)));
                }
                reader.skip(pairs as usize * 8)?;
            }
            0xc4 => {
                let widened = reader.u8()?;
                // wide iinc carries index + constant, other wide forms only the index
                reader.skip(if widened == 0x84 { 4 } else { 2 })?;
            }
            _ => {
                let operands = operand_length(opcode).ok_or_else(|| {
                    BytecodeError::malformed_code(method, format!("unknown opcode {:#04x} at {}", opcode, pc))
                })?;
                reader.skip(operands)?;
            }
        }
    }

    Ok(instructions)
}

fn push_ldc(instructions: &mut Vec<Instruction>, pool: &ConstantPool, pc: usize, index: u16) -> BytecodeResult<()> {
    if let Constant::Class { .. } = pool.get(index)? {
        instructions.push(Instruction::class(pc as u32, InstructionKind::Ldc, pool.class_name(index)?));
    }
    Ok(())
}

fn skip_padding(reader: &mut ByteReader<'_>, pc: usize) -> BytecodeResult<()> {
    let padding = (4 - (pc + 1) % 4) % 4;
    reader.skip(padding)
}

/// Operand byte count of fixed-length opcodes not handled explicitly
fn operand_length(opcode: u8) -> Option<usize> {
    match opcode {
        0x00..=0x0f => Some(0),
        0x10 => Some(1),        // bipush
        0x11 => Some(2),        // sipush
        0x14 => Some(2),        // ldc2_w
        0x15..=0x19 => Some(1), // loads
        0x1a..=0x35 => Some(0),
        0x36..=0x3a => Some(1), // stores
        0x3b..=0x83 => Some(0),
        0x84 => Some(2),        // iinc
        0x85..=0x98 => Some(0),
        0x99..=0xa8 => Some(2), // branches, goto, jsr
        0xa9 => Some(1),        // ret
        0xac..=0xb1 => Some(0), // returns
        0xba => Some(4),        // invokedynamic
        0xbc => Some(1),        // newarray
        0xbe | 0xbf | 0xc2 | 0xc3 => Some(0),
        0xc6 | 0xc7 => Some(2), // ifnull, ifnonnull
        0xc8 | 0xc9 => Some(4), // goto_w, jsr_w
        0xca | 0xfe | 0xff => Some(0),
        _ => None,
    }
}
