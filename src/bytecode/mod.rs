//! JVM Class File Decoding
//!
//! Turns raw class file bytes into the [`ClassFile`] model consumed by the
//! resolvers and the compatibility checker, and writes models back out.

pub mod class_file;
pub mod constant_pool;
pub mod error;
pub mod instruction;
pub mod reader;
pub mod reference;
pub mod writer;

pub use class_file::{AccessFlags, ClassFile, FieldInfo, MethodInfo, JAVA_LANG_OBJECT};
pub use error::{BytecodeError, BytecodeResult};
pub use instruction::{Instruction, InstructionKind};
pub use reference::{
    array_element_class, package_of, to_java_name, ClassReference, FieldReference, MethodReference,
    SymbolicReference,
};
pub use writer::write_class;

#[cfg(test)]
mod tests;
