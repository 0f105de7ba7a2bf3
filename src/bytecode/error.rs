//! Bytecode Error Types
//!
//! Errors raised while decoding JVM class files.

use thiserror::Error;

/// Result type for class file decoding
pub type BytecodeResult<T> = Result<T, BytecodeError>;

/// Errors that can occur while decoding a class file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BytecodeError {
    /// The data does not start with 0xCAFEBABE
    #[error("Invalid class file magic: {magic:#010x}")]
    BadMagic { magic: u32 },

    /// The data ended before a complete structure could be read
    #[error("Unexpected end of class data at offset {offset} ({needed} more bytes needed)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// A constant pool index points outside the pool or at an unusable slot
    #[error("Invalid constant pool index {index}")]
    BadConstantIndex { index: u16 },

    /// A constant pool entry has the wrong type for its use site
    #[error("Constant pool entry {index} is {found}, expected {expected}")]
    ConstantTypeMismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },

    /// The constant pool contains an unknown tag
    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    /// A method's Code attribute could not be decoded
    #[error("Malformed code in method {method}: {message}")]
    MalformedCode { method: String, message: String },

    /// A CONSTANT_Utf8 entry is not valid modified UTF-8
    #[error("Invalid modified UTF-8 string: {message}")]
    InvalidUtf8 { message: String },
}

impl BytecodeError {
    /// Create a malformed code error
    pub fn malformed_code<M: Into<String>, S: Into<String>>(method: M, message: S) -> Self {
        Self::MalformedCode {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an invalid UTF-8 error
    pub fn invalid_utf8<S: Into<String>>(message: S) -> Self {
        Self::InvalidUtf8 { message: message.into() }
    }
}
