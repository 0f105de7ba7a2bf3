//! Big-endian cursor over class file bytes

use super::error::{BytecodeError, BytecodeResult};

/// Sequential reader over a byte slice using the class file (big-endian) layout
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the data
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn bytes(&mut self, len: usize) -> BytecodeResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(BytecodeError::UnexpectedEof {
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> BytecodeResult<()> {
        self.bytes(len).map(|_| ())
    }

    pub fn u8(&mut self) -> BytecodeResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> BytecodeResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> BytecodeResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn i32(&mut self) -> BytecodeResult<i32> {
        Ok(self.u32()? as i32)
    }

    pub fn u64(&mut self) -> BytecodeResult<u64> {
        let b = self.bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }
}
