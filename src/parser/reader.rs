//! Byte-level reader for the WebAssembly binary format
//!
//! All multi-byte integers in the binary format are LEB128 encoded, apart from
//! the fixed-width header fields and the float immediates, which are
//! little-endian.

use super::ParseError;
use byteorder::{LittleEndian, ReadBytesExt};

pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, pos: 0 }
    }

    // Basic operations --------------------------------------------------------

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_byte(&mut self) -> Result<u8, ParseError> {
        let byte = *self.bytes.get(self.pos).ok_or(ParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos.checked_add(len).ok_or(ParseError::UnexpectedEof)?;
        let slice = self.bytes.get(self.pos..end).ok_or(ParseError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    /// Split off the next `len` bytes as an independent reader, used for
    /// sections and function bodies that must be consumed exactly.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, ParseError> {
        Ok(Reader::new(self.read_bytes(len)?))
    }

    // Read and interpret types ------------------------------------------------

    // le
    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        let mut bytes = self.read_bytes(4)?;
        Ok(bytes.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32, ParseError> {
        let mut bytes = self.read_bytes(4)?;
        Ok(bytes.read_f32::<LittleEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64, ParseError> {
        let mut bytes = self.read_bytes(8)?;
        Ok(bytes.read_f64::<LittleEndian>()?)
    }

    pub fn read_vu32(&mut self) -> Result<u32, ParseError> {
        Ok(self.read_unsigned(32)? as u32)
    }

    pub fn read_vs32(&mut self) -> Result<i32, ParseError> {
        Ok(self.read_signed(32)? as i32)
    }

    /// Signed 33-bit LEB128, the encoding of block type indices.
    pub fn read_vs33(&mut self) -> Result<i64, ParseError> {
        self.read_signed(33)
    }

    pub fn read_vs64(&mut self) -> Result<i64, ParseError> {
        self.read_signed(64)
    }

    pub fn read_name(&mut self) -> Result<String, ParseError> {
        let len = self.read_vu32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::InvalidUtf8)
    }

    fn read_unsigned(&mut self, bits: u32) -> Result<u64, ParseError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            let payload = u64::from(byte & 0x7f);
            let remaining = bits - shift;
            if remaining < 7 && (payload >> remaining) != 0 {
                return Err(ParseError::IntegerTooLarge);
            }
            result |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= bits {
                return Err(ParseError::IntegerRepresentationTooLong);
            }
        }
    }

    fn read_signed(&mut self, bits: u32) -> Result<i64, ParseError> {
        let mut result: i64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            let payload = i64::from(byte & 0x7f);
            let remaining = bits - shift;
            if remaining < 7 {
                // unused high bits of the final byte must sign-extend the last used bit
                let mask = (-1i64 << (remaining - 1)) & 0x7f;
                let high = payload & mask;
                if high != 0 && high != mask {
                    return Err(ParseError::IntegerTooLarge);
                }
            }
            result |= payload << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 64 && byte & 0x40 != 0 {
                    result |= -1i64 << shift;
                }
                return Ok(result);
            }
            if shift >= bits {
                return Err(ParseError::IntegerRepresentationTooLong);
            }
        }
    }
}
