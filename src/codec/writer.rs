use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use super::types::{Packet, Slot, WireValue};

/// Big-endian binary writer for protocol data
pub struct BinaryWriter {
    data: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: BytesMut::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.put_u8(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.data.put_i8(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(if v { 1 } else { 0 });
    }

    pub fn write_u16(&mut self, v: u16) {
        self.data.put_u16(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.data.put_i16(v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.put_u32(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.data.put_i32(v);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.data.put_u64(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.data.put_i64(v);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.data.put_f32(v);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.data.put_f64(v);
    }

    /// Write a string as a code-unit count followed by one 16-bit unit per
    /// code point. Code points above U+FFFF are truncated to their low 16
    /// bits; the wire format has no surrogate pairs.
    pub fn write_string(&mut self, s: &str) {
        self.write_u16(s.chars().count() as u16);
        for c in s.chars() {
            self.write_u16(c as u32 as u16);
        }
    }

    /// Write a 16-bit length-prefixed byte array
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_u16(bytes.len() as u16);
        self.write_bytes(bytes);
    }

    pub fn write_slot(&mut self, slot: &Slot) {
        self.write_i16(slot.id);
        if slot.is_empty() {
            return;
        }
        self.write_i8(slot.count);
        self.write_i16(slot.damage);
        if slot.has_extra_data() {
            if slot.data.is_empty() {
                self.write_i16(-1);
            } else {
                self.write_i16(slot.data.len() as i16);
                self.write_bytes(&slot.data);
            }
        }
    }

    pub fn write_value(&mut self, value: &WireValue) -> Result<()> {
        match value {
            WireValue::U8(v) => self.write_u8(*v),
            WireValue::I8(v) => self.write_i8(*v),
            WireValue::U16(v) => self.write_u16(*v),
            WireValue::I16(v) => self.write_i16(*v),
            WireValue::U32(v) => self.write_u32(*v),
            WireValue::I32(v) => self.write_i32(*v),
            WireValue::U64(v) => self.write_u64(*v),
            WireValue::I64(v) => self.write_i64(*v),
            WireValue::F32(v) => self.write_f32(*v),
            WireValue::F64(v) => self.write_f64(*v),
            WireValue::Str(v) => self.write_string(v),
            WireValue::Bytes(v) => self.write_byte_array(v),
            WireValue::Bool(v) => self.write_bool(*v),
            WireValue::Slot(v) => self.write_slot(v),
            WireValue::Metadata(_) => return Err(Error::UnsupportedFieldType("entity metadata")),
        }
        Ok(())
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BinaryWriter> for Vec<u8> {
    fn from(writer: BinaryWriter) -> Self {
        writer.into_vec()
    }
}

/// Encode a whole packet (id + fields). Fails before producing any bytes if
/// a field cannot be encoded.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::with_capacity(1 + packet.fields.len() * 4);
    writer.write_u8(packet.id);
    for field in &packet.fields {
        writer.write_value(field)?;
    }
    Ok(writer.into_vec())
}
