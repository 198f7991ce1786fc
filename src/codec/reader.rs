use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};
use super::types::{
    item_has_extra_data, EntityMetadata, FieldKind, MetadataValue, Position, Slot, WireValue,
};

/// Streaming big-endian reader for protocol data.
///
/// Packets carry no length envelope, so fields are pulled straight off the
/// underlying stream one at a time.
pub struct PacketReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub async fn read_u8(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8().await?)
    }

    pub async fn read_i8(&mut self) -> Result<i8> {
        Ok(self.inner.read_i8().await?)
    }

    /// Any byte other than 1 reads as false
    pub async fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8().await? == 1)
    }

    pub async fn read_u16(&mut self) -> Result<u16> {
        Ok(self.inner.read_u16().await?)
    }

    pub async fn read_i16(&mut self) -> Result<i16> {
        Ok(self.inner.read_i16().await?)
    }

    pub async fn read_u32(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32().await?)
    }

    pub async fn read_i32(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32().await?)
    }

    pub async fn read_u64(&mut self) -> Result<u64> {
        Ok(self.inner.read_u64().await?)
    }

    pub async fn read_i64(&mut self) -> Result<i64> {
        Ok(self.inner.read_i64().await?)
    }

    pub async fn read_f32(&mut self) -> Result<f32> {
        Ok(self.inner.read_f32().await?)
    }

    pub async fn read_f64(&mut self) -> Result<f64> {
        Ok(self.inner.read_f64().await?)
    }

    pub async fn read_exact_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Read and drop `n` bytes
    pub async fn skip(&mut self, n: u64) -> Result<()> {
        let copied = tokio::io::copy(&mut (&mut self.inner).take(n), &mut tokio::io::sink()).await?;
        if copied < n {
            return Err(Error::Io("unexpected end of stream".into()));
        }
        Ok(())
    }

    /// Read a string of 16-bit code units, one code point per unit.
    /// Lone surrogate units decode to U+FFFD.
    pub async fn read_string(&mut self) -> Result<String> {
        let len = self.read_u16().await? as usize;
        let mut s = String::with_capacity(len);
        for _ in 0..len {
            let unit = self.read_u16().await?;
            s.push(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        Ok(s)
    }

    /// Read a 16-bit length-prefixed byte array; length 0 yields an empty vec
    pub async fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u16().await? as usize;
        if len == 0 {
            return Ok(Vec::new());
        }
        self.read_exact_bytes(len).await
    }

    pub async fn read_slot(&mut self) -> Result<Slot> {
        let id = self.read_i16().await?;
        if id == Slot::EMPTY_ID {
            return Ok(Slot::empty());
        }

        let count = self.read_i8().await?;
        let damage = self.read_i16().await?;
        let mut slot = Slot::new(id, count, damage);

        if item_has_extra_data(id) {
            let len = self.read_i16().await?;
            if len > 0 {
                slot.data = self.read_exact_bytes(len as usize).await?;
            } else if len < -1 {
                return Err(Error::Protocol(format!("negative slot payload length {len}")));
            }
        }

        Ok(slot)
    }

    /// Read an entity metadata block up to the 127 terminator
    pub async fn read_metadata(&mut self) -> Result<EntityMetadata> {
        let mut metadata = EntityMetadata::new();

        loop {
            let tag = self.read_u8().await?;
            if tag == MetadataValue::END_TAG {
                break;
            }

            let key = tag & 0x1F;
            let value = match tag >> 5 {
                0 => MetadataValue::Byte(self.read_i8().await?),
                1 => MetadataValue::Short(self.read_i16().await?),
                2 => MetadataValue::Int(self.read_i32().await?),
                3 => MetadataValue::Float(self.read_f32().await?),
                4 => MetadataValue::Str(self.read_string().await?),
                5 => {
                    let id = self.read_i16().await?;
                    let count = self.read_i8().await?;
                    let damage = self.read_i16().await?;
                    MetadataValue::Slot(Slot::new(id, count, damage))
                }
                6 => MetadataValue::Position(Position {
                    x: self.read_i32().await?,
                    y: self.read_i32().await?,
                    z: self.read_i32().await?,
                }),
                other => {
                    return Err(Error::Protocol(format!("invalid metadata type {other}")));
                }
            };

            metadata.insert(key, value);
        }

        Ok(metadata)
    }

    pub async fn read_value(&mut self, kind: FieldKind) -> Result<WireValue> {
        Ok(match kind {
            FieldKind::U8 => WireValue::U8(self.read_u8().await?),
            FieldKind::I8 => WireValue::I8(self.read_i8().await?),
            FieldKind::U16 => WireValue::U16(self.read_u16().await?),
            FieldKind::I16 => WireValue::I16(self.read_i16().await?),
            FieldKind::U32 => WireValue::U32(self.read_u32().await?),
            FieldKind::I32 => WireValue::I32(self.read_i32().await?),
            FieldKind::U64 => WireValue::U64(self.read_u64().await?),
            FieldKind::I64 => WireValue::I64(self.read_i64().await?),
            FieldKind::F32 => WireValue::F32(self.read_f32().await?),
            FieldKind::F64 => WireValue::F64(self.read_f64().await?),
            FieldKind::Str => WireValue::Str(self.read_string().await?),
            FieldKind::Bytes => WireValue::Bytes(self.read_byte_array().await?),
            FieldKind::Bool => WireValue::Bool(self.read_bool().await?),
            FieldKind::Slot => WireValue::Slot(self.read_slot().await?),
            FieldKind::Metadata => WireValue::Metadata(self.read_metadata().await?),
        })
    }

    /// Read an ordered list of fields
    pub async fn read_fields(&mut self, kinds: &[FieldKind]) -> Result<Vec<WireValue>> {
        let mut values = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            values.push(self.read_value(kind).await?);
        }
        Ok(values)
    }
}
