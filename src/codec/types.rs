use std::collections::BTreeMap;

/// Item ids whose slot encoding carries an extra NBT payload
/// (tools, weapons, armor, fishing rod, shears, books).
const NBT_ITEM_RANGES: &[(i16, i16)] = &[
    (256, 259),
    (261, 261),
    (267, 279),
    (283, 286),
    (290, 294),
    (298, 317),
    (346, 346),
    (359, 359),
];

/// An inventory item stack as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slot {
    pub id: i16,
    pub count: i8,
    pub damage: i16,
    /// Raw (gzipped NBT) payload; empty when absent
    pub data: Vec<u8>,
}

impl Slot {
    pub const EMPTY_ID: i16 = -1;

    pub fn empty() -> Self {
        Self {
            id: Self::EMPTY_ID,
            ..Default::default()
        }
    }

    pub fn new(id: i16, count: i8, damage: i16) -> Self {
        Self {
            id,
            count,
            damage,
            data: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == Self::EMPTY_ID
    }

    /// Whether this item id carries the extra length-prefixed payload
    pub fn has_extra_data(&self) -> bool {
        item_has_extra_data(self.id)
    }
}

pub fn item_has_extra_data(id: i16) -> bool {
    NBT_ITEM_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&id))
}

/// Integer block position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// One value inside an entity metadata block.
/// The type is selected by the high three bits of the tag byte.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Float(f32),
    Str(String),
    /// id/count/damage only; metadata slots never carry a payload
    Slot(Slot),
    Position(Position),
}

impl MetadataValue {
    pub const END_TAG: u8 = 127;

    pub fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => 0,
            Self::Short(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Str(_) => 4,
            Self::Slot(_) => 5,
            Self::Position(_) => 6,
        }
    }
}

/// Entity metadata keyed by the low five bits of each tag
pub type EntityMetadata = BTreeMap<u8, MetadataValue>;

/// The kinds of field a packet body can be made of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Str,
    Bytes,
    Bool,
    Slot,
    Metadata,
}

/// A typed wire value. Packets are ordered sequences of these.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Slot(Slot),
    /// Decode-only; the client never sends metadata blocks
    Metadata(EntityMetadata),
}

impl WireValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::U8(_) => FieldKind::U8,
            Self::I8(_) => FieldKind::I8,
            Self::U16(_) => FieldKind::U16,
            Self::I16(_) => FieldKind::I16,
            Self::U32(_) => FieldKind::U32,
            Self::I32(_) => FieldKind::I32,
            Self::U64(_) => FieldKind::U64,
            Self::I64(_) => FieldKind::I64,
            Self::F32(_) => FieldKind::F32,
            Self::F64(_) => FieldKind::F64,
            Self::Str(_) => FieldKind::Str,
            Self::Bytes(_) => FieldKind::Bytes,
            Self::Bool(_) => FieldKind::Bool,
            Self::Slot(_) => FieldKind::Slot,
            Self::Metadata(_) => FieldKind::Metadata,
        }
    }
}

macro_rules! wire_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for WireValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

wire_from! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Str,
    Vec<u8> => Bytes,
    bool => Bool,
    Slot => Slot,
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<&[u8]> for WireValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

/// An outbound packet: one id byte followed by ordered fields
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub id: u8,
    pub fields: Vec<WireValue>,
}

impl Packet {
    pub fn new(id: u8) -> Self {
        Self { id, fields: Vec::new() }
    }

    pub fn field(mut self, value: impl Into<WireValue>) -> Self {
        self.fields.push(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_data_whitelist() {
        assert!(item_has_extra_data(256));
        assert!(item_has_extra_data(261));
        assert!(item_has_extra_data(317));
        assert!(item_has_extra_data(359));
        assert!(!item_has_extra_data(260));
        assert!(!item_has_extra_data(1));
        assert!(!item_has_extra_data(-1));
    }

    #[test]
    fn test_packet_builder() {
        let packet = Packet::new(0x03).field("hi").field(5i32).field(true);
        assert_eq!(packet.fields.len(), 3);
        assert_eq!(packet.fields[0].kind(), FieldKind::Str);
        assert_eq!(packet.fields[1], WireValue::I32(5));
    }
}
