pub mod reader;
pub mod writer;
pub mod types;

pub use reader::PacketReader;
pub use writer::{BinaryWriter, encode_packet};
pub use types::*;
