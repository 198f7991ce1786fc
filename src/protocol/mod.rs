pub mod crypto;
pub mod message;
pub mod packet;
pub mod status;
pub mod transport;

pub use message::{ClientboundPacket, EncryptionRequest};
pub use packet::{ids, split_address, DEFAULT_PORT, OFFLINE_SERVER_ID, PROTOCOL_VERSION};
pub use status::{ping, ServerListing};
pub use transport::{PacketSink, PacketSource, PlainTransport};
