//! Minecraft Client API
//!
//! A Rust library for joining protocol 39 (Minecraft 1.3.2) servers, keeping
//! track of the player and the surrounding world, and chatting
//! programmatically.

pub mod client;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod state;

pub use client::{
    ansi_escapes, strip_escapes, Client, ClientBuilder, ClientConfig, ConnectionState,
    DisconnectReason, EventHandler, GameEvent, HttpSessionService, OfflineSessionService, Session,
    SessionService,
};
pub use codec::{EntityMetadata, MetadataValue, Packet, Slot, WireValue};
pub use error::{Error, Result};
pub use protocol::{ping, ServerListing};
pub use state::{Block, Chunk, ColumnCoord, LoginInfo, PlayerState, ServerStatus, World};
