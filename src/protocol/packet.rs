/// Protocol version sent in the handshake (Minecraft 1.3.2)
pub const PROTOCOL_VERSION: u8 = 39;

/// Port used when the address does not carry one
pub const DEFAULT_PORT: u16 = 25565;

/// Server id meaning the server runs in offline mode
pub const OFFLINE_SERVER_ID: &str = "-";

/// Packet ids used by this client. Ids are shared between directions where
/// the protocol reuses them.
pub mod ids {
    pub const KEEP_ALIVE: u8 = 0x00;
    pub const LOGIN: u8 = 0x01;
    pub const HANDSHAKE: u8 = 0x02;
    pub const CHAT: u8 = 0x03;
    pub const TIME_UPDATE: u8 = 0x04;
    pub const ENTITY_EQUIPMENT: u8 = 0x05;
    pub const SPAWN_POSITION: u8 = 0x06;
    pub const UPDATE_HEALTH: u8 = 0x08;
    pub const RESPAWN: u8 = 0x09;
    pub const PLAYER_POSITION_LOOK: u8 = 0x0D;
    pub const USE_BED: u8 = 0x11;
    pub const ANIMATION: u8 = 0x12;
    pub const SPAWN_NAMED_ENTITY: u8 = 0x14;
    pub const SPAWN_DROPPED_ITEM: u8 = 0x15;
    pub const COLLECT_ITEM: u8 = 0x16;
    pub const SPAWN_OBJECT: u8 = 0x17;
    pub const SPAWN_MOB: u8 = 0x18;
    pub const SPAWN_PAINTING: u8 = 0x19;
    pub const SPAWN_EXPERIENCE_ORB: u8 = 0x1A;
    pub const ENTITY_VELOCITY: u8 = 0x1C;
    pub const DESTROY_ENTITY: u8 = 0x1D;
    pub const ENTITY: u8 = 0x1E;
    pub const ENTITY_RELATIVE_MOVE: u8 = 0x1F;
    pub const ENTITY_LOOK: u8 = 0x20;
    pub const ENTITY_LOOK_RELATIVE_MOVE: u8 = 0x21;
    pub const ENTITY_TELEPORT: u8 = 0x22;
    pub const ENTITY_HEAD_LOOK: u8 = 0x23;
    pub const ENTITY_STATUS: u8 = 0x26;
    pub const ATTACH_ENTITY: u8 = 0x27;
    pub const ENTITY_METADATA: u8 = 0x28;
    pub const ENTITY_EFFECT: u8 = 0x29;
    pub const REMOVE_ENTITY_EFFECT: u8 = 0x2A;
    pub const SET_EXPERIENCE: u8 = 0x2B;
    pub const MAP_COLUMN_ALLOCATION: u8 = 0x32;
    pub const MAP_CHUNKS: u8 = 0x33;
    pub const MULTI_BLOCK_CHANGE: u8 = 0x34;
    pub const BLOCK_CHANGE: u8 = 0x35;
    pub const BLOCK_ACTION: u8 = 0x36;
    pub const EXPLOSION: u8 = 0x3C;
    pub const SOUND_PARTICLE_EFFECT: u8 = 0x3D;
    pub const CHANGE_GAME_STATE: u8 = 0x46;
    pub const THUNDERBOLT: u8 = 0x47;
    pub const OPEN_WINDOW: u8 = 0x64;
    pub const CLOSE_WINDOW: u8 = 0x65;
    pub const SET_SLOT: u8 = 0x67;
    pub const SET_WINDOW_ITEMS: u8 = 0x68;
    pub const UPDATE_WINDOW_PROPERTY: u8 = 0x69;
    pub const CONFIRM_TRANSACTION: u8 = 0x6A;
    pub const CREATIVE_INVENTORY_ACTION: u8 = 0x6B;
    pub const UPDATE_SIGN: u8 = 0x82;
    pub const ITEM_DATA: u8 = 0x83;
    pub const UPDATE_TILE_ENTITY: u8 = 0x84;
    pub const INCREMENT_STATISTIC: u8 = 0xC8;
    pub const PLAYER_LIST_ITEM: u8 = 0xC9;
    pub const PLAYER_ABILITIES: u8 = 0xCA;
    pub const CLIENT_STATUSES: u8 = 0xCD;
    pub const PLUGIN_MESSAGE: u8 = 0xFA;
    pub const ENCRYPTION_RESPONSE: u8 = 0xFC;
    pub const ENCRYPTION_REQUEST: u8 = 0xFD;
    pub const SERVER_LIST_PING: u8 = 0xFE;
    pub const KICK: u8 = 0xFF;
}

/// Split "host[:port]" into its parts, defaulting the port
pub fn split_address(addr: &str) -> crate::error::Result<(String, u16)> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.ends_with(':') => {
            let port = port
                .parse::<u16>()
                .map_err(|e| crate::error::Error::Protocol(format!("invalid port {port:?}: {e}")))?;
            Ok((host.trim_matches(|c| c == '[' || c == ']').to_string(), port))
        }
        _ => Ok((addr.to_string(), DEFAULT_PORT)),
    }
}
