//! Packet bodies for protocol 39.
//!
//! Clientbound packets decode straight off the stream into [`ClientboundPacket`].
//! Serverbound packets are built as [`Packet`] field lists.

use tokio::io::AsyncRead;

use crate::codec::{EntityMetadata, Packet, PacketReader, Slot};
use crate::error::{Error, Result};
use crate::protocol::packet::{ids, PROTOCOL_VERSION};
use crate::state::{ChunkDataHeader, ColumnCoord, LoginInfo, PlayerState};

/// Encryption key request (0xFD)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionRequest {
    pub server_id: String,
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl EncryptionRequest {
    pub async fn read<R: AsyncRead + Unpin>(r: &mut PacketReader<R>) -> Result<Self> {
        Ok(Self {
            server_id: r.read_string().await?,
            public_key: r.read_byte_array().await?,
            verify_token: r.read_byte_array().await?,
        })
    }
}

/// Login success (0x01)
pub async fn read_login<R: AsyncRead + Unpin>(r: &mut PacketReader<R>) -> Result<LoginInfo> {
    let entity_id = r.read_i32().await?;
    let level_type = r.read_string().await?;
    let game_mode = r.read_i8().await?;
    let dimension = r.read_i8().await?;
    let difficulty = r.read_i8().await?;
    let _unused = r.read_u8().await?;
    let max_players = r.read_u8().await?;
    Ok(LoginInfo {
        entity_id,
        level_type,
        game_mode,
        dimension,
        difficulty,
        max_players,
    })
}

/// Packets the client understands while playing
#[derive(Debug, Clone, PartialEq)]
pub enum ClientboundPacket {
    KeepAlive { id: i32 },
    Chat { message: String },
    TimeUpdate { world_age: i64 },
    EntityEquipment { entity_id: i32, slot: i16, item_id: i16, damage: i16 },
    SpawnPosition { x: i32, y: i32, z: i32 },
    UpdateHealth { health: i16, food: i16, saturation: f32 },
    Respawn { dimension: i32, difficulty: i8, game_mode: i8, world_height: i16, level_type: String },
    PlayerPositionLook { x: f64, stance: f64, y: f64, z: f64, yaw: f32, pitch: f32, on_ground: bool },
    UseBed { entity_id: i32, x: i32, y: i8, z: i32 },
    Animation { entity_id: i32, animation: i8 },
    SpawnNamedEntity { entity_id: i32, name: String, x: i32, y: i32, z: i32, yaw: i8, pitch: i8, current_item: i16 },
    SpawnDroppedItem { entity_id: i32, item: Slot, x: i32, y: i32, z: i32, rotation: i8, pitch: i8, roll: i8 },
    CollectItem { collected_id: i32, collector_id: i32 },
    SpawnObject { entity_id: i32, kind: i8, x: i32, y: i32, z: i32, thrower_id: i32, speed: Option<(i16, i16, i16)> },
    SpawnMob { entity_id: i32, kind: i8, x: i32, y: i32, z: i32, yaw: i8, pitch: i8, head_yaw: i8, metadata: EntityMetadata },
    SpawnPainting { entity_id: i32, title: String, x: i32, y: i32, z: i32, direction: i32 },
    SpawnExperienceOrb { entity_id: i32, x: i32, y: i32, z: i32, count: i16 },
    EntityVelocity { entity_id: i32, vx: i16, vy: i16, vz: i16 },
    DestroyEntity { entity_id: i32 },
    Entity { entity_id: i32 },
    EntityRelativeMove { entity_id: i32, dx: i8, dy: i8, dz: i8 },
    EntityLook { entity_id: i32, yaw: i8, pitch: i8 },
    EntityLookRelativeMove { entity_id: i32, dx: i8, dy: i8, dz: i8, yaw: i8, pitch: i8 },
    EntityTeleport { entity_id: i32, x: i32, y: i32, z: i32, yaw: i8, pitch: i8 },
    EntityHeadLook { entity_id: i32, head_yaw: i8 },
    EntityStatus { entity_id: i32, status: i8 },
    AttachEntity { entity_id: i32, vehicle_id: i32 },
    EntityMetadata { entity_id: i32, metadata: EntityMetadata },
    EntityEffect { entity_id: i32, effect_id: i8, amplifier: i8, duration: i16 },
    RemoveEntityEffect { entity_id: i32, effect_id: i8 },
    SetExperience { bar: f32, level: i16, total: i16 },
    MapColumnAllocation { coord: ColumnCoord, allocate: bool },
    /// `compressed` is `None` when the payload was skipped on the wire
    MapChunks { header: ChunkDataHeader, compressed: Option<Vec<u8>> },
    MultiBlockChange { coord: ColumnCoord, record_count: i16, records: Vec<u8> },
    BlockChange { x: i32, y: i8, z: i32, block_type: i8, metadata: i8 },
    BlockAction { x: i32, y: i16, z: i32, byte1: i8, byte2: i8 },
    Explosion { x: f64, y: f64, z: f64, radius: f32, records: Vec<(i8, i8, i8)> },
    SoundParticleEffect { effect_id: i32, x: i32, y: i8, z: i32, data: i32 },
    ChangeGameState { reason: i8, game_mode: i8 },
    Thunderbolt { entity_id: i32, x: i32, y: i32, z: i32 },
    OpenWindow { window_id: i8, inventory_type: i8, title: String, slot_count: i8 },
    CloseWindow { window_id: i8 },
    SetSlot { window_id: i8, slot: i16, item: Slot },
    SetWindowItems { window_id: i8, items: Vec<Slot> },
    UpdateWindowProperty { window_id: i8, property: i16, value: i16 },
    ConfirmTransaction { window_id: i8, action: i16, accepted: bool },
    CreativeInventoryAction { slot: i16, item: Slot },
    UpdateSign { x: i32, y: i16, z: i32, lines: [String; 4] },
    ItemData { item_type: i16, item_id: i16, data: Vec<u8> },
    UpdateTileEntity { x: i32, y: i16, z: i32, action: i8, custom: [i32; 3] },
    IncrementStatistic { statistic_id: i32, amount: i8 },
    PlayerListItem { name: String, online: bool, ping: i16 },
    PlayerAbilities { invulnerable: bool, flying: bool, can_fly: bool, instant_destroy: bool },
    PluginMessage { channel: String, data: Vec<u8> },
    Kick { reason: String },
}

impl ClientboundPacket {
    /// Decode the body for `id`. Returns `Ok(None)` for ids without a decoder;
    /// in that case nothing past the id has been consumed.
    ///
    /// Chunk payloads are only buffered when `retain_world` is set.
    pub async fn read<R: AsyncRead + Unpin>(
        id: u8,
        r: &mut PacketReader<R>,
        retain_world: bool,
    ) -> Result<Option<Self>> {
        let packet = match id {
            ids::KEEP_ALIVE => Self::KeepAlive { id: r.read_i32().await? },
            ids::CHAT => Self::Chat { message: r.read_string().await? },
            ids::TIME_UPDATE => Self::TimeUpdate { world_age: r.read_i64().await? },
            ids::ENTITY_EQUIPMENT => Self::EntityEquipment {
                entity_id: r.read_i32().await?,
                slot: r.read_i16().await?,
                item_id: r.read_i16().await?,
                damage: r.read_i16().await?,
            },
            ids::SPAWN_POSITION => Self::SpawnPosition {
                x: r.read_i32().await?,
                y: r.read_i32().await?,
                z: r.read_i32().await?,
            },
            ids::UPDATE_HEALTH => Self::UpdateHealth {
                health: r.read_i16().await?,
                food: r.read_i16().await?,
                saturation: r.read_f32().await?,
            },
            ids::RESPAWN => Self::Respawn {
                dimension: r.read_i32().await?,
                difficulty: r.read_i8().await?,
                game_mode: r.read_i8().await?,
                world_height: r.read_i16().await?,
                level_type: r.read_string().await?,
            },
            ids::PLAYER_POSITION_LOOK => Self::PlayerPositionLook {
                x: r.read_f64().await?,
                stance: r.read_f64().await?,
                y: r.read_f64().await?,
                z: r.read_f64().await?,
                yaw: r.read_f32().await?,
                pitch: r.read_f32().await?,
                on_ground: r.read_bool().await?,
            },
            ids::USE_BED => {
                let entity_id = r.read_i32().await?;
                let _unknown = r.read_i8().await?;
                Self::UseBed {
                    entity_id,
                    x: r.read_i32().await?,
                    y: r.read_i8().await?,
                    z: r.read_i32().await?,
                }
            }
            ids::ANIMATION => Self::Animation {
                entity_id: r.read_i32().await?,
                animation: r.read_i8().await?,
            },
            ids::SPAWN_NAMED_ENTITY => Self::SpawnNamedEntity {
                entity_id: r.read_i32().await?,
                name: r.read_string().await?,
                x: r.read_i32().await?,
                y: r.read_i32().await?,
                z: r.read_i32().await?,
                yaw: r.read_i8().await?,
                pitch: r.read_i8().await?,
                current_item: r.read_i16().await?,
            },
            ids::SPAWN_DROPPED_ITEM => {
                let entity_id = r.read_i32().await?;
                let id = r.read_i16().await?;
                let count = r.read_i8().await?;
                let damage = r.read_i16().await?;
                Self::SpawnDroppedItem {
                    entity_id,
                    item: Slot::new(id, count, damage),
                    x: r.read_i32().await?,
                    y: r.read_i32().await?,
                    z: r.read_i32().await?,
                    rotation: r.read_i8().await?,
                    pitch: r.read_i8().await?,
                    roll: r.read_i8().await?,
                }
            }
            ids::COLLECT_ITEM => Self::CollectItem {
                collected_id: r.read_i32().await?,
                collector_id: r.read_i32().await?,
            },
            ids::SPAWN_OBJECT => {
                let entity_id = r.read_i32().await?;
                let kind = r.read_i8().await?;
                let x = r.read_i32().await?;
                let y = r.read_i32().await?;
                let z = r.read_i32().await?;
                let thrower_id = r.read_i32().await?;
                // Velocity only follows when there is a thrower
                let speed = if thrower_id != 0 {
                    Some((r.read_i16().await?, r.read_i16().await?, r.read_i16().await?))
                } else {
                    None
                };
                Self::SpawnObject { entity_id, kind, x, y, z, thrower_id, speed }
            }
            ids::SPAWN_MOB => Self::SpawnMob {
                entity_id: r.read_i32().await?,
                kind: r.read_i8().await?,
                x: r.read_i32().await?,
                y: r.read_i32().await?,
                z: r.read_i32().await?,
                yaw: r.read_i8().await?,
                pitch: r.read_i8().await?,
                head_yaw: r.read_i8().await?,
                metadata: r.read_metadata().await?,
            },
            ids::SPAWN_PAINTING => Self::SpawnPainting {
                entity_id: r.read_i32().await?,
                title: r.read_string().await?,
                x: r.read_i32().await?,
                y: r.read_i32().await?,
                z: r.read_i32().await?,
                direction: r.read_i32().await?,
            },
            ids::SPAWN_EXPERIENCE_ORB => Self::SpawnExperienceOrb {
                entity_id: r.read_i32().await?,
                x: r.read_i32().await?,
                y: r.read_i32().await?,
                z: r.read_i32().await?,
                count: r.read_i16().await?,
            },
            ids::ENTITY_VELOCITY => Self::EntityVelocity {
                entity_id: r.read_i32().await?,
                vx: r.read_i16().await?,
                vy: r.read_i16().await?,
                vz: r.read_i16().await?,
            },
            ids::DESTROY_ENTITY => Self::DestroyEntity { entity_id: r.read_i32().await? },
            ids::ENTITY => Self::Entity { entity_id: r.read_i32().await? },
            ids::ENTITY_RELATIVE_MOVE => Self::EntityRelativeMove {
                entity_id: r.read_i32().await?,
                dx: r.read_i8().await?,
                dy: r.read_i8().await?,
                dz: r.read_i8().await?,
            },
            ids::ENTITY_LOOK => Self::EntityLook {
                entity_id: r.read_i32().await?,
                yaw: r.read_i8().await?,
                pitch: r.read_i8().await?,
            },
            ids::ENTITY_LOOK_RELATIVE_MOVE => Self::EntityLookRelativeMove {
                entity_id: r.read_i32().await?,
                dx: r.read_i8().await?,
                dy: r.read_i8().await?,
                dz: r.read_i8().await?,
                yaw: r.read_i8().await?,
                pitch: r.read_i8().await?,
            },
            ids::ENTITY_TELEPORT => Self::EntityTeleport {
                entity_id: r.read_i32().await?,
                x: r.read_i32().await?,
                y: r.read_i32().await?,
                z: r.read_i32().await?,
                yaw: r.read_i8().await?,
                pitch: r.read_i8().await?,
            },
            ids::ENTITY_HEAD_LOOK => Self::EntityHeadLook {
                entity_id: r.read_i32().await?,
                head_yaw: r.read_i8().await?,
            },
            ids::ENTITY_STATUS => Self::EntityStatus {
                entity_id: r.read_i32().await?,
                status: r.read_i8().await?,
            },
            ids::ATTACH_ENTITY => Self::AttachEntity {
                entity_id: r.read_i32().await?,
                vehicle_id: r.read_i32().await?,
            },
            ids::ENTITY_METADATA => Self::EntityMetadata {
                entity_id: r.read_i32().await?,
                metadata: r.read_metadata().await?,
            },
            ids::ENTITY_EFFECT => Self::EntityEffect {
                entity_id: r.read_i32().await?,
                effect_id: r.read_i8().await?,
                amplifier: r.read_i8().await?,
                duration: r.read_i16().await?,
            },
            ids::REMOVE_ENTITY_EFFECT => Self::RemoveEntityEffect {
                entity_id: r.read_i32().await?,
                effect_id: r.read_i8().await?,
            },
            ids::SET_EXPERIENCE => Self::SetExperience {
                bar: r.read_f32().await?,
                level: r.read_i16().await?,
                total: r.read_i16().await?,
            },
            ids::MAP_COLUMN_ALLOCATION => Self::MapColumnAllocation {
                coord: ColumnCoord::new(r.read_i32().await?, r.read_i32().await?),
                allocate: r.read_bool().await?,
            },
            ids::MAP_CHUNKS => {
                let coord = ColumnCoord::new(r.read_i32().await?, r.read_i32().await?);
                let header = ChunkDataHeader {
                    coord,
                    ground_up_continuous: r.read_bool().await?,
                    primary_bitmap: r.read_u16().await?,
                    add_bitmap: r.read_u16().await?,
                };
                let size = non_negative(r.read_i32().await?, "compressed chunk size")?;
                let compressed = if retain_world {
                    Some(r.read_exact_bytes(size).await?)
                } else {
                    r.skip(size as u64).await?;
                    None
                };
                Self::MapChunks { header, compressed }
            }
            ids::MULTI_BLOCK_CHANGE => {
                let coord = ColumnCoord::new(r.read_i32().await?, r.read_i32().await?);
                let record_count = r.read_i16().await?;
                let size = non_negative(r.read_i32().await?, "block record size")?;
                Self::MultiBlockChange { coord, record_count, records: r.read_exact_bytes(size).await? }
            }
            ids::BLOCK_CHANGE => Self::BlockChange {
                x: r.read_i32().await?,
                y: r.read_i8().await?,
                z: r.read_i32().await?,
                block_type: r.read_i8().await?,
                metadata: r.read_i8().await?,
            },
            ids::BLOCK_ACTION => Self::BlockAction {
                x: r.read_i32().await?,
                y: r.read_i16().await?,
                z: r.read_i32().await?,
                byte1: r.read_i8().await?,
                byte2: r.read_i8().await?,
            },
            ids::EXPLOSION => {
                let x = r.read_f64().await?;
                let y = r.read_f64().await?;
                let z = r.read_f64().await?;
                let radius = r.read_f32().await?;
                let count = non_negative(r.read_i32().await?, "explosion record count")?;
                let mut records = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    records.push((r.read_i8().await?, r.read_i8().await?, r.read_i8().await?));
                }
                Self::Explosion { x, y, z, radius, records }
            }
            ids::SOUND_PARTICLE_EFFECT => Self::SoundParticleEffect {
                effect_id: r.read_i32().await?,
                x: r.read_i32().await?,
                y: r.read_i8().await?,
                z: r.read_i32().await?,
                data: r.read_i32().await?,
            },
            ids::CHANGE_GAME_STATE => Self::ChangeGameState {
                reason: r.read_i8().await?,
                game_mode: r.read_i8().await?,
            },
            ids::THUNDERBOLT => {
                let entity_id = r.read_i32().await?;
                let _unknown = r.read_bool().await?;
                Self::Thunderbolt {
                    entity_id,
                    x: r.read_i32().await?,
                    y: r.read_i32().await?,
                    z: r.read_i32().await?,
                }
            }
            ids::OPEN_WINDOW => Self::OpenWindow {
                window_id: r.read_i8().await?,
                inventory_type: r.read_i8().await?,
                title: r.read_string().await?,
                slot_count: r.read_i8().await?,
            },
            ids::CLOSE_WINDOW => Self::CloseWindow { window_id: r.read_i8().await? },
            ids::SET_SLOT => Self::SetSlot {
                window_id: r.read_i8().await?,
                slot: r.read_i16().await?,
                item: r.read_slot().await?,
            },
            ids::SET_WINDOW_ITEMS => {
                let window_id = r.read_i8().await?;
                let count = non_negative(r.read_i16().await? as i32, "window item count")?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(r.read_slot().await?);
                }
                Self::SetWindowItems { window_id, items }
            }
            ids::UPDATE_WINDOW_PROPERTY => Self::UpdateWindowProperty {
                window_id: r.read_i8().await?,
                property: r.read_i16().await?,
                value: r.read_i16().await?,
            },
            ids::CONFIRM_TRANSACTION => Self::ConfirmTransaction {
                window_id: r.read_i8().await?,
                action: r.read_i16().await?,
                accepted: r.read_bool().await?,
            },
            ids::CREATIVE_INVENTORY_ACTION => Self::CreativeInventoryAction {
                slot: r.read_i16().await?,
                item: r.read_slot().await?,
            },
            ids::UPDATE_SIGN => Self::UpdateSign {
                x: r.read_i32().await?,
                y: r.read_i16().await?,
                z: r.read_i32().await?,
                lines: [
                    r.read_string().await?,
                    r.read_string().await?,
                    r.read_string().await?,
                    r.read_string().await?,
                ],
            },
            ids::ITEM_DATA => {
                let item_type = r.read_i16().await?;
                let item_id = r.read_i16().await?;
                let len = r.read_u8().await? as usize;
                Self::ItemData { item_type, item_id, data: r.read_exact_bytes(len).await? }
            }
            ids::UPDATE_TILE_ENTITY => Self::UpdateTileEntity {
                x: r.read_i32().await?,
                y: r.read_i16().await?,
                z: r.read_i32().await?,
                action: r.read_i8().await?,
                custom: [r.read_i32().await?, r.read_i32().await?, r.read_i32().await?],
            },
            ids::INCREMENT_STATISTIC => Self::IncrementStatistic {
                statistic_id: r.read_i32().await?,
                amount: r.read_i8().await?,
            },
            ids::PLAYER_LIST_ITEM => Self::PlayerListItem {
                name: r.read_string().await?,
                online: r.read_bool().await?,
                ping: r.read_i16().await?,
            },
            ids::PLAYER_ABILITIES => Self::PlayerAbilities {
                invulnerable: r.read_bool().await?,
                flying: r.read_bool().await?,
                can_fly: r.read_bool().await?,
                instant_destroy: r.read_bool().await?,
            },
            ids::PLUGIN_MESSAGE => {
                let channel = r.read_string().await?;
                let len = non_negative(r.read_i16().await? as i32, "plugin message length")?;
                Self::PluginMessage { channel, data: r.read_exact_bytes(len).await? }
            }
            ids::KICK => Self::Kick { reason: r.read_string().await? },
            _ => return Ok(None),
        };
        Ok(Some(packet))
    }
}

fn non_negative(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::Protocol(format!("negative {what}: {value}")))
}

/// Handshake (0x02)
pub fn handshake(username: &str, host: &str, port: u16) -> Packet {
    Packet::new(ids::HANDSHAKE)
        .field(PROTOCOL_VERSION)
        .field(username)
        .field(host)
        .field(port as i32)
}

/// Encryption response (0xFC): encrypted shared secret then encrypted token
pub fn encryption_response(encrypted_secret: Vec<u8>, encrypted_token: Vec<u8>) -> Packet {
    Packet::new(ids::ENCRYPTION_RESPONSE)
        .field(encrypted_secret)
        .field(encrypted_token)
}

/// Client statuses (0xCD) with payload 0: ready to log in
pub fn login_intent() -> Packet {
    Packet::new(ids::CLIENT_STATUSES).field(0u8)
}

pub fn chat(message: &str) -> Packet {
    Packet::new(ids::CHAT).field(message)
}

pub fn keep_alive(id: i32) -> Packet {
    Packet::new(ids::KEEP_ALIVE).field(id)
}

/// Player position and look (0x0D) in client field order
pub fn position_look(player: &PlayerState) -> Packet {
    Packet::new(ids::PLAYER_POSITION_LOOK)
        .field(player.x)
        .field(player.y)
        .field(player.stance)
        .field(player.z)
        .field(player.yaw)
        .field(player.pitch)
        .field(player.on_ground)
}

pub fn disconnect(reason: &str) -> Packet {
    Packet::new(ids::KICK).field(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_packet, BinaryWriter, MetadataValue};

    async fn decode(id: u8, body: &[u8]) -> Option<ClientboundPacket> {
        let mut reader = PacketReader::new(body);
        let packet = ClientboundPacket::read(id, &mut reader, true).await.unwrap();
        // every decoder must consume its whole body
        assert!(reader.read_u8().await.is_err(), "trailing bytes after 0x{id:02X}");
        packet
    }

    #[tokio::test]
    async fn test_position_look_order() {
        let mut w = BinaryWriter::new();
        for v in [1.0, 65.62, 64.0, 3.0] {
            w.write_f64(v);
        }
        w.write_f32(90.0);
        w.write_f32(0.0);
        w.write_bool(true);

        let packet = decode(ids::PLAYER_POSITION_LOOK, w.as_slice()).await.unwrap();
        assert_eq!(
            packet,
            ClientboundPacket::PlayerPositionLook {
                x: 1.0, stance: 65.62, y: 64.0, z: 3.0, yaw: 90.0, pitch: 0.0, on_ground: true,
            }
        );
    }

    #[tokio::test]
    async fn test_spawn_object_without_thrower() {
        let mut w = BinaryWriter::new();
        w.write_i32(7);
        w.write_i8(10);
        w.write_i32(1);
        w.write_i32(2);
        w.write_i32(3);
        w.write_i32(0);
        let packet = decode(ids::SPAWN_OBJECT, w.as_slice()).await.unwrap();
        assert!(matches!(packet, ClientboundPacket::SpawnObject { speed: None, .. }));
    }

    #[tokio::test]
    async fn test_spawn_object_with_thrower() {
        let mut w = BinaryWriter::new();
        w.write_i32(7);
        w.write_i8(10);
        w.write_i32(1);
        w.write_i32(2);
        w.write_i32(3);
        w.write_i32(42);
        w.write_i16(-1);
        w.write_i16(0);
        w.write_i16(1);
        let packet = decode(ids::SPAWN_OBJECT, w.as_slice()).await.unwrap();
        assert!(matches!(packet, ClientboundPacket::SpawnObject { speed: Some((-1, 0, 1)), .. }));
    }

    #[tokio::test]
    async fn test_spawn_mob_metadata() {
        let mut w = BinaryWriter::new();
        w.write_i32(5);
        w.write_i8(50);
        w.write_i32(0);
        w.write_i32(64);
        w.write_i32(0);
        w.write_i8(0);
        w.write_i8(0);
        w.write_i8(0);
        w.write_u8(0x23);
        w.write_i16(7);
        w.write_u8(0x7F);
        match decode(ids::SPAWN_MOB, w.as_slice()).await.unwrap() {
            ClientboundPacket::SpawnMob { kind, metadata, .. } => {
                assert_eq!(kind, 50);
                assert_eq!(metadata.get(&3), Some(&MetadataValue::Short(7)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_window_items() {
        let mut w = BinaryWriter::new();
        w.write_i8(0);
        w.write_i16(3);
        w.write_slot(&Slot::empty());
        w.write_slot(&Slot::new(1, 64, 0));
        w.write_slot(&Slot::new(278, 1, 5));
        match decode(ids::SET_WINDOW_ITEMS, w.as_slice()).await.unwrap() {
            ClientboundPacket::SetWindowItems { items, .. } => {
                assert_eq!(items.len(), 3);
                assert!(items[0].is_empty());
                assert_eq!(items[2].damage, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_map_chunks_header() {
        let mut w = BinaryWriter::new();
        w.write_i32(-2);
        w.write_i32(5);
        w.write_bool(true);
        w.write_u16(0x0001);
        w.write_u16(0);
        w.write_i32(3);
        w.write_bytes(&[1, 2, 3]);
        match decode(ids::MAP_CHUNKS, w.as_slice()).await.unwrap() {
            ClientboundPacket::MapChunks { header, compressed } => {
                assert_eq!(header.coord, ColumnCoord::new(-2, 5));
                assert!(header.ground_up_continuous);
                assert_eq!(header.primary_bitmap, 1);
                assert_eq!(compressed, Some(vec![1, 2, 3]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_map_chunks_skipped_without_world() {
        let mut w = BinaryWriter::new();
        w.write_i32(0);
        w.write_i32(0);
        w.write_bool(false);
        w.write_u16(0x0003);
        w.write_u16(0);
        w.write_i32(4);
        w.write_bytes(&[9, 9, 9, 9]);
        w.write_u8(ids::KEEP_ALIVE);
        let mut reader = PacketReader::new(w.as_slice());
        match ClientboundPacket::read(ids::MAP_CHUNKS, &mut reader, false).await.unwrap() {
            Some(ClientboundPacket::MapChunks { header, compressed }) => {
                assert_eq!(header.primary_bitmap, 3);
                assert!(compressed.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(reader.read_u8().await.unwrap(), ids::KEEP_ALIVE);

        // A short payload is still an error
        let mut w = BinaryWriter::new();
        w.write_i32(0);
        w.write_i32(0);
        w.write_bool(false);
        w.write_u16(1);
        w.write_u16(0);
        w.write_i32(100);
        w.write_bytes(&[1, 2]);
        let mut reader = PacketReader::new(w.as_slice());
        assert!(ClientboundPacket::read(ids::MAP_CHUNKS, &mut reader, false).await.is_err());
    }

    #[tokio::test]
    async fn test_plugin_message() {
        let mut w = BinaryWriter::new();
        w.write_string("MC|TPack");
        w.write_i16(2);
        w.write_bytes(b"ok");
        assert_eq!(
            decode(ids::PLUGIN_MESSAGE, w.as_slice()).await.unwrap(),
            ClientboundPacket::PluginMessage { channel: "MC|TPack".into(), data: b"ok".to_vec() }
        );
    }

    #[tokio::test]
    async fn test_explosion_records() {
        let mut w = BinaryWriter::new();
        w.write_f64(0.5);
        w.write_f64(64.0);
        w.write_f64(-0.5);
        w.write_f32(3.0);
        w.write_i32(2);
        w.write_bytes(&[1, 2, 3, 0xFF, 0xFE, 0xFD]);
        match decode(ids::EXPLOSION, w.as_slice()).await.unwrap() {
            ClientboundPacket::Explosion { records, .. } => {
                assert_eq!(records, vec![(1, 2, 3), (-1, -2, -3)]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_id_consumes_nothing() {
        let data: &[u8] = &[0xAB];
        let mut reader = PacketReader::new(data);
        assert!(ClientboundPacket::read(0x3E, &mut reader, true).await.unwrap().is_none());
        assert_eq!(reader.read_u8().await.unwrap(), 0xAB);
    }

    #[tokio::test]
    async fn test_login_info() {
        let mut w = BinaryWriter::new();
        w.write_i32(1234);
        w.write_string("default");
        w.write_i8(1);
        w.write_i8(-1);
        w.write_i8(2);
        w.write_u8(0);
        w.write_u8(20);
        let data = w.into_vec();
        let mut reader = PacketReader::new(data.as_slice());
        let info = read_login(&mut reader).await.unwrap();
        assert_eq!(info.entity_id, 1234);
        assert_eq!(info.level_type, "default");
        assert_eq!(info.dimension, -1);
        assert_eq!(info.max_players, 20);
    }

    #[test]
    fn test_position_look_client_order() {
        let mut player = PlayerState::default();
        player.set_position(1.0, 64.0, 3.0);
        let data = encode_packet(&position_look(&player)).unwrap();
        assert_eq!(data.len(), 1 + 8 * 4 + 4 * 2 + 1);
        assert_eq!(data[0], ids::PLAYER_POSITION_LOOK);
        // y precedes stance on the way out
        assert_eq!(&data[9..17], &64.0f64.to_be_bytes());
    }

    #[test]
    fn test_handshake_layout() {
        let data = encode_packet(&handshake("bob", "h", 25565)).unwrap();
        assert_eq!(
            data,
            vec![0x02, 39, 0, 3, 0, b'b', 0, b'o', 0, b'b', 0, 1, 0, b'h', 0, 0, 0x63, 0xDD]
        );
    }
}
