//! Receive-side packet handling.
//!
//! Unknown packet ids are skipped by consuming nothing past the id byte.
//! Packets have no length envelope, so a skipped packet with a body leaves
//! the stream misaligned; only a length-framed protocol could fix that.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

use crate::client::events::{DisconnectReason, EventHandler, GameEvent};
use crate::client::tasks::SharedSink;
use crate::codec::PacketReader;
use crate::error::Result;
use crate::protocol::message::{self, ClientboundPacket};
use crate::protocol::transport::read_packet_id;
use crate::state::{LoginInfo, ServerStatus, SharedPlayer, World};

/// What the receive loop should do after a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Kicked(String),
}

/// Change-game-state reasons
const BEGIN_RAIN: i8 = 1;
const END_RAIN: i8 = 2;
const CHANGE_GAME_MODE: i8 = 3;

/// Client-side game state mutated by incoming packets
pub struct Dispatcher {
    retain_world: bool,
    log_packets: bool,
    player: SharedPlayer,
    world: World,
    login: Option<LoginInfo>,
    status: ServerStatus,
    handler: Option<Box<dyn EventHandler>>,
}

impl Dispatcher {
    pub fn new(player: SharedPlayer, retain_world: bool, log_packets: bool) -> Self {
        Self {
            retain_world,
            log_packets,
            player,
            world: World::new(),
            login: None,
            status: ServerStatus::default(),
            handler: None,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn login(&self) -> Option<&LoginInfo> {
        self.login.as_ref()
    }

    pub fn status(&self) -> &ServerStatus {
        &self.status
    }

    pub fn set_handler(&mut self, handler: Box<dyn EventHandler>) {
        self.handler = Some(handler);
    }

    /// Reset per-connection state for a fresh join
    pub fn begin_session(&mut self, login: LoginInfo) {
        self.world.clear();
        self.status = ServerStatus::default();
        self.login = Some(login);
    }

    pub fn emit(&mut self, event: GameEvent) {
        if let Some(handler) = self.handler.as_mut() {
            handler.on_event(event);
        }
    }

    /// Read one packet off `source` and apply it
    pub async fn dispatch_next<R, W>(
        &mut self,
        source: &mut PacketReader<R>,
        sink: &SharedSink<W>,
    ) -> Result<Flow>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let id = read_packet_id(source, self.log_packets).await?;
        match ClientboundPacket::read(id, source, self.retain_world).await? {
            Some(packet) => self.apply(packet, sink).await,
            None => {
                warn!("unknown packet 0x{:02X}, skipping", id);
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn apply<W>(&mut self, packet: ClientboundPacket, sink: &SharedSink<W>) -> Result<Flow>
    where
        W: AsyncWrite + Unpin,
    {
        use ClientboundPacket as P;

        match packet {
            P::KeepAlive { id } => {
                sink.lock().await.send(&message::keep_alive(id)).await?;
            }
            P::Chat { message } => {
                self.emit(GameEvent::Chat { message });
            }
            P::TimeUpdate { world_age } => {
                self.status.world_age = world_age;
            }
            P::SpawnPosition { x, y, z } => {
                self.status.spawn = Some((x, y, z));
                self.player.lock().set_position(x as f64, y as f64, z as f64);
            }
            P::UpdateHealth { health, food, saturation } => {
                self.status.health = health;
                self.status.food = food;
                self.status.food_saturation = saturation;
                self.emit(GameEvent::HealthUpdated { health, food });
            }
            P::Respawn { dimension, difficulty, game_mode, level_type, .. } => {
                debug!("respawn in dimension {}", dimension);
                self.world.clear();
                if let Some(login) = self.login.as_mut() {
                    login.dimension = dimension as i8;
                    login.difficulty = difficulty;
                    login.game_mode = game_mode;
                    login.level_type = level_type;
                }
                self.emit(GameEvent::Respawned { dimension });
            }
            P::PlayerPositionLook { x, stance, y, z, yaw, pitch, on_ground } => {
                let echo = {
                    let mut player = self.player.lock();
                    player.x = x;
                    player.y = y;
                    player.z = z;
                    player.stance = stance;
                    player.yaw = yaw;
                    player.pitch = pitch;
                    player.on_ground = on_ground;
                    message::position_look(&player)
                };
                debug!("position corrected to ({:.1}, {:.1}, {:.1})", x, y, z);
                sink.lock().await.send(&echo).await?;
                self.emit(GameEvent::PositionCorrected { x, y, z });
            }
            P::SetExperience { bar, level, total } => {
                self.status.experience_bar = bar;
                self.status.level = level;
                self.status.total_experience = total;
            }
            P::ChangeGameState { reason, game_mode } => match reason {
                BEGIN_RAIN => self.status.raining = true,
                END_RAIN => self.status.raining = false,
                CHANGE_GAME_MODE => {
                    if let Some(login) = self.login.as_mut() {
                        login.game_mode = game_mode;
                    }
                }
                _ => {}
            },
            P::PlayerAbilities { invulnerable, flying, can_fly, instant_destroy } => {
                self.status.invulnerable = invulnerable;
                self.status.flying = flying;
                self.status.can_fly = can_fly;
                self.status.instant_destroy = instant_destroy;
            }
            P::MapColumnAllocation { coord, allocate } => {
                if self.retain_world {
                    if allocate {
                        self.world.allocate_column(coord);
                    } else {
                        self.world.unload_column(coord);
                    }
                }
            }
            P::MapChunks { header, compressed } => {
                if let Some(compressed) = compressed.filter(|_| self.retain_world) {
                    self.world.load_chunk_data(&header, &compressed)?;
                }
            }
            P::MultiBlockChange { coord, records, .. } => {
                if self.retain_world {
                    self.world.apply_block_records(coord, &records);
                }
            }
            P::BlockChange { x, y, z, block_type, metadata } => {
                if self.retain_world {
                    self.world.set_block(x, y as u8 as i32, z, block_type as u8, metadata as u8);
                }
            }
            P::PluginMessage { channel, data } => {
                self.emit(GameEvent::PluginMessage { channel, data });
            }
            P::Kick { reason } => {
                info!("kicked: {}", reason);
                self.emit(GameEvent::Disconnected {
                    reason: DisconnectReason::Kicked(reason.clone()),
                });
                return Ok(Flow::Kicked(reason));
            }
            other => {
                if self.log_packets {
                    trace!("{:?}", other);
                }
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use tokio::io::DuplexStream;

    use crate::codec::BinaryWriter;
    use crate::protocol::crypto::{DecryptingReader, StreamEncryptor};
    use crate::protocol::packet::ids;
    use crate::protocol::transport::PacketSink;
    use crate::state::{ColumnCoord, PlayerState};

    const SECRET: [u8; 16] = [5; 16];

    fn setup(retain_world: bool) -> (Dispatcher, SharedSink<DuplexStream>, PacketReader<DecryptingReader<DuplexStream>>) {
        let player = Arc::new(parking_lot::Mutex::new(PlayerState::default()));
        let mut dispatcher = Dispatcher::new(player, retain_world, false);
        dispatcher.begin_session(LoginInfo::default());
        let (client, server) = tokio::io::duplex(4096);
        let sink = Arc::new(tokio::sync::Mutex::new(PacketSink::new(
            client,
            StreamEncryptor::new(&SECRET).unwrap(),
            false,
        )));
        let reader = PacketReader::new(DecryptingReader::new(server, &SECRET).unwrap());
        (dispatcher, sink, reader)
    }

    #[tokio::test]
    async fn test_keep_alive_echo() {
        let (mut dispatcher, sink, mut server) = setup(false);
        let flow = dispatcher.apply(ClientboundPacket::KeepAlive { id: 99 }, &sink).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(server.read_u8().await.unwrap(), ids::KEEP_ALIVE);
        assert_eq!(server.read_i32().await.unwrap(), 99);
    }

    #[tokio::test]
    async fn test_position_correction_echoed_in_client_order() {
        let (mut dispatcher, sink, mut server) = setup(false);
        let packet = ClientboundPacket::PlayerPositionLook {
            x: 1.5, stance: 65.62, y: 64.0, z: -2.5, yaw: 45.0, pitch: 10.0, on_ground: true,
        };
        dispatcher.apply(packet, &sink).await.unwrap();

        let player = *dispatcher.player.lock();
        assert_eq!((player.x, player.y, player.z), (1.5, 64.0, -2.5));
        assert_eq!(player.stance, 65.62);

        assert_eq!(server.read_u8().await.unwrap(), ids::PLAYER_POSITION_LOOK);
        assert_eq!(server.read_f64().await.unwrap(), 1.5);
        assert_eq!(server.read_f64().await.unwrap(), 64.0);
        assert_eq!(server.read_f64().await.unwrap(), 65.62);
        assert_eq!(server.read_f64().await.unwrap(), -2.5);
        assert_eq!(server.read_f32().await.unwrap(), 45.0);
        assert_eq!(server.read_f32().await.unwrap(), 10.0);
        assert!(server.read_bool().await.unwrap());
    }

    #[tokio::test]
    async fn test_chat_and_kick_events() {
        let (mut dispatcher, sink, _server) = setup(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_events = seen.clone();
        dispatcher.set_handler(Box::new(move |event: GameEvent| {
            sink_events.lock().unwrap().push(event);
        }));

        dispatcher.apply(ClientboundPacket::Chat { message: "§ehi".into() }, &sink).await.unwrap();
        let flow = dispatcher.apply(ClientboundPacket::Kick { reason: "bye".into() }, &sink).await.unwrap();
        assert_eq!(flow, Flow::Kicked("bye".into()));

        let events = seen.lock().unwrap();
        assert_eq!(events[0], GameEvent::Chat { message: "§ehi".into() });
        assert_eq!(
            events[1],
            GameEvent::Disconnected { reason: DisconnectReason::Kicked("bye".into()) }
        );
    }

    #[tokio::test]
    async fn test_world_retention() {
        let (mut dispatcher, sink, _server) = setup(true);
        let coord = ColumnCoord::new(0, 0);
        dispatcher
            .apply(ClientboundPacket::MapColumnAllocation { coord, allocate: true }, &sink)
            .await
            .unwrap();
        assert!(dispatcher.world().column(coord).is_some());

        dispatcher
            .apply(ClientboundPacket::MapColumnAllocation { coord, allocate: false }, &sink)
            .await
            .unwrap();
        assert!(dispatcher.world().is_empty());
    }

    #[tokio::test]
    async fn test_world_ignored_without_retention() {
        let (mut dispatcher, sink, _server) = setup(false);
        let coord = ColumnCoord::new(3, 4);
        dispatcher
            .apply(ClientboundPacket::MapColumnAllocation { coord, allocate: true }, &sink)
            .await
            .unwrap();
        assert!(dispatcher.world().is_empty());
    }

    #[tokio::test]
    async fn test_status_updates() {
        let (mut dispatcher, sink, _server) = setup(false);
        dispatcher.apply(ClientboundPacket::TimeUpdate { world_age: 6000 }, &sink).await.unwrap();
        dispatcher
            .apply(ClientboundPacket::SpawnPosition { x: 10, y: 64, z: -20 }, &sink)
            .await
            .unwrap();
        dispatcher
            .apply(ClientboundPacket::ChangeGameState { reason: 1, game_mode: 0 }, &sink)
            .await
            .unwrap();
        dispatcher
            .apply(ClientboundPacket::ChangeGameState { reason: 3, game_mode: 1 }, &sink)
            .await
            .unwrap();

        assert_eq!(dispatcher.status().world_age, 6000);
        assert_eq!(dispatcher.status().spawn, Some((10, 64, -20)));
        assert!(dispatcher.status().raining);
        assert_eq!(dispatcher.login().unwrap().game_mode, 1);
        assert_eq!(dispatcher.player.lock().x, 10.0);
    }

    #[tokio::test]
    async fn test_dispatch_next_skips_unknown() {
        let (mut dispatcher, sink, _server) = setup(false);
        let mut w = BinaryWriter::new();
        w.write_u8(0x3E);
        w.write_u8(ids::TIME_UPDATE);
        w.write_i64(42);
        let data = w.into_vec();
        let mut source = PacketReader::new(data.as_slice());

        assert_eq!(dispatcher.dispatch_next(&mut source, &sink).await.unwrap(), Flow::Continue);
        assert_eq!(dispatcher.dispatch_next(&mut source, &sink).await.unwrap(), Flow::Continue);
        assert_eq!(dispatcher.status().world_age, 42);
    }
}
