pub mod player;
pub mod world;

pub use player::{LoginInfo, PlayerState, ServerStatus, SharedPlayer};
pub use world::{
    Block, Chunk, ChunkDataHeader, Column, ColumnCoord, World,
    cell_offset,
};
