use std::io::Read;

use ahash::AHashMap;
use byteorder::{BigEndian, ByteOrder};
use flate2::read::ZlibDecoder;
use tracing::trace;

use crate::error::{Error, Result};

pub const CHUNKS_PER_COLUMN: usize = 16;
pub const CHUNK_CELLS: usize = 16 * 16 * 16;
pub const NIBBLE_LAYER_LEN: usize = CHUNK_CELLS / 2;
pub const BIOME_LEN: usize = 256;

/// Horizontal position of a column, in chunk units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColumnCoord {
    pub x: i32,
    pub z: i32,
}

impl ColumnCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn from_block(x: i32, z: i32) -> Self {
        Self { x: x >> 4, z: z >> 4 }
    }
}

/// Byte offset of a local cell inside a chunk
pub fn cell_offset(x: usize, y: usize, z: usize) -> usize {
    x | (z << 4) | (y << 8)
}

fn get_nibble(layer: &[u8], offset: usize) -> u8 {
    let byte = layer[offset / 2];
    if offset % 2 == 0 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}

fn set_nibble(layer: &mut [u8], offset: usize, value: u8) {
    let byte = &mut layer[offset / 2];
    if offset % 2 == 0 {
        *byte = (*byte & 0xF0) | (value & 0x0F);
    } else {
        *byte = (*byte & 0x0F) | (value << 4);
    }
}

/// A 16x16x16 volume. Each layer is `None` when the server did not send it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub block_types: Option<Vec<u8>>,
    pub block_metadata: Option<Vec<u8>>,
    pub block_light: Option<Vec<u8>>,
    pub sky_light: Option<Vec<u8>>,
    pub add_types: Option<Vec<u8>>,
}

/// Everything known about one block. Missing layers read as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    pub block_type: u8,
    pub metadata: u8,
    pub block_light: u8,
    pub sky_light: u8,
    pub add_type: u8,
}

impl Block {
    /// 12-bit block id combining the add-type nibble
    pub fn full_type(&self) -> u16 {
        ((self.add_type as u16) << 8) | self.block_type as u16
    }
}

impl Chunk {
    /// Read a cell by local coordinates (0..16 each)
    pub fn block(&self, x: usize, y: usize, z: usize) -> Block {
        let offset = cell_offset(x, y, z);
        Block {
            block_type: self.block_types.as_ref().map_or(0, |l| l[offset]),
            metadata: self.block_metadata.as_ref().map_or(0, |l| get_nibble(l, offset)),
            block_light: self.block_light.as_ref().map_or(0, |l| get_nibble(l, offset)),
            sky_light: self.sky_light.as_ref().map_or(0, |l| get_nibble(l, offset)),
            add_type: self.add_types.as_ref().map_or(0, |l| get_nibble(l, offset)),
        }
    }

    /// Write type and metadata for a cell. Creates the two layers if absent.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block_type: u8, metadata: u8) {
        let offset = cell_offset(x, y, z);
        self.block_types.get_or_insert_with(|| vec![0; CHUNK_CELLS])[offset] = block_type;
        let meta = self.block_metadata.get_or_insert_with(|| vec![0; NIBBLE_LAYER_LEN]);
        set_nibble(meta, offset, metadata);
    }

    /// Write the high nibble of a 12-bit block id. A zero nibble does not
    /// create the layer.
    pub fn set_add_type(&mut self, x: usize, y: usize, z: usize, add_type: u8) {
        let offset = cell_offset(x, y, z);
        match &mut self.add_types {
            Some(layer) => set_nibble(layer, offset, add_type),
            None if add_type != 0 => {
                let mut layer = vec![0; NIBBLE_LAYER_LEN];
                set_nibble(&mut layer, offset, add_type);
                self.add_types = Some(layer);
            }
            None => {}
        }
    }
}

/// A vertical stack of 16 chunk slots plus biome data
#[derive(Debug, Clone, Default)]
pub struct Column {
    pub chunks: [Option<Chunk>; CHUNKS_PER_COLUMN],
    pub biomes: Option<Vec<u8>>,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk(&self, cy: i32) -> Option<&Chunk> {
        usize::try_from(cy).ok()
            .and_then(|cy| self.chunks.get(cy))
            .and_then(Option::as_ref)
    }

    pub fn chunk_mut(&mut self, cy: i32) -> Option<&mut Chunk> {
        usize::try_from(cy).ok()
            .and_then(|cy| self.chunks.get_mut(cy))
            .and_then(Option::as_mut)
    }

    pub fn loaded_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks.iter().enumerate().filter_map(|(i, c)| c.as_ref().map(|_| i))
    }
}

/// Header of a map chunks packet (0x33)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDataHeader {
    pub coord: ColumnCoord,
    pub ground_up_continuous: bool,
    pub primary_bitmap: u16,
    pub add_bitmap: u16,
}

impl ChunkDataHeader {
    /// Number of decompressed bytes the header announces
    pub fn expected_len(&self) -> usize {
        let primary = self.primary_bitmap.count_ones() as usize;
        let add = self.add_bitmap.count_ones() as usize;
        let biomes = if self.ground_up_continuous { BIOME_LEN } else { 0 };
        primary * (CHUNK_CELLS + 3 * NIBBLE_LAYER_LEN) + add * NIBBLE_LAYER_LEN + biomes
    }
}

/// All columns the client currently knows about
#[derive(Debug, Clone, Default)]
pub struct World {
    columns: AHashMap<ColumnCoord, Column>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    pub fn column(&self, coord: ColumnCoord) -> Option<&Column> {
        self.columns.get(&coord)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&ColumnCoord, &Column)> {
        self.columns.iter()
    }

    /// Allocate an empty column, replacing whatever was there
    pub fn allocate_column(&mut self, coord: ColumnCoord) {
        self.columns.insert(coord, Column::new());
    }

    pub fn unload_column(&mut self, coord: ColumnCoord) -> Option<Column> {
        self.columns.remove(&coord)
    }

    pub fn get_chunk(&self, cx: i32, cy: i32, cz: i32) -> Option<&Chunk> {
        self.columns.get(&ColumnCoord::new(cx, cz))?.chunk(cy)
    }

    pub fn get_chunk_mut(&mut self, cx: i32, cy: i32, cz: i32) -> Option<&mut Chunk> {
        self.columns.get_mut(&ColumnCoord::new(cx, cz))?.chunk_mut(cy)
    }

    /// Look up a block by world coordinates; `None` if its chunk is not loaded
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<Block> {
        let chunk = self.get_chunk(x >> 4, y >> 4, z >> 4)?;
        Some(chunk.block((x & 15) as usize, (y & 15) as usize, (z & 15) as usize))
    }

    /// Apply a single block change. Returns false if the chunk is not loaded.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block_type: u8, metadata: u8) -> bool {
        match self.get_chunk_mut(x >> 4, y >> 4, z >> 4) {
            Some(chunk) => {
                chunk.set_block((x & 15) as usize, (y & 15) as usize, (z & 15) as usize, block_type, metadata);
                true
            }
            None => false,
        }
    }

    /// Apply multi-block-change records, each a big-endian u32 packed as
    /// `x:4 z:4 y:8 type:12 meta:4`. The low byte of the type goes to the
    /// block type layer and the high nibble to the add-type layer. Returns
    /// how many cells were updated.
    pub fn apply_block_records(&mut self, coord: ColumnCoord, records: &[u8]) -> usize {
        let mut applied = 0;
        for record in records.chunks_exact(4) {
            let value = BigEndian::read_u32(record);
            let lx = ((value >> 28) & 0x0F) as usize;
            let lz = ((value >> 24) & 0x0F) as usize;
            let y = ((value >> 16) & 0xFF) as i32;
            let block_type = ((value >> 4) & 0xFF) as u8;
            let add_type = ((value >> 12) & 0x0F) as u8;
            let metadata = (value & 0x0F) as u8;
            let x = coord.x * 16 + lx as i32;
            let z = coord.z * 16 + lz as i32;
            if let Some(chunk) = self.get_chunk_mut(coord.x, y >> 4, coord.z) {
                let ly = (y & 15) as usize;
                chunk.set_block(lx, ly, lz, block_type, metadata);
                chunk.set_add_type(lx, ly, lz, add_type);
                applied += 1;
            } else {
                trace!("record for unloaded chunk at ({}, {}, {})", x, y, z);
            }
        }
        applied
    }

    /// Decompress a map chunks payload into its allocated column.
    ///
    /// Layers are pulled in wire order: block types for every primary slot,
    /// then metadata, block light and sky light for every primary slot, then
    /// add types for every add slot, then biomes when ground-up continuous.
    /// Returns the number of decompressed bytes consumed.
    pub fn load_chunk_data(&mut self, header: &ChunkDataHeader, compressed: &[u8]) -> Result<usize> {
        let coord = header.coord;
        let column = self.columns.get_mut(&coord).ok_or_else(|| {
            Error::Protocol(format!(
                "chunk data for unallocated column ({}, {})",
                coord.x, coord.z
            ))
        })?;

        let mut decoder = ZlibDecoder::new(compressed);
        let mut consumed = 0;

        consumed += read_layer(&mut decoder, column, header.primary_bitmap, CHUNK_CELLS, |c| &mut c.block_types)?;
        consumed += read_layer(&mut decoder, column, header.primary_bitmap, NIBBLE_LAYER_LEN, |c| &mut c.block_metadata)?;
        consumed += read_layer(&mut decoder, column, header.primary_bitmap, NIBBLE_LAYER_LEN, |c| &mut c.block_light)?;
        consumed += read_layer(&mut decoder, column, header.primary_bitmap, NIBBLE_LAYER_LEN, |c| &mut c.sky_light)?;
        consumed += read_layer(&mut decoder, column, header.add_bitmap, NIBBLE_LAYER_LEN, |c| &mut c.add_types)?;

        if header.ground_up_continuous {
            column.biomes = Some(read_exact(&mut decoder, BIOME_LEN)?);
            consumed += BIOME_LEN;
        }

        trace!(
            "loaded column ({}, {}) slots {:016b}, {} bytes",
            coord.x, coord.z, header.primary_bitmap, consumed
        );
        Ok(consumed)
    }
}

fn read_exact(reader: &mut impl Read, len: usize) -> Result<Vec<u8>> {
    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(data)
}

fn read_layer(
    reader: &mut impl Read,
    column: &mut Column,
    bitmap: u16,
    len: usize,
    layer: fn(&mut Chunk) -> &mut Option<Vec<u8>>,
) -> Result<usize> {
    let mut consumed = 0;
    for cy in 0..CHUNKS_PER_COLUMN {
        if bitmap & (1 << cy) == 0 {
            continue;
        }
        let data = read_exact(reader, len)?;
        let chunk = column.chunks[cy].get_or_insert_with(Chunk::default);
        *layer(chunk) = Some(data);
        consumed += len;
    }
    Ok(consumed)
}
