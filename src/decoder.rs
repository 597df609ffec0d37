use std::fs::File;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::callback::{RenderCallback, WayText};
use crate::errors::{FileOpenResult, MapFileError};
use crate::header::{MapFileHeader, MapFileInfo, SubFileParameter};
use crate::index_cache::IndexCache;
use crate::mercator::MercatorProjection;
use crate::query_parameters::QueryParameters;
use crate::reader::{ReadBuffer, MAXIMUM_BUFFER_SIZE};
use crate::tile::Tile;
use crate::types::{LatLongUtils, Tag};

/// Bitmask to extract the block offset from an index entry.
const BITMASK_INDEX_OFFSET: u64 = 0x7f_ffff_ffff;

/// Bitmask to extract the water information from an index entry.
const BITMASK_INDEX_WATER: u64 = 0x80_0000_0000;

/// Amount of chunks the block index cache stores.
const INDEX_CACHE_SIZE: usize = 64;

/// Maximum way nodes sequence length which is considered as valid.
const MAXIMUM_WAY_NODES_SEQUENCE_LENGTH: usize = 8192;

/// Maximum number of map objects in the zoom table which is considered as
/// valid.
const MAXIMUM_ZOOM_TABLE_OBJECTS: i32 = 65536;

/// Capacity of the shared way node output buffer.
const WAY_NODES_BUFFER_LENGTH: usize = 100_000;

/// The layer nibble of a flag byte is biased so that negative layers can
/// be stored: raw values 0..15 map to layers -5..+10.
const LAYER_BIAS: i8 = 5;
const LAYER_BITMASK: u8 = 0xf0;
const LAYER_SHIFT: u8 = 4;

const POI_FEATURE_ELEVATION: u8 = 0x20;
const POI_FEATURE_HOUSE_NUMBER: u8 = 0x40;
const POI_FEATURE_NAME: u8 = 0x80;
const POI_NUMBER_OF_TAGS_BITMASK: u8 = 0x0f;

const SIGNATURE_LENGTH_BLOCK: usize = 32;
const SIGNATURE_LENGTH_POI: usize = 32;
const SIGNATURE_LENGTH_WAY: usize = 32;

const TAG_KEY_ELE: &str = "ele";
const TAG_KEY_HOUSE_NUMBER: &str = "addr:housenumber";
const TAG_KEY_NAME: &str = "name";

const WAY_FEATURE_DATA_BLOCKS_BYTE: u8 = 0x08;
const WAY_FEATURE_DOUBLE_DELTA_ENCODING: u8 = 0x04;
const WAY_FEATURE_HOUSE_NUMBER: u8 = 0x40;
const WAY_FEATURE_LABEL_POSITION: u8 = 0x10;
const WAY_FEATURE_NAME: u8 = 0x80;
const WAY_FEATURE_REF: u8 = 0x20;
const WAY_NUMBER_OF_TAGS_BITMASK: u8 = 0x0f;

const INVALID_FIRST_WAY_OFFSET: &str = "invalid first way offset: ";

fn extract_layer(special_byte: u8) -> i8 {
    ((special_byte & LAYER_BITMASK) >> LAYER_SHIFT) as i8 - LAYER_BIAS
}

/// A decoder for tile-oriented binary map files.
///
/// One instance serves one caller at a time; callers that want
/// concurrency open the same file through several decoders.
pub struct MapDecoder {
    state: Option<DecoderState>,
    water_background: bool,
    min_lat: i32,
    min_lon: i32,
}

impl Default for MapDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapDecoder {
    pub fn new() -> Self {
        Self {
            state: None,
            water_background: false,
            min_lat: 0,
            min_lon: 0,
        }
    }

    /// Opens a map file and reads its header. Any previously opened file
    /// is closed first.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> FileOpenResult {
        self.close_file();

        match DecoderState::open(path.as_ref()) {
            Ok(state) => {
                self.state = Some(state);
                FileOpenResult::Success
            }
            Err(e) => FileOpenResult::Failure(e.to_string()),
        }
    }

    /// Closes the current map file, if any. Idempotent.
    pub fn close_file(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.index_cache.destroy();
        }
    }

    pub fn has_open_file(&self) -> bool {
        self.state.is_some()
    }

    pub fn get_map_file_info(&self) -> Result<&MapFileInfo, MapFileError> {
        self.state
            .as_ref()
            .map(|state| state.header.map_file_info())
            .ok_or_else(|| MapFileError::new("no map file is currently opened"))
    }

    /// Enables synthesizing a water background: when every block visited
    /// by a query carries the water flag, `render_water_background` fires
    /// on the callback.
    pub fn set_water_background(&mut self, enabled: bool) {
        self.water_background = enabled;
    }

    /// Sets the micro-degree thresholds below which intermediate way nodes
    /// are dropped. Zero (the default) keeps every node; the first and
    /// last node of a coordinate block are always kept.
    pub fn set_node_filter(&mut self, min_latitude: i32, min_longitude: i32) {
        self.min_lat = min_latitude.max(0);
        self.min_lon = min_longitude.max(0);
    }

    /// Decodes all map objects covering `tile` and delivers them to the
    /// callback. Errors are logged; the query terminates early but the
    /// file stays open.
    pub fn execute_query(&mut self, tile: &Tile, callback: &mut dyn RenderCallback) {
        let water_background = self.water_background;
        let thresholds = (self.min_lat, self.min_lon);

        let Some(state) = self.state.as_mut() else {
            warn!("no map file is currently opened");
            return;
        };

        if let Err(e) = state.execute_query(tile, water_background, thresholds, callback) {
            error!("query for tile {:?} failed: {}", tile, e);
        }
    }

    /// Resolves a string reference against the string pool of the most
    /// recently decoded block. References are only meaningful for the way
    /// sequence they were delivered with.
    pub fn read_string(&mut self, position: u32) -> Result<String, MapFileError> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| MapFileError::new("no map file is currently opened"))?;
        let offset = state.scratch.string_offset + position as usize;
        state.read_buffer.read_utf8_encoded_string_at(offset)
    }
}

/// Everything that exists while a file is open.
struct DecoderState {
    header: MapFileHeader,
    read_buffer: ReadBuffer<File>,
    index_cache: IndexCache<File>,
    file_size: i64,
    scratch: QueryScratch,
}

impl DecoderState {
    fn open(path: &Path) -> Result<DecoderState, MapFileError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| MapFileError::new(format!("cannot read file {}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(MapFileError::new(format!("not a file: {}", path.display())));
        }

        let file = File::open(path)?;
        let file_size = metadata.len() as i64;

        let mut read_buffer = ReadBuffer::new(file.try_clone()?);
        let header = MapFileHeader::read(&mut read_buffer, file_size)?;
        let index_cache = IndexCache::new(file, INDEX_CACHE_SIZE);

        info!(file_size, path = %path.display(), "map file opened");

        Ok(DecoderState {
            header,
            read_buffer,
            index_cache,
            file_size,
            scratch: QueryScratch::new(),
        })
    }

    fn execute_query(
        &mut self,
        tile: &Tile,
        water_background: bool,
        thresholds: (i32, i32),
        callback: &mut dyn RenderCallback,
    ) -> Result<(), MapFileError> {
        self.scratch.prepare(thresholds);

        let mut query_parameters = QueryParameters::new();
        query_parameters.query_zoom_level = self.header.get_query_zoom_level(tile.zoom_level);

        let Some(sub_file_parameter) = self
            .header
            .get_sub_file_parameter(query_parameters.query_zoom_level)
        else {
            warn!(
                "no sub-file for zoom level: {}",
                query_parameters.query_zoom_level
            );
            return Ok(());
        };
        let sub_file_parameter = sub_file_parameter.clone();

        query_parameters.calculate_base_tiles(tile, &sub_file_parameter);
        query_parameters.calculate_blocks(&sub_file_parameter);

        self.process_blocks(
            &query_parameters,
            &sub_file_parameter,
            water_background,
            callback,
        )
    }

    fn process_blocks(
        &mut self,
        query_parameters: &QueryParameters,
        sub_file_parameter: &SubFileParameter,
        water_background: bool,
        callback: &mut dyn RenderCallback,
    ) -> Result<(), MapFileError> {
        let mut query_is_water = true;
        let mut query_read_water_info = false;

        // read and process all blocks from top to bottom and from left to
        // right
        for row in query_parameters.from_block_y..=query_parameters.to_block_y {
            for column in query_parameters.from_block_x..=query_parameters.to_block_x {
                let block_number = row * sub_file_parameter.blocks_width + column;

                let current_block_index_entry = self
                    .index_cache
                    .get_index_entry(sub_file_parameter, block_number)?;

                if query_is_water {
                    query_is_water &= current_block_index_entry & BITMASK_INDEX_WATER != 0;
                    query_read_water_info = true;
                }

                let current_block_pointer =
                    (current_block_index_entry & BITMASK_INDEX_OFFSET) as i64;
                if current_block_pointer < 1
                    || current_block_pointer > sub_file_parameter.sub_file_size
                {
                    return Err(MapFileError::new(format!(
                        "invalid current block pointer: {}",
                        current_block_pointer
                    )));
                }

                let next_block_pointer = if block_number + 1 == sub_file_parameter.number_of_blocks
                {
                    // the current block is the last block in the sub-file
                    sub_file_parameter.sub_file_size
                } else {
                    let next_entry = self
                        .index_cache
                        .get_index_entry(sub_file_parameter, block_number + 1)?;
                    let next_pointer = (next_entry & BITMASK_INDEX_OFFSET) as i64;
                    if next_pointer < 1 || next_pointer > sub_file_parameter.sub_file_size {
                        return Err(MapFileError::new(format!(
                            "invalid next block pointer: {}",
                            next_pointer
                        )));
                    }
                    next_pointer
                };

                let current_block_size = next_block_pointer - current_block_pointer;
                if current_block_size < 0 {
                    return Err(MapFileError::new(format!(
                        "current block size must not be negative: {}",
                        current_block_size
                    )));
                }
                if current_block_size == 0 {
                    // the current block is empty
                    continue;
                }
                if current_block_size as usize > MAXIMUM_BUFFER_SIZE {
                    warn!(block_number, current_block_size, "block too large, skipped");
                    continue;
                }
                if current_block_pointer + current_block_size > self.file_size {
                    return Err(MapFileError::new(format!(
                        "block extends beyond end of file: {}",
                        current_block_pointer + current_block_size
                    )));
                }

                let block_offset = (sub_file_parameter.start_address + current_block_pointer) as u64;
                if !self
                    .read_buffer
                    .read_from_file_at_offset(block_offset, current_block_size as usize)?
                {
                    return Err(MapFileError::new(format!(
                        "reading block of size {} has failed",
                        current_block_size
                    )));
                }

                // the top-left coordinates of the underlying base tile
                let tile_latitude_deg = MercatorProjection::tile_y_to_latitude(
                    sub_file_parameter.boundary_tile_top + row,
                    sub_file_parameter.base_zoom_level,
                );
                let tile_longitude_deg = MercatorProjection::tile_x_to_longitude(
                    sub_file_parameter.boundary_tile_left + column,
                    sub_file_parameter.base_zoom_level,
                );
                self.scratch.tile_latitude =
                    LatLongUtils::degrees_to_microdegrees(tile_latitude_deg);
                self.scratch.tile_longitude =
                    LatLongUtils::degrees_to_microdegrees(tile_longitude_deg);

                let map_file_info = self.header.map_file_info();
                if let Err(e) = self.scratch.process_block(
                    &mut self.read_buffer,
                    map_file_info,
                    query_parameters,
                    sub_file_parameter,
                    callback,
                ) {
                    // a malformed block must not take the query down
                    warn!(block_number, "skipping block: {}", e);
                }
            }
        }

        if water_background && query_is_water && query_read_water_info {
            debug!("all blocks of the query are water");
            callback.render_water_background();
        }

        Ok(())
    }
}

/// Per-query working set: scratch buffers reused across blocks so the hot
/// path does not allocate.
struct QueryScratch {
    tile_latitude: i32,
    tile_longitude: i32,
    min_lat: i32,
    min_lon: i32,
    int_buffer: Vec<i32>,
    way_nodes: Vec<f32>,
    way_node_position: usize,
    way_lengths: Vec<i32>,
    zoom_table: Vec<(i32, i32)>,
    poi_tags: Vec<Tag>,
    way_tags: Vec<Tag>,
    string_offset: usize,
}

impl QueryScratch {
    fn new() -> Self {
        Self {
            tile_latitude: 0,
            tile_longitude: 0,
            min_lat: 0,
            min_lon: 0,
            int_buffer: Vec::new(),
            way_nodes: vec![0.0; WAY_NODES_BUFFER_LENGTH],
            way_node_position: 0,
            way_lengths: Vec::new(),
            zoom_table: Vec::new(),
            poi_tags: Vec::new(),
            way_tags: Vec::new(),
            string_offset: 0,
        }
    }

    fn prepare(&mut self, (min_lat, min_lon): (i32, i32)) {
        if self.int_buffer.is_empty() {
            self.int_buffer = vec![0; MAXIMUM_WAY_NODES_SEQUENCE_LENGTH * 2];
        }
        self.way_node_position = 0;
        self.min_lat = min_lat;
        self.min_lon = min_lon;
    }

    fn process_block(
        &mut self,
        read_buffer: &mut ReadBuffer<File>,
        map_file_info: &MapFileInfo,
        query_parameters: &QueryParameters,
        sub_file_parameter: &SubFileParameter,
        callback: &mut dyn RenderCallback,
    ) -> Result<(), MapFileError> {
        if map_file_info.debug_file {
            let signature_block =
                read_buffer.read_utf8_encoded_string_with_length(SIGNATURE_LENGTH_BLOCK)?;
            if !signature_block.starts_with("###TileStart") {
                return Err(MapFileError::new(format!(
                    "invalid block signature: {}",
                    signature_block
                )));
            }
        }

        self.read_zoom_table(read_buffer, sub_file_parameter)?;
        let zoom_table_row = query_parameters
            .query_zoom_level
            .checked_sub(sub_file_parameter.zoom_level_min)
            .map(usize::from)
            .and_then(|row| self.zoom_table.get(row))
            .ok_or_else(|| MapFileError::new("query zoom level outside zoom table"))?;
        let (pois_on_query_zoom_level, ways_on_query_zoom_level) = *zoom_table_row;

        // the offset to the first stored way, relative to the position
        // after this field
        let first_way_offset =
            read_buffer.read_unsigned_int()? as usize + read_buffer.buffer_position();
        if first_way_offset > read_buffer.buffer_size() {
            return Err(MapFileError::new(format!(
                "{}{}",
                INVALID_FIRST_WAY_OFFSET, first_way_offset
            )));
        }

        self.process_pois(
            read_buffer,
            &map_file_info.poi_tags,
            map_file_info.debug_file,
            pois_on_query_zoom_level as usize,
            callback,
        )?;

        // finished reading POIs, the cursor must not have overrun the ways
        if read_buffer.buffer_position() > first_way_offset {
            return Err(MapFileError::new(format!(
                "invalid buffer position: {}",
                read_buffer.buffer_position()
            )));
        }

        read_buffer.set_buffer_position(first_way_offset);
        self.process_ways(
            read_buffer,
            &map_file_info.way_tags,
            map_file_info.debug_file,
            query_parameters,
            ways_on_query_zoom_level,
            callback,
        )
    }

    fn read_zoom_table(
        &mut self,
        read_buffer: &mut ReadBuffer<File>,
        sub_file_parameter: &SubFileParameter,
    ) -> Result<(), MapFileError> {
        let rows =
            (sub_file_parameter.zoom_level_max - sub_file_parameter.zoom_level_min) as usize + 1;
        self.zoom_table.clear();

        let mut cumulated_number_of_pois: i32 = 0;
        let mut cumulated_number_of_ways: i32 = 0;

        for row in 0..rows {
            cumulated_number_of_pois =
                cumulated_number_of_pois.wrapping_add(read_buffer.read_unsigned_int()? as i32);
            cumulated_number_of_ways =
                cumulated_number_of_ways.wrapping_add(read_buffer.read_unsigned_int()? as i32);

            if cumulated_number_of_pois < 0 || cumulated_number_of_pois > MAXIMUM_ZOOM_TABLE_OBJECTS
            {
                return Err(MapFileError::new(format!(
                    "invalid cumulated number of POIs in row {}: {}",
                    row, cumulated_number_of_pois
                )));
            }
            if cumulated_number_of_ways < 0 || cumulated_number_of_ways > MAXIMUM_ZOOM_TABLE_OBJECTS
            {
                return Err(MapFileError::new(format!(
                    "invalid cumulated number of ways in row {}: {}",
                    row, cumulated_number_of_ways
                )));
            }

            self.zoom_table
                .push((cumulated_number_of_pois, cumulated_number_of_ways));
        }

        Ok(())
    }

    fn process_pois(
        &mut self,
        read_buffer: &mut ReadBuffer<File>,
        poi_tag_table: &[Tag],
        debug_file: bool,
        number_of_pois: usize,
        callback: &mut dyn RenderCallback,
    ) -> Result<(), MapFileError> {
        for _ in 0..number_of_pois {
            if debug_file {
                let signature_poi =
                    read_buffer.read_utf8_encoded_string_with_length(SIGNATURE_LENGTH_POI)?;
                if !signature_poi.starts_with("***POIStart") {
                    return Err(MapFileError::new(format!(
                        "invalid POI signature: {}",
                        signature_poi
                    )));
                }
            }

            // position as offsets from the tile origin (VBE-S)
            let latitude = self.tile_latitude.wrapping_add(read_buffer.read_signed_int()?);
            let longitude = self
                .tile_longitude
                .wrapping_add(read_buffer.read_signed_int()?);

            let special_byte = read_buffer.read_byte()?;
            let layer = extract_layer(special_byte);
            let number_of_tags = special_byte & POI_NUMBER_OF_TAGS_BITMASK;
            read_buffer.read_tags(&mut self.poi_tags, poi_tag_table, number_of_tags)?;

            let feature_byte = read_buffer.read_byte()?;

            if feature_byte & POI_FEATURE_NAME != 0 {
                self.poi_tags
                    .push(Tag::new(TAG_KEY_NAME, read_buffer.read_utf8_encoded_string()?));
            }
            if feature_byte & POI_FEATURE_HOUSE_NUMBER != 0 {
                self.poi_tags.push(Tag::new(
                    TAG_KEY_HOUSE_NUMBER,
                    read_buffer.read_utf8_encoded_string()?,
                ));
            }
            if feature_byte & POI_FEATURE_ELEVATION != 0 {
                self.poi_tags
                    .push(Tag::new(TAG_KEY_ELE, read_buffer.read_signed_int()?.to_string()));
            }

            callback.render_point_of_interest(layer, latitude, longitude, &self.poi_tags);
        }

        Ok(())
    }

    fn process_ways(
        &mut self,
        read_buffer: &mut ReadBuffer<File>,
        way_tag_table: &[Tag],
        debug_file: bool,
        query_parameters: &QueryParameters,
        number_of_ways: i32,
        callback: &mut dyn RenderCallback,
    ) -> Result<(), MapFileError> {
        // the way sequence starts with its string pool
        let strings_size = read_buffer.read_unsigned_int()? as usize;
        self.string_offset = read_buffer.buffer_position();
        if self.string_offset + strings_size > read_buffer.buffer_size() {
            return Err(MapFileError::new(format!(
                "invalid way string pool size: {}",
                strings_size
            )));
        }
        read_buffer.skip_bytes(strings_size);
        let pool_range = self.string_offset..self.string_offset + strings_size;

        self.way_tags.clear();
        let mut remaining = number_of_ways;

        while remaining > 0 {
            if debug_file {
                let signature_way =
                    read_buffer.read_utf8_encoded_string_with_length(SIGNATURE_LENGTH_WAY)?;
                if !signature_way.starts_with("---WayStart") {
                    return Err(MapFileError::new(format!(
                        "invalid way signature: {}",
                        signature_way
                    )));
                }
            }

            let mut tags_changed = false;

            if query_parameters.use_tile_bitmask {
                remaining =
                    read_buffer.skip_ways(query_parameters.query_tile_bitmask, remaining)?;
                if remaining == 0 {
                    return Ok(());
                }

                // replay the tags of the last skipped way so consecutive
                // ways can share one decoded tag array
                if let Some(tag_position) = read_buffer.last_tag_position() {
                    let way_position = read_buffer.buffer_position();
                    read_buffer.set_buffer_position(tag_position);

                    let number_of_tags = read_buffer.read_byte()? & WAY_NUMBER_OF_TAGS_BITMASK;
                    read_buffer.read_tags(&mut self.way_tags, way_tag_table, number_of_tags)?;
                    tags_changed = true;

                    read_buffer.set_buffer_position(way_position);
                }
            } else {
                let way_data_size = read_buffer.read_unsigned_int()? as usize;
                if read_buffer.buffer_position() + way_data_size > read_buffer.buffer_size() {
                    return Err(MapFileError::new(format!(
                        "invalid way data size: {}",
                        way_data_size
                    )));
                }
                // the way tile bitmask is irrelevant without a query bitmask
                read_buffer.skip_bytes(2);
            }

            let special_byte = read_buffer.read_byte()?;
            let layer = extract_layer(special_byte);
            let number_of_tags = special_byte & WAY_NUMBER_OF_TAGS_BITMASK;
            if number_of_tags != 0 {
                read_buffer.read_tags(&mut self.way_tags, way_tag_table, number_of_tags)?;
                tags_changed = true;
            }

            let feature_byte = read_buffer.read_byte()?;
            let double_delta_encoding = feature_byte & WAY_FEATURE_DOUBLE_DELTA_ENCODING != 0;

            let name = if feature_byte & WAY_FEATURE_NAME != 0 {
                Some(read_buffer.read_unsigned_int()?)
            } else {
                None
            };
            let house_number = if feature_byte & WAY_FEATURE_HOUSE_NUMBER != 0 {
                Some(read_buffer.read_unsigned_int()?)
            } else {
                None
            };
            let reference = if feature_byte & WAY_FEATURE_REF != 0 {
                Some(read_buffer.read_unsigned_int()?)
            } else {
                None
            };

            let label_position = if feature_byte & WAY_FEATURE_LABEL_POSITION != 0 {
                let latitude = self.tile_latitude.wrapping_add(read_buffer.read_signed_int()?);
                let longitude = self
                    .tile_longitude
                    .wrapping_add(read_buffer.read_signed_int()?);
                Some((latitude, longitude))
            } else {
                None
            };

            let way_data_blocks = if feature_byte & WAY_FEATURE_DATA_BLOCKS_BYTE != 0 {
                read_buffer.read_unsigned_int()?
            } else {
                1
            };
            if way_data_blocks < 1 {
                return Err(MapFileError::new(format!(
                    "invalid number of way data blocks: {}",
                    way_data_blocks
                )));
            }

            for _ in 0..way_data_blocks {
                self.process_way_data_block(read_buffer, double_delta_encoding)?;

                let text = WayText::new(
                    &read_buffer.buffer()[pool_range.clone()],
                    name,
                    house_number,
                    reference,
                    label_position,
                );
                callback.render_way(
                    layer,
                    &self.way_tags,
                    &self.way_nodes[..self.way_node_position],
                    &self.way_lengths,
                    &text,
                    tags_changed,
                );
            }

            remaining -= 1;
        }

        Ok(())
    }

    fn process_way_data_block(
        &mut self,
        read_buffer: &mut ReadBuffer<File>,
        double_delta_encoding: bool,
    ) -> Result<(), MapFileError> {
        let number_of_coordinate_blocks = read_buffer.read_unsigned_int()?;
        if number_of_coordinate_blocks < 1 || number_of_coordinate_blocks > i16::MAX as u32 {
            return Err(MapFileError::new(format!(
                "invalid number of way coordinate blocks: {}",
                number_of_coordinate_blocks
            )));
        }

        self.way_lengths.clear();
        self.way_node_position = 0;

        for _ in 0..number_of_coordinate_blocks {
            let number_of_way_nodes = read_buffer.read_unsigned_int()? as usize;
            if !(2..=MAXIMUM_WAY_NODES_SEQUENCE_LENGTH).contains(&number_of_way_nodes) {
                return Err(MapFileError::new(format!(
                    "invalid number of way nodes: {}",
                    number_of_way_nodes
                )));
            }

            // each way node consists of a latitude and a longitude delta
            let length = number_of_way_nodes * 2;
            if self.way_node_position + length > self.way_nodes.len() {
                return Err(MapFileError::new("way node buffer exhausted"));
            }

            read_buffer.read_signed_ints(&mut self.int_buffer[..length])?;

            let output_length = if double_delta_encoding {
                self.decode_way_nodes_double_delta(length)
            } else {
                self.decode_way_nodes_single_delta(length)
            };
            self.way_lengths.push(output_length as i32);
        }

        Ok(())
    }

    fn decode_way_nodes_single_delta(&mut self, length: usize) -> usize {
        let mut float_pos = self.way_node_position;

        let mut way_node_latitude = self.tile_latitude.wrapping_add(self.int_buffer[0]);
        let mut way_node_longitude = self.tile_longitude.wrapping_add(self.int_buffer[1]);

        self.way_nodes[float_pos] = way_node_longitude as f32;
        self.way_nodes[float_pos + 1] = way_node_latitude as f32;
        float_pos += 2;
        let mut count = 2;

        let mut pos = 2;
        while pos < length {
            let delta_latitude = self.int_buffer[pos];
            let delta_longitude = self.int_buffer[pos + 1];
            way_node_latitude = way_node_latitude.wrapping_add(delta_latitude);
            way_node_longitude = way_node_longitude.wrapping_add(delta_longitude);

            if delta_latitude.unsigned_abs() >= self.min_lat as u32
                || delta_longitude.unsigned_abs() >= self.min_lon as u32
                || pos == length - 2
            {
                self.way_nodes[float_pos] = way_node_longitude as f32;
                self.way_nodes[float_pos + 1] = way_node_latitude as f32;
                float_pos += 2;
                count += 2;
            }
            pos += 2;
        }

        self.way_node_position = float_pos;
        count
    }

    fn decode_way_nodes_double_delta(&mut self, length: usize) -> usize {
        let mut float_pos = self.way_node_position;

        let mut way_node_latitude = self.tile_latitude.wrapping_add(self.int_buffer[0]);
        let mut way_node_longitude = self.tile_longitude.wrapping_add(self.int_buffer[1]);

        self.way_nodes[float_pos] = way_node_longitude as f32;
        self.way_nodes[float_pos + 1] = way_node_latitude as f32;
        float_pos += 2;
        let mut count = 2;

        let mut single_delta_latitude: i32 = 0;
        let mut single_delta_longitude: i32 = 0;

        let mut pos = 2;
        while pos < length {
            // the stored values are offsets to the previous deltas
            single_delta_latitude = single_delta_latitude.wrapping_add(self.int_buffer[pos]);
            single_delta_longitude = single_delta_longitude.wrapping_add(self.int_buffer[pos + 1]);
            way_node_latitude = way_node_latitude.wrapping_add(single_delta_latitude);
            way_node_longitude = way_node_longitude.wrapping_add(single_delta_longitude);

            if single_delta_latitude.unsigned_abs() >= self.min_lat as u32
                || single_delta_longitude.unsigned_abs() >= self.min_lon as u32
                || pos == length - 2
            {
                self.way_nodes[float_pos] = way_node_longitude as f32;
                self.way_nodes[float_pos + 1] = way_node_latitude as f32;
                float_pos += 2;
                count += 2;
            }
            pos += 2;
        }

        self.way_node_position = float_pos;
        count
    }
}
