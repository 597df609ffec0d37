use std::io::{Read, Seek};

use tracing::warn;

use crate::errors::MapFileError;
use crate::mercator::MercatorProjection;
use crate::reader::ReadBuffer;
use crate::types::{BoundingBox, LatLong, Tag};

const BINARY_OSM_MAGIC_BYTE: &str = "mapsforge binary OSM";
const HEADER_SIZE_MIN: i32 = 70;
const HEADER_SIZE_MAX: i32 = 1_000_000;
const SUPPORTED_FILE_VERSION_MIN: i32 = 3;
const SUPPORTED_FILE_VERSION_MAX: i32 = 5;
const MERCATOR: &str = "Mercator";

const BASE_ZOOM_LEVEL_MAX: u8 = 20;
const ZOOM_LEVEL_MAX_ALLOWED: u8 = 22;

/// Length of the debug signature in front of a sub-file index.
const SIGNATURE_LENGTH_INDEX: i64 = 16;

// optional-field flags
const HEADER_BITMASK_DEBUG: u8 = 0x80;
const HEADER_BITMASK_START_POSITION: u8 = 0x40;
const HEADER_BITMASK_START_ZOOM_LEVEL: u8 = 0x20;
const HEADER_BITMASK_LANGUAGES_PREFERENCE: u8 = 0x10;
const HEADER_BITMASK_COMMENT: u8 = 0x08;
const HEADER_BITMASK_CREATED_BY: u8 = 0x04;

/// Derived parameters of one sub-file: the contiguous byte region holding
/// all blocks of one base zoom level. Tile coordinates are given in the
/// sub-file's base zoom grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubFileParameter {
    pub base_zoom_level: u8,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
    pub start_address: i64,
    pub sub_file_size: i64,
    pub index_start_address: i64,
    pub index_end_address: i64,
    pub boundary_tile_top: i64,
    pub boundary_tile_left: i64,
    pub boundary_tile_bottom: i64,
    pub boundary_tile_right: i64,
    pub blocks_width: i64,
    pub blocks_height: i64,
    pub number_of_blocks: i64,
}

impl SubFileParameter {
    pub const BYTES_PER_INDEX_ENTRY: usize = 5;
}

#[derive(Debug, Default)]
pub struct SubFileParameterBuilder {
    pub base_zoom_level: u8,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
    pub start_address: i64,
    pub sub_file_size: i64,
    pub index_start_address: i64,
    pub bounding_box: Option<BoundingBox>,
}

impl SubFileParameterBuilder {
    pub fn build(self) -> Result<SubFileParameter, MapFileError> {
        let bounding_box = self
            .bounding_box
            .ok_or_else(|| MapFileError::new("bounding box is required"))?;

        let boundary_tile_top =
            MercatorProjection::latitude_to_tile_y(bounding_box.max_latitude, self.base_zoom_level);
        let boundary_tile_left = MercatorProjection::longitude_to_tile_x(
            bounding_box.min_longitude,
            self.base_zoom_level,
        );
        let boundary_tile_bottom =
            MercatorProjection::latitude_to_tile_y(bounding_box.min_latitude, self.base_zoom_level);
        let boundary_tile_right = MercatorProjection::longitude_to_tile_x(
            bounding_box.max_longitude,
            self.base_zoom_level,
        );

        let blocks_width = boundary_tile_right - boundary_tile_left + 1;
        let blocks_height = boundary_tile_bottom - boundary_tile_top + 1;
        let number_of_blocks = blocks_width * blocks_height;

        let index_end_address = self.index_start_address
            + number_of_blocks * SubFileParameter::BYTES_PER_INDEX_ENTRY as i64;

        Ok(SubFileParameter {
            base_zoom_level: self.base_zoom_level,
            zoom_level_min: self.zoom_level_min,
            zoom_level_max: self.zoom_level_max,
            start_address: self.start_address,
            sub_file_size: self.sub_file_size,
            index_start_address: self.index_start_address,
            index_end_address,
            boundary_tile_top,
            boundary_tile_left,
            boundary_tile_bottom,
            boundary_tile_right,
            blocks_width,
            blocks_height,
            number_of_blocks,
        })
    }
}

/// Metadata of an open map file, assembled from the file header.
#[derive(Debug)]
pub struct MapFileInfo {
    pub bounding_box: BoundingBox,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub debug_file: bool,
    pub file_size: i64,
    pub file_version: i32,
    pub languages_preference: Option<String>,
    pub map_date: i64,
    pub number_of_sub_files: u8,
    pub poi_tags: Vec<Tag>,
    pub projection_name: String,
    pub start_position: Option<LatLong>,
    pub start_zoom_level: Option<u8>,
    pub tile_pixel_size: i32,
    pub way_tags: Vec<Tag>,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
}

impl MapFileInfo {
    /// The position a map view should start at, falling back to the center
    /// of the bounding box.
    pub fn start_or_center_position(&self) -> LatLong {
        self.start_position
            .clone()
            .unwrap_or_else(|| self.bounding_box.center_point())
    }

    pub fn map_languages(&self) -> Option<Vec<String>> {
        self.languages_preference
            .as_ref()
            .map(|languages| languages.split(',').map(str::to_string).collect())
    }
}

#[derive(Debug, Default)]
struct OptionalFields {
    comment: Option<String>,
    created_by: Option<String>,
    debug_file: bool,
    languages_preference: Option<String>,
    start_position: Option<LatLong>,
    start_zoom_level: Option<u8>,
}

impl OptionalFields {
    fn read<R: Read + Seek>(read_buffer: &mut ReadBuffer<R>) -> Result<Self, MapFileError> {
        let flags = read_buffer.read_byte()?;
        let mut fields = OptionalFields {
            debug_file: flags & HEADER_BITMASK_DEBUG != 0,
            ..OptionalFields::default()
        };

        if flags & HEADER_BITMASK_START_POSITION != 0 {
            let latitude = read_buffer.read_int()? as f64 / 1_000_000.0;
            let longitude = read_buffer.read_int()? as f64 / 1_000_000.0;
            fields.start_position = Some(LatLong::new(latitude, longitude));
        }

        if flags & HEADER_BITMASK_START_ZOOM_LEVEL != 0 {
            let start_zoom_level = read_buffer.read_byte()?;
            if start_zoom_level > ZOOM_LEVEL_MAX_ALLOWED {
                return Err(MapFileError::new(format!(
                    "invalid map start zoom level: {}",
                    start_zoom_level
                )));
            }
            fields.start_zoom_level = Some(start_zoom_level);
        }

        if flags & HEADER_BITMASK_LANGUAGES_PREFERENCE != 0 {
            fields.languages_preference = Some(read_buffer.read_utf8_encoded_string()?);
        }

        if flags & HEADER_BITMASK_COMMENT != 0 {
            fields.comment = Some(read_buffer.read_utf8_encoded_string()?);
        }

        if flags & HEADER_BITMASK_CREATED_BY != 0 {
            fields.created_by = Some(read_buffer.read_utf8_encoded_string()?);
        }

        Ok(fields)
    }
}

/// Parsed map file header: the file-wide metadata plus a per-zoom lookup
/// of sub-file parameters.
pub struct MapFileHeader {
    map_file_info: MapFileInfo,
    sub_file_parameters: Vec<Option<SubFileParameter>>,
    zoom_level_minimum: u8,
    zoom_level_maximum: u8,
}

impl MapFileHeader {
    /// Reads and validates the complete header from the start of the file.
    pub fn read<R: Read + Seek>(
        read_buffer: &mut ReadBuffer<R>,
        file_size: i64,
    ) -> Result<MapFileHeader, MapFileError> {
        read_magic_byte(read_buffer)?;
        read_remaining_header(read_buffer)?;

        let file_version = read_file_version(read_buffer)?;
        let header_file_size = read_file_size(read_buffer, file_size)?;
        let map_date = read_map_date(read_buffer)?;
        let bounding_box = read_bounding_box(read_buffer)?;
        let tile_pixel_size = read_buffer.read_short()? as i32;
        let projection_name = read_projection_name(read_buffer)?;
        let optional_fields = OptionalFields::read(read_buffer)?;
        let poi_tags = read_tag_table(read_buffer, "POI")?;
        let way_tags = read_tag_table(read_buffer, "way")?;

        let mut header = MapFileHeader {
            map_file_info: MapFileInfo {
                bounding_box: bounding_box.clone(),
                comment: optional_fields.comment,
                created_by: optional_fields.created_by,
                debug_file: optional_fields.debug_file,
                file_size: header_file_size,
                file_version,
                languages_preference: optional_fields.languages_preference,
                map_date,
                number_of_sub_files: 0,
                poi_tags,
                projection_name,
                start_position: optional_fields.start_position,
                start_zoom_level: optional_fields.start_zoom_level,
                tile_pixel_size,
                way_tags,
                zoom_level_min: u8::MAX,
                zoom_level_max: 0,
            },
            sub_file_parameters: Vec::new(),
            zoom_level_minimum: u8::MAX,
            zoom_level_maximum: 0,
        };

        header.read_sub_file_parameters(read_buffer, file_size, &bounding_box)?;
        Ok(header)
    }

    pub fn map_file_info(&self) -> &MapFileInfo {
        &self.map_file_info
    }

    /// Clamps a requested zoom level into the range this file can answer.
    pub fn get_query_zoom_level(&self, zoom_level: u8) -> u8 {
        zoom_level.clamp(self.zoom_level_minimum, self.zoom_level_maximum)
    }

    /// Looks up the sub-file responsible for a query zoom level.
    pub fn get_sub_file_parameter(&self, query_zoom_level: u8) -> Option<&SubFileParameter> {
        self.sub_file_parameters
            .get(query_zoom_level as usize)?
            .as_ref()
    }

    fn read_sub_file_parameters<R: Read + Seek>(
        &mut self,
        read_buffer: &mut ReadBuffer<R>,
        file_size: i64,
        bounding_box: &BoundingBox,
    ) -> Result<(), MapFileError> {
        let number_of_sub_files = read_buffer.read_byte()?;
        if number_of_sub_files < 1 {
            return Err(MapFileError::new(format!(
                "invalid number of sub-files: {}",
                number_of_sub_files
            )));
        }
        self.map_file_info.number_of_sub_files = number_of_sub_files;

        let mut temp_sub_file_parameters = Vec::with_capacity(number_of_sub_files as usize);

        for _ in 0..number_of_sub_files {
            let base_zoom_level = read_buffer.read_byte()?;
            if base_zoom_level > BASE_ZOOM_LEVEL_MAX {
                return Err(MapFileError::new(format!(
                    "invalid base zoom level: {}",
                    base_zoom_level
                )));
            }

            let zoom_level_min = read_buffer.read_byte()?;
            if zoom_level_min > ZOOM_LEVEL_MAX_ALLOWED {
                return Err(MapFileError::new(format!(
                    "invalid minimum zoom level: {}",
                    zoom_level_min
                )));
            }

            let zoom_level_max = read_buffer.read_byte()?;
            if zoom_level_max > ZOOM_LEVEL_MAX_ALLOWED {
                return Err(MapFileError::new(format!(
                    "invalid maximum zoom level: {}",
                    zoom_level_max
                )));
            }

            if zoom_level_min > zoom_level_max {
                return Err(MapFileError::new(format!(
                    "invalid zoom level range: {} {}",
                    zoom_level_min, zoom_level_max
                )));
            }

            let start_address = read_buffer.read_long()?;
            if start_address < HEADER_SIZE_MIN as i64 || start_address >= file_size {
                return Err(MapFileError::new(format!(
                    "invalid start address: {}",
                    start_address
                )));
            }

            let index_start_address = if self.map_file_info.debug_file {
                // the sub-file index is prefixed with a signature
                start_address + SIGNATURE_LENGTH_INDEX
            } else {
                start_address
            };

            let sub_file_size = read_buffer.read_long()?;
            if sub_file_size < 1 {
                return Err(MapFileError::new(format!(
                    "invalid sub-file size: {}",
                    sub_file_size
                )));
            }

            let sub_file_parameter = SubFileParameterBuilder {
                base_zoom_level,
                zoom_level_min,
                zoom_level_max,
                start_address,
                sub_file_size,
                index_start_address,
                bounding_box: Some(bounding_box.clone()),
            }
            .build()?;

            self.zoom_level_minimum = self.zoom_level_minimum.min(zoom_level_min);
            self.zoom_level_maximum = self.zoom_level_maximum.max(zoom_level_max);
            temp_sub_file_parameters.push(sub_file_parameter);
        }

        self.map_file_info.zoom_level_min = self.zoom_level_minimum;
        self.map_file_info.zoom_level_max = self.zoom_level_maximum;

        // dense lookup from query zoom level to the responsible sub-file
        self.sub_file_parameters = vec![None; self.zoom_level_maximum as usize + 1];
        for sub_file_parameter in temp_sub_file_parameters {
            for zoom_level in sub_file_parameter.zoom_level_min..=sub_file_parameter.zoom_level_max
            {
                let slot = &mut self.sub_file_parameters[zoom_level as usize];
                if slot.is_none() {
                    *slot = Some(sub_file_parameter.clone());
                } else {
                    warn!(zoom_level, "overlapping sub-file zoom intervals");
                }
            }
        }

        Ok(())
    }
}

fn read_magic_byte<R: Read + Seek>(read_buffer: &mut ReadBuffer<R>) -> Result<(), MapFileError> {
    let magic_byte_length = BINARY_OSM_MAGIC_BYTE.len();
    if !read_buffer.read_from_file(magic_byte_length + 4)? {
        return Err(MapFileError::new("reading magic byte has failed"));
    }

    let magic_byte = read_buffer.read_utf8_encoded_string_with_length(magic_byte_length)?;
    if magic_byte != BINARY_OSM_MAGIC_BYTE {
        return Err(MapFileError::new(format!(
            "invalid magic byte: {}",
            magic_byte
        )));
    }
    Ok(())
}

fn read_remaining_header<R: Read + Seek>(
    read_buffer: &mut ReadBuffer<R>,
) -> Result<(), MapFileError> {
    let remaining_header_size = read_buffer.read_int()?;
    if !(HEADER_SIZE_MIN..=HEADER_SIZE_MAX).contains(&remaining_header_size) {
        return Err(MapFileError::new(format!(
            "invalid remaining header size: {}",
            remaining_header_size
        )));
    }

    if !read_buffer.read_from_file(remaining_header_size as usize)? {
        return Err(MapFileError::new(format!(
            "reading header data has failed: {}",
            remaining_header_size
        )));
    }
    Ok(())
}

fn read_file_version<R: Read + Seek>(
    read_buffer: &mut ReadBuffer<R>,
) -> Result<i32, MapFileError> {
    let file_version = read_buffer.read_int()?;
    if !(SUPPORTED_FILE_VERSION_MIN..=SUPPORTED_FILE_VERSION_MAX).contains(&file_version) {
        return Err(MapFileError::new(format!(
            "unsupported file version: {}",
            file_version
        )));
    }
    Ok(file_version)
}

fn read_file_size<R: Read + Seek>(
    read_buffer: &mut ReadBuffer<R>,
    actual_file_size: i64,
) -> Result<i64, MapFileError> {
    let header_file_size = read_buffer.read_long()?;
    if header_file_size != actual_file_size {
        return Err(MapFileError::new(format!(
            "invalid file size: {}",
            header_file_size
        )));
    }
    Ok(header_file_size)
}

fn read_map_date<R: Read + Seek>(read_buffer: &mut ReadBuffer<R>) -> Result<i64, MapFileError> {
    let map_date = read_buffer.read_long()?;
    // millisecond timestamps before 2008 predate the format
    if map_date < 1_200_000_000_000 {
        return Err(MapFileError::new(format!("invalid map date: {}", map_date)));
    }
    Ok(map_date)
}

fn read_bounding_box<R: Read + Seek>(
    read_buffer: &mut ReadBuffer<R>,
) -> Result<BoundingBox, MapFileError> {
    let min_latitude = read_buffer.read_int()? as f64 / 1_000_000.0;
    let min_longitude = read_buffer.read_int()? as f64 / 1_000_000.0;
    let max_latitude = read_buffer.read_int()? as f64 / 1_000_000.0;
    let max_longitude = read_buffer.read_int()? as f64 / 1_000_000.0;

    BoundingBox::new(min_latitude, min_longitude, max_latitude, max_longitude)
}

fn read_projection_name<R: Read + Seek>(
    read_buffer: &mut ReadBuffer<R>,
) -> Result<String, MapFileError> {
    let projection_name = read_buffer.read_utf8_encoded_string()?;
    if projection_name != MERCATOR {
        return Err(MapFileError::new(format!(
            "unsupported projection: {}",
            projection_name
        )));
    }
    Ok(projection_name)
}

fn read_tag_table<R: Read + Seek>(
    read_buffer: &mut ReadBuffer<R>,
    what: &str,
) -> Result<Vec<Tag>, MapFileError> {
    let number_of_tags = read_buffer.read_short()?;

    let mut tags = Vec::with_capacity(number_of_tags as usize);
    for tag_id in 0..number_of_tags {
        let tag = read_buffer.read_utf8_encoded_string().map_err(|e| {
            MapFileError::new(format!("invalid {} tag {}: {}", what, tag_id, e))
        })?;
        tags.push(Tag::from_encoded(&tag));
    }
    Ok(tags)
}
