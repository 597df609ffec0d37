#![allow(dead_code)]

use mapreader::{LatLongUtils, MercatorProjection, RenderCallback, Tag, WayText};
use std::path::PathBuf;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn write_vbe_u(out: &mut Vec<u8>, mut value: u32) {
    while value > 0x7f {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn write_vbe_s(out: &mut Vec<u8>, value: i32) {
    let mut magnitude = value.unsigned_abs();
    while magnitude > 0x3f {
        out.push((magnitude as u8 & 0x7f) | 0x80);
        magnitude >>= 7;
    }
    let mut terminator = magnitude as u8;
    if value < 0 {
        terminator |= 0x40;
    }
    out.push(terminator);
}

pub fn vbe_u(value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    write_vbe_u(&mut out, value);
    out
}

pub fn vbe_s(value: i32) -> Vec<u8> {
    let mut out = Vec::new();
    write_vbe_s(&mut out, value);
    out
}

/// Micro-degree origin of a tile, computed the same way the decoder does.
pub fn tile_origin(tile_x: i64, tile_y: i64, zoom_level: u8) -> (i32, i32) {
    let latitude = LatLongUtils::degrees_to_microdegrees(MercatorProjection::tile_y_to_latitude(
        tile_y, zoom_level,
    ));
    let longitude = LatLongUtils::degrees_to_microdegrees(MercatorProjection::tile_x_to_longitude(
        tile_x, zoom_level,
    ));
    (latitude, longitude)
}

/// Assembles a block payload: zoom table rows (as per-row increments),
/// the first-way offset, POI records, the way string pool, way records.
pub fn block(
    zoom_row_increments: &[(u32, u32)],
    pois: &[Vec<u8>],
    string_pool: &[u8],
    ways: &[Vec<u8>],
) -> Vec<u8> {
    let mut out = Vec::new();
    for &(poi_increment, way_increment) in zoom_row_increments {
        write_vbe_u(&mut out, poi_increment);
        write_vbe_u(&mut out, way_increment);
    }

    let poi_bytes: Vec<u8> = pois.concat();
    write_vbe_u(&mut out, poi_bytes.len() as u32);
    out.extend_from_slice(&poi_bytes);

    write_vbe_u(&mut out, string_pool.len() as u32);
    out.extend_from_slice(string_pool);
    for way in ways {
        out.extend_from_slice(way);
    }
    out
}

/// A POI record without optional feature payloads; append those manually.
pub fn poi(
    lat_delta: i32,
    lon_delta: i32,
    flag_byte: u8,
    tag_indices: &[u32],
    feature_byte: u8,
) -> Vec<u8> {
    let mut out = Vec::new();
    write_vbe_s(&mut out, lat_delta);
    write_vbe_s(&mut out, lon_delta);
    out.push(flag_byte);
    for &tag_index in tag_indices {
        write_vbe_u(&mut out, tag_index);
    }
    out.push(feature_byte);
    out
}

/// A way record: the size prefix covers the tile bitmask and everything
/// after it. `body` holds the feature payloads (string references, label
/// position, data block count) followed by the geometry.
pub fn way(
    tile_bitmask: u16,
    flag_byte: u8,
    tag_indices: &[u32],
    feature_byte: u8,
    body: &[u8],
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&tile_bitmask.to_be_bytes());
    data.push(flag_byte);
    for &tag_index in tag_indices {
        write_vbe_u(&mut data, tag_index);
    }
    data.push(feature_byte);
    data.extend_from_slice(body);

    let mut out = Vec::new();
    write_vbe_u(&mut out, data.len() as u32);
    out.extend_from_slice(&data);
    out
}

/// Geometry of one way data block: each entry is the delta sequence of one
/// coordinate block (two values per node).
pub fn coordinate_blocks(blocks: &[&[i32]]) -> Vec<u8> {
    let mut out = Vec::new();
    write_vbe_u(&mut out, blocks.len() as u32);
    for deltas in blocks {
        assert!(deltas.len() % 2 == 0, "deltas come in pairs");
        write_vbe_u(&mut out, (deltas.len() / 2) as u32);
        for &delta in *deltas {
            write_vbe_s(&mut out, delta);
        }
    }
    out
}

/// Builds complete map files byte by byte for the end-to-end tests.
pub struct MapFileBuilder {
    /// (min_lat, min_lon, max_lat, max_lon) in micro-degrees.
    pub bounding_box: (i32, i32, i32, i32),
    pub file_version: i32,
    pub debug_file: bool,
    pub start_position: Option<(i32, i32)>,
    pub start_zoom_level: Option<u8>,
    pub languages_preference: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub poi_tags: Vec<String>,
    pub way_tags: Vec<String>,
    pub base_zoom_level: u8,
    pub zoom_level_min: u8,
    pub zoom_level_max: u8,
    /// Raw 40-bit index entries; left empty they are derived from `blocks`.
    pub index_entries: Vec<u64>,
    pub blocks: Vec<Vec<u8>>,
}

impl MapFileBuilder {
    /// A sub-file whose boundary covers exactly one base tile at zoom 8:
    /// tile (128, 127).
    pub fn single_tile() -> Self {
        Self {
            bounding_box: (200_000, 200_000, 1_200_000, 1_200_000),
            file_version: 3,
            debug_file: false,
            start_position: None,
            start_zoom_level: None,
            languages_preference: None,
            comment: None,
            created_by: None,
            poi_tags: Vec::new(),
            way_tags: Vec::new(),
            base_zoom_level: 8,
            zoom_level_min: 8,
            zoom_level_max: 8,
            index_entries: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// A boundary spanning base tiles (128, 127) and (129, 127): a 2x1
    /// block grid.
    pub fn two_tiles_wide() -> Self {
        Self {
            bounding_box: (200_000, 200_000, 1_200_000, 2_000_000),
            ..Self::single_tile()
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let index_signature_length = if self.debug_file { 16usize } else { 0 };

        // derive the index from the block payloads unless overridden
        let index_entries = if self.index_entries.is_empty() {
            let mut entries = Vec::with_capacity(self.blocks.len());
            let mut offset = (index_signature_length + self.blocks.len() * 5) as u64;
            for block in &self.blocks {
                entries.push(offset);
                offset += block.len() as u64;
            }
            entries
        } else {
            self.index_entries.clone()
        };

        let mut body = Vec::new();
        if self.debug_file {
            body.extend_from_slice(b"+++IndexStart+++");
        }
        for &entry in &index_entries {
            body.extend_from_slice(&entry.to_be_bytes()[3..8]);
        }
        for block in &self.blocks {
            body.extend_from_slice(block);
        }

        let mut fields = Vec::new();
        fields.extend_from_slice(&self.file_version.to_be_bytes());
        let file_size_at = fields.len();
        fields.extend_from_slice(&[0u8; 8]);
        fields.extend_from_slice(&1_400_000_000_000i64.to_be_bytes());
        let (min_lat, min_lon, max_lat, max_lon) = self.bounding_box;
        fields.extend_from_slice(&min_lat.to_be_bytes());
        fields.extend_from_slice(&min_lon.to_be_bytes());
        fields.extend_from_slice(&max_lat.to_be_bytes());
        fields.extend_from_slice(&max_lon.to_be_bytes());
        fields.extend_from_slice(&256i16.to_be_bytes());
        write_vbe_u(&mut fields, "Mercator".len() as u32);
        fields.extend_from_slice(b"Mercator");

        let mut flags = 0u8;
        if self.debug_file {
            flags |= 0x80;
        }
        if self.start_position.is_some() {
            flags |= 0x40;
        }
        if self.start_zoom_level.is_some() {
            flags |= 0x20;
        }
        if self.languages_preference.is_some() {
            flags |= 0x10;
        }
        if self.comment.is_some() {
            flags |= 0x08;
        }
        if self.created_by.is_some() {
            flags |= 0x04;
        }
        fields.push(flags);

        if let Some((latitude, longitude)) = self.start_position {
            fields.extend_from_slice(&latitude.to_be_bytes());
            fields.extend_from_slice(&longitude.to_be_bytes());
        }
        if let Some(start_zoom_level) = self.start_zoom_level {
            fields.push(start_zoom_level);
        }
        for optional in [
            &self.languages_preference,
            &self.comment,
            &self.created_by,
        ]
        .into_iter()
        .flatten()
        {
            write_vbe_u(&mut fields, optional.len() as u32);
            fields.extend_from_slice(optional.as_bytes());
        }

        for tag_table in [&self.poi_tags, &self.way_tags] {
            fields.extend_from_slice(&(tag_table.len() as u16).to_be_bytes());
            for tag in tag_table {
                write_vbe_u(&mut fields, tag.len() as u32);
                fields.extend_from_slice(tag.as_bytes());
            }
        }

        fields.push(1); // number of sub-files
        fields.push(self.base_zoom_level);
        fields.push(self.zoom_level_min);
        fields.push(self.zoom_level_max);
        let start_address_at = fields.len();
        fields.extend_from_slice(&[0u8; 8]);
        fields.extend_from_slice(&(body.len() as i64).to_be_bytes());

        let start_address = 24 + fields.len() as i64;
        let file_size = start_address + body.len() as i64;
        fields[file_size_at..file_size_at + 8].copy_from_slice(&file_size.to_be_bytes());
        fields[start_address_at..start_address_at + 8]
            .copy_from_slice(&start_address.to_be_bytes());

        let mut out = Vec::new();
        out.extend_from_slice(b"mapsforge binary OSM");
        out.extend_from_slice(&(fields.len() as i32).to_be_bytes());
        out.extend_from_slice(&fields);
        out.extend_from_slice(&body);
        out
    }

    pub fn write(&self, name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "mapreader-{}-{}.map",
            name,
            std::process::id()
        ));
        std::fs::write(&path, self.build()).expect("writing test map file");
        path
    }
}

#[derive(Debug, Clone)]
pub struct RecordedPoi {
    pub layer: i8,
    pub latitude: i32,
    pub longitude: i32,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone)]
pub struct RecordedWay {
    pub layer: i8,
    pub tags: Vec<Tag>,
    pub coordinates: Vec<f32>,
    pub lengths: Vec<i32>,
    pub name: Option<String>,
    pub house_number: Option<String>,
    pub reference: Option<String>,
    pub label_position: Option<(i32, i32)>,
    pub tags_changed: bool,
}

/// Captures every callback invocation for assertions.
#[derive(Debug, Default)]
pub struct RecordingCallback {
    pub pois: Vec<RecordedPoi>,
    pub ways: Vec<RecordedWay>,
    pub water_background_calls: usize,
}

impl RenderCallback for RecordingCallback {
    fn render_point_of_interest(&mut self, layer: i8, latitude: i32, longitude: i32, tags: &[Tag]) {
        self.pois.push(RecordedPoi {
            layer,
            latitude,
            longitude,
            tags: tags.to_vec(),
        });
    }

    fn render_way(
        &mut self,
        layer: i8,
        tags: &[Tag],
        coordinates: &[f32],
        lengths: &[i32],
        text: &WayText<'_>,
        tags_changed: bool,
    ) {
        self.ways.push(RecordedWay {
            layer,
            tags: tags.to_vec(),
            coordinates: coordinates.to_vec(),
            lengths: lengths.to_vec(),
            name: text.name().map(str::to_string),
            house_number: text.house_number().map(str::to_string),
            reference: text.reference().map(str::to_string),
            label_position: text.label_position(),
            tags_changed,
        });
    }

    fn render_water_background(&mut self) {
        self.water_background_calls += 1;
    }
}
