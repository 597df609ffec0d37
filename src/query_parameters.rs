use crate::header::SubFileParameter;
use crate::query_calculations::QueryCalculations;
use crate::tile::Tile;

/// Output of the query planner: the rectangle of blocks to visit and the
/// optional sub-tile bitmask used to skip ways inside those blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    pub from_base_tile_x: i64,
    pub from_base_tile_y: i64,
    pub to_base_tile_x: i64,
    pub to_base_tile_y: i64,
    pub from_block_x: i64,
    pub from_block_y: i64,
    pub to_block_x: i64,
    pub to_block_y: i64,
    pub query_tile_bitmask: u16,
    pub query_zoom_level: u8,
    pub use_tile_bitmask: bool,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Determines the rectangle of base-zoom tiles covering the query tile.
    pub fn calculate_base_tiles(&mut self, tile: &Tile, sub_file_parameter: &SubFileParameter) {
        if tile.zoom_level < sub_file_parameter.base_zoom_level {
            // one query tile spans several base tiles
            let zoom_level_difference = sub_file_parameter.base_zoom_level - tile.zoom_level;
            self.from_base_tile_x = tile.tile_x << zoom_level_difference;
            self.from_base_tile_y = tile.tile_y << zoom_level_difference;
            self.to_base_tile_x = self.from_base_tile_x + (1 << zoom_level_difference) - 1;
            self.to_base_tile_y = self.from_base_tile_y + (1 << zoom_level_difference) - 1;
            self.use_tile_bitmask = false;
        } else if tile.zoom_level > sub_file_parameter.base_zoom_level {
            // the query tile lies within a single base tile
            let zoom_level_difference = tile.zoom_level - sub_file_parameter.base_zoom_level;
            self.from_base_tile_x = tile.tile_x >> zoom_level_difference;
            self.from_base_tile_y = tile.tile_y >> zoom_level_difference;
            self.to_base_tile_x = self.from_base_tile_x;
            self.to_base_tile_y = self.from_base_tile_y;
            self.use_tile_bitmask = true;
            self.query_tile_bitmask =
                QueryCalculations::calculate_tile_bitmask(tile, zoom_level_difference);
        } else {
            self.from_base_tile_x = tile.tile_x;
            self.from_base_tile_y = tile.tile_y;
            self.to_base_tile_x = tile.tile_x;
            self.to_base_tile_y = tile.tile_y;
            self.use_tile_bitmask = false;
        }
    }

    /// Intersects the base-tile rectangle with the sub-file boundary and
    /// converts it into block coordinates.
    pub fn calculate_blocks(&mut self, sub_file_parameter: &SubFileParameter) {
        self.from_block_x =
            (self.from_base_tile_x - sub_file_parameter.boundary_tile_left).max(0);
        self.from_block_y = (self.from_base_tile_y - sub_file_parameter.boundary_tile_top).max(0);

        self.to_block_x = (self.to_base_tile_x - sub_file_parameter.boundary_tile_left)
            .min(sub_file_parameter.blocks_width - 1);
        self.to_block_y = (self.to_base_tile_y - sub_file_parameter.boundary_tile_top)
            .min(sub_file_parameter.blocks_height - 1);
    }
}
