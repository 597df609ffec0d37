mod callback;
mod decoder;
mod errors;
mod header;
mod index_cache;
mod map_data;
mod mercator;
mod query_calculations;
mod query_parameters;
mod reader;
mod tile;
mod types;

// One consistent public API surface
pub use callback::{RenderCallback, WayText};
pub use decoder::MapDecoder;
pub use errors::{FileOpenResult, MapFileError};
pub use header::{MapFileHeader, MapFileInfo, SubFileParameter, SubFileParameterBuilder};
pub use index_cache::IndexCache;
pub use map_data::{MapDataCollector, MapReadResult, PointOfInterest, Way};
pub use mercator::MercatorProjection;
pub use query_calculations::QueryCalculations;
pub use query_parameters::QueryParameters;
pub use reader::{ReadBuffer, MAXIMUM_BUFFER_SIZE};
pub use tile::{Tile, TILE_SIZE};
pub use types::{BoundingBox, LatLong, LatLongUtils, Tag};
