use crate::callback::{RenderCallback, WayText};
use crate::types::Tag;

/// An owned point of interest, position in micro-degrees.
#[derive(Debug, Clone)]
pub struct PointOfInterest {
    pub layer: i8,
    pub latitude: i32,
    pub longitude: i32,
    pub tags: Vec<Tag>,
}

/// An owned way. `coordinates` keeps the flat `(longitude, latitude)`
/// micro-degree layout of the callback contract, with `lengths` giving the
/// number of values per coordinate block.
#[derive(Debug, Clone)]
pub struct Way {
    pub layer: i8,
    pub tags: Vec<Tag>,
    pub coordinates: Vec<f32>,
    pub lengths: Vec<i32>,
    pub name: Option<String>,
    pub house_number: Option<String>,
    pub reference: Option<String>,
    pub label_position: Option<(i32, i32)>,
}

#[derive(Debug, Default)]
pub struct MapReadResult {
    pub pois: Vec<PointOfInterest>,
    pub ways: Vec<Way>,
    pub is_water: bool,
}

/// Callback that copies every delivered element into owned collections,
/// for consumers that prefer plain result objects over zero-copy
/// callbacks.
#[derive(Debug, Default)]
pub struct MapDataCollector {
    pub result: MapReadResult,
}

impl MapDataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_result(self) -> MapReadResult {
        self.result
    }
}

impl RenderCallback for MapDataCollector {
    fn render_point_of_interest(&mut self, layer: i8, latitude: i32, longitude: i32, tags: &[Tag]) {
        self.result.pois.push(PointOfInterest {
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
        _tags_changed: bool,
    ) {
        self.result.ways.push(Way {
            layer,
            tags: tags.to_vec(),
            coordinates: coordinates.to_vec(),
            lengths: lengths.to_vec(),
            name: text.name().map(str::to_string),
            house_number: text.house_number().map(str::to_string),
            reference: text.reference().map(str::to_string),
            label_position: text.label_position(),
        });
    }

    fn render_water_background(&mut self) {
        self.result.is_water = true;
    }
}
