use mapreader::{MapDataCollector, MapDecoder, MercatorProjection, Tile};
use std::env;
use std::time::Instant;

fn main() {
    let Some(file_path) = env::args().nth(1) else {
        eprintln!("usage: dump <map-file> [zoom]");
        return;
    };
    let requested_zoom: u8 = env::args()
        .nth(2)
        .and_then(|zoom| zoom.parse().ok())
        .unwrap_or(12);

    let mut decoder = MapDecoder::new();
    let start = Instant::now();
    let open_result = decoder.open_file(&file_path);
    if !open_result.is_success() {
        eprintln!(
            "cannot open {}: {}",
            file_path,
            open_result.error_message().unwrap_or("unknown error")
        );
        return;
    }
    println!("opened {} in {:?}", file_path, start.elapsed());

    let info = decoder.get_map_file_info().expect("file is open");
    println!("bounds:        {:?}", info.bounding_box);
    println!(
        "zoom levels:   {} to {}",
        info.zoom_level_min, info.zoom_level_max
    );
    println!("map date:      {}", info.map_date);
    println!("file version:  {}", info.file_version);
    println!("sub-files:     {}", info.number_of_sub_files);
    println!("POI tags:      {}", info.poi_tags.len());
    println!("way tags:      {}", info.way_tags.len());
    println!("languages:     {:?}", info.map_languages());
    println!("comment:       {:?}", info.comment);

    let zoom = requested_zoom.clamp(info.zoom_level_min, info.zoom_level_max);
    let position = info.start_or_center_position();
    let tile = Tile::new(
        MercatorProjection::longitude_to_tile_x(position.longitude, zoom),
        MercatorProjection::latitude_to_tile_y(position.latitude, zoom),
        zoom,
    );

    let start = Instant::now();
    let mut collector = MapDataCollector::new();
    decoder.execute_query(&tile, &mut collector);
    let result = collector.into_result();

    println!(
        "\ntile {}/{}/{}: {} POIs, {} ways in {:?}",
        tile.zoom_level,
        tile.tile_x,
        tile.tile_y,
        result.pois.len(),
        result.ways.len(),
        start.elapsed()
    );

    for poi in result.pois.iter().take(10) {
        println!(
            "  POI layer {:>3} at {}/{}: {:?}",
            poi.layer, poi.latitude, poi.longitude, poi.tags
        );
    }
    for way in result.ways.iter().take(10) {
        println!(
            "  way layer {:>3}, {} coordinate blocks, {} nodes, name {:?}",
            way.layer,
            way.lengths.len(),
            way.coordinates.len() / 2,
            way.name
        );
    }
}
