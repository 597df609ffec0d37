mod common;

use common::MapFileBuilder;
use mapreader::{LatLong, MapDecoder};

#[test]
fn header_fields_round_trip() {
    common::init();
    let mut builder = MapFileBuilder::single_tile();
    builder.start_position = Some((150_000, 250_000));
    builder.start_zoom_level = Some(16);
    builder.languages_preference = Some("en".to_string());
    builder.comment = Some("testcomment".to_string());
    builder.created_by = Some("mapreader-tests".to_string());
    builder.poi_tags = vec!["amenity=bank".to_string(), "shop=bakery".to_string()];
    builder.way_tags = vec!["highway=primary".to_string()];
    builder.index_entries = vec![5];
    let path = builder.write("header-roundtrip");

    let mut decoder = MapDecoder::new();
    assert!(decoder.open_file(&path).is_success());
    assert!(decoder.has_open_file());

    let info = decoder.get_map_file_info().unwrap();
    assert_eq!(info.file_version, 3);
    assert_eq!(info.file_size, std::fs::metadata(&path).unwrap().len() as i64);
    assert_eq!(info.map_date, 1_400_000_000_000);
    assert_eq!(info.projection_name, "Mercator");
    assert_eq!(info.tile_pixel_size, 256);
    assert_eq!(info.number_of_sub_files, 1);
    assert!(!info.debug_file);

    assert_eq!(info.bounding_box.min_latitude, 0.2);
    assert_eq!(info.bounding_box.min_longitude, 0.2);
    assert_eq!(info.bounding_box.max_latitude, 1.2);
    assert_eq!(info.bounding_box.max_longitude, 1.2);

    assert_eq!(info.start_position, Some(LatLong::new(0.15, 0.25)));
    assert_eq!(info.start_zoom_level, Some(16));
    assert_eq!(info.languages_preference.as_deref(), Some("en"));
    assert_eq!(info.comment.as_deref(), Some("testcomment"));
    assert_eq!(info.created_by.as_deref(), Some("mapreader-tests"));
    assert_eq!(info.map_languages(), Some(vec!["en".to_string()]));

    assert_eq!(info.poi_tags.len(), 2);
    assert_eq!(info.poi_tags[0].key, "amenity");
    assert_eq!(info.poi_tags[0].value, "bank");
    assert_eq!(info.way_tags.len(), 1);

    assert_eq!(info.zoom_level_min, 8);
    assert_eq!(info.zoom_level_max, 8);
}

#[test]
fn rejects_invalid_magic_byte() {
    common::init();
    let mut builder = MapFileBuilder::single_tile();
    builder.index_entries = vec![5];
    let mut bytes = builder.build();
    bytes[0] = b'X';

    let path = std::env::temp_dir().join(format!("mapreader-bad-magic-{}.map", std::process::id()));
    std::fs::write(&path, bytes).unwrap();

    let mut decoder = MapDecoder::new();
    let result = decoder.open_file(&path);
    assert!(!result.is_success());
    assert!(result.error_message().unwrap().contains("invalid magic byte"));
    assert!(!decoder.has_open_file());
}

#[test]
fn rejects_unsupported_file_version() {
    common::init();
    let mut builder = MapFileBuilder::single_tile();
    builder.file_version = 2;
    builder.index_entries = vec![5];
    let path = builder.write("bad-version");

    let mut decoder = MapDecoder::new();
    let result = decoder.open_file(&path);
    assert!(!result.is_success());
    assert!(result
        .error_message()
        .unwrap()
        .contains("unsupported file version"));
}

#[test]
fn rejects_truncated_file() {
    common::init();
    let mut builder = MapFileBuilder::single_tile();
    builder.index_entries = vec![5];
    let bytes = builder.build();

    let path = std::env::temp_dir().join(format!("mapreader-truncated-{}.map", std::process::id()));
    std::fs::write(&path, &bytes[..30]).unwrap();

    let mut decoder = MapDecoder::new();
    assert!(!decoder.open_file(&path).is_success());
}

#[test]
fn rejects_mismatched_file_size() {
    common::init();
    let mut builder = MapFileBuilder::single_tile();
    builder.index_entries = vec![5];
    let mut bytes = builder.build();
    bytes.push(0); // actual size no longer matches the declared size

    let path = std::env::temp_dir().join(format!("mapreader-size-{}.map", std::process::id()));
    std::fs::write(&path, bytes).unwrap();

    let mut decoder = MapDecoder::new();
    let result = decoder.open_file(&path);
    assert!(!result.is_success());
    assert!(result.error_message().unwrap().contains("invalid file size"));
}

#[test]
fn close_file_is_idempotent() {
    common::init();
    let mut builder = MapFileBuilder::single_tile();
    builder.index_entries = vec![5];
    let path = builder.write("close-idempotent");

    let mut decoder = MapDecoder::new();
    assert!(decoder.get_map_file_info().is_err());

    assert!(decoder.open_file(&path).is_success());
    assert!(decoder.has_open_file());

    decoder.close_file();
    decoder.close_file();
    assert!(!decoder.has_open_file());
    assert!(decoder.get_map_file_info().is_err());
}

#[test]
fn missing_file_reports_failure() {
    common::init();
    let mut decoder = MapDecoder::new();
    let result = decoder.open_file("/nonexistent/path/to.map");
    assert!(!result.is_success());
}
