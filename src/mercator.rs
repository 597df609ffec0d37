pub struct MercatorProjection;

const LATITUDE_MAX: f64 = 85.05112877980659;
const LATITUDE_MIN: f64 = -LATITUDE_MAX;
const PI: f64 = std::f64::consts::PI;

impl MercatorProjection {
    pub fn tile_x_to_longitude(tile_x: i64, zoom_level: u8) -> f64 {
        let n = 1i64 << zoom_level;
        (tile_x as f64 * 360.0 / n as f64) - 180.0
    }

    pub fn tile_y_to_latitude(tile_y: i64, zoom_level: u8) -> f64 {
        let n = 1i64 << zoom_level;
        let y = 0.5 - (tile_y as f64 / n as f64);
        90.0 - 360.0 * ((-y * (2.0 * PI)).exp().atan()) / PI
    }

    pub fn longitude_to_tile_x(longitude: f64, zoom_level: u8) -> i64 {
        let n = 1i64 << zoom_level;
        ((longitude + 180.0) / 360.0 * n as f64).floor() as i64
    }

    pub fn latitude_to_tile_y(latitude: f64, zoom_level: u8) -> i64 {
        let latitude = latitude.clamp(LATITUDE_MIN, LATITUDE_MAX);
        let n = 1i64 << zoom_level;

        let lat_rad = latitude.to_radians();
        let y = 0.5 - (lat_rad.sin().atanh() / (2.0 * PI));

        // guard against rounding just past the pole
        let tile_y = (y * n as f64).floor() as i64;
        tile_y.clamp(0, n - 1)
    }
}
