// Unit conversion module
// Pixel <-> millimeter conversion at a fixed voxel size, plus landmark distances

use geo_oa_common::{PixelPoint, DEFAULT_VOXEL_SIZE_MM};

/// Euclidean distance between two points (in pixels)
pub fn distance(point1: PixelPoint, point2: PixelPoint) -> f64 {
    let dx = point2.x() - point1.x();
    let dy = point2.y() - point1.y();
    (dx * dx + dy * dy).sqrt()
}

/// Convert a pixel distance to millimeters
pub fn pixels_to_mm(pixels: f64, voxel_size_mm: f64) -> f64 {
    pixels * voxel_size_mm
}

/// Convert millimeters to a pixel distance
pub fn mm_to_pixels(mm: f64, voxel_size_mm: f64) -> f64 {
    mm / voxel_size_mm
}

/// `pixels_to_mm` at the default voxel size
pub fn pixels_to_mm_default(pixels: f64) -> f64 {
    pixels_to_mm(pixels, DEFAULT_VOXEL_SIZE_MM)
}

/// Round to 3 decimal places
///
/// Rounds the exact stored value through its decimal form, so results never
/// drift from scaling by 1000 first (exact ties go to even).
pub fn round3(value: f64) -> f64 {
    format!("{:.3}", value).parse().unwrap_or(value)
}
