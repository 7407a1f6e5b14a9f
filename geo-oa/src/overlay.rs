// Measurement overlay module
// Draws measurement lines, landmark markers and labels onto uCT slices

use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use geo_oa_common::{palette, Landmarks, PixelPoint};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut, draw_text_mut,
};

use crate::error::{GeoOaError, Result};
use crate::units::{distance, pixels_to_mm};

const ENDPOINT_MARKER_RADIUS: i32 = 4;
pub const DEFAULT_LINE_WIDTH: u32 = 2;
pub const DEFAULT_LANDMARK_SIZE: i32 = 6;

/// Convert a palette triple into an image pixel
pub fn rgb(color: [u8; 3]) -> Rgb<u8> {
    Rgb(color)
}

/// Overlay renderer; labels are drawn only when a font is loaded
pub struct Overlay {
    font: Option<FontVec>,
    label_scale: PxScale,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::without_font()
    }
}

impl Overlay {
    pub fn without_font() -> Self {
        Self {
            font: None,
            label_scale: PxScale::from(14.0),
        }
    }

    pub fn with_font(font: FontVec) -> Self {
        Self {
            font: Some(font),
            label_scale: PxScale::from(14.0),
        }
    }

    /// Load a TTF/OTF font from disk for labels
    pub fn from_font_file(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            GeoOaError::InvalidInput(format!("Failed to load font {}: {}", path.display(), e))
        })?;
        Ok(Self::with_font(font))
    }

    /// Use the configured font when present, otherwise draw without labels
    pub fn from_optional_font(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_font_file(p),
            None => Ok(Self::without_font()),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_label(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match &self.font {
            Some(font) => draw_text_mut(img, color, x, y, self.label_scale, font, text),
            None => log::debug!("No font loaded, skipping label '{}'", text),
        }
    }

    /// Draw a measurement line with endpoint markers and an optional label
    ///
    /// Returns a modified copy; the label sits just above-right of the midpoint.
    pub fn draw_measurement_line(
        &self,
        image: &RgbImage,
        point1: PixelPoint,
        point2: PixelPoint,
        label: Option<&str>,
        color: Rgb<u8>,
        line_width: u32,
    ) -> RgbImage {
        let mut img = image.clone();

        draw_thick_line(&mut img, point1, point2, color, line_width.max(1));

        for pt in [point1, point2] {
            draw_filled_circle_mut(
                &mut img,
                (pt.x().round() as i32, pt.y().round() as i32),
                ENDPOINT_MARKER_RADIUS,
                color,
            );
        }

        if let Some(text) = label {
            let mid_x = (point1.x() + point2.x()) / 2.0;
            let mid_y = (point1.y() + point2.y()) / 2.0;
            self.draw_label(
                &mut img,
                (mid_x + 5.0) as i32,
                (mid_y - 10.0) as i32,
                text,
                color,
            );
        }

        img
    }

    /// Draw a landmark as a crosshair with a small circle
    pub fn draw_landmark(
        &self,
        image: &RgbImage,
        point: PixelPoint,
        label: Option<&str>,
        color: Rgb<u8>,
        size: i32,
    ) -> RgbImage {
        let mut img = image.clone();
        let (x, y) = (point.x() as f32, point.y() as f32);
        let s = size as f32;

        draw_line_segment_mut(&mut img, (x - s, y), (x + s, y), color);
        draw_line_segment_mut(&mut img, (x, y - s), (x, y + s), color);
        draw_hollow_circle_mut(&mut img, (x as i32, y as i32), size / 2, color);

        if let Some(text) = label {
            self.draw_label(&mut img, x as i32 + size + 2, y as i32 - 5, text, color);
        }

        img
    }

    /// Draw every measurable femoral and tibial distance onto an RGB copy of the image
    pub fn create_measurement_overlay(
        &self,
        image: &DynamicImage,
        landmarks: &Landmarks,
        voxel_size_mm: f64,
        line_width: u32,
    ) -> RgbImage {
        let mut img = image.to_rgb8();
        let femoral = &landmarks.femoral;
        let tibial = &landmarks.tibial;

        let spans = [
            (
                femoral.lateral_condyle,
                femoral.medial_condyle,
                "W",
                palette::FEMORAL_WIDTH,
            ),
            (
                femoral.groove_midpoint,
                femoral.intercondylar_notch,
                "L",
                palette::FEMORAL_LENGTH,
            ),
            (
                tibial.lateral_border,
                tibial.medial_border,
                "W",
                palette::TIBIAL_WIDTH,
            ),
            (
                tibial.articular_surface,
                tibial.growth_plate,
                "H",
                palette::IIOC_HEIGHT,
            ),
        ];

        let mut drawn = 0;
        for (a, b, prefix, color) in spans {
            if let (Some(a), Some(b)) = (a, b) {
                let mm = pixels_to_mm(distance(a, b), voxel_size_mm);
                let label = format!("{}: {:.2} mm", prefix, mm);
                img = self.draw_measurement_line(&img, a, b, Some(&label), rgb(color), line_width);
                drawn += 1;
            }
        }

        log::debug!("Overlay: drew {} measurement line(s)", drawn);
        img
    }
}

/// Draw a line `width` pixels thick by stacking parallel one-pixel segments
fn draw_thick_line(img: &mut RgbImage, p1: PixelPoint, p2: PixelPoint, color: Rgb<u8>, width: u32) {
    let (x1, y1) = (p1.x() as f32, p1.y() as f32);
    let (x2, y2) = (p2.x() as f32, p2.y() as f32);

    let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
    let (nx, ny) = if len > 0.0 {
        (-(y2 - y1) / len, (x2 - x1) / len)
    } else {
        (0.0, 0.0)
    };

    let half = (width as f32 - 1.0) / 2.0;
    for i in 0..width {
        let offset = i as f32 - half;
        draw_line_segment_mut(
            img,
            (x1 + nx * offset, y1 + ny * offset),
            (x2 + nx * offset, y2 + ny * offset),
            color,
        );
    }
}
