use serde::{Deserialize, Serialize};
use std::fmt;

/// Distal femur width/length ratio below which a joint is definitively normal
pub const FEMORAL_WL_NORMAL_MAX: f64 = 1.28;
/// Distal femur width/length ratio above which a joint is definitively OA
pub const FEMORAL_WL_OA_MIN: f64 = 1.30;

/// Proximal tibia height/width ratio above which a joint is definitively normal
pub const TIBIAL_HW_NORMAL_MIN: f64 = 0.28;
/// Proximal tibia height/width ratio below which a joint is definitively OA
pub const TIBIAL_HW_OA_MAX: f64 = 0.27;

/// Default uCT voxel size (Scanco VivaCT 40), in micrometers
pub const DEFAULT_VOXEL_SIZE_UM: f64 = 10.5;
/// Default uCT voxel size (Scanco VivaCT 40), in millimeters
pub const DEFAULT_VOXEL_SIZE_MM: f64 = 0.0105;

/// Clinical classification of a single index or of the whole joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OaStatus {
    Normal,
    Borderline,
    Oa,
}

impl OaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OaStatus::Normal => "NORMAL",
            OaStatus::Borderline => "BORDERLINE",
            OaStatus::Oa => "OA",
        }
    }

    /// Display color tag associated with this status
    pub fn color(&self) -> ColorTag {
        match self {
            OaStatus::Normal => ColorTag::Green,
            OaStatus::Borderline => ColorTag::Orange,
            OaStatus::Oa => ColorTag::Red,
        }
    }
}

impl fmt::Display for OaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named display color for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Green,
    Orange,
    Red,
}

impl ColorTag {
    pub fn name(&self) -> &'static str {
        match self {
            ColorTag::Green => "green",
            ColorTag::Orange => "orange",
            ColorTag::Red => "red",
        }
    }

    /// Returns the RGB triple used when drawing this tag
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            ColorTag::Green => palette::NORMAL,
            ColorTag::Orange => palette::BORDERLINE,
            ColorTag::Red => palette::OA,
        }
    }
}

impl fmt::Display for ColorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Visualization colors (RGB)
pub mod palette {
    pub const FEMORAL_WIDTH: [u8; 3] = [255, 255, 0];
    pub const FEMORAL_LENGTH: [u8; 3] = [0, 255, 255];
    pub const TIBIAL_WIDTH: [u8; 3] = [0, 255, 0];
    pub const IIOC_HEIGHT: [u8; 3] = [255, 0, 255];
    pub const NORMAL: [u8; 3] = [0, 200, 0];
    pub const BORDERLINE: [u8; 3] = [255, 165, 0];
    pub const OA: [u8; 3] = [255, 0, 0];
    pub const LANDMARK: [u8; 3] = [255, 255, 255];
}

/// Anatomical site an index is measured on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// Distal femur, width/length ratio
    Femoral,
    /// Proximal tibia, IIOC height/width ratio
    Tibial,
}

impl Site {
    /// Returns the (normal, oa) threshold pair for this site
    ///
    /// For the femur the normal bound is an upper bound, for the tibia it is a lower bound.
    pub fn thresholds(&self) -> (f64, f64) {
        match self {
            Site::Femoral => (FEMORAL_WL_NORMAL_MAX, FEMORAL_WL_OA_MIN),
            Site::Tibial => (TIBIAL_HW_NORMAL_MIN, TIBIAL_HW_OA_MAX),
        }
    }

    /// Short ratio label, "W/L" or "H/W"
    pub fn ratio_label(&self) -> &'static str {
        match self {
            Site::Femoral => "W/L",
            Site::Tibial => "H/W",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Femoral => write!(f, "Distal Femur"),
            Site::Tibial => write!(f, "Proximal Tibia"),
        }
    }
}

/// 2D point in image pixels, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint(pub f64, pub f64);

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self(x, y)
    }

    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }
}

impl From<(f64, f64)> for PixelPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self(x, y)
    }
}

/// Distal femur landmarks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FemoralLandmarks {
    /// Lateral condyle edge (width endpoint)
    pub lateral_condyle: Option<PixelPoint>,
    /// Medial condyle edge (width endpoint)
    pub medial_condyle: Option<PixelPoint>,
    /// Patellar groove midpoint (length endpoint)
    pub groove_midpoint: Option<PixelPoint>,
    /// Intercondylar notch (length endpoint)
    pub intercondylar_notch: Option<PixelPoint>,
}

/// Proximal tibia landmarks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TibialLandmarks {
    /// Lateral border at growth plate level (width endpoint)
    pub lateral_border: Option<PixelPoint>,
    /// Medial border at growth plate level (width endpoint)
    pub medial_border: Option<PixelPoint>,
    /// Articular surface (IIOC height endpoint)
    pub articular_surface: Option<PixelPoint>,
    /// Growth plate (IIOC height endpoint)
    pub growth_plate: Option<PixelPoint>,
}

/// All landmarks placed on one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Landmarks {
    pub femoral: FemoralLandmarks,
    pub tibial: TibialLandmarks,
}

/// Expected ratio intervals for a reference population
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceRange {
    pub key: &'static str,
    pub description: &'static str,
    /// Closed femoral W/L interval
    pub femoral_wl_ratio: (f64, f64),
    /// Closed tibial H/W interval
    pub tibial_hw_ratio: (f64, f64),
}

/// Reference ranges for comparison
pub const REFERENCE_RANGES: &[ReferenceRange] = &[
    ReferenceRange {
        key: "normal_adult",
        description: "Normal adult mouse (5 months, C57BL/6)",
        femoral_wl_ratio: (1.20, 1.25),
        tibial_hw_ratio: (0.30, 0.35),
    },
    ReferenceRange {
        key: "ptoa_8wk",
        description: "Post-traumatic OA (MMS, 8 weeks)",
        femoral_wl_ratio: (1.35, 1.50),
        tibial_hw_ratio: (0.20, 0.26),
    },
    ReferenceRange {
        key: "aroa_28mo",
        description: "Age-related OA (28 months)",
        femoral_wl_ratio: (1.33, 1.60),
        tibial_hw_ratio: (0.22, 0.28),
    },
];

impl ReferenceRange {
    /// Look up a reference population by key
    pub fn find(key: &str) -> Option<&'static ReferenceRange> {
        REFERENCE_RANGES.iter().find(|r| r.key == key)
    }

    /// Returns the interval for the given site
    pub fn interval(&self, site: Site) -> (f64, f64) {
        match site {
            Site::Femoral => self.femoral_wl_ratio,
            Site::Tibial => self.tibial_hw_ratio,
        }
    }

    /// Whether a ratio lies inside this population's interval (bounds inclusive)
    pub fn contains(&self, site: Site, ratio: f64) -> bool {
        let (lo, hi) = self.interval(site);
        ratio >= lo && ratio <= hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&OaStatus::Borderline).unwrap();
        assert_eq!(json, "\"BORDERLINE\"");
        assert_eq!(OaStatus::Oa.to_string(), "OA");
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(OaStatus::Normal.color(), ColorTag::Green);
        assert_eq!(OaStatus::Borderline.color().name(), "orange");
        assert_eq!(OaStatus::Oa.color().rgb(), [255, 0, 0]);
    }

    #[test]
    fn test_status_orders_by_severity() {
        assert!(OaStatus::Oa > OaStatus::Borderline);
        assert!(OaStatus::Borderline > OaStatus::Normal);
    }

    #[test]
    fn test_landmarks_from_partial_json() {
        let json = r#"{"femoral": {"lateral_condyle": [10, 20], "medial_condyle": [110.5, 20]}}"#;
        let landmarks: Landmarks = serde_json::from_str(json).unwrap();
        assert_eq!(landmarks.femoral.lateral_condyle, Some(PixelPoint::new(10.0, 20.0)));
        assert_eq!(landmarks.femoral.medial_condyle.map(|p| p.x()), Some(110.5));
        assert!(landmarks.femoral.groove_midpoint.is_none());
        assert_eq!(landmarks.tibial, TibialLandmarks::default());
    }

    #[test]
    fn test_reference_lookup() {
        let range = ReferenceRange::find("ptoa_8wk").unwrap();
        assert_eq!(range.femoral_wl_ratio, (1.35, 1.50));
        assert!(range.contains(Site::Tibial, 0.26));
        assert!(!range.contains(Site::Tibial, 0.27));
        assert!(ReferenceRange::find("unknown").is_none());
    }
}
