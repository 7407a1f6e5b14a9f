// Ratio classification module
// Tang/Yao geometric indices: femoral W/L and tibial H/W ratios with three-way OA calls

use geo_oa_common::{
    ColorTag, OaStatus, Site, FEMORAL_WL_NORMAL_MAX, FEMORAL_WL_OA_MIN, TIBIAL_HW_NORMAL_MIN,
    TIBIAL_HW_OA_MAX,
};
use serde::Serialize;

use crate::error::{GeoOaError, Result};
use crate::units::round3;

const BORDERLINE_INTERPRETATION: &str = "Ratio in borderline range; may indicate early OA changes";

/// Measurements that produced a site ratio, rounded to 3 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SiteInputs {
    Femoral { width_mm: f64, length_mm: f64 },
    Tibial { height_mm: f64, width_mm: f64 },
}

/// Classified ratio for one anatomical site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteResult {
    #[serde(skip)]
    pub site: Site,
    /// Ratio rounded to 3 decimals
    pub ratio: f64,
    /// Unrounded ratio the status was derived from
    #[serde(skip)]
    pub raw_ratio: f64,
    pub status: OaStatus,
    pub interpretation: &'static str,
    pub color: ColorTag,
    #[serde(flatten)]
    pub inputs: SiteInputs,
    pub threshold_normal: f64,
    pub threshold_oa: f64,
}

/// Combined femoral and tibial call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallAssessment {
    pub overall_status: OaStatus,
    pub severity_description: &'static str,
    pub femoral_status: OaStatus,
    pub tibial_status: OaStatus,
    pub femoral_ratio: f64,
    pub tibial_ratio: f64,
}

/// Status for a femoral W/L ratio; higher is more abnormal
///
/// Both thresholds themselves fall into BORDERLINE.
pub fn femoral_status(ratio: f64) -> OaStatus {
    if ratio < FEMORAL_WL_NORMAL_MAX {
        OaStatus::Normal
    } else if ratio > FEMORAL_WL_OA_MIN {
        OaStatus::Oa
    } else {
        OaStatus::Borderline
    }
}

/// Status for a tibial H/W ratio; lower is more abnormal
///
/// Both thresholds themselves fall into BORDERLINE.
pub fn tibial_status(ratio: f64) -> OaStatus {
    if ratio > TIBIAL_HW_NORMAL_MIN {
        OaStatus::Normal
    } else if ratio < TIBIAL_HW_OA_MAX {
        OaStatus::Oa
    } else {
        OaStatus::Borderline
    }
}

/// Calculate the distal femoral width/length ratio and interpret OA status
///
/// `width_mm` is lateral to medial condyle edge, `length_mm` is groove midpoint
/// to intercondylar notch.
pub fn classify_femoral(width_mm: f64, length_mm: f64) -> Result<SiteResult> {
    if length_mm <= 0.0 {
        return Err(GeoOaError::InvalidInput("length must be > 0".to_string()));
    }

    let ratio = width_mm / length_mm;
    let status = femoral_status(ratio);
    let interpretation = match status {
        OaStatus::Normal => "No significant osteophyte formation detected",
        OaStatus::Oa => {
            "Elevated ratio indicates osteophyte formation consistent with osteoarthritis"
        }
        OaStatus::Borderline => BORDERLINE_INTERPRETATION,
    };

    log::debug!("Femoral W/L {:.4} -> {}", ratio, status);

    Ok(SiteResult {
        site: Site::Femoral,
        ratio: round3(ratio),
        raw_ratio: ratio,
        status,
        interpretation,
        color: status.color(),
        inputs: SiteInputs::Femoral {
            width_mm: round3(width_mm),
            length_mm: round3(length_mm),
        },
        threshold_normal: FEMORAL_WL_NORMAL_MAX,
        threshold_oa: FEMORAL_WL_OA_MIN,
    })
}

/// Calculate the tibial IIOC height/width ratio and interpret OA status
///
/// `height_mm` is articular surface to growth plate, `width_mm` is taken at
/// growth plate level.
pub fn classify_tibial(height_mm: f64, width_mm: f64) -> Result<SiteResult> {
    if width_mm <= 0.0 {
        return Err(GeoOaError::InvalidInput("width must be > 0".to_string()));
    }

    let ratio = height_mm / width_mm;
    let status = tibial_status(ratio);
    let interpretation = match status {
        OaStatus::Normal => "No significant subchondral collapse or osteophyte formation",
        OaStatus::Oa => {
            "Reduced ratio indicates subchondral bone collapse and/or osteophyte formation"
        }
        OaStatus::Borderline => BORDERLINE_INTERPRETATION,
    };

    log::debug!("Tibial H/W {:.4} -> {}", ratio, status);

    Ok(SiteResult {
        site: Site::Tibial,
        ratio: round3(ratio),
        raw_ratio: ratio,
        status,
        interpretation,
        color: status.color(),
        inputs: SiteInputs::Tibial {
            height_mm: round3(height_mm),
            width_mm: round3(width_mm),
        },
        threshold_normal: TIBIAL_HW_NORMAL_MIN,
        threshold_oa: TIBIAL_HW_OA_MAX,
    })
}

/// Overall OA assessment from both ratios
///
/// Statuses are re-derived from the ratios, so pass unrounded values
/// (`SiteResult::raw_ratio`) to stay consistent with the per-site calls.
/// Any OA site makes the joint OA, otherwise any BORDERLINE site makes it
/// BORDERLINE.
pub fn combine(femoral_ratio: f64, tibial_ratio: f64) -> OverallAssessment {
    let femoral = femoral_status(femoral_ratio);
    let tibial = tibial_status(tibial_ratio);

    let (overall_status, severity_description) = match (femoral, tibial) {
        (OaStatus::Oa, OaStatus::Oa) => (
            OaStatus::Oa,
            "Significant OA: Both femoral and tibial indices abnormal",
        ),
        (OaStatus::Oa, _) => (
            OaStatus::Oa,
            "OA indicated by femoral ratio (osteophyte formation)",
        ),
        (_, OaStatus::Oa) => (
            OaStatus::Oa,
            "OA indicated by tibial ratio (subchondral collapse/osteophytes)",
        ),
        (OaStatus::Borderline, _) | (_, OaStatus::Borderline) => (
            OaStatus::Borderline,
            "Early or mild changes possible; continued monitoring recommended",
        ),
        _ => (
            OaStatus::Normal,
            "No significant osteoarthritic changes detected",
        ),
    };

    OverallAssessment {
        overall_status,
        severity_description,
        femoral_status: femoral,
        tibial_status: tibial,
        femoral_ratio: round3(femoral_ratio),
        tibial_ratio: round3(tibial_ratio),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Powers of two keep `k * l / l` exact, so the ratio hits the threshold bit-for-bit.
    const EXACT_LENGTHS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

    #[test]
    fn test_femoral_ratio_is_rounded() {
        let result = classify_femoral(2.3456, 1.8).unwrap();
        assert_eq!(result.ratio, round3(2.3456 / 1.8));
        assert_eq!(
            result.inputs,
            SiteInputs::Femoral {
                width_mm: 2.346,
                length_mm: 1.8
            }
        );
        assert_eq!(result.threshold_normal, 1.28);
        assert_eq!(result.threshold_oa, 1.30);
    }

    #[test]
    fn test_femoral_boundaries_are_borderline() {
        for l in EXACT_LENGTHS {
            assert_eq!(classify_femoral(1.28 * l, l).unwrap().status, OaStatus::Borderline);
            assert_eq!(classify_femoral(1.30 * l, l).unwrap().status, OaStatus::Borderline);
        }
    }

    #[test]
    fn test_femoral_zones() {
        for l in [0.7, 1.0, 2.3, 3.0] {
            let normal = classify_femoral(1.27 * l, l).unwrap();
            assert_eq!(normal.status, OaStatus::Normal);
            assert_eq!(normal.color, ColorTag::Green);

            let oa = classify_femoral(1.31 * l, l).unwrap();
            assert_eq!(oa.status, OaStatus::Oa);
            assert_eq!(oa.color, ColorTag::Red);
            assert!(oa.interpretation.starts_with("Elevated ratio"));
        }
        let borderline = classify_femoral(1.29, 1.0).unwrap();
        assert_eq!(borderline.color, ColorTag::Orange);
        assert_eq!(borderline.interpretation, BORDERLINE_INTERPRETATION);
    }

    #[test]
    fn test_femoral_rejects_non_positive_length() {
        for length in [0.0, -1.0] {
            match classify_femoral(2.0, length) {
                Err(GeoOaError::InvalidInput(msg)) => assert_eq!(msg, "length must be > 0"),
                other => panic!("expected InvalidInput, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_tibial_boundaries_are_borderline() {
        for w in EXACT_LENGTHS {
            assert_eq!(classify_tibial(0.27 * w, w).unwrap().status, OaStatus::Borderline);
            assert_eq!(classify_tibial(0.28 * w, w).unwrap().status, OaStatus::Borderline);
        }
    }

    #[test]
    fn test_tibial_zones() {
        let normal = classify_tibial(0.29, 1.0).unwrap();
        assert_eq!(normal.status, OaStatus::Normal);
        assert_eq!(
            normal.interpretation,
            "No significant subchondral collapse or osteophyte formation"
        );

        let oa = classify_tibial(0.26, 1.0).unwrap();
        assert_eq!(oa.status, OaStatus::Oa);
        assert_eq!(oa.threshold_normal, 0.28);
        assert_eq!(oa.threshold_oa, 0.27);
    }

    #[test]
    fn test_tibial_rejects_zero_width() {
        assert!(matches!(
            classify_tibial(0.5, 0.0),
            Err(GeoOaError::InvalidInput(msg)) if msg == "width must be > 0"
        ));
    }

    #[test]
    fn test_site_result_json_shape() {
        let value = serde_json::to_value(classify_tibial(0.6, 2.0).unwrap()).unwrap();
        assert_eq!(value["status"], "NORMAL");
        assert_eq!(value["color"], "green");
        assert_eq!(value["height_mm"], 0.6);
        assert_eq!(value["width_mm"], 2.0);
        assert!(value.get("site").is_none());
        assert!(value.get("raw_ratio").is_none());
    }

    #[test]
    fn test_raw_ratio_keeps_status_basis() {
        let femoral = classify_femoral(1.2796, 1.0).unwrap();
        assert_eq!(femoral.ratio, 1.28);
        assert_eq!(femoral.raw_ratio, 1.2796);
        assert_eq!(femoral_status(femoral.raw_ratio), femoral.status);
        assert_eq!(combine(femoral.raw_ratio, 0.32).femoral_status, OaStatus::Normal);
    }

    #[test]
    fn test_combine_both_oa() {
        let overall = combine(1.40, 0.20);
        assert_eq!(overall.overall_status, OaStatus::Oa);
        assert_eq!(overall.femoral_status, OaStatus::Oa);
        assert_eq!(overall.tibial_status, OaStatus::Oa);
        assert_eq!(
            overall.severity_description,
            "Significant OA: Both femoral and tibial indices abnormal"
        );
    }

    #[test]
    fn test_combine_single_site_oa() {
        let femoral_only = combine(1.40, 0.32);
        assert_eq!(femoral_only.overall_status, OaStatus::Oa);
        assert_eq!(
            femoral_only.severity_description,
            "OA indicated by femoral ratio (osteophyte formation)"
        );

        let tibial_only = combine(1.29, 0.20);
        assert_eq!(tibial_only.overall_status, OaStatus::Oa);
        assert_eq!(tibial_only.femoral_status, OaStatus::Borderline);
        assert_eq!(
            tibial_only.severity_description,
            "OA indicated by tibial ratio (subchondral collapse/osteophytes)"
        );
    }

    #[test]
    fn test_combine_normal_and_borderline() {
        let normal = combine(1.20, 0.32);
        assert_eq!(normal.overall_status, OaStatus::Normal);
        assert_eq!(
            normal.severity_description,
            "No significant osteoarthritic changes detected"
        );

        let borderline = combine(1.29, 0.32);
        assert_eq!(borderline.overall_status, OaStatus::Borderline);
        assert_eq!(borderline.femoral_status, OaStatus::Borderline);
        assert_eq!(borderline.tibial_status, OaStatus::Normal);
    }

    #[test]
    fn test_combine_rounds_ratios() {
        let overall = combine(1.23456, 0.31249);
        assert_eq!(overall.femoral_ratio, 1.235);
        assert_eq!(overall.tibial_ratio, 0.312);
    }
}
