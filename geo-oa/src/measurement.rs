// Measurement module
// Turns placed landmarks into millimeter distances and a classified knee analysis

use geo_oa_common::{Landmarks, PixelPoint, ReferenceRange, Site};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::classifier::{classify_femoral, classify_tibial, combine, OverallAssessment, SiteResult};
use crate::error::Result;
use crate::units::{distance, pixels_to_mm, round3};

/// Linear distances in millimeters; each is present only when both of its landmarks are
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KneeMeasurements {
    pub femoral_width_mm: Option<f64>,
    pub femoral_length_mm: Option<f64>,
    pub tibial_width_mm: Option<f64>,
    pub iioc_height_mm: Option<f64>,
    pub voxel_size_mm: f64,
}

/// Classified results for one knee
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KneeAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    pub measurements: KneeMeasurements,
    pub femoral: Option<SiteResult>,
    pub tibial: Option<SiteResult>,
    pub overall: Option<OverallAssessment>,
}

/// Per-site membership of a reference population's intervals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceComparison {
    pub reference: &'static str,
    pub femoral_in_range: Option<bool>,
    pub tibial_in_range: Option<bool>,
}

fn span_mm(a: Option<PixelPoint>, b: Option<PixelPoint>, voxel_size_mm: f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pixels_to_mm(distance(a, b), voxel_size_mm)),
        _ => None,
    }
}

/// Measure every distance whose two landmarks are both placed
pub fn measure_landmarks(landmarks: &Landmarks, voxel_size_mm: f64) -> KneeMeasurements {
    let femoral = &landmarks.femoral;
    let tibial = &landmarks.tibial;

    KneeMeasurements {
        femoral_width_mm: span_mm(femoral.lateral_condyle, femoral.medial_condyle, voxel_size_mm),
        femoral_length_mm: span_mm(
            femoral.groove_midpoint,
            femoral.intercondylar_notch,
            voxel_size_mm,
        ),
        tibial_width_mm: span_mm(tibial.lateral_border, tibial.medial_border, voxel_size_mm),
        iioc_height_mm: span_mm(tibial.articular_surface, tibial.growth_plate, voxel_size_mm),
        voxel_size_mm,
    }
}

/// Classify whatever sites are fully measured
///
/// The overall assessment is produced only when both sites are available.
pub fn analyze(measurements: KneeMeasurements, sample: Option<String>) -> Result<KneeAnalysis> {
    let femoral = match (measurements.femoral_width_mm, measurements.femoral_length_mm) {
        (Some(w), Some(l)) => Some(classify_femoral(w, l)?),
        _ => None,
    };
    let tibial = match (measurements.iioc_height_mm, measurements.tibial_width_mm) {
        (Some(h), Some(w)) => Some(classify_tibial(h, w)?),
        _ => None,
    };

    let overall = match (&femoral, &tibial) {
        (Some(f), Some(t)) => Some(combine(f.raw_ratio, t.raw_ratio)),
        _ => {
            log::warn!("Overall assessment needs both femoral and tibial ratios; skipping");
            None
        }
    };

    Ok(KneeAnalysis {
        sample,
        measurements,
        femoral,
        tibial,
        overall,
    })
}

impl KneeAnalysis {
    /// Flatten into a single record for CSV export and reporting
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();

        if let Some(sample) = &self.sample {
            record.insert("sample".into(), Value::from(sample.as_str()));
        }

        let m = &self.measurements;
        let lengths = [
            ("femoral_width_mm", m.femoral_width_mm),
            ("femoral_length_mm", m.femoral_length_mm),
            ("tibial_width_mm", m.tibial_width_mm),
            ("iioc_height_mm", m.iioc_height_mm),
        ];
        for (key, value) in lengths {
            if let Some(v) = value {
                record.insert(key.into(), Value::from(round3(v)));
            }
        }

        if let Some(f) = &self.femoral {
            record.insert("femoral_wl_ratio".into(), Value::from(f.ratio));
            record.insert("femoral_status".into(), Value::from(f.status.as_str()));
        }
        if let Some(t) = &self.tibial {
            record.insert("tibial_hw_ratio".into(), Value::from(t.ratio));
            record.insert("tibial_status".into(), Value::from(t.status.as_str()));
        }
        if let Some(o) = &self.overall {
            record.insert("overall_status".into(), Value::from(o.overall_status.as_str()));
            record.insert(
                "severity_description".into(),
                Value::from(o.severity_description),
            );
        }

        record.insert("voxel_size_mm".into(), Value::from(m.voxel_size_mm));
        record
    }

    /// Check the measured ratios against a reference population
    pub fn compare(&self, reference: &ReferenceRange) -> ReferenceComparison {
        ReferenceComparison {
            reference: reference.key,
            femoral_in_range: self
                .femoral
                .as_ref()
                .map(|f| reference.contains(Site::Femoral, f.ratio)),
            tibial_in_range: self
                .tibial
                .as_ref()
                .map(|t| reference.contains(Site::Tibial, t.ratio)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_oa_common::{FemoralLandmarks, OaStatus, TibialLandmarks};

    fn full_landmarks() -> Landmarks {
        Landmarks {
            femoral: FemoralLandmarks {
                lateral_condyle: Some(PixelPoint::new(100.0, 100.0)),
                medial_condyle: Some(PixelPoint::new(340.0, 100.0)),
                groove_midpoint: Some(PixelPoint::new(220.0, 50.0)),
                intercondylar_notch: Some(PixelPoint::new(220.0, 250.0)),
            },
            tibial: TibialLandmarks {
                lateral_border: Some(PixelPoint::new(100.0, 400.0)),
                medial_border: Some(PixelPoint::new(300.0, 400.0)),
                articular_surface: Some(PixelPoint::new(200.0, 340.0)),
                growth_plate: Some(PixelPoint::new(200.0, 400.0)),
            },
        }
    }

    #[test]
    fn test_measure_full_landmarks() {
        let m = measure_landmarks(&full_landmarks(), 0.01);
        assert!((m.femoral_width_mm.unwrap() - 2.4).abs() < 1e-9);
        assert!((m.femoral_length_mm.unwrap() - 2.0).abs() < 1e-9);
        assert!((m.tibial_width_mm.unwrap() - 2.0).abs() < 1e-9);
        assert!((m.iioc_height_mm.unwrap() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_missing_endpoint_skips_distance() {
        let mut landmarks = full_landmarks();
        landmarks.tibial.growth_plate = None;
        let m = measure_landmarks(&landmarks, 0.01);
        assert!(m.iioc_height_mm.is_none());
        assert!(m.tibial_width_mm.is_some());
    }

    #[test]
    fn test_analyze_full() {
        let analysis = analyze(measure_landmarks(&full_landmarks(), 0.01), None).unwrap();
        let femoral = analysis.femoral.as_ref().unwrap();
        assert_eq!(femoral.ratio, 1.2);
        assert_eq!(femoral.status, OaStatus::Normal);
        let tibial = analysis.tibial.as_ref().unwrap();
        assert_eq!(tibial.ratio, 0.3);
        assert_eq!(analysis.overall.as_ref().unwrap().overall_status, OaStatus::Normal);
    }

    #[test]
    fn test_overall_agrees_with_sites_near_thresholds() {
        // Both ratios round onto a threshold but sit on the normal side of it
        let measurements = KneeMeasurements {
            femoral_width_mm: Some(1.2796),
            femoral_length_mm: Some(1.0),
            tibial_width_mm: Some(1.0),
            iioc_height_mm: Some(0.28049),
            voxel_size_mm: 0.0105,
        };
        let analysis = analyze(measurements, None).unwrap();
        let femoral = analysis.femoral.as_ref().unwrap();
        let tibial = analysis.tibial.as_ref().unwrap();
        let overall = analysis.overall.as_ref().unwrap();

        assert_eq!(femoral.ratio, 1.28);
        assert_eq!(tibial.ratio, 0.28);
        assert_eq!(femoral.status, OaStatus::Normal);
        assert_eq!(tibial.status, OaStatus::Normal);
        assert_eq!(overall.femoral_status, femoral.status);
        assert_eq!(overall.tibial_status, tibial.status);
        assert_eq!(overall.overall_status, OaStatus::Normal);
    }

    #[test]
    fn test_analyze_partial_has_no_overall() {
        let mut landmarks = full_landmarks();
        landmarks.tibial = TibialLandmarks::default();
        let analysis = analyze(measure_landmarks(&landmarks, 0.01), None).unwrap();
        assert!(analysis.femoral.is_some());
        assert!(analysis.tibial.is_none());
        assert!(analysis.overall.is_none());
    }

    #[test]
    fn test_analyze_propagates_invalid_input() {
        let measurements = KneeMeasurements {
            femoral_width_mm: Some(2.0),
            femoral_length_mm: Some(0.0),
            voxel_size_mm: 0.0105,
            ..Default::default()
        };
        assert!(analyze(measurements, None).is_err());
    }

    #[test]
    fn test_record_keys() {
        let analysis = analyze(
            measure_landmarks(&full_landmarks(), 0.01),
            Some("knee-01".to_string()),
        )
        .unwrap();
        let record = analysis.to_record();
        assert_eq!(record["sample"], "knee-01");
        assert_eq!(record["femoral_wl_ratio"], 1.2);
        assert_eq!(record["tibial_status"], "NORMAL");
        assert_eq!(record["overall_status"], "NORMAL");
        assert_eq!(record["iioc_height_mm"], 0.6);
        assert_eq!(record.len(), 12);
    }

    #[test]
    fn test_compare_with_reference() {
        let analysis = analyze(measure_landmarks(&full_landmarks(), 0.01), None).unwrap();
        let normal = ReferenceRange::find("normal_adult").unwrap();
        let cmp = analysis.compare(normal);
        assert_eq!(cmp.femoral_in_range, Some(true));
        assert_eq!(cmp.tibial_in_range, Some(true));

        let ptoa = ReferenceRange::find("ptoa_8wk").unwrap();
        assert_eq!(analysis.compare(ptoa).femoral_in_range, Some(false));
    }
}
