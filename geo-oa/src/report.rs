// Report module
// Builds the structured report blocks consumed by the host's layer data panel

use geo_oa_common::{
    ReferenceRange, FEMORAL_WL_NORMAL_MAX, FEMORAL_WL_OA_MIN, TIBIAL_HW_NORMAL_MIN,
    TIBIAL_HW_OA_MAX,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::measurement::KneeAnalysis;
use crate::units::round3;

const NOT_AVAILABLE: &str = "N/A";

/// One block of a human-readable report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportBlock {
    /// Markdown-ish text
    Text { content: String },
    /// Titled label -> value table, in insertion order
    KeyValue {
        title: String,
        data: Map<String, Value>,
    },
}

impl ReportBlock {
    pub fn text(content: impl Into<String>) -> Self {
        ReportBlock::Text {
            content: content.into(),
        }
    }

    pub fn key_value(title: impl Into<String>, entries: Vec<(&str, Value)>) -> Self {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        ReportBlock::KeyValue {
            title: title.into(),
            data,
        }
    }
}

fn or_na<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or_else(|| Value::from(NOT_AVAILABLE))
}

/// Generate the report blocks for an analysis
pub fn generate_report(analysis: &KneeAnalysis) -> Vec<ReportBlock> {
    generate_report_with_reference(analysis, None)
}

/// Generate the report blocks, adding a reference population comparison when given
pub fn generate_report_with_reference(
    analysis: &KneeAnalysis,
    reference: Option<&ReferenceRange>,
) -> Vec<ReportBlock> {
    let mut blocks = Vec::new();
    let m = &analysis.measurements;

    blocks.push(ReportBlock::text(
        "## uCT OA Analysis Report\n### Tang/Yao Geometric Indices Protocol",
    ));

    if m.femoral_width_mm.is_some() {
        let femoral = analysis.femoral.as_ref();
        blocks.push(ReportBlock::key_value(
            "Distal Femur",
            vec![
                ("Width (mm)", or_na(m.femoral_width_mm.map(round3))),
                ("Length (mm)", or_na(m.femoral_length_mm.map(round3))),
                ("W/L Ratio", or_na(femoral.map(|f| f.ratio))),
                ("Status", or_na(femoral.map(|f| f.status.as_str()))),
            ],
        ));
    }

    if m.tibial_width_mm.is_some() {
        let tibial = analysis.tibial.as_ref();
        blocks.push(ReportBlock::key_value(
            "Proximal Tibia",
            vec![
                ("Width (mm)", or_na(m.tibial_width_mm.map(round3))),
                ("IIOC Height (mm)", or_na(m.iioc_height_mm.map(round3))),
                ("H/W Ratio", or_na(tibial.map(|t| t.ratio))),
                ("Status", or_na(tibial.map(|t| t.status.as_str()))),
            ],
        ));
    }

    if let Some(overall) = &analysis.overall {
        blocks.push(ReportBlock::key_value(
            "Overall Assessment",
            vec![
                ("Status", Value::from(overall.overall_status.as_str())),
                ("Description", Value::from(overall.severity_description)),
            ],
        ));
    }

    if let Some(range) = reference {
        let cmp = analysis.compare(range);
        let in_range = |v: Option<bool>| match v {
            Some(true) => Value::from("within range"),
            Some(false) => Value::from("outside range"),
            None => Value::from(NOT_AVAILABLE),
        };
        blocks.push(ReportBlock::key_value(
            format!("Reference: {}", range.description),
            vec![
                (
                    "Femoral W/L range",
                    Value::from(format!(
                        "{:.2}-{:.2}",
                        range.femoral_wl_ratio.0, range.femoral_wl_ratio.1
                    )),
                ),
                ("Femoral", in_range(cmp.femoral_in_range)),
                (
                    "Tibial H/W range",
                    Value::from(format!(
                        "{:.2}-{:.2}",
                        range.tibial_hw_ratio.0, range.tibial_hw_ratio.1
                    )),
                ),
                ("Tibial", in_range(cmp.tibial_in_range)),
            ],
        ));
    }

    blocks.push(ReportBlock::text(format!(
        "\n### Reference Thresholds\n- **Femoral W/L**: <{} normal, >{} OA\n- **Tibial H/W**: >{} normal, <{} OA\n",
        FEMORAL_WL_NORMAL_MAX, FEMORAL_WL_OA_MIN, TIBIAL_HW_NORMAL_MIN, TIBIAL_HW_OA_MAX
    )));

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{analyze, KneeMeasurements};

    fn measurements(fw: f64, fl: f64, tw: f64, th: f64) -> KneeMeasurements {
        KneeMeasurements {
            femoral_width_mm: Some(fw),
            femoral_length_mm: Some(fl),
            tibial_width_mm: Some(tw),
            iioc_height_mm: Some(th),
            voxel_size_mm: 0.0105,
        }
    }

    #[test]
    fn test_full_report_order() {
        let analysis = analyze(measurements(2.8, 2.0, 2.0, 0.5), None).unwrap();
        let blocks = generate_report(&analysis);
        assert_eq!(blocks.len(), 5);

        let titles: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                ReportBlock::KeyValue { title, .. } => Some(title.as_str()),
                ReportBlock::Text { .. } => None,
            })
            .collect();
        assert_eq!(titles, ["Distal Femur", "Proximal Tibia", "Overall Assessment"]);

        match &blocks[3] {
            ReportBlock::KeyValue { data, .. } => {
                assert_eq!(data["Status"], "OA");
                assert_eq!(
                    data["Description"],
                    "Significant OA: Both femoral and tibial indices abnormal"
                );
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_threshold_block_text() {
        let analysis = analyze(KneeMeasurements::default(), None).unwrap();
        let blocks = generate_report(&analysis);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[1],
            ReportBlock::text(
                "\n### Reference Thresholds\n- **Femoral W/L**: <1.28 normal, >1.3 OA\n- **Tibial H/W**: >0.28 normal, <0.27 OA\n"
            )
        );
    }

    #[test]
    fn test_missing_values_render_na() {
        let partial = KneeMeasurements {
            femoral_width_mm: Some(2.5),
            voxel_size_mm: 0.0105,
            ..Default::default()
        };
        let analysis = analyze(partial, None).unwrap();
        let blocks = generate_report(&analysis);
        match &blocks[1] {
            ReportBlock::KeyValue { title, data } => {
                assert_eq!(title, "Distal Femur");
                assert_eq!(data["Width (mm)"], 2.5);
                assert_eq!(data["Length (mm)"], "N/A");
                assert_eq!(data["W/L Ratio"], "N/A");
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_block_json_shape() {
        let block = ReportBlock::key_value("Overall Assessment", vec![("Status", Value::from("NORMAL"))]);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "key_value");
        assert_eq!(json["title"], "Overall Assessment");
        assert_eq!(json["data"]["Status"], "NORMAL");

        let text = serde_json::to_value(ReportBlock::text("hi")).unwrap();
        assert_eq!(text, serde_json::json!({"type": "text", "content": "hi"}));
    }

    #[test]
    fn test_reference_block() {
        let analysis = analyze(measurements(2.4, 2.0, 2.0, 0.64), None).unwrap();
        let range = ReferenceRange::find("normal_adult").unwrap();
        let blocks = generate_report_with_reference(&analysis, Some(range));
        assert_eq!(blocks.len(), 6);
        match &blocks[4] {
            ReportBlock::KeyValue { title, data } => {
                assert_eq!(title, "Reference: Normal adult mouse (5 months, C57BL/6)");
                assert_eq!(data["Femoral"], "within range");
                assert_eq!(data["Tibial"], "within range");
                assert_eq!(data["Femoral W/L range"], "1.20-1.25");
            }
            other => panic!("unexpected block {:?}", other),
        }
    }
}
