// Ratio chart module
// Renders the femoral and tibial ratios against their threshold zones as an SVG figure

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use geo_oa_common::{
    ReferenceRange, Site, FEMORAL_WL_NORMAL_MAX, FEMORAL_WL_OA_MIN, TIBIAL_HW_NORMAL_MIN,
    TIBIAL_HW_OA_MAX,
};

use crate::error::Result;

const PANEL_WIDTH: f64 = 500.0;
const FIGURE_HEIGHT: f64 = 400.0;
const PLOT_LEFT: f64 = 50.0;
const PLOT_RIGHT: f64 = 470.0;
const PLOT_TOP: f64 = 70.0;
const PLOT_BOTTOM: f64 = 330.0;

const ZONE_NORMAL: &str = "green";
const ZONE_BORDERLINE: &str = "orange";
const ZONE_OA: &str = "red";

/// A rendered two-panel ratio chart
#[derive(Debug, Clone, PartialEq)]
pub struct RatioChart {
    svg: String,
}

impl RatioChart {
    pub fn as_svg(&self) -> &str {
        &self.svg
    }

    pub fn into_svg(self) -> String {
        self.svg
    }

    /// Write the SVG document to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.svg)?;
        log::info!("Saved ratio chart to: {}", path.display());
        Ok(())
    }
}

/// One panel: axis range and the three colored zones in axis order
struct Panel {
    site: Site,
    title: String,
    axis: (f64, f64),
    /// (from, to, color, label)
    zones: [(f64, f64, &'static str, &'static str); 3],
    normal_threshold: f64,
    oa_threshold: f64,
    value: f64,
}

/// Create a chart comparing measured ratios with the OA threshold zones
///
/// When a reference population is given its expected interval is drawn as a
/// hatched band on each panel.
pub fn create_ratio_chart(
    femoral_ratio: f64,
    tibial_ratio: f64,
    reference: Option<&ReferenceRange>,
) -> RatioChart {
    let femoral = Panel {
        site: Site::Femoral,
        title: format!("Femoral W/L Ratio: {:.3}", femoral_ratio),
        axis: (1.0, 1.8),
        zones: [
            (f64::MIN, FEMORAL_WL_NORMAL_MAX, ZONE_NORMAL, "Normal"),
            (FEMORAL_WL_NORMAL_MAX, FEMORAL_WL_OA_MIN, ZONE_BORDERLINE, "Borderline"),
            (FEMORAL_WL_OA_MIN, f64::MAX, ZONE_OA, "OA"),
        ],
        normal_threshold: FEMORAL_WL_NORMAL_MAX,
        oa_threshold: FEMORAL_WL_OA_MIN,
        value: femoral_ratio,
    };

    // Zones are reversed for the tibia: lower ratios are worse
    let tibial = Panel {
        site: Site::Tibial,
        title: format!("Tibial H/W Ratio: {:.3}", tibial_ratio),
        axis: (0.1, 0.45),
        zones: [
            (f64::MIN, TIBIAL_HW_OA_MAX, ZONE_OA, "OA"),
            (TIBIAL_HW_OA_MAX, TIBIAL_HW_NORMAL_MIN, ZONE_BORDERLINE, "Borderline"),
            (TIBIAL_HW_NORMAL_MIN, f64::MAX, ZONE_NORMAL, "Normal"),
        ],
        normal_threshold: TIBIAL_HW_NORMAL_MIN,
        oa_threshold: TIBIAL_HW_OA_MAX,
        value: tibial_ratio,
    };

    let mut svg = String::new();
    let width = PANEL_WIDTH * 2.0;

    // Writing into a String cannot fail
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        width, FIGURE_HEIGHT, width, FIGURE_HEIGHT
    );
    let _ = writeln!(svg, "  <title>OA Geometric Indices</title>");
    let _ = writeln!(svg, "  <defs>");
    let _ = writeln!(
        svg,
        r#"    <pattern id="ref-hatch" width="8" height="8" patternUnits="userSpaceOnUse" patternTransform="rotate(45)"><line x1="0" y1="0" x2="0" y2="8" stroke="black" stroke-width="1.5" /></pattern>"#
    );
    let _ = writeln!(svg, "  </defs>");
    let _ = writeln!(
        svg,
        r#"  <rect x="0" y="0" width="{}" height="{}" fill="white" />"#,
        width, FIGURE_HEIGHT
    );

    for (idx, panel) in [femoral, tibial].iter().enumerate() {
        write_panel(&mut svg, panel, idx as f64 * PANEL_WIDTH, reference);
    }

    let _ = writeln!(svg, "</svg>");

    RatioChart { svg }
}

fn write_panel(svg: &mut String, panel: &Panel, offset_x: f64, reference: Option<&ReferenceRange>) {
    let (min, max) = panel.axis;
    let left = offset_x + PLOT_LEFT;
    let right = offset_x + PLOT_RIGHT;
    let to_x = |v: f64| left + (v.clamp(min, max) - min) / (max - min) * (right - left);
    let plot_height = PLOT_BOTTOM - PLOT_TOP;

    let _ = writeln!(svg, r#"  <g id="{}-panel">"#, panel.site.to_string().to_lowercase().replace(' ', "-"));
    let _ = writeln!(
        svg,
        r#"    <text x="{:.1}" y="40" font-family="sans-serif" font-size="16" text-anchor="middle">{}</text>"#,
        (left + right) / 2.0,
        panel.title
    );

    for (from, to, color, _) in &panel.zones {
        let x1 = to_x(*from);
        let x2 = to_x(*to);
        if x2 > x1 {
            let _ = writeln!(
                svg,
                r#"    <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" fill-opacity="0.3" />"#,
                x1, PLOT_TOP, x2 - x1, plot_height, color
            );
        }
    }

    if let Some(range) = reference {
        let (lo, hi) = range.interval(panel.site);
        let x1 = to_x(lo);
        let x2 = to_x(hi);
        let _ = writeln!(
            svg,
            r#"    <rect class="reference" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="url(#ref-hatch)" fill-opacity="0.4" stroke="black" stroke-width="0.5" />"#,
            x1, PLOT_TOP, (x2 - x1).max(0.0), plot_height
        );
    }

    // Measured value bar
    let bar_height = plot_height * 0.5;
    let bar_y = PLOT_TOP + (plot_height - bar_height) / 2.0;
    let _ = writeln!(
        svg,
        r#"    <rect class="measured" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="blue" />"#,
        left,
        bar_y,
        to_x(panel.value) - left,
        bar_height
    );

    for (threshold, color) in [
        (panel.normal_threshold, ZONE_NORMAL),
        (panel.oa_threshold, ZONE_OA),
    ] {
        let x = to_x(threshold);
        let _ = writeln!(
            svg,
            r#"    <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="2" stroke-dasharray="6,4" />"#,
            x, PLOT_TOP, x, PLOT_BOTTOM, color
        );
    }

    // Axis with ticks at the range ends and thresholds
    let _ = writeln!(
        svg,
        r#"    <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="black" stroke-width="1" />"#,
        left, PLOT_BOTTOM, right, PLOT_BOTTOM
    );
    for tick in [min, panel.oa_threshold.min(panel.normal_threshold), panel.oa_threshold.max(panel.normal_threshold), max] {
        let _ = writeln!(
            svg,
            r#"    <text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="11" text-anchor="middle">{:.2}</text>"#,
            to_x(tick),
            PLOT_BOTTOM + 16.0,
            tick
        );
    }
    let _ = writeln!(
        svg,
        r#"    <text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="12" text-anchor="middle">Ratio</text>"#,
        (left + right) / 2.0,
        PLOT_BOTTOM + 36.0
    );

    // Legend
    let mut legend_y = PLOT_TOP + 12.0;
    for (_, _, color, label) in &panel.zones {
        write_legend_entry(svg, right - 110.0, legend_y, &format!(r#"fill="{}" fill-opacity="0.3""#, color), label);
        legend_y += 16.0;
    }
    if let Some(range) = reference {
        write_legend_entry(svg, right - 110.0, legend_y, r#"fill="url(#ref-hatch)""#, range.key);
    }

    let _ = writeln!(svg, "  </g>");
}

fn write_legend_entry(svg: &mut String, x: f64, y: f64, fill: &str, label: &str) {
    let _ = writeln!(
        svg,
        r#"    <rect x="{:.2}" y="{:.2}" width="12" height="10" {} />"#,
        x,
        y - 9.0,
        fill
    );
    let _ = writeln!(
        svg,
        r#"    <text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="11">{}</text>"#,
        x + 16.0,
        y,
        label
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_titles_and_structure() {
        let chart = create_ratio_chart(1.2345, 0.3, None);
        let svg = chart.as_svg();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Femoral W/L Ratio: 1.234") || svg.contains("Femoral W/L Ratio: 1.235"));
        assert!(svg.contains("Tibial H/W Ratio: 0.300"));
        assert!(svg.contains(r#"<g id="distal-femur-panel">"#));
        assert!(svg.contains(r#"<g id="proximal-tibia-panel">"#));
        assert_eq!(svg.matches(r#"class="measured""#).count(), 2);
        assert_eq!(svg.matches(r#"class="reference""#).count(), 0);
    }

    #[test]
    fn test_reference_band_is_drawn() {
        let range = ReferenceRange::find("aroa_28mo").unwrap();
        let svg = create_ratio_chart(1.4, 0.25, Some(range)).into_svg();
        assert_eq!(svg.matches(r#"class="reference""#).count(), 2);
        assert!(svg.contains(">aroa_28mo</text>"));
    }

    #[test]
    fn test_out_of_axis_value_is_clamped() {
        let svg = create_ratio_chart(5.0, -1.0, None).into_svg();
        // femoral bar spans the whole plot width, tibial bar collapses to zero
        assert!(svg.contains(&format!(
            r#"class="measured" x="{:.2}" y="135.00" width="{:.2}""#,
            PLOT_LEFT,
            PLOT_RIGHT - PLOT_LEFT
        )));
        assert!(svg.contains(r#"width="0.00" height="130.00" fill="blue""#));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let chart = create_ratio_chart(1.29, 0.275, None);
        chart.save(&path).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), chart.as_svg());
    }
}
