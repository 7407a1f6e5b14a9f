// Toolkit module
// OA extension over the host client: classify, measure, and publish results to the host UI

use geo_oa_common::{Landmarks, ReferenceRange};
use image::DynamicImage;
use serde_json::Map;

use crate::chart::create_ratio_chart;
use crate::classifier::{self, OverallAssessment, SiteResult};
use crate::config::GeoOaConfig;
use crate::error::{GeoOaError, Result};
use crate::host::{HostClient, HostPlatform, LayerData, PlotData};
use crate::measurement::{analyze, measure_landmarks, KneeAnalysis};
use crate::overlay::Overlay;
use crate::report::generate_report_with_reference;

pub const OVERLAY_LAYER: &str = "OA Overlay";
pub const REPORT_LAYER: &str = "OA Measurements";
pub const CHART_NAME: &str = "OA Ratio Chart";

/// Knee OA analysis extension bound to a host
pub struct GeoOa<H: HostPlatform> {
    client: HostClient<H>,
    config: GeoOaConfig,
    overlay: Overlay,
    reference: Option<&'static ReferenceRange>,
}

impl<H: HostPlatform> GeoOa<H> {
    pub fn new(host: H, config: GeoOaConfig) -> Result<Self> {
        config.validate()?;
        let overlay = Overlay::from_optional_font(config.font_path.as_deref())?;
        Ok(Self {
            client: HostClient::new(host, &config),
            config,
            overlay,
            reference: None,
        })
    }

    /// Compare every subsequent analysis against a reference population
    pub fn set_reference(&mut self, key: &str) -> Result<()> {
        let range = ReferenceRange::find(key)
            .ok_or_else(|| GeoOaError::InvalidInput(format!("unknown reference range '{}'", key)))?;
        self.reference = Some(range);
        Ok(())
    }

    pub fn reference(&self) -> Option<&'static ReferenceRange> {
        self.reference
    }

    pub fn config(&self) -> &GeoOaConfig {
        &self.config
    }

    pub fn client(&self) -> &HostClient<H> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut HostClient<H> {
        &mut self.client
    }

    pub fn calculate_femoral_index(&self, width_mm: f64, length_mm: f64) -> Result<SiteResult> {
        classifier::classify_femoral(width_mm, length_mm)
    }

    pub fn calculate_tibial_index(&self, height_mm: f64, width_mm: f64) -> Result<SiteResult> {
        classifier::classify_tibial(height_mm, width_mm)
    }

    pub fn combined_assessment(&self, femoral_ratio: f64, tibial_ratio: f64) -> OverallAssessment {
        classifier::combine(femoral_ratio, tibial_ratio)
    }

    /// Measure landmarks on an image and publish the overlay, report and chart
    ///
    /// The chart is only attached when both sites could be classified.
    pub fn analyze_image(
        &mut self,
        image: &DynamicImage,
        landmarks: &Landmarks,
        sample: Option<String>,
        target_file: Option<&str>,
    ) -> Result<KneeAnalysis> {
        let voxel = self.config.voxel_size_mm;
        let measurements = measure_landmarks(landmarks, voxel);
        let analysis = analyze(measurements, sample)?;

        let overlay =
            self.overlay
                .create_measurement_overlay(image, landmarks, voxel, self.config.line_width);
        self.client
            .add_layer(OVERLAY_LAYER, None, LayerData::Image(overlay), target_file, Map::new())
            .map_err(|e| GeoOaError::Host(e.to_string()))?;

        let blocks = generate_report_with_reference(&analysis, self.reference);
        self.client.report_layer_data(REPORT_LAYER, blocks, target_file);

        if let (Some(f), Some(t)) = (&analysis.femoral, &analysis.tibial) {
            let chart = create_ratio_chart(f.ratio, t.ratio, self.reference);
            self.client
                .add_related_plot(CHART_NAME, PlotData::Chart(chart), target_file)
                .map_err(|e| GeoOaError::Host(e.to_string()))?;
        }

        log::info!(
            "Analyzed {}: {} action(s) pending",
            target_file.unwrap_or("image"),
            self.client.queue().len()
        );
        Ok(analysis)
    }

    /// Analyze the host's active image
    pub fn analyze_active_image(&mut self, landmarks: &Landmarks, sample: Option<String>) -> Result<KneeAnalysis> {
        let image = self.client.get_active_image()?;
        let target = self.client.host().active_file().map(|f| f.name);
        self.analyze_image(&image, landmarks, sample, target.as_deref())
    }
}
