use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_oa::chart::create_ratio_chart;
use geo_oa::export_csv::export_csv;
use geo_oa::overlay::Overlay;
use geo_oa::report::generate_report_with_reference;
use geo_oa::{analyze, classify_femoral, classify_tibial, combine, measure_landmarks, GeoOaConfig};
use geo_oa_common::{Landmarks, ReferenceRange};

/// Compute femoral W/L and tibial H/W OA indices from uCT landmark measurements
#[derive(Parser, Debug)]
#[command(name = "geo-oa")]
#[command(about = "Knee OA geometric indices from uCT measurements", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify ratios from distances already measured in millimeters
    Classify {
        #[arg(long)]
        femoral_width: Option<f64>,
        #[arg(long)]
        femoral_length: Option<f64>,
        #[arg(long)]
        tibial_height: Option<f64>,
        #[arg(long)]
        tibial_width: Option<f64>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Measure landmarks on an image and write overlay, report, CSV and chart
    Measure {
        /// Input image file path
        #[arg(short, long)]
        input: PathBuf,
        /// Landmarks JSON file
        #[arg(short, long)]
        landmarks: PathBuf,
        /// Output path prefix
        #[arg(short, long, default_value = "output")]
        output: String,
        /// Pixel size in millimeters (overrides config)
        #[arg(long)]
        voxel_size: Option<f64>,
        /// Reference population key to compare against
        #[arg(long)]
        reference: Option<String>,
        /// Sample name recorded in the report and CSV
        #[arg(long)]
        sample: Option<String>,
    },
    /// List the reference populations
    References,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = GeoOaConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Classify {
            femoral_width,
            femoral_length,
            tibial_height,
            tibial_width,
            json,
        } => run_classify(femoral_width, femoral_length, tibial_height, tibial_width, json),
        Command::Measure {
            input,
            landmarks,
            output,
            voxel_size,
            reference,
            sample,
        } => {
            let mut config = config;
            if let Some(v) = voxel_size {
                config.voxel_size_mm = v;
                config.validate()?;
            }
            run_measure(&config, &input, &landmarks, &output, reference.as_deref(), sample)
        }
        Command::References => {
            println!("Reference populations:");
            for range in geo_oa_common::REFERENCE_RANGES {
                println!(
                    "  {:<14} W/L {:.2}-{:.2}  H/W {:.2}-{:.2}  {}",
                    range.key,
                    range.femoral_wl_ratio.0,
                    range.femoral_wl_ratio.1,
                    range.tibial_hw_ratio.0,
                    range.tibial_hw_ratio.1,
                    range.description
                );
            }
            Ok(())
        }
    }
}

fn run_classify(
    femoral_width: Option<f64>,
    femoral_length: Option<f64>,
    tibial_height: Option<f64>,
    tibial_width: Option<f64>,
    json: bool,
) -> Result<()> {
    let femoral = match (femoral_width, femoral_length) {
        (Some(w), Some(l)) => Some(classify_femoral(w, l)?),
        _ => None,
    };
    let tibial = match (tibial_height, tibial_width) {
        (Some(h), Some(w)) => Some(classify_tibial(h, w)?),
        _ => None,
    };
    if femoral.is_none() && tibial.is_none() {
        anyhow::bail!("Provide --femoral-width/--femoral-length and/or --tibial-height/--tibial-width");
    }
    let overall = match (&femoral, &tibial) {
        (Some(f), Some(t)) => Some(combine(f.raw_ratio, t.raw_ratio)),
        _ => None,
    };

    if json {
        let value = serde_json::json!({
            "femoral": femoral,
            "tibial": tibial,
            "overall": overall,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for result in femoral.iter().chain(tibial.iter()) {
        println!("{} {}: {:.3} -> {}", result.site, result.site.ratio_label(), result.ratio, result.status);
        println!("  {}", result.interpretation);
    }
    if let Some(o) = overall {
        println!("\nOverall: {}", o.overall_status);
        println!("  {}", o.severity_description);
    }
    Ok(())
}

fn run_measure(
    config: &GeoOaConfig,
    input: &Path,
    landmarks_path: &Path,
    output: &str,
    reference: Option<&str>,
    sample: Option<String>,
) -> Result<()> {
    let reference = match reference {
        Some(key) => Some(
            ReferenceRange::find(key).with_context(|| format!("Unknown reference population '{}'", key))?,
        ),
        None => None,
    };

    println!("geo-oa - uCT OA Geometric Indices");
    println!("=================================");
    println!("Input: {}", input.display());
    println!("Landmarks: {}", landmarks_path.display());
    println!("Output: {}", output);
    println!("Voxel size: {} mm", config.voxel_size_mm);
    println!();

    // Step 1: Load image and landmarks
    println!("Step 1: Loading image and landmarks...");
    let image = image::open(input).with_context(|| format!("Failed to open image {}", input.display()))?;
    let landmarks_json = fs::read_to_string(landmarks_path)
        .with_context(|| format!("Failed to read landmarks {}", landmarks_path.display()))?;
    let landmarks: Landmarks = serde_json::from_str(&landmarks_json).context("Failed to parse landmarks JSON")?;

    // Step 2: Measure and classify
    println!("\nStep 2: Measuring distances and classifying...");
    let measurements = measure_landmarks(&landmarks, config.voxel_size_mm);
    let analysis = analyze(measurements, sample)?;
    for result in analysis.femoral.iter().chain(analysis.tibial.iter()) {
        println!("  - {} {}: {:.3} ({})", result.site, result.site.ratio_label(), result.ratio, result.status);
    }
    if let Some(o) = &analysis.overall {
        println!("  - Overall: {} ({})", o.overall_status, o.severity_description);
    }

    // Step 3: Overlay
    println!("\nStep 3: Drawing measurement overlay...");
    let overlay = Overlay::from_optional_font(config.font_path.as_deref())?;
    if !overlay.has_font() {
        println!("  No font configured, labels will be omitted");
    }
    let overlay_img =
        overlay.create_measurement_overlay(&image, &landmarks, config.voxel_size_mm, config.line_width);
    let overlay_path = format!("{}_overlay.png", output);
    overlay_img.save(&overlay_path)?;
    println!("Saved overlay to: {}", overlay_path);

    // Step 4: Report
    println!("\nStep 4: Writing report...");
    let blocks = generate_report_with_reference(&analysis, reference);
    let report = serde_json::json!({
        "analysis": analysis,
        "comparison": reference.map(|r| analysis.compare(r)),
        "blocks": blocks,
    });
    let report_path = format!("{}_report.json", output);
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    println!("Saved report to: {}", report_path);

    // Step 5: CSV
    println!("\nStep 5: Exporting CSV...");
    let prefix = Path::new(output);
    let out_dir = match prefix.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    if let Some(csv_path) = export_csv(&[analysis.to_record()], &stem, &out_dir)? {
        println!("Saved CSV to: {}", csv_path.display());
    }

    // Step 6: Chart
    match (&analysis.femoral, &analysis.tibial) {
        (Some(f), Some(t)) => {
            println!("\nStep 6: Rendering ratio chart...");
            let chart_path = format!("{}_chart.svg", output);
            create_ratio_chart(f.ratio, t.ratio, reference).save(Path::new(&chart_path))?;
            println!("Saved chart to: {}", chart_path);
        }
        _ => println!("\nStep 6: Skipping ratio chart (needs both femoral and tibial ratios)"),
    }

    println!("\nDone.");
    Ok(())
}
