// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bleedwerk: print-ready pages with bleed.
//
// Entry point. Initialises logging, resolves production settings from a
// config file and flags, and dispatches the subcommand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use bleedwerk_core::{Color, FitMode, PaperSize, ProductionConfig};
use bleedwerk_document::preview::save_preview;
use bleedwerk_document::{BleedPipeline, PageComposer, PdfSource, PdfiumRasterizer, TestCard};

#[derive(Parser)]
#[command(name = "bleedwerk", version, about = "Scale artwork to a print format and add bleed")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose every page to the print format, add bleed and write one PDF.
    Process {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        target: TargetArgs,
        /// Also write a PNG preview of the first composed page.
        #[arg(long)]
        preview: Option<PathBuf>,
        /// Write per-page decisions as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Also write a proof PDF with the cutting band and cut line drawn in.
        #[arg(long)]
        cut_preview: Option<PathBuf>,
        /// Width of the cutting band in millimetres.
        #[arg(long, default_value_t = 3.0, requires = "cut_preview")]
        cut_tolerance: f32,
    },
    /// Print the detected border of one page as JSON.
    Analyze {
        input: PathBuf,
        /// 1-indexed page number.
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Write a calibration card with a known border.
    Testcard {
        output: PathBuf,
        #[arg(long, default_value_t = 148.0)]
        width: f32,
        #[arg(long, default_value_t = 105.0)]
        height: f32,
        /// Border width in millimetres.
        #[arg(long, default_value_t = 6.0)]
        border: f32,
        /// Border color as `rrggbb`.
        #[arg(long, default_value = "00a050")]
        color: String,
        #[arg(long)]
        no_grid: bool,
    },
    /// Write the default production settings to a JSON file.
    InitConfig { path: PathBuf },
}

/// Format, bleed and analysis overrides shared by `process` and `analyze`.
#[derive(Args, Debug)]
struct TargetArgs {
    /// Production settings file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
    /// ISO A-series format name, e.g. `A6`.
    #[arg(long)]
    format: Option<String>,
    /// Lay the format out with the long edge vertical.
    #[arg(long)]
    portrait: bool,
    /// Custom nominal width in millimetres.
    #[arg(long, requires = "height")]
    width: Option<f32>,
    /// Custom nominal height in millimetres.
    #[arg(long, requires = "width")]
    height: Option<f32>,
    /// Bleed per side in millimetres.
    #[arg(long)]
    bleed: Option<f32>,
    /// Analysis resolution.
    #[arg(long)]
    dpi: Option<f32>,
    /// Allow a quarter turn when it fits the format better.
    #[arg(long)]
    rotate: bool,
    /// Cover the whole format, cropping overflow, instead of fitting inside.
    #[arg(long)]
    fill: bool,
    /// Directory holding the PDFium shared library.
    #[arg(long, env = "BLEEDWERK_PDFIUM_DIR")]
    pdfium_dir: Option<PathBuf>,
}

impl TargetArgs {
    /// Settings file (or defaults) with command-line overrides applied.
    fn production_config(&self) -> Result<ProductionConfig> {
        let mut config = match &self.config {
            Some(path) => ProductionConfig::load(path)
                .with_context(|| format!("cannot load settings from {}", path.display()))?,
            None => ProductionConfig::default(),
        };

        if let Some(name) = &self.format {
            config.format = PaperSize::from_name(name)
                .with_context(|| format!("unknown paper format '{name}'"))?;
        }
        if self.portrait {
            config.landscape = false;
        }
        if let (Some(width_mm), Some(height_mm)) = (self.width, self.height) {
            config.format = PaperSize::Custom {
                width_mm,
                height_mm,
            };
            config.landscape = width_mm >= height_mm;
        }
        if let Some(bleed) = self.bleed {
            config.bleed_mm = bleed;
        }
        if let Some(dpi) = self.dpi {
            config.analysis.dpi = dpi;
        }
        if self.rotate {
            config.analysis.allow_rotation = true;
        }
        if self.fill {
            config.analysis.fit_mode = FitMode::Fill;
        }

        config.bleed_spec().validate()?;
        Ok(config)
    }

    fn rasterizer(&self) -> Result<PdfiumRasterizer> {
        let rasterizer = match &self.pdfium_dir {
            Some(dir) => PdfiumRasterizer::with_library_dir(dir),
            None => PdfiumRasterizer::new(),
        };
        rasterizer.context("PDFium is required for page analysis")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Process {
            input,
            output,
            target,
            preview,
            report,
            cut_preview,
            cut_tolerance,
        } => process(
            &input,
            &output,
            &target,
            Outputs {
                preview: preview.as_deref(),
                report: report.as_deref(),
                cut_preview: cut_preview.as_deref().map(|path| (path, cut_tolerance)),
            },
        ),
        Command::Analyze {
            input,
            page,
            target,
        } => analyze(&input, page, &target),
        Command::Testcard {
            output,
            width,
            height,
            border,
            color,
            no_grid,
        } => testcard(&output, width, height, border, &color, no_grid),
        Command::InitConfig { path } => {
            ProductionConfig::default().save(&path)?;
            info!(path = %path.display(), "Default settings written");
            Ok(())
        }
    }
}

/// Optional side outputs of `process`.
struct Outputs<'a> {
    preview: Option<&'a Path>,
    report: Option<&'a Path>,
    /// Proof path and cutting band width in millimetres.
    cut_preview: Option<(&'a Path, f32)>,
}

fn process(input: &Path, output: &Path, target: &TargetArgs, outputs: Outputs<'_>) -> Result<()> {
    let config = target.production_config()?;
    let (nominal, bleed) = (config.nominal_spec(), config.bleed_spec());
    let source = PdfSource::open(input)?;
    let pipeline = BleedPipeline::new(target.rasterizer()?);

    info!(
        input = %input.display(),
        pages = source.page_count(),
        width_mm = nominal.width_mm,
        height_mm = nominal.height_mm,
        bleed_mm = bleed.bleed_mm,
        "Processing"
    );

    if let Some(path) = outputs.preview {
        let image = pipeline.composer().preview(&source.page(1)?, &nominal)?;
        save_preview(&image, path)?;
        info!(path = %path.display(), "Preview written");
    }

    let batch = pipeline.process_document(&source, &nominal, &bleed);
    for (page, err) in batch.failures() {
        error!(page, %err, "Page not processed");
    }
    if let Some(path) = outputs.report {
        std::fs::write(path, serde_json::to_string_pretty(&batch.summary())?)
            .with_context(|| format!("cannot write report {}", path.display()))?;
    }
    if let Some((path, tolerance_mm)) = outputs.cut_preview
        && batch.succeeded() > 0
    {
        std::fs::write(path, batch.cut_preview(tolerance_mm)?)
            .with_context(|| format!("cannot write cut preview {}", path.display()))?;
        info!(path = %path.display(), tolerance_mm, "Cut preview written");
    }

    let total = batch.pages.len();
    let succeeded = batch.succeeded();
    batch.write_document(output)?;
    info!(output = %output.display(), pages = succeeded, "Print file written");

    if succeeded < total {
        bail!("{} of {} pages could not be processed", total - succeeded, total);
    }
    Ok(())
}

fn analyze(input: &Path, page: u32, target: &TargetArgs) -> Result<()> {
    let spec = target.production_config()?.nominal_spec();
    let source = PdfSource::open(input)?;
    let composer = PageComposer::new(target.rasterizer()?);
    let report = composer.analyze(&source.page(page)?, &spec)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn testcard(
    output: &Path,
    width: f32,
    height: f32,
    border: f32,
    color: &str,
    no_grid: bool,
) -> Result<()> {
    let color = Color::from_hex(color).with_context(|| format!("invalid color '{color}'"))?;
    if !(width > 0.0 && height > 0.0 && border >= 0.0) {
        bail!("card size must be positive and border non-negative");
    }
    let mut card = TestCard::new(width, height, border).with_border_color(color);
    if no_grid {
        card = card.without_grid();
    }
    std::fs::write(output, card.to_pdf_bytes()?)
        .with_context(|| format!("cannot write {}", output.display()))?;
    info!(path = %output.display(), "Test card written");
    Ok(())
}
