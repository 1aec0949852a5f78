//! CLI binary for formula-scan.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DetectionConfig` and prints candidates.

use anyhow::{Context, Result};
use clap::Parser;
use formula_scan::{
    detect_file, inspect, CandidateReport, CandidateSource, DetectionConfig, DetectionOutput,
    DetectionProgressCallback, DetectionStats, PageSelection, ProgressCallback, RegionError,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live page bar plus one log line per page
/// that produced candidates or lost regions.
struct CliProgressCallback {
    bar: ProgressBar,
    region_errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_detection_start` supplies the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            region_errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Scanning");
    }
}

impl DetectionProgressCallback for CliProgressCallback {
    fn on_detection_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Scanning {total_pages} pages for formulas…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_region_error(&self, _page_num: usize, error: &RegionError) {
        self.region_errors.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} {}", yellow("⚠"), dim(&error.to_string())));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, candidates: usize) {
        if candidates > 0 {
            self.bar.println(format!(
                "  {} Page {:>3}/{:<3}  {}",
                green("✓"),
                page_num,
                total,
                dim(&format!("{candidates} candidates")),
            ));
        }
        self.bar.inc(1);
    }

    fn on_detection_complete(&self, total_pages: usize, total_candidates: usize) {
        self.bar.finish_and_clear();
        let failed = self.region_errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {} candidates on {} pages{}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&total_candidates.to_string()),
            total_pages,
            if failed == 0 {
                String::new()
            } else {
                format!("  ({} regions skipped)", yellow(&failed.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # List formula candidates
  formula-scan paper.pdf

  # Only strong candidates on pages 3-10, exported as PNGs
  formula-scan --pages 3-10 --min-confidence 0.5 --export-dir formulas/ paper.pdf

  # JSON with embedded PNG data URIs, ready for a recognition service
  formula-scan --json --include-images paper.pdf > candidates.json

  # Stricter image acceptance, looser colour gate
  formula-scan --image-threshold 0.45 --color-threshold 15 scan.pdf

  # Page count and metadata only
  formula-scan --inspect-only paper.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH      Path to libpdfium (file or directory)
  RUST_LOG             Overrides -v / -q log filtering
  FORMULA_SCAN_*       Every flag has an env var, e.g. FORMULA_SCAN_PAGES
"#;

/// Find probable mathematical formulas in PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "formula-scan",
    version,
    about = "Find probable mathematical formulas in PDF documents",
    long_about = "Scan PDF text and embedded images for regions that look like mathematical \
formulas. Text is matched against LaTeX/operator/Unicode-math patterns; images are screened \
by a colour gate and scored on background, shape, component and edge density.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "FORMULA_SCAN_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "FORMULA_SCAN_PASSWORD")]
    password: Option<String>,

    /// Only report candidates at or above this confidence.
    #[arg(long, env = "FORMULA_SCAN_MIN_CONFIDENCE", default_value_t = 0.0)]
    min_confidence: f64,

    /// Output structured JSON instead of one line per candidate.
    #[arg(long, env = "FORMULA_SCAN_JSON")]
    json: bool,

    /// Embed each candidate as a PNG data URI in JSON output.
    #[arg(long, env = "FORMULA_SCAN_INCLUDE_IMAGES", requires = "json")]
    include_images: bool,

    /// Write each reported candidate to DIR/formula_{n}.png.
    #[arg(long, env = "FORMULA_SCAN_EXPORT_DIR", value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Font used to rasterise text candidates (repeatable; tried in order).
    #[arg(long = "font", env = "FORMULA_SCAN_FONT", value_name = "PATH")]
    fonts: Vec<PathBuf>,

    /// Pixel intensity above which a pixel counts as white background (0–255).
    #[arg(long, env = "FORMULA_SCAN_NEAR_WHITE", default_value_t = 240)]
    near_white: u8,

    /// Mean channel difference above which an image is treated as colour.
    #[arg(long, env = "FORMULA_SCAN_COLOR_THRESHOLD", default_value_t = 10.0)]
    color_threshold: f64,

    /// Height/width ratio that scores best on the aspect feature.
    #[arg(long, env = "FORMULA_SCAN_ASPECT_TARGET", default_value_t = 1.0)]
    aspect_target: f64,

    /// Ink-component count at which the component score saturates.
    #[arg(long, env = "FORMULA_SCAN_COMPONENT_DIVISOR", default_value_t = 6.0)]
    component_divisor: f64,

    /// Multiplier applied to the edge-pixel ratio.
    #[arg(long, env = "FORMULA_SCAN_EDGE_SCALE", default_value_t = 4.0)]
    edge_scale: f64,

    /// Fused image score an image must exceed to be accepted.
    #[arg(long, env = "FORMULA_SCAN_IMAGE_THRESHOLD", default_value_t = 0.3)]
    image_threshold: f64,

    /// Print page count and metadata only, no scanning.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FORMULA_SCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "FORMULA_SCAN_QUIET")]
    quiet: bool,
}

/// JSON document printed by `--json`.
#[derive(Serialize)]
struct JsonOutput<'a> {
    candidates: Vec<CandidateReport>,
    region_errors: &'a [RegionError],
    stats: &'a DetectionStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v asks for them.
    let show_progress = !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
            if let Some(ref p) = info.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn DetectionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run detection ────────────────────────────────────────────────────
    let output = detect_file(&cli.input, &config)
        .await
        .context("Detection failed")?;
    let selected = retain_confident(output, cli.min_confidence);

    if let Some(ref dir) = cli.export_dir {
        let written = selected
            .export_pngs(dir)
            .context("Failed to export candidate images")?;
        if !cli.quiet {
            eprintln!(
                "{} {} images → {}",
                green("✔"),
                written.len(),
                bold(&dir.display().to_string())
            );
        }
    }

    if cli.json {
        let doc = JsonOutput {
            candidates: selected.reports(cli.include_images),
            region_errors: &selected.region_errors,
            stats: &selected.stats,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("Failed to serialise output")?
        );
    } else {
        for (i, c) in selected.candidates.iter().enumerate() {
            let b = &c.bbox;
            let label = match c.text() {
                Some(text) => format!("{:?}", text),
                None => format!("{}x{} px", c.pixels().width(), c.pixels().height()),
            };
            println!(
                "{:>4}  p{:<4} {:<5}  {:.3}  [{:.1}, {:.1}, {:.1}, {:.1}]  {}",
                i + 1,
                c.page,
                format!("{:?}", c.source()).to_lowercase(),
                c.confidence,
                b.x0,
                b.y0,
                b.x1,
                b.y1,
                label
            );
        }

        if !cli.quiet && !show_progress {
            let s = &selected.stats;
            eprintln!(
                "Scanned {}/{} pages in {}ms: {} candidates ({} text, {} image), {} regions skipped",
                s.pages_scanned,
                s.total_pages,
                s.duration_ms,
                selected.candidates.len(),
                s.text_candidates,
                s.image_candidates,
                s.region_failures
            );
        }
    }

    Ok(())
}

/// Drop candidates under `min_confidence`, keeping order.
///
/// Candidate counts in `stats` are recomputed to match what is kept; the
/// other counters still describe the whole scan.
fn retain_confident(mut output: DetectionOutput, min_confidence: f64) -> DetectionOutput {
    output.candidates.retain(|c| c.confidence >= min_confidence);
    let text = output
        .candidates
        .iter()
        .filter(|c| c.source() == CandidateSource::Text)
        .count();
    output.stats.text_candidates = text;
    output.stats.image_candidates = output.candidates.len() - text;
    output
}

/// Map CLI args to `DetectionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DetectionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = DetectionConfig::builder()
        .pages(pages)
        .near_white_threshold(cli.near_white)
        .color_threshold(cli.color_threshold)
        .aspect_target(cli.aspect_target)
        .component_divisor(cli.component_divisor)
        .edge_scale(cli.edge_scale)
        .image_accept_threshold(cli.image_threshold);

    for font in &cli.fonts {
        builder = builder.font_path(font);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
