//! CLI binary for edgequake-card2csv.
//!
//! A thin shim over the library crate that reads image files, maps CLI flags
//! to `ExtractionConfig`, and writes the CSV export.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_card2csv::{
    extract_batch, read_upload, BatchOutput, BatchProgressCallback, ExtractionConfig,
    ProgressCallback, Upload, DEFAULT_MODEL, EXPORT_FILE_NAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch, one log line per card.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    fallbacks: AtomicUsize,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} cards  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            fallbacks: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_files} business cards…"))
        ));
    }

    fn on_file_start(&self, index: usize, _total: usize, filename: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, filename: &str, fallback: bool) {
        let secs = self.elapsed_secs(index);
        let mark = if fallback {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
            yellow("?")
        } else {
            green("✓")
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            mark,
            index + 1,
            total,
            filename,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, index: usize, total: usize, filename: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        self.skipped.fetch_add(1, Ordering::SeqCst);

        // Keep decoder messages to one terminal line.
        let msg = match error.char_indices().nth(80) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            filename,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, records: usize) {
        self.bar.finish_and_clear();
        let fallbacks = self.fallbacks.load(Ordering::SeqCst);
        let skipped = self.skipped.load(Ordering::SeqCst);

        if fallbacks == 0 && skipped == 0 {
            eprintln!(
                "{} {} cards extracted",
                green("✔"),
                bold(&records.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} cards extracted  ({} unreadable, {} skipped)",
                if records == 0 { red("✘") } else { cyan("⚠") },
                bold(&records.saturating_sub(fallbacks).to_string()),
                total_files,
                yellow(&fallbacks.to_string()),
                red(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a folder of cards to business_cards_extracted.csv
  card2csv cards/*.jpg

  # Choose the output file
  card2csv IMG_0001.HEIC IMG_0002.HEIC -o contacts.csv

  # Print CSV to stdout
  card2csv --stdout card.png > contacts.csv

  # Full per-file report as JSON
  card2csv --json cards/*.png > report.json

  # Another model / provider
  card2csv --provider anthropic --model claude-sonnet-4-20250514 card.jpg

SUPPORTED INPUTS:
  .png  .jpg  .jpeg   always
  .heic .heif         when built with `--features heif` (needs libheif)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter (e.g. edgequake_card2csv=debug)
"#;

/// Extract contact details from business-card images into a CSV file.
#[derive(Parser, Debug)]
#[command(
    name = "card2csv",
    version,
    about = "Extract contact details from business-card images into CSV using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Card images (png, jpg, jpeg, heic, heif), processed in the given order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write CSV to this file.
    #[arg(short, long, env = "CARD2CSV_OUTPUT", default_value = EXPORT_FILE_NAME)]
    output: PathBuf,

    /// Write CSV to stdout instead of a file.
    #[arg(long, conflicts_with = "json")]
    stdout: bool,

    /// Print the full batch report (records, fallbacks, skips) as JSON to stdout.
    #[arg(long, env = "CARD2CSV_JSON")]
    json: bool,

    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Extra attempts per card when the call or the JSON fails.
    #[arg(long, env = "CARD2CSV_RETRIES", default_value_t = 1)]
    retries: u32,

    /// JPEG quality used when normalising images (1–100).
    #[arg(long, env = "CARD2CSV_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Max LLM output tokens per card.
    #[arg(long, env = "CARD2CSV_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "CARD2CSV_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "CARD2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CARD2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CARD2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.stdout;
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

    // ── Read inputs before any network call ──────────────────────────────
    let mut uploads: Vec<Upload> = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        uploads.push(
            read_upload(path)
                .await
                .with_context(|| format!("Cannot read {}", path.display()))?,
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run batch ────────────────────────────────────────────────────────
    let output = extract_batch(&uploads, &config)
        .await
        .context("Extraction failed")?;

    // The progress callback already logged skips as they happened.
    if !show_progress && !cli.quiet {
        for skipped in output.skipped() {
            eprintln!("{} {}", red("✗"), skipped);
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if cli.stdout {
        let csv = output
            .to_csv()
            .context("CSV export failed")?
            .context("No records to export: every file failed image conversion")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(csv.as_bytes())
            .context("Failed to write to stdout")?;
    } else {
        output
            .write_csv(&cli.output)
            .with_context(|| format!("Failed to export {}", cli.output.display()))?;
    }

    if !cli.quiet {
        print_summary(&output, (!cli.stdout).then_some(&cli.output));
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(cli.model.clone())
        .retries(cli.retries)
        .jpeg_quality(cli.quality)
        .max_tokens(cli.max_tokens);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &BatchOutput, written_to: Option<&PathBuf>) {
    let stats = &output.stats;
    let target = written_to
        .map(|p| bold(&p.display().to_string()))
        .unwrap_or_else(|| "stdout".to_string());
    eprintln!(
        "{}  {} rows  {} attempts  {}ms  →  {}",
        if stats.fallbacks == 0 && stats.skipped == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        output.records.len(),
        stats.total_attempts,
        stats.duration_ms,
        target,
    );
    for (filename, cause) in output.fallbacks() {
        eprintln!("   {} {}: {}", yellow("?"), filename, dim(&cause.to_string()));
    }
}
