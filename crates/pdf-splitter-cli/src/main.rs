//! PDF Splitter CLI - Merge PDF files and split the result into size-limited parts.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_splitter_core::{
    AppConfig, CompressionMode, MergeOutcome, MergeSession, MergeSplitter, MergeSummary,
    SessionEvent, SessionUpdate, SourceFile, SplitPlan, format_file_size, parse_byte_size,
};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressOption {
    Off,
    Always,
    Fallback,
}

impl From<CompressOption> for CompressionMode {
    fn from(opt: CompressOption) -> Self {
        match opt {
            CompressOption::Off => Self::Off,
            CompressOption::Always => Self::Always,
            CompressOption::Fallback => Self::Fallback,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-merge-split")]
#[command(author, version, about = "Merge PDF files and split the result into size-limited parts", long_about = None)]
struct Args {
    /// Input PDF files, merged in the given order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for the merged file and its parts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Split the merged file when it is larger than this (e.g. "20MB")
    #[arg(long, env = "PDF_SPLITTER_MERGE_LIMIT")]
    merge_limit: Option<String>,

    /// Maximum size of each part (e.g. "18MB")
    #[arg(long, env = "PDF_SPLITTER_PART_SIZE")]
    part_size: Option<String>,

    /// Percentage of the part size to actually fill (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    margin: Option<u8>,

    /// Stream compression for parts
    #[arg(long, value_enum)]
    compress: Option<CompressOption>,

    /// Give up on splitting after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable measurement caching
    #[arg(long)]
    no_cache: bool,

    /// Compute the split plan without writing any files
    #[arg(long)]
    dry_run: bool,

    /// Print the split plan as JSON
    #[arg(long)]
    json: bool,
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut AppConfig, args: &Args) -> Result<()> {
    if let Some(ref limit) = args.merge_limit {
        config.limits.merge_limit_bytes =
            parse_byte_size(limit).context("Invalid --merge-limit")?;
    }
    if let Some(ref size) = args.part_size {
        config.limits.part_size_bytes = parse_byte_size(size).context("Invalid --part-size")?;
    }
    if let Some(margin) = args.margin {
        config.limits.safety_margin_percent = margin;
    }
    if let Some(compress) = args.compress {
        config.limits.compression = compress.into();
    }
    if let Some(timeout) = args.timeout_secs {
        config.limits.timeout_seconds = timeout;
    }
    if args.no_cache {
        config.cache.enabled = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// Read the inputs into a session, skipping anything that is not a PDF
fn select_files(inputs: &[PathBuf]) -> Result<MergeSession> {
    let files = inputs
        .iter()
        .map(|path| {
            SourceFile::from_path(path).context(format!("Failed to read {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut session = MergeSession::new();
    if let SessionUpdate::FilesAdded { accepted, rejected } =
        session.handle(SessionEvent::AddFiles(files))?
    {
        info!("Selected {} PDF files", accepted.len());
        for name in rejected {
            warn!("Skipping {}: not a PDF file", name);
        }
    }

    if !session.can_merge() {
        anyhow::bail!("No PDF files to merge");
    }
    Ok(session)
}

fn summary_lines(summary: &MergeSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Files merged: {}", summary.files),
        format!("Total pages uploaded: {}", summary.uploaded_pages),
        format!("Total pages in merged PDF: {}", summary.merged_pages),
    ];
    if summary.pages_match() {
        lines.push("All pages merged successfully".to_string());
    } else {
        lines.push("Warning: page count mismatch".to_string());
    }
    lines.push(format!(
        "Merged file size: {}",
        format_file_size(summary.merged_size)
    ));
    lines
}

fn plan_lines(plan: &SplitPlan, prefix: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "Split into {} parts (limit {} each):",
        plan.len(),
        format_file_size(plan.ceiling())
    )];
    for group in plan.groups() {
        let marker = if group.oversized {
            " [exceeds limit]"
        } else {
            ""
        };
        lines.push(format!(
            "  {prefix}{}.pdf  pages {}  {}{marker}",
            group.index,
            group.page_range_label(),
            format_file_size(group.size)
        ));
    }
    lines
}

/// Everything printed to stdout before parts are written
struct Report<'a> {
    summary: &'a MergeSummary,
    merged_path: Option<&'a Path>,
    merge_limit: u64,
    plan: Option<&'a SplitPlan>,
    part_prefix: &'a str,
}

impl Report<'_> {
    /// Human-readable lines, or only the plan JSON when `json` is set.
    fn lines(&self, json: bool) -> Result<Vec<String>> {
        if json {
            return Ok(match self.plan {
                Some(plan) => vec![plan.to_json()?],
                None => Vec::new(),
            });
        }

        let mut lines = summary_lines(self.summary);
        if let Some(path) = self.merged_path {
            lines.push(format!("Merged PDF saved to: {}", path.display()));
        }
        match self.plan {
            Some(plan) => lines.extend(plan_lines(plan, self.part_prefix)),
            None => lines.push(format!(
                "Merged file is within the {} limit, no split needed",
                format_file_size(self.merge_limit)
            )),
        }
        Ok(lines)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).context(format!("Failed to write output: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    apply_overrides(&mut config, &args)?;

    let session = select_files(&args.inputs)?;
    let splitter = MergeSplitter::new(config).context("Failed to initialize splitter")?;
    let output = splitter.config().output.clone();

    let MergeOutcome { document, summary } = splitter
        .merge(session.files())
        .context("Failed to merge PDF files")?;

    let merged_path = if args.dry_run {
        None
    } else {
        std::fs::create_dir_all(&args.output_dir).context(format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        ))?;
        let path = args.output_dir.join(&output.merged_file_name);
        write_file(&path, document.bytes())?;
        Some(path)
    };

    let plan = if splitter.needs_split(&document) {
        Some(
            splitter
                .plan(&document)
                .await
                .context("Failed to split merged PDF")?,
        )
    } else {
        None
    };

    let report = Report {
        summary: &summary,
        merged_path: merged_path.as_deref(),
        merge_limit: splitter.config().limits.merge_limit_bytes,
        plan: plan.as_ref(),
        part_prefix: &output.part_prefix,
    };

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        for line in report.lines(args.json)? {
            println!("{line}");
        }
    }

    let Some(plan) = plan else {
        return Ok(());
    };

    if args.dry_run {
        return Ok(());
    }

    // Setup progress bar
    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(plan.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let progress = pb.clone();
    let parts = splitter
        .render_parts(
            &document,
            &plan,
            Some(Box::new(move |done, _total| {
                progress.set_position(u64::try_from(done).unwrap_or(u64::MAX));
            })),
        )
        .await
        .context("Failed to write split parts")?;

    pb.finish_with_message("Split complete");

    for part in &parts {
        write_file(&args.output_dir.join(&part.file_name), &part.bytes)?;
    }

    if !args.json {
        #[allow(clippy::print_stdout)]
        {
            println!(
                "Saved {} parts to: {}",
                parts.len(),
                args.output_dir.display()
            );
        }
    }

    Ok(())
}
