use crate::config::{default_columns, GeneratorConfig};
use crate::generator::{validate_output, GenerationMetrics, Generator, ProgressEvent};
use crate::progress::RunProgress;
use anyhow::Context;
use clap::Args;
use schemars::JsonSchema;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Configuration file (.yaml, .yml or .json); built-in columns when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory for day files
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Approximate rows per day
    #[arg(short, long)]
    pub rows: Option<u64>,

    /// Number of days to generate
    #[arg(short, long)]
    pub days: Option<usize>,

    /// Output format: csv, json or jsonl
    #[arg(short, long)]
    pub format: Option<String>,

    /// Parallel column workers (default: all CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Values generated and cached per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// RNG seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Newline-delimited word list for string columns
    #[arg(long)]
    pub word_list: Option<PathBuf>,

    /// Directory for day caches
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Keep day caches after writing output
    #[arg(long)]
    pub no_cleanup: bool,

    /// Show progress during generation
    #[arg(short, long)]
    pub progress: bool,

    /// Check the output directory after generation
    #[arg(long)]
    pub validate: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    /// Load the base configuration and apply command-line overrides.
    pub fn resolve_config(&self) -> anyhow::Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => GeneratorConfig::with_default_columns(),
        };
        if config.columns.is_empty() {
            config.columns = default_columns();
        }

        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if let Some(rows) = self.rows {
            config.approx_rows_per_day = rows;
        }
        if let Some(days) = self.days {
            config.num_days = days;
        }
        if let Some(format) = &self.format {
            config.output_format = format.clone();
        }
        if let Some(workers) = self.workers {
            config.max_workers = Some(workers);
        }
        if let Some(batch_size) = self.batch_size {
            config.cache_batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(word_list) = &self.word_list {
            config.word_list = Some(word_list.clone());
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = Some(cache_dir.clone());
        }
        if self.no_cleanup {
            config.cleanup_cache = false;
        }

        Ok(config)
    }
}

/// JSON output for the generate command
#[derive(Serialize, JsonSchema)]
pub(crate) struct GenerateJsonOutput {
    output_dir: String,
    format: String,
    seed: u64,
    rows_per_day: Vec<u64>,
    files: Vec<String>,
    metrics: GenerationMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_issues: Option<Vec<String>>,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;
    let mut generator = Generator::new(config)?;

    let plan = generator.plan().clone();
    let progress = (args.progress && !args.json)
        .then(|| RunProgress::new(generator.columns().len(), plan.num_days));

    if let Some(progress) = &progress {
        let cached = progress.cached.clone();
        let written = progress.written.clone();
        generator = generator.with_progress(move |event| match event {
            ProgressEvent::DayCached { .. } => cached.inc(1),
            ProgressEvent::DayWritten { .. } => written.inc(1),
        });
    }

    let report = match generator.run() {
        Ok(report) => {
            if let Some(progress) = &progress {
                progress.finish();
            }
            report
        }
        Err(e) => {
            if let Some(progress) = &progress {
                progress.abandon();
            }
            return Err(e).context("Generation failed");
        }
    };

    let issues = args.validate.then(|| {
        validate_output(
            &plan.output_dir,
            plan.output_format,
            plan.num_days,
            &report.metrics,
        )
    });

    if args.json {
        let output = GenerateJsonOutput {
            output_dir: plan.output_dir.display().to_string(),
            format: plan.output_format.to_string(),
            seed: plan.seed,
            rows_per_day: report.rows_per_day.iter().map(|(_, rows)| rows).collect(),
            files: report
                .outputs
                .iter()
                .map(|o| o.path.display().to_string())
                .collect(),
            metrics: report.metrics.clone(),
            validation_issues: issues.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let metrics = &report.metrics;
        eprintln!("\n✓ Generation completed successfully!");
        eprintln!("\nStatistics:");
        eprintln!("  Days: {}", plan.num_days);
        eprintln!("  Columns: {}", metrics.total_columns);
        eprintln!("  Rows written: {}", metrics.total_rows_generated);
        eprintln!("  Files written: {}", metrics.files_written);
        eprintln!("  Cache operations: {}", metrics.cache_operations);
        eprintln!("  Seed: {}", plan.seed);
        eprintln!("  Elapsed time: {:.3}s", metrics.generation_time_seconds);
        eprintln!("\nOutput written to: {}", plan.output_dir.display());
        eprintln!("Profile: {}", report.profile_path.display());

        if let Some(issues) = &issues {
            if issues.is_empty() {
                eprintln!("\n✓ Output validation passed");
            } else {
                eprintln!("\n✗ Output validation found {} issue(s):", issues.len());
                for issue in issues {
                    eprintln!("  - {}", issue);
                }
            }
        }
    }

    if let Some(issues) = issues {
        if !issues.is_empty() {
            anyhow::bail!("Output validation failed with {} issue(s)", issues.len());
        }
    }

    Ok(())
}
