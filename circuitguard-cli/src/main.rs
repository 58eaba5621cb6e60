//! CircuitGuard CLI - BS 7671 circuit estimation, validation and schedule
//! merging from the command line.

use anyhow::Context;
use circuitguard::analyzer::{Rule, DESIGN_CHECKS};
use circuitguard::cables::CableDatabase;
use circuitguard::config::{load_options, options_from_env, EmbeddingConfig};
use circuitguard::content::{
    chunk_document, ingest, ChunkStrategy, ContentChunk, EmbeddingError, HttpEmbeddingClient,
    JsonlChunkStore,
};
use circuitguard::design::{EarthingSystem, Phases, DEFAULT_VOLTAGE};
use circuitguard::{
    quick_estimate, to_toon, validate_circuit, CircuitGuardCore, CircuitInput, Issue,
    MergedCircuit, RulesEngine, Severity, ValidationOptions, ValidationResult,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "circuitguard")]
#[command(about = "BS 7671 circuit estimation, validation and schedule merging tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a single installation design file
    Check {
        /// Path to a .design.json file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        validate: ValidateArgs,
    },

    /// Validate all design files in a directory
    Project {
        /// Path to project directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        #[command(flatten)]
        validate: ValidateArgs,
    },

    /// Quick estimate for a single circuit
    Estimate {
        /// Load in watts
        #[arg(long)]
        power: f64,

        /// Supply voltage
        #[arg(long, default_value_t = DEFAULT_VOLTAGE)]
        voltage: f64,

        /// single or three
        #[arg(long, default_value = "single")]
        phases: Phases,

        /// Cable route length in metres
        #[arg(long)]
        length: f64,

        /// Load type (lighting, sockets, shower, ev-charger, ...)
        #[arg(long, default_value = "general")]
        load_type: String,

        /// Earthing system used for the circuit checks
        #[arg(long, default_value = "TN-C-S")]
        earthing: EarthingSystem,

        /// Circuit name shown in the output
        #[arg(long, default_value = "Circuit")]
        name: String,

        /// The circuit is RCD protected
        #[arg(long)]
        rcd: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Merge per-photo circuit detections into one schedule
    Merge {
        /// JSON array of detected circuits
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code if any merged circuit has conflicting readings
        #[arg(long)]
        fail_on_conflict: bool,
    },

    /// List cables in the built-in database
    Cables {
        /// Installation reference method
        #[arg(long, default_value = "C")]
        method: String,

        /// Only cables with a size rated for at least this current
        #[arg(long)]
        min_current: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Split a regulations or course document into chunks
    Chunk {
        /// Text or markdown file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Chunk a document, embed each chunk and append it to a JSONL store
    Ingest {
        /// Text or markdown file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSONL file to append embedded chunks to
        #[arg(long, value_name = "JSONL")]
        out: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List available validation rules
    Rules {
        /// Show rule severities
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct ValidateArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Exit with error code if issues found at this severity or higher
    #[arg(long, value_enum)]
    fail_on: Option<FailOnSeverity>,

    /// JSON file with validation options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the supply voltage
    #[arg(long)]
    voltage: Option<f64>,

    /// Override the earthing system (TN-S, TN-C-S, TT)
    #[arg(long)]
    earthing: Option<EarthingSystem>,

    /// Only run these rule ids (repeatable)
    #[arg(long = "rule", value_name = "ID")]
    rules: Vec<String>,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct ChunkArgs {
    /// Chunking strategy
    #[arg(long, value_enum, default_value = "paragraph")]
    strategy: ChunkMode,

    /// Chunk size in characters
    #[arg(long, default_value_t = 1500)]
    size: usize,

    /// Overlap in characters (fixed strategy only)
    #[arg(long, default_value_t = 0)]
    overlap: usize,
}

impl ChunkArgs {
    fn strategy(&self) -> ChunkStrategy {
        match self.strategy {
            ChunkMode::Fixed => ChunkStrategy::Fixed {
                size: self.size,
                overlap: self.overlap,
            },
            ChunkMode::Paragraph => ChunkStrategy::Paragraph {
                max_chars: self.size,
            },
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ChunkMode {
    Fixed,
    Paragraph,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
    /// Token-Oriented Object Notation
    Toon,
    /// GitHub Actions format
    Github,
    /// GitLab CI format
    Gitlab,
}

#[derive(Clone, ValueEnum)]
enum FailOnSeverity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check { file, validate } => handle_check(&file, &validate),
        Commands::Project { dir, validate } => handle_project(&dir, &validate),
        Commands::Estimate {
            power,
            voltage,
            phases,
            length,
            load_type,
            earthing,
            name,
            rcd,
            format,
        } => {
            let mut circuit = CircuitInput::new(name, power, load_type)
                .with_length(length)
                .with_phases(phases);
            if rcd {
                circuit = circuit.with_rcd(None);
            }
            handle_estimate(&circuit, voltage, earthing, format)
        }
        Commands::Merge {
            file,
            format,
            fail_on_conflict,
        } => handle_merge(&file, format, fail_on_conflict),
        Commands::Cables {
            method,
            min_current,
            format,
        } => handle_cables(&method, min_current, format),
        Commands::Chunk {
            file,
            chunking,
            format,
        } => handle_chunk(&file, &chunking, format),
        Commands::Ingest {
            file,
            out,
            chunking,
            format,
        } => handle_ingest(&file, &out, &chunking, format),
        Commands::Rules { verbose } => {
            handle_rules(verbose);
            Ok(0)
        }
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// File options, then environment, then flags.
fn build_options(args: &ValidateArgs) -> anyhow::Result<ValidationOptions> {
    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => options_from_env()?,
    };
    if let Some(voltage) = args.voltage {
        options.voltage = Some(voltage);
    }
    if let Some(earthing) = args.earthing {
        options.earthing = Some(earthing);
    }
    if !args.rules.is_empty() {
        options.rules = args.rules.clone();
    }
    if args.strict {
        options.strict_mode = true;
    }
    Ok(options)
}

fn handle_check(file: &Path, args: &ValidateArgs) -> anyhow::Result<i32> {
    let options = build_options(args)?;
    let result = CircuitGuardCore::validate_design_file(file, &options)?;
    let results = [result];
    output_results(&results, args.format)?;
    Ok(exit_code_for(&results, args.fail_on.as_ref()))
}

fn handle_project(dir: &Path, args: &ValidateArgs) -> anyhow::Result<i32> {
    let options = build_options(args)?;
    let results = CircuitGuardCore::validate_project(dir, &options)?;
    output_results(&results, args.format)?;
    Ok(exit_code_for(&results, args.fail_on.as_ref()))
}

fn exit_code_for(results: &[ValidationResult], fail_on: Option<&FailOnSeverity>) -> i32 {
    match fail_on {
        Some(severity) if results.iter().any(|r| should_fail(r, severity)) => 1,
        _ => 0,
    }
}

fn should_fail(result: &ValidationResult, severity: &FailOnSeverity) -> bool {
    match severity {
        FailOnSeverity::Critical => result.has_critical(),
        FailOnSeverity::High => result.has_high_or_critical(),
        FailOnSeverity::Medium => result.has_high_or_critical() || result.stats.medium > 0,
        FailOnSeverity::Low => {
            result.has_high_or_critical() || result.stats.medium > 0 || result.stats.low > 0
        }
        FailOnSeverity::Info => result.total_issues() > 0,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_toon<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", to_toon(&serde_json::to_value(value)?));
    Ok(())
}

fn output_results(results: &[ValidationResult], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            output_human(results);
            Ok(())
        }
        OutputFormat::Json => print_json(&results_report(results)),
        OutputFormat::Toon => print_toon(&results_report(results)),
        OutputFormat::Github => {
            output_github(results);
            Ok(())
        }
        OutputFormat::Gitlab => output_gitlab(results),
    }
}

fn results_report(results: &[ValidationResult]) -> serde_json::Value {
    serde_json::json!({
        "results": results,
        "summary": {
            "totalFiles": results.len(),
            "totalIssues": results.iter().map(|r| r.total_issues()).sum::<usize>(),
            "critical": results.iter().map(|r| r.stats.critical).sum::<usize>(),
        }
    })
}

fn print_issue_group(title: &str, issues: &[&Issue]) {
    if issues.is_empty() {
        return;
    }
    println!("\n  {}:", title);
    for issue in issues {
        println!("    - [{}] {}", issue.rule_id, issue.message);
        if let Some(ref comp) = issue.component {
            println!("      Circuit: {}", comp);
        }
        if let Some(ref suggestion) = issue.suggestion {
            println!("      Fix: {}", suggestion);
        }
    }
}

fn output_human(results: &[ValidationResult]) {
    if results.is_empty() {
        println!("No design files found");
        return;
    }
    for result in results {
        println!("\nDesign: {}", result.source);
        println!("{}", "─".repeat(60));

        if result.total_issues() == 0 {
            println!("  No issues found");
            continue;
        }

        let by_severity = |severity: Severity| -> Vec<&Issue> {
            result
                .issues
                .iter()
                .filter(|i| i.severity == severity)
                .collect()
        };
        print_issue_group("CRITICAL", &by_severity(Severity::Error));
        print_issue_group("HIGH", &by_severity(Severity::Warning));
        print_issue_group("MEDIUM", &by_severity(Severity::Suggestion));
        print_issue_group("INFO", &by_severity(Severity::Info));

        println!("\n  Summary:");
        println!("    Critical: {}", result.stats.critical);
        println!("    High:     {}", result.stats.high);
        println!("    Medium:   {}", result.stats.medium);
        println!("    Low:      {}", result.stats.low);
        println!("    Info:     {}", result.stats.info);
    }
}

fn severity_to_github(issue: &Issue) -> &'static str {
    match issue.severity {
        Severity::Error => "error",
        Severity::Warning | Severity::Suggestion => "warning",
        Severity::Info => "notice",
    }
}

fn output_github(results: &[ValidationResult]) {
    for result in results {
        for issue in &result.issues {
            println!(
                "::{} file={},title={}::{}",
                severity_to_github(issue),
                result.source,
                issue.rule_id,
                issue.message.replace('\n', " ")
            );
        }
    }
}

fn severity_to_gitlab(issue: &Issue) -> &'static str {
    match issue.severity {
        Severity::Error => "blocker",
        Severity::Warning => "major",
        Severity::Suggestion => "minor",
        Severity::Info => "info",
    }
}

fn output_gitlab(results: &[ValidationResult]) -> anyhow::Result<()> {
    let mut reports = Vec::new();
    for result in results {
        for issue in &result.issues {
            reports.push(serde_json::json!({
                "description": issue.message,
                "check_name": issue.rule_id,
                "fingerprint": issue.id,
                "severity": severity_to_gitlab(issue),
                "location": {
                    "path": result.source,
                    "lines": { "begin": 1 },
                }
            }));
        }
    }
    print_json(&reports)
}

fn handle_estimate(
    circuit: &CircuitInput,
    voltage: f64,
    earthing: EarthingSystem,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let estimate = quick_estimate(circuit, voltage);
    let validation = validate_circuit(circuit, voltage, earthing);

    match format {
        OutputFormat::Human => {
            println!("\nCircuit: {}", estimate.circuit);
            println!("{}", "─".repeat(60));
            println!("  Design current (Ib): {:.2} A", estimate.design_current);
            println!(
                "  Diversified current: {:.2} A (factor {})",
                estimate.diversified_current, estimate.diversity_factor
            );
            println!("  Suggested MCB:       {} A", estimate.mcb_rating);
            println!("  Cable size:          {} mm²", estimate.cable_size);
            println!(
                "  Material cost:       £{:.2} (cable £{:.2}, protection £{:.2}, accessories £{:.2})",
                estimate.material_cost.total,
                estimate.material_cost.cable,
                estimate.material_cost.protection,
                estimate.material_cost.accessories
            );
            for error in &validation.errors {
                println!("  ERROR:   {}", error);
            }
            for warning in &validation.warnings {
                println!("  WARNING: {}", warning);
            }
            if validation.errors.is_empty() && validation.warnings.is_empty() {
                println!("  No issues found");
            }
        }
        OutputFormat::Toon => print_toon(&serde_json::json!({
            "estimate": estimate,
            "validation": validation,
        }))?,
        // CI formats have nothing file-based to annotate here.
        OutputFormat::Json | OutputFormat::Github | OutputFormat::Gitlab => {
            print_json(&serde_json::json!({
                "estimate": estimate,
                "validation": validation,
            }))?
        }
    }
    Ok(0)
}

fn handle_merge(file: &Path, format: OutputFormat, fail_on_conflict: bool) -> anyhow::Result<i32> {
    let merged = CircuitGuardCore::merge_detection_file(file)?;

    match format {
        OutputFormat::Human => output_merge_human(&merged),
        OutputFormat::Toon => print_toon(&merged)?,
        OutputFormat::Json | OutputFormat::Github | OutputFormat::Gitlab => print_json(&merged)?,
    }

    if fail_on_conflict && merged.iter().any(MergedCircuit::has_conflicts) {
        return Ok(1);
    }
    Ok(0)
}

fn output_merge_human(merged: &[MergedCircuit]) {
    println!("\nMerged schedule: {} circuit(s)", merged.len());
    println!("{}", "─".repeat(60));
    for m in merged {
        let c = &m.circuit;
        let number = if c.circuit_number.is_empty() {
            "?"
        } else {
            c.circuit_number.as_str()
        };
        println!(
            "  {:>3}  {:<24} {}{}A  {}/{} mm²  [{}, {} photo(s)]",
            number,
            c.circuit_description,
            c.protective_device_type,
            c.protective_device_rating,
            c.live_size,
            c.cpc_size,
            m.overall_confidence,
            m.detection_count
        );
        for conflict in &m.conflicts {
            let readings: Vec<String> = conflict
                .values
                .iter()
                .map(|v| format!("{} x{}", v.value, v.count))
                .collect();
            println!(
                "       conflict {}: chose '{}' from {}",
                conflict.field,
                conflict.chosen,
                readings.join(", ")
            );
        }
        for note in &m.notes {
            println!("       note: {}", note);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CableRow {
    cable_type: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capacity: Option<f64>,
}

fn handle_cables(method: &str, min_current: Option<f64>, format: OutputFormat) -> anyhow::Result<i32> {
    let db = CableDatabase::builtin();
    let types = match min_current {
        Some(current) => db.cables_by_current_rating(current, method),
        None => db.cables_by_installation_method(method),
    };

    let rows: Vec<CableRow> = types
        .into_iter()
        .filter_map(|cable_type| {
            let data = db.get_cable_data(cable_type)?;
            let selection = min_current
                .and_then(|current| db.find_optimal_cable_size(cable_type, current, method));
            Some(CableRow {
                cable_type: cable_type.to_string(),
                name: data.specification.name.clone(),
                size: selection.as_ref().map(|s| s.size),
                capacity: selection.as_ref().map(|s| s.capacity),
            })
        })
        .collect();

    match format {
        OutputFormat::Human => {
            println!("Cables for installation method {}:\n", method);
            if rows.is_empty() {
                println!("  None");
            }
            for row in &rows {
                match (row.size, row.capacity) {
                    (Some(size), Some(capacity)) => println!(
                        "  {:<20} {:<36} {} mm² ({} A)",
                        row.cable_type, row.name, size, capacity
                    ),
                    _ => println!("  {:<20} {}", row.cable_type, row.name),
                }
            }
        }
        OutputFormat::Toon => print_toon(&rows)?,
        OutputFormat::Json | OutputFormat::Github | OutputFormat::Gitlab => print_json(&rows)?,
    }
    Ok(0)
}

fn read_chunks(file: &Path, chunking: &ChunkArgs) -> anyhow::Result<Vec<ContentChunk>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let source = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();
    Ok(chunk_document(&source, &text, chunking.strategy()))
}

fn handle_chunk(file: &Path, chunking: &ChunkArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let chunks = read_chunks(file, chunking)?;

    match format {
        OutputFormat::Human => {
            println!("{} chunk(s) from {}\n", chunks.len(), file.display());
            for chunk in &chunks {
                let preview: String = chunk
                    .text
                    .lines()
                    .next()
                    .unwrap_or("")
                    .chars()
                    .take(60)
                    .collect();
                println!(
                    "  [{}] {} (~{} tokens)",
                    chunk.index,
                    chunk.section.as_deref().unwrap_or("(preamble)"),
                    chunk.token_estimate
                );
                println!("      {}", preview);
            }
        }
        OutputFormat::Toon => print_toon(&chunks)?,
        OutputFormat::Json | OutputFormat::Github | OutputFormat::Gitlab => print_json(&chunks)?,
    }
    Ok(0)
}

fn handle_ingest(
    file: &Path,
    out: &Path,
    chunking: &ChunkArgs,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let config = EmbeddingConfig::from_env();
    if config.api_key.is_none() {
        return Err(EmbeddingError::MissingApiKey)
            .context("set CIRCUITGUARD_EMBEDDING_KEY or OPENAI_API_KEY");
    }
    let chunks = read_chunks(file, chunking)?;
    let client = HttpEmbeddingClient::new(config)?;
    let store = JsonlChunkStore::new(out);

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(ingest(&chunks, &client, &store));

    match format {
        OutputFormat::Human => {
            println!(
                "Stored {}/{} chunk(s) in {} using {}",
                report.stored,
                report.attempted,
                out.display(),
                report.model
            );
            for failure in &report.failures {
                println!("  chunk {} failed: {}", failure.index, failure.error);
            }
        }
        OutputFormat::Toon => print_toon(&report)?,
        OutputFormat::Json | OutputFormat::Github | OutputFormat::Gitlab => print_json(&report)?,
    }
    Ok(if report.is_complete() { 0 } else { 1 })
}

fn handle_rules(verbose: bool) {
    println!("Available validation rules:\n");

    println!("Circuit rules:");
    let engine = RulesEngine::with_default_rules();
    for rule in engine.rules() {
        println!("  {}", rule.id());
        println!("    {}", rule.name());
        if verbose {
            println!("    Severity: {}", rule.severity());
        }
        println!();
    }

    println!("Design checks:");
    for (id, name) in DESIGN_CHECKS {
        println!("  {}", id);
        println!("    {}", name);
        println!();
    }
}
