use std::fs::{File, OpenOptions};
use std::io::{BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use serde::Serialize;

use jitmine_core::{Hunk, JitConfig, OutputFormat};
use jitmine_difflens::aggregate::FileDiff;
use jitmine_difflens::filter::{DiffFilter, SkipReason};
use jitmine_gitpulse::extract::{ExtractionReport, Extractor};
use jitmine_gitpulse::history::HistoryStore;
use jitmine_gitpulse::mining::{GitSource, HistorySource, MiningOptions};

#[derive(Parser)]
#[command(
    name = "jitmine",
    version,
    about = "Mine git history into just-in-time defect prediction features",
    long_about = "Parses unified diffs and blame listings, then folds every commit, in date order,\n\
                   into longitudinal change metrics (la, ld, lt, ns, nd, nf, entropy, fix, ndev,\n\
                   age, nuc, exp, rexp, sexp).\n\n\
                   Examples:\n  \
                     jitmine extract --path . --output features.jsonl   Mine a repository\n  \
                     git show HEAD | jitmine diff                       Inspect a diff\n  \
                     git blame -t -n -l HEAD -- src/lib.rs | jitmine blame\n  \
                     jitmine init                                       Write .jitmine.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .jitmine.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable summaries (default)\n  \
                         json  Machine-readable JSON"
    )]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a unified diff into per-file records
    #[command(long_about = "Parse a unified diff into per-file records.\n\n\
        Reads the output of `git show` or `git diff` from a file or stdin and prints\n\
        each file's change blocks, plus the reason it would be excluded from a commit.\n\n\
        Examples:\n  git show HEAD | jitmine diff\n  jitmine diff --file change.patch --groups")]
    Diff {
        /// Diff file (default: stdin)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Regroup change blocks with bounded surrounding context
        #[arg(long)]
        groups: bool,
    },
    /// Parse a `git blame -t -n -l` listing
    Blame {
        /// Blame file (default: stdin)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Extract one feature record per commit from a repository
    #[command(long_about = "Extract one feature record per commit from a repository.\n\n\
        Commits are processed oldest first. Records are written as JSON lines; the\n\
        extraction report goes to stderr. With --state, history is restored from and\n\
        saved to a checkpoint so a later run resumes after the last folded commit.\n\n\
        Examples:\n  jitmine extract --output features.jsonl\n  \
        jitmine extract --path ../repo --since 2021-01-01 --state .jitmine/history.json")]
    Extract {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// History checkpoint to resume from and save to
        #[arg(long)]
        state: Option<PathBuf>,

        /// Write feature records here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Branch to walk (overrides config)
        #[arg(long)]
        branch: Option<String>,

        /// First day to include, YYYY-MM-DD (overrides config)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Last day to include, YYYY-MM-DD (overrides config)
        #[arg(long)]
        until: Option<NaiveDate>,
    },
    /// Create a default .jitmine.toml configuration file
    Init,
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# jitmine configuration

[extract]
# Language allow-list by name, e.g. ["Python", "Java"]. Empty keeps every file.
# languages = []
# Context lines kept around each change group when hunks are regrouped.
# surrounding_lines = 3
# Extra glob patterns of paths to exclude.
# skip_patterns = ["docs/**", "**/*.generated.*"]
# Extracted commits between history checkpoints when running with --state.
# batch_size = 100

[mining]
# Branch to walk (default: HEAD).
# branch = "main"
# Date window, inclusive (YYYY-MM-DD).
# since = "2020-01-01"
# until = "2024-12-31"
"#;

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("jitmine=debug")
    } else {
        EnvFilter::try_from_env("JITMINE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("jitmine=info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<JitConfig> {
    let config = match path {
        Some(path) => JitConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".jitmine.toml");
            if default_path.exists() {
                JitConfig::from_file(default_path)?
            } else {
                JitConfig::default()
            }
        }
    };
    Ok(config)
}

fn read_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip: Option<SkipReason>,
    diff: &'a FileDiff,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<Vec<Vec<Hunk>>>,
}

#[derive(Serialize)]
struct BlockError {
    block: usize,
    error: String,
}

fn run_diff(config: &JitConfig, format: OutputFormat, input: &str, groups: bool) -> Result<()> {
    let filter = DiffFilter::from_config(&config.extract);
    let results = jitmine_difflens::parse_commit_diff(input);

    let mut diffs = Vec::new();
    let mut errors = Vec::new();
    for (block, result) in results.into_iter().enumerate() {
        match result {
            Ok(diff) => diffs.push(diff),
            Err(e) => errors.push(BlockError {
                block,
                error: e.to_string(),
            }),
        }
    }

    let reports: Vec<FileReport> = diffs
        .iter()
        .map(|diff| FileReport {
            name: diff.name_b(),
            skip: filter.check(diff),
            diff,
            groups: groups.then(|| {
                jitmine_difflens::hunks::regroup(&diff.content, config.extract.surrounding_lines)
            }),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({ "files": reports, "errors": errors });
            println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        }
        OutputFormat::Text => {
            for report in &reports {
                match &report.skip {
                    Some(reason) => println!("{}  [skipped: {reason}]", report.diff),
                    None => println!("{}", report.diff),
                }
                if let Some(groups) = &report.groups {
                    for (i, group) in groups.iter().enumerate() {
                        let lines: usize = group
                            .iter()
                            .map(|h| h.ab.len() + h.a.len() + h.b.len())
                            .sum();
                        println!("  group {}: {} blocks, {lines} lines", i + 1, group.len());
                    }
                }
            }
            for error in &errors {
                eprintln!("block {}: {}", error.block + 1, error.error);
            }
            println!(
                "{} files parsed, {} blocks failed",
                reports.len(),
                errors.len()
            );
        }
    }
    Ok(())
}

fn run_blame(format: OutputFormat, input: &str) -> Result<()> {
    let lines: Vec<&str> = input.lines().collect();
    let blame = jitmine_gitpulse::blame::parse_blame(&lines);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&blame).into_diagnostic()?);
        }
        OutputFormat::Text => {
            for (id, entry) in &blame {
                let ranges: Vec<String> = entry
                    .ranges
                    .iter()
                    .map(|r| {
                        if r.start == r.end {
                            r.start.to_string()
                        } else {
                            format!("{}-{}", r.start, r.end)
                        }
                    })
                    .collect();
                println!(
                    "{id}  {}  {}  lines {}",
                    entry.author,
                    entry.time,
                    ranges.join(",")
                );
            }
            let owned: u64 = blame.values().map(|e| e.line_count()).sum();
            println!("{} commits own {owned} lines", blame.len());
        }
    }
    Ok(())
}

fn print_report(report: &ExtractionReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            eprintln!("{}", serde_json::to_string_pretty(report).into_diagnostic()?);
        }
        OutputFormat::Text => {
            eprintln!(
                "Processed {} commits: {} extracted, {} not applicable, {} failed.",
                report.total(),
                report.extracted,
                report.not_applicable,
                report.failed.len()
            );
            if !report.skipped_files.is_empty() {
                let skipped: Vec<String> = report
                    .skipped_files
                    .iter()
                    .map(|(kind, count)| format!("{kind}={count}"))
                    .collect();
                eprintln!("Skipped files: {}", skipped.join(", "));
            }
            if report.dropped_files > 0 {
                eprintln!("Dropped {} unparsable file diffs.", report.dropped_files);
            }
            if !report.fix_candidates.is_empty() {
                eprintln!("{} bug-fix candidates.", report.fix_candidates.len());
            }
            for id in &report.failed {
                eprintln!("  failed: {id}");
            }
        }
    }
    Ok(())
}

/// Open the feature output, appending when resuming from a checkpoint.
fn open_output(path: &Path, append: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    if append {
        options.append(true).create(true);
    } else {
        options.write(true).create(true).truncate(true);
    }
    options
        .open(path)
        .into_diagnostic()
        .wrap_err(format!("opening {}", path.display()))
}

struct ExtractRun<'a, S: HistorySource> {
    extractor: &'a Extractor<'a, S>,
    history: &'a mut HistoryStore,
    report: &'a mut ExtractionReport,
    sink: &'a mut dyn Write,
    state: Option<&'a Path>,
    batch_size: usize,
}

impl<S: HistorySource> ExtractRun<'_, S> {
    /// Extract `ids` in order, checkpointing every `batch_size` extracted commits.
    fn fold(&mut self, ids: &[String], pb: Option<&indicatif::ProgressBar>) -> Result<()> {
        let mut since_checkpoint = 0;
        for id in ids {
            let feature = self
                .extractor
                .process(id, &mut *self.history, &mut *self.report);
            if let Some(pb) = pb {
                pb.inc(1);
            }
            let Some(feature) = feature? else {
                continue;
            };
            serde_json::to_writer(&mut *self.sink, &feature).into_diagnostic()?;
            writeln!(self.sink).into_diagnostic()?;

            since_checkpoint += 1;
            if since_checkpoint == self.batch_size {
                self.checkpoint()?;
                since_checkpoint = 0;
            }
        }
        Ok(())
    }

    /// Flush written records, then save the history they were computed from.
    fn checkpoint(&mut self) -> Result<()> {
        self.sink.flush().into_diagnostic()?;
        if let Some(state_path) = self.state {
            self.history.save(state_path)?;
            tracing::debug!(
                path = %state_path.display(),
                folded = self.history.commits_folded(),
                "saved history checkpoint"
            );
        }
        Ok(())
    }
}

fn progress_bar(len: usize, enabled: bool) -> Result<Option<indicatif::ProgressBar>> {
    if !enabled {
        return Ok(None);
    }
    let pb = indicatif::ProgressBar::new(len as u64);
    pb.set_style(
        indicatif::ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} commits ({eta})",
        )
        .into_diagnostic()?
        .progress_chars("=> "),
    );
    Ok(Some(pb))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Diff { ref file, groups } => {
            let input = read_input(file)?;
            run_diff(&config, cli.format, &input, groups)?;
        }
        Command::Blame { ref file } => {
            let input = read_input(file)?;
            run_blame(cli.format, &input)?;
        }
        Command::Extract {
            ref path,
            ref state,
            ref output,
            ref branch,
            since,
            until,
        } => {
            let mut options = MiningOptions::from(&config.mining);
            if branch.is_some() {
                options.branch.clone_from(branch);
            }
            options.since = since.or(options.since);
            options.until = until.or(options.until);
            if let (Some(since), Some(until)) = (options.since, options.until) {
                if since > until {
                    miette::bail!("--since ({since}) is after --until ({until})");
                }
            }

            let source = GitSource::open(path).map_err(|e| {
                miette::miette!(
                    help = "Run jitmine from inside a git repository, or pass --path to one",
                    "{e}"
                )
            })?;

            let (mut history, resumed) = match state {
                Some(state_path) => match HistoryStore::load(state_path)? {
                    Some(history) => (history, true),
                    None => (HistoryStore::new(), false),
                },
                None => (HistoryStore::new(), false),
            };

            let ids = source.commit_ids(&options)?;
            let pending = history.remaining(&ids);
            tracing::info!(
                total = ids.len(),
                pending = pending.len(),
                resumed,
                repo = %source.repo_path().display(),
                "mining commits"
            );

            let mut sink: Box<dyn Write> = match output {
                Some(out) => Box::new(BufWriter::new(open_output(out, resumed)?)),
                None => Box::new(BufWriter::new(std::io::stdout().lock())),
            };

            let show_progress = std::io::stderr().is_terminal() && !cli.verbose;
            let pb = progress_bar(pending.len(), show_progress)?;
            let extractor = Extractor::new(&source, &config.extract);
            let mut report = ExtractionReport::default();
            let mut run = ExtractRun {
                extractor: &extractor,
                history: &mut history,
                report: &mut report,
                sink: &mut sink,
                state: state.as_deref(),
                batch_size: config.extract.batch_size,
            };

            let outcome = run.fold(pending, pb.as_ref());
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            // records already written must stay in step with the saved history
            run.checkpoint()?;
            outcome?;

            print_report(&report, cli.format)?;
        }
        Command::Init => {
            let path = Path::new(".jitmine.toml");
            if path.exists() {
                miette::bail!(".jitmine.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .jitmine.toml with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "jitmine", &mut std::io::stdout());
        }
    }

    Ok(())
}
