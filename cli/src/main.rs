use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand};
use cmq_combine::output::{ReportFormat, format_bundle, summary_line};
use cmq_combine::report::{FailureReport, ReportBundle};
use cmq_combine::{CombineConfig, CombineError, CombineOptions, CombineReport, MediaCombiner, Source};
use cmq_core::LineEnding;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "cmq")]
#[command(about = "Combine, deduplicate and order CSS media queries", version)]
struct Cli {
    /// Log debug diagnostics to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Combine media queries in CSS files.
    Combine(CombineArgs),
    /// Combine CSS read from stdin and write the result to stdout.
    Stdin(StdinArgs),
    /// Print or write the default configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct OptionArgs {
    /// Configuration file (YAML, or JSON with a .json extension).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Move @keyframes rules after the media queries.
    #[arg(long)]
    keyframes_last: bool,
    /// Write CRLF line endings.
    #[arg(long)]
    crlf: bool,
    /// Log a summary for every combined file.
    #[arg(long)]
    log: bool,
}

#[derive(Debug, Args)]
struct CombineArgs {
    /// CSS files or glob patterns (e.g. "dist/**/*.css").
    #[arg(required = true)]
    inputs: Vec<String>,
    /// Output directory for combined files. Inputs keep their path relative
    /// to the deepest directory that contains all of them.
    #[arg(long, required_unless_present = "concat")]
    dest: Option<PathBuf>,
    /// Replace the extension of written files (e.g. "combined.css").
    #[arg(long, conflicts_with = "concat")]
    suffix: Option<String>,
    /// Combine every input into this single file (inside --dest when given).
    #[arg(long)]
    concat: Option<PathBuf>,
    /// Write a report bundle to this file.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Report bundle format.
    #[arg(long, default_value = "json")]
    report_format: ReportFormat,
    /// Stop at the first input that cannot be read or parsed.
    #[arg(long)]
    fail_fast: bool,
    /// Number of parallel jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    #[command(flatten)]
    options: OptionArgs,
}

#[derive(Debug, Args)]
struct StdinArgs {
    /// Name used for the input in logs and the summary line.
    #[arg(long, default_value = "<stdin>")]
    name: String,
    #[command(flatten)]
    options: OptionArgs,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Write the configuration to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Combine(args) => run_combine(args, cli.verbose),
        Command::Stdin(args) => run_stdin(args, cli.verbose),
        Command::Config(args) => run_config(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over the flags.
fn init_logging(log: bool, verbose: bool) {
    let level = if verbose {
        "debug"
    } else if log {
        "info"
    } else {
        "error"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_options(args: &OptionArgs) -> Result<CombineOptions, String> {
    let config = match &args.config {
        Some(path) => CombineConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => CombineConfig::default(),
    };
    let mut options = config
        .into_options()
        .map_err(|err| format!("Invalid configuration: {err}"))?;

    options.keyframes_last |= args.keyframes_last;
    options.log |= args.log;
    if args.crlf {
        options.format.line_ending = LineEnding::Crlf;
    }
    Ok(options)
}

fn run_combine(args: CombineArgs, verbose: bool) -> Result<(), String> {
    let options = load_options(&args.options)?;
    init_logging(options.log, verbose);

    if let Some(dest) = &args.dest {
        fs::create_dir_all(dest).map_err(|err| {
            format!("Failed to create output directory '{}': {err}", dest.display())
        })?;
    }

    let (paths, mut failures) = expand_inputs(&args.inputs);
    if args.fail_fast && !failures.is_empty() {
        return Err(failures.remove(0).error);
    }
    debug!(inputs = paths.len(), "Expanded input patterns");

    let combiner = MediaCombiner::new(options);
    let reports = match &args.concat {
        Some(concat) => {
            let target = match &args.dest {
                Some(dest) => dest.join(concat),
                None => concat.clone(),
            };
            combine_concat(&combiner, &paths, &target, args.fail_fast, &mut failures)?
        }
        None => {
            // Present unless --concat, enforced by clap.
            let dest = args
                .dest
                .as_deref()
                .ok_or_else(|| "--dest is required without --concat".to_string())?;
            combine_each(&combiner, &paths, dest, &args, &mut failures)?
        }
    };

    for report in &reports {
        println!("{}", summary_line(report));
    }

    let written = reports.len();
    let bundle = ReportBundle::new(PACKAGE_VERSION, reports, failures);
    if let Some(report_path) = &args.report {
        let raw = format_bundle(&bundle, args.report_format)?;
        fs::write(report_path, raw)
            .map_err(|err| format!("Failed to write '{}': {err}", report_path.display()))?;
    }

    println!("Combined and wrote {written} file(s).");

    if !bundle.failures.is_empty() {
        let sources: Vec<&str> = bundle
            .failures
            .iter()
            .map(|failure| failure.source.as_str())
            .collect();
        return Err(format!(
            "{} input(s) failed: {}",
            bundle.failures.len(),
            sources.join(", ")
        ));
    }
    Ok(())
}

/// Combines every path into its own output file, in parallel.
fn combine_each(
    combiner: &MediaCombiner,
    paths: &[PathBuf],
    dest: &Path,
    args: &CombineArgs,
    failures: &mut Vec<FailureReport>,
) -> Result<Vec<CombineReport>, String> {
    use rayon::prelude::*;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let base = common_base(paths);
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut jobs = Vec::with_capacity(paths.len());
    for path in paths {
        let target = output_path(dest, &base, path, args.suffix.as_deref());
        if let Some(first) = claimed.get(&target) {
            if *first == path.as_path() {
                continue;
            }
            let message = format!(
                "output '{}' is already written for '{}'",
                target.display(),
                first.display()
            );
            error!(source = %path.display(), "{message}");
            if args.fail_fast {
                return Err(message);
            }
            failures.push(FailureReport {
                source: path.display().to_string(),
                error: message,
            });
            continue;
        }
        claimed.insert(target.clone(), path);
        jobs.push((path, target));
    }

    let stop = AtomicBool::new(false);
    let outcomes: Vec<Option<Result<CombineReport, CombineError>>> = pool.install(|| {
        jobs.par_iter()
            .map(|(path, target)| {
                if stop.load(Ordering::Relaxed) {
                    return None;
                }
                let outcome = combine_file(combiner, path, target);
                if outcome.is_err() && args.fail_fast {
                    stop.store(true, Ordering::Relaxed);
                }
                Some(outcome)
            })
            .collect()
    });

    let mut reports = Vec::new();
    for ((path, _), outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            Some(Ok(report)) => reports.push(report),
            Some(Err(err)) => {
                error!(source = %path.display(), "{err}");
                if args.fail_fast {
                    return Err(err.to_string());
                }
                failures.push(FailureReport {
                    source: path.display().to_string(),
                    error: err.to_string(),
                });
            }
            None => {}
        }
    }
    Ok(reports)
}

fn combine_file(
    combiner: &MediaCombiner,
    path: &Path,
    target: &Path,
) -> Result<CombineReport, CombineError> {
    let source = Source::from_path(path)?;
    let combined = combiner.combine(&[source])?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| CombineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(target, &combined.css).map_err(|source| CombineError::Io {
        path: target.to_path_buf(),
        source,
    })?;
    info!(output = %target.display(), "Wrote combined stylesheet");
    Ok(combined.report)
}

/// Combines all readable paths as one stylesheet written to `target`.
fn combine_concat(
    combiner: &MediaCombiner,
    paths: &[PathBuf],
    target: &Path,
    fail_fast: bool,
    failures: &mut Vec<FailureReport>,
) -> Result<Vec<CombineReport>, String> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        match Source::from_path(path) {
            Ok(source) => sources.push(source),
            Err(err) if fail_fast => return Err(err.to_string()),
            Err(err) => {
                error!(source = %path.display(), "{err}");
                failures.push(FailureReport {
                    source: path.display().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    let combined = match combiner.combine(&sources) {
        Ok(combined) => combined,
        Err(err) if fail_fast => return Err(err.to_string()),
        Err(err) => {
            error!("{err}");
            failures.push(FailureReport {
                source: target.display().to_string(),
                error: err.to_string(),
            });
            return Ok(Vec::new());
        }
    };

    if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create '{}': {err}", parent.display()))?;
    }
    fs::write(target, &combined.css)
        .map_err(|err| format!("Failed to write '{}': {err}", target.display()))?;
    info!(output = %target.display(), "Wrote combined stylesheet");
    Ok(vec![combined.report])
}

fn run_stdin(args: StdinArgs, verbose: bool) -> Result<(), String> {
    let options = load_options(&args.options)?;
    init_logging(options.log, verbose);

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|err| format!("Failed to read stdin: {err}"))?;

    let combined = MediaCombiner::new(options)
        .combine_text(&args.name, &text)
        .map_err(|err| err.to_string())?;
    print!("{}", combined.css);
    eprintln!("{}", summary_line(&combined.report));
    Ok(())
}

fn run_config(args: ConfigArgs) -> Result<(), String> {
    let config = CombineConfig::default();
    match args.output {
        Some(path) => {
            config
                .save(&path)
                .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => {
            let raw = serde_yaml::to_string(&config)
                .map_err(|e| format!("YAML serialization failed: {e}"))?;
            print!("{raw}");
        }
    }
    Ok(())
}

/// Resolves inputs to file paths. Glob patterns that match nothing and
/// invalid patterns are reported as failures; literal paths pass through
/// and are checked when read.
fn expand_inputs(inputs: &[String]) -> (Vec<PathBuf>, Vec<FailureReport>) {
    let mut paths = Vec::new();
    let mut failures = Vec::new();

    for input in inputs {
        if !is_glob_pattern(input) {
            paths.push(PathBuf::from(input));
            continue;
        }
        match glob::glob(input) {
            Ok(entries) => {
                let before = paths.len();
                paths.extend(entries.flatten().filter(|path| path.is_file()));
                if paths.len() == before {
                    failures.push(FailureReport {
                        source: input.clone(),
                        error: format!("no files match pattern '{input}'"),
                    });
                }
            }
            Err(err) => failures.push(FailureReport {
                source: input.clone(),
                error: format!("invalid pattern '{input}': {err}"),
            }),
        }
    }

    (paths, failures)
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Deepest directory containing every path.
fn common_base(paths: &[PathBuf]) -> PathBuf {
    let mut parents = paths
        .iter()
        .map(|path| path.parent().unwrap_or_else(|| Path::new("")));
    let Some(first) = parents.next() else {
        return PathBuf::new();
    };
    let mut base = first.to_path_buf();
    for parent in parents {
        while !parent.starts_with(&base) {
            if !base.pop() {
                break;
            }
        }
    }
    base
}

/// Where the combined output of `path` goes: its directory relative to
/// `base` recreated under `dest`. Only plain directory names are kept, so
/// `..` never leaves `dest`.
fn output_path(dest: &Path, base: &Path, path: &Path, suffix: Option<&str>) -> PathBuf {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let mut target = dest.to_path_buf();
    if let Some(parent) = relative.parent() {
        target.extend(
            parent
                .components()
                .filter(|component| matches!(component, Component::Normal(_))),
        );
    }
    target.push(output_file_name(path, suffix));
    target
}

/// File name for a combined output: the input's name, or its stem with
/// `suffix` as the new extension.
fn output_file_name(path: &Path, suffix: Option<&str>) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.css".to_string());
    match suffix {
        Some(suffix) => {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or(name);
            format!("{stem}.{}", suffix.trim_start_matches('.'))
        }
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name_keeps_or_rewrites_extension() {
        let path = Path::new("dist/site.css");
        assert_eq!(output_file_name(path, None), "site.css");
        assert_eq!(output_file_name(path, Some("combined.css")), "site.combined.css");
        assert_eq!(output_file_name(path, Some(".min.css")), "site.min.css");
    }

    #[test]
    fn test_output_path_keeps_directories_below_common_base() {
        let paths = vec![
            PathBuf::from("dist/a/site.css"),
            PathBuf::from("dist/b/site.css"),
            PathBuf::from("dist/b/deep/theme.css"),
        ];
        let base = common_base(&paths);
        assert_eq!(base, PathBuf::from("dist"));

        let dest = Path::new("out");
        assert_eq!(output_path(dest, &base, &paths[0], None), PathBuf::from("out/a/site.css"));
        assert_eq!(output_path(dest, &base, &paths[1], None), PathBuf::from("out/b/site.css"));
        assert_eq!(
            output_path(dest, &base, &paths[2], Some("min.css")),
            PathBuf::from("out/b/deep/theme.min.css")
        );
    }

    #[test]
    fn test_output_path_for_single_input_and_parent_dirs() {
        let single = vec![PathBuf::from("dist/site.css")];
        let base = common_base(&single);
        assert_eq!(output_path(Path::new("out"), &base, &single[0], None), PathBuf::from("out/site.css"));

        let escaping = vec![PathBuf::from("../x/site.css"), PathBuf::from("y/site.css")];
        let base = common_base(&escaping);
        assert_eq!(base, PathBuf::new());
        assert_eq!(
            output_path(Path::new("out"), &base, &escaping[0], None),
            PathBuf::from("out/x/site.css")
        );
        assert_eq!(common_base(&[]), PathBuf::new());
    }

    #[test]
    fn test_glob_detection() {
        assert!(is_glob_pattern("dist/*.css"));
        assert!(is_glob_pattern("a?.css"));
        assert!(!is_glob_pattern("dist/site.css"));
    }

    #[test]
    fn test_unmatched_pattern_is_a_failure_and_literals_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.css"), "").unwrap();
        let pattern = format!("{}/*.css", dir.path().display());
        let empty = format!("{}/*.scss", dir.path().display());

        let (paths, failures) =
            expand_inputs(&[pattern, empty.clone(), "missing.css".to_string()]);
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.css"));
        assert_eq!(paths[1], PathBuf::from("missing.css"));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source, empty);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let args = OptionArgs {
            config: None,
            keyframes_last: true,
            crlf: true,
            log: false,
        };
        let options = load_options(&args).unwrap();
        assert!(options.keyframes_last);
        assert!(!options.log);
        assert_eq!(options.format.line_ending, LineEnding::Crlf);
    }
}
