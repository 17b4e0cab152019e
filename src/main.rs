//! MDREPO command-line interface.
//!
//! Wires the library modules together for scripting: query a data file,
//! diff two data files, commit a candidate through a repository, or print
//! canonical JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mdrepo::{
    diff, dump, dump_node, format_diff, load_schema_file, parse_data, DataTree, NodeKind,
    OutputFormat, OutputOptions, Repository, Schema,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// MDREPO - Schema-governed structured data repository
#[derive(Parser)]
#[command(name = "mdrepo")]
#[command(version)]
#[command(about = "Schema-governed structured data repository", long_about = None)]
struct Cli {
    /// Log filter directive (e.g. "info", "mdrepo=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the node addressed by a path
    Get {
        #[command(flatten)]
        repo: RepoArgs,

        /// Path query, e.g. Data/ChildList[Id=1]/Name
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Compare two data files built against the same schema
    Diff {
        /// Schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Running (old) data file
        #[arg(value_name = "RUN")]
        run: PathBuf,

        /// Edit (new) data file
        #[arg(value_name = "EDIT")]
        edit: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Commit a candidate data file through the repository
    Edit {
        #[command(flatten)]
        repo: RepoArgs,

        /// Candidate data file
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Print the canonical JSON of a data file
    Dump {
        #[command(flatten)]
        repo: RepoArgs,
    },
}

#[derive(Args)]
struct RepoArgs {
    /// Schema file
    #[arg(short, long, value_name = "SCHEMA")]
    schema: PathBuf,

    /// Data file
    #[arg(short, long, value_name = "DATA")]
    data: PathBuf,
}

#[derive(Args)]
struct ReportArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "terminal")]
    format: OutputFormatArg,

    /// Maximum length for displayed values
    #[arg(long, default_value = "80")]
    max_value_length: usize,

    /// Only list changed nodes, not their differing leaves
    #[arg(short, long)]
    quiet: bool,
}

impl ReportArgs {
    fn options(&self) -> OutputOptions {
        OutputOptions {
            leaf_details: !self.quiet,
            max_value_length: self.max_value_length,
        }
    }
}

/// Output format argument for clap
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormatArg {
    /// Colored terminal output
    Terminal,
    /// JSON representation
    Json,
    /// Plain text (no colors)
    Plain,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Terminal => OutputFormat::Terminal,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Plain => OutputFormat::Plain,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli.command) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(2);
        }
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Get { repo, path } => run_get(&repo, &path),
        Command::Diff {
            schema,
            run,
            edit,
            report,
        } => run_diff(&schema, &run, &edit, &report),
        Command::Edit {
            repo,
            candidate,
            report,
        } => run_edit(&repo, &candidate, &report),
        Command::Dump { repo } => run_dump(&repo),
    }
}

fn open_repository(args: &RepoArgs) -> Result<Repository> {
    let mut repo = Repository::new();
    repo.init(&args.schema, &args.data).with_context(|| {
        format!(
            "Failed to open repository {} with schema {}",
            args.data.display(),
            args.schema.display()
        )
    })?;
    Ok(repo)
}

fn run_get(args: &RepoArgs, path: &str) -> Result<i32> {
    let repo = open_repository(args)?;
    let node = repo.get(path)?;

    match (node.kind(), node.value()) {
        (NodeKind::Leaf(_), Some(value)) => println!("{}", value),
        _ => println!("{}", dump_node(node)?),
    }
    Ok(0)
}

fn run_diff(
    schema_path: &Path,
    run_path: &Path,
    edit_path: &Path,
    report: &ReportArgs,
) -> Result<i32> {
    let schema = Arc::new(
        load_schema_file(schema_path)
            .with_context(|| format!("Failed to load schema: {}", schema_path.display()))?,
    );
    let run_tree = read_tree(&schema, run_path)?;
    let edit_tree = read_tree(&schema, edit_path)?;

    let changes = diff(&schema, &run_tree, &edit_tree).context("Failed to compute diff")?;
    let output = format_diff(&changes, &report.format.into(), &report.options())
        .context("Failed to format diff output")?;
    println!("{}", output);

    Ok(if changes.is_empty() { 0 } else { 1 })
}

fn read_tree(schema: &Arc<Schema>, path: &Path) -> Result<DataTree> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_data(schema, &text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn run_edit(args: &RepoArgs, candidate: &Path, report: &ReportArgs) -> Result<i32> {
    let mut repo = open_repository(args)?;
    let text = fs::read_to_string(candidate)
        .with_context(|| format!("Failed to read {}", candidate.display()))?;

    let format: OutputFormat = report.format.into();
    let options = report.options();
    repo.on_diff(move |changes| match format_diff(changes, &format, &options) {
        Ok(output) => println!("{}", output),
        Err(err) => eprintln!("Error: {}", err),
    });

    repo.edit(&text)
        .with_context(|| format!("Failed to commit {}", candidate.display()))?;
    Ok(0)
}

fn run_dump(args: &RepoArgs) -> Result<i32> {
    let repo = open_repository(args)?;
    let running = repo.running().context("Repository has no running tree")?;
    println!("{}", dump(running)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_conversion() {
        assert_eq!(
            OutputFormat::from(OutputFormatArg::Terminal),
            OutputFormat::Terminal
        );
        assert_eq!(
            OutputFormat::from(OutputFormatArg::Json),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::from(OutputFormatArg::Plain),
            OutputFormat::Plain
        );
    }

    #[test]
    fn test_cli_parses_get() {
        let cli = Cli::try_parse_from([
            "mdrepo",
            "get",
            "--schema",
            "model.json",
            "--data",
            "data.json",
            "Data/Name",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Get { ref path, .. } if path == "Data/Name"));
    }
}
