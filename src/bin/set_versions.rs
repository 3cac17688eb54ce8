use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use colored::Colorize;
use serde_json::Value;
use set_versions::{
    ConfigError, ErrorCategory, SyncError, SyncOptions, SyncReport, VersionChange,
    VersionSynchronizer, WorkspaceResolver,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Set one version across package.json manifests and their internal dependencies
#[derive(Parser, Debug)]
#[command(name = "set-versions", author, version, about, long_about = None)]
struct Cli {
    /// Version to set (defaults to the root manifest's version with --workspaces)
    #[arg(value_name = "VERSION")]
    target: Option<String>,

    /// package.json files to update
    #[arg(conflicts_with = "workspaces")]
    files: Vec<PathBuf>,

    /// Update the workspace root and every package it declares
    #[arg(short, long)]
    workspaces: bool,

    /// Directory to run from
    #[arg(short = 'C', long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Show what would change without writing files
    #[arg(long)]
    dry_run: bool,

    /// Exit non-zero if any manifest is not at the version
    #[arg(long, conflicts_with = "dry_run")]
    check: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // Sync errors already render their cause; other errors show the chain.
            match e.downcast_ref::<SyncError>() {
                Some(sync) => eprintln!("{} {}", "error:".red().bold(), sync),
                None => eprintln!("{} {:#}", "error:".red().bold(), e),
            }
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let category = err.downcast_ref::<SyncError>().map(SyncError::category);
    match category {
        Some(ErrorCategory::Configuration) => ExitCode::from(2),
        Some(ErrorCategory::ManifestRead) => ExitCode::from(3),
        Some(ErrorCategory::ManifestWrite) => ExitCode::from(4),
        Some(ErrorCategory::Internal) | None => ExitCode::FAILURE,
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let current_dir = std::env::current_dir().context("Failed to determine current directory")?;
    let base = match &cli.cwd {
        Some(dir) => current_dir.join(dir),
        None => current_dir,
    };

    let (version, paths) = if cli.workspaces {
        let workspace = WorkspaceResolver::new(&base).resolve()?;
        let version = match cli.target {
            Some(version) => version,
            None => workspace
                .root_manifest
                .version()
                .map(str::to_string)
                .ok_or_else(|| {
                    SyncError::from(ConfigError::MissingVersion {
                        path: workspace.root_manifest_path().to_path_buf(),
                    })
                })?,
        };
        (version, workspace.all_manifest_paths())
    } else {
        let Some(version) = cli.target else {
            Cli::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    "a VERSION is required unless --workspaces is given",
                )
                .exit();
        };
        if cli.files.is_empty() {
            Cli::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    "at least one package.json file is required unless --workspaces is given",
                )
                .exit();
        }
        let paths: Vec<PathBuf> = cli.files.iter().map(|f| base.join(f)).collect();
        (version, paths)
    };

    let synchronizer = VersionSynchronizer::new(version).with_options(SyncOptions {
        dry_run: cli.dry_run,
    });

    if cli.check {
        let report = synchronizer.check(&paths).await?;
        return Ok(print_check(&report, &base));
    }

    let report = synchronizer.synchronize(&paths).await?;
    print_report(&report, &base);
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &SyncReport, base: &Path) {
    if !report.written {
        println!("{}", "Dry run mode: no files were written".yellow());
    }

    for change in &report.changes {
        print_change(change, base);
    }

    let verb = if report.written { "Updated" } else { "Would update" };
    println!(
        "\n{} {} manifest(s) to {}",
        verb,
        report.changes.len(),
        report.version.bright_white().bold()
    );
}

fn print_check(report: &SyncReport, base: &Path) -> ExitCode {
    if report.is_in_sync() {
        println!(
            "{} All {} manifest(s) are at {}",
            "✓".green(),
            report.changes.len(),
            report.version.bright_white().bold()
        );
        return ExitCode::SUCCESS;
    }

    println!("{}", "Out of sync manifests:".red().bold());
    for change in report.outdated() {
        print_change(change, base);
    }
    ExitCode::FAILURE
}

fn print_change(change: &VersionChange, base: &Path) {
    let path = change.path.strip_prefix(base).unwrap_or(&change.path);
    let label = change.package.as_deref().unwrap_or("(unnamed)");
    let old = change.old_version.as_deref().unwrap_or("none");

    let note = if change.is_version_drift() {
        String::new()
    } else {
        format!(" {}", "(formatting only)".dimmed())
    };

    println!(
        "  {} {} {} → {}{}",
        label.cyan(),
        path.display().to_string().dimmed(),
        old,
        change.new_version.green(),
        note
    );
    for dep in &change.dependencies {
        println!(
            "    {} {} ({}) {} → {}",
            "•".dimmed(),
            dep.name,
            dep.kind.field(),
            specifier(&dep.old_specifier),
            dep.new_specifier.green()
        );
    }
}

fn specifier(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
