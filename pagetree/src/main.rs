//! Command-line host for the page-tree session engine.
//!
//! Every invocation of `pagetree cycle` is one rerun of the host program:
//! the session is restored from `<dir>/sessions/<name>.json`, the requested
//! interactions are applied, the active page runs, and the result is committed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;

use pagetree::core::navigator::{adjacent, nav_entries};
use pagetree::cycle::{CycleExecutor, CycleReport, CycleRequest, Interaction};
use pagetree::exit_codes;
use pagetree::io::config::{EngineConfig, load_config, write_config};
use pagetree::io::file_store::FileStore;
use pagetree::io::store::SessionStore;
use pagetree::render::render_navigation;
use pagetree::tree::DataMap;

#[derive(Parser)]
#[command(
    name = "pagetree",
    version,
    about = "Rerun-driven page-tree session engine"
)]
struct Cli {
    /// Directory holding `config.toml` and stored sessions.
    #[arg(long, global = true, default_value = ".pagetree")]
    dir: PathBuf,

    /// Session name.
    #[arg(long, global = true, default_value = "main")]
    session: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `config.toml` if missing.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Run one cycle: apply interactions, run the active page, commit.
    Cycle {
        /// Select a page by id. Repeatable; the last valid one wins.
        #[arg(long = "select", value_name = "ID")]
        select: Vec<String>,

        /// Reset the session before the page runs.
        #[arg(long)]
        reset: bool,

        /// Persist a global value (`KEY=JSON`).
        #[arg(long = "set", value_name = "KEY=JSON", value_parser = parse_assignment)]
        set: Vec<(String, Value)>,

        /// Override a global for this cycle only (`KEY=JSON`).
        #[arg(long = "override", value_name = "KEY=JSON", value_parser = parse_assignment)]
        overrides: Vec<(String, Value)>,

        /// Print the debug view after the page output.
        #[arg(long)]
        debug: bool,
    },
    /// Clear all page data and return the session to its start page.
    Reset,
    /// Print the stored snapshot and its navigation without running a cycle.
    Show,
    /// List stored sessions.
    Sessions,
}

fn main() {
    pagetree::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.dir, force),
        Command::Cycle {
            select,
            reset,
            set,
            overrides,
            debug,
        } => {
            let request = build_request(select, reset, set, overrides);
            cmd_cycle(&cli.dir, &cli.session, request, debug)
        }
        Command::Reset => cmd_reset(&cli.dir, &cli.session),
        Command::Show => cmd_show(&cli.dir, &cli.session),
        Command::Sessions => cmd_sessions(&cli.dir),
    }
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join("config.toml")
}

fn open_store(dir: &Path) -> Result<FileStore> {
    let store = FileStore::new(dir.join("sessions"))?;
    debug!(dir = %store.dir().display(), "opened session store");
    Ok(store)
}

fn cmd_init(dir: &Path, force: bool) -> Result<i32> {
    let path = config_path(dir);
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    if force || !path.exists() {
        write_config(&path, &EngineConfig::default())?;
    }
    Ok(exit_codes::OK)
}

/// Interactions in command-line order: globals, then reset, then selections.
fn build_request(
    select: Vec<String>,
    reset: bool,
    set: Vec<(String, Value)>,
    overrides: Vec<(String, Value)>,
) -> CycleRequest {
    let mut request = CycleRequest::new();
    if !set.is_empty() {
        let globals: DataMap = set.into_iter().collect();
        request.interactions.push(Interaction::UpdateGlobals(globals));
    }
    if reset {
        request = request.reset();
    }
    for id in select {
        request = request.select(id);
    }
    request.overrides = overrides.into_iter().collect();
    request
}

fn cmd_cycle(dir: &Path, session: &str, request: CycleRequest, debug: bool) -> Result<i32> {
    let mut cfg = load_config(&config_path(dir))?;
    cfg.debug |= debug;
    let app = cfg.to_app().context("build app from config")?;
    let store = open_store(dir)?;
    let report = CycleExecutor::new(&app, &store).run_cycle(session, request)?;
    print_report(&report)?;
    if report.diagnostics.is_empty() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::DIAGNOSTICS)
    }
}

fn print_report(report: &CycleReport) -> Result<()> {
    for line in &report.output {
        println!("{line}");
    }
    if !report.output.is_empty() {
        println!();
    }
    let navigation = render_navigation(&report.navigation, &report.active.id)
        .context("render navigation")?;
    print!("{navigation}");
    for diagnostic in &report.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    if let Some(debug) = &report.debug {
        println!();
        print!("{debug}");
    }
    Ok(())
}

fn cmd_reset(dir: &Path, session: &str) -> Result<i32> {
    let app = load_config(&config_path(dir))?
        .to_app()
        .context("build app from config")?;
    let store = open_store(dir)?;
    let snapshot = CycleExecutor::new(&app, &store).reset(session)?;
    println!("{}", snapshot.active_id);
    Ok(exit_codes::OK)
}

fn cmd_show(dir: &Path, session: &str) -> Result<i32> {
    let store = open_store(dir)?;
    let snapshot = store
        .load(session)?
        .ok_or_else(|| anyhow!("session '{session}' has not been started"))?;
    snapshot.validate()?;
    let entries = nav_entries(adjacent(&snapshot.tree, &snapshot.active_id)?);
    print!(
        "{}",
        render_navigation(&entries, &snapshot.active_id).context("render navigation")?
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("serialize snapshot")?
    );
    Ok(exit_codes::OK)
}

fn cmd_sessions(dir: &Path) -> Result<i32> {
    for name in open_store(dir)?.sessions()? {
        println!("{name}");
    }
    Ok(exit_codes::OK)
}

/// Parse `KEY=JSON`. Values that are not valid JSON are taken as strings.
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=JSON, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}
