mod buffer;
mod config;
mod editor;
mod filter;
mod matcher;
mod navigation;
mod session;
mod subsearch;
mod tui;
mod walker;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use config::Config;
use editor::EditorCommand;
use filter::FilterPolicy;
use log::{debug, info, LevelFilter};
use session::{SearchParams, Session};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "ngp",
    version,
    about = "Interactive recursive content search",
    long_about = "Walks a directory tree, shows matching lines live while the walk runs, \
                  and lets you narrow the results with nested searches or open a match in your editor."
)]
struct Cli {
    /// Pattern to search for
    pattern: String,

    /// Where to start (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Case-insensitive matching
    #[arg(short, long)]
    ignore_case: bool,

    /// Also scan files with this extension (repeatable)
    #[arg(short = 't', long = "type", value_name = "EXT")]
    types: Vec<String>,

    /// Scan every regular file, whatever its name
    #[arg(short, long)]
    raw: bool,

    /// Treat the pattern as a regular expression
    #[arg(short = 'e', long)]
    regexp: bool,

    /// Follow symbolic links
    #[arg(short, long)]
    follow: bool,

    /// Skip this directory (repeatable)
    #[arg(short = 'x', long, value_name = "DIR")]
    exclude: Vec<String>,

    /// Verbosity level (-v, -vv, -vvv), written to the log file
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "ngp:".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;

    let config = Config::load()?;
    info!("config loaded from {}", config.source.display());

    let mut policy = FilterPolicy::new(&config.extensions, &config.files)
        .with_raw(cli.raw)
        .with_follow_symlinks(cli.follow);
    for ext in &cli.types {
        policy.add_extension(ext);
    }
    for dir in &cli.exclude {
        policy.add_exclude(dir);
    }
    debug!("scanning extensions {:?}", policy.extensions());

    let params = SearchParams {
        pattern: cli.pattern,
        root: cli.path,
        ignore_case: cli.ignore_case,
        regex: cli.regexp,
        policy,
    };
    // Compile first so a bad pattern is reported before the root is looked at.
    let mut session = Session::prepare(&params)?;
    if fs::symlink_metadata(&params.root).is_err() {
        bail!("{}: no such file or directory", params.root.display());
    }
    session.spawn_walker(params.policy)?;

    let pattern = params.pattern;
    let editor = EditorCommand::new(config.editor);
    match tui::run(session, &editor)? {
        tui::Exit::Quit => {}
        tui::Exit::NothingFound => println!("No match found for '{pattern}'."),
    }
    Ok(())
}

/// Log records go to `<cache dir>/ngp/ngp.log`, never to the terminal the UI owns.
/// Off unless `-v` is given or `RUST_LOG` is set.
fn init_logging(verbose: u8) -> Result<()> {
    let from_env = std::env::var_os("RUST_LOG").is_some();
    if verbose == 0 && !from_env {
        return Ok(());
    }

    let Some(cache) = dirs::cache_dir() else {
        return Ok(());
    };
    let dir = cache.join("ngp");
    fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let path = dir.join("ngp.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
