mod commands;
mod completion;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{
    add_app, build_app, contains_app, list_view_lines, list_views_json, load_manifest, remove_app,
    resolve_view, resolve_views, show_app, AddAttributes, ViewArgs,
};
use crate::completion::{write_completions_script, CliCompletionShell};
use crate::render::current_output_style;

const LOG_ENV: &str = "WINAPP_LOG";

#[derive(Parser, Debug)]
#[command(name = "winapp")]
#[command(
    about = "Manage unpackaged applications in the installed programs registry",
    long_about = None
)]
struct Cli {
    /// Raise log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Disable styled output.
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List applications in one view, or in every view.
    List {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        json: bool,
    },
    /// Show every attribute of an application.
    Show {
        id: String,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        json: bool,
    },
    /// Report whether an application is present.
    Contains {
        id: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Add an application record.
    Add {
        #[arg(required_unless_present = "manifest")]
        id: Option<String>,
        /// TOML manifest describing the application.
        #[arg(long, conflicts_with = "id")]
        manifest: Option<PathBuf>,
        #[command(flatten)]
        attributes: AddAttributes,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Remove an application record. The application's uninstaller is not run.
    Remove {
        id: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run_cli(cli)
}

fn run_cli(cli: Cli) -> Result<()> {
    let style = current_output_style(cli.plain);
    tracing::debug!(command = ?cli.command, ?style, "running command");

    match cli.command {
        Commands::List { view, json } => {
            let views = resolve_views(&view, true)?;
            let store = host_store()?;
            if json {
                println!("{}", list_views_json(&store, &views)?);
            } else {
                for line in list_view_lines(&store, &views, style) {
                    println!("{line}");
                }
            }
        }
        Commands::Show { id, view, json } => {
            let view = resolve_view(&view)?;
            let store = host_store()?;
            for line in show_app(&store, view, &id, json)? {
                println!("{line}");
            }
        }
        Commands::Contains { id, view } => {
            let view = resolve_view(&view)?;
            let store = host_store()?;
            println!("{}", contains_app(&store, view, &id)?);
        }
        Commands::Add {
            id,
            manifest,
            attributes,
            view,
        } => {
            let view = resolve_view(&view)?;
            let app = match (manifest, id) {
                (Some(path), _) => load_manifest(&path)?,
                (None, Some(id)) => {
                    build_app(&id, &attributes, chrono::Local::now().date_naive())?
                }
                (None, None) => anyhow::bail!("either an application id or --manifest is required"),
            };
            let store = host_store()?;
            println!("{}", add_app(&store, view, &app, style)?);
        }
        Commands::Remove { id, view } => {
            let view = resolve_view(&view)?;
            let store = host_store()?;
            println!("{}", remove_app(&store, view, &id, style)?);
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}

#[cfg(windows)]
fn host_store() -> Result<winapp_registry::WindowsStore> {
    Ok(winapp_registry::WindowsStore::new())
}

#[cfg(not(windows))]
fn host_store() -> Result<winapp_registry::MemoryStore> {
    anyhow::bail!("the application registry requires a Windows host")
}

fn init_logging(verbose: u8) {
    let env = std::env::var(LOG_ENV).ok();
    let filter = EnvFilter::try_new(log_filter(verbose, env.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `-v` flags take precedence over the environment.
fn log_filter(verbose: u8, env: Option<&str>) -> String {
    match (verbose, env) {
        (0, Some(directives)) if !directives.trim().is_empty() => directives.to_string(),
        (0, _) => "warn".to_string(),
        (1, _) => "info".to_string(),
        (2, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
