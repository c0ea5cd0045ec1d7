use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use canvas_api::{Breakpoint, InteractionState};
use canvas_cli::commands::{self, render::RenderArgs};
use canvas_cli::CanvasConfig;

#[derive(Parser)]
#[command(name = "canvas")]
#[command(about = "Inspect, migrate and render page-builder documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $CANVAS_CONFIG, then ~/.config/canvas/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring stored documents up to the current version (dry run by default)
    Migrate {
        /// Document files or directories of *.json files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Rewrite migrated files in place
        #[arg(long)]
        write: bool,
    },

    /// Summarize a document: version, node count, canvas heights, dropped input
    Inspect {
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Print the layer outline
    Outline {
        path: PathBuf,

        #[arg(short, long, default_value = "desktop")]
        breakpoint: Breakpoint,

        /// Only show nodes matching this text, with their ancestors
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Compose a page into a template's slot
    Compose {
        template: PathBuf,
        page: PathBuf,

        #[arg(short, long, default_value = "desktop")]
        breakpoint: Breakpoint,
    },

    /// Render a document (optionally inside a template) to positioned JSON
    Render {
        path: PathBuf,

        #[arg(short, long)]
        template: Option<PathBuf>,

        #[arg(short, long, default_value = "desktop")]
        breakpoint: Breakpoint,

        /// Interaction state (default, hover, active, focus)
        #[arg(short, long, default_value = "default")]
        state: InteractionState,

        /// JSON object of resolved references keyed like `media:/a.png`
        #[arg(short, long)]
        references: Option<PathBuf>,
    },

    /// Sanitize a style record from a file, or stdin with `-`
    Sanitize { path: PathBuf },

    /// Print a starter template: top menu, page slot, footer menu
    Template {
        /// Top menu name; `none` leaves it out
        #[arg(long, default_value = "main")]
        menu: String,

        /// Footer menu name; `none` leaves it out
        #[arg(long, default_value = "footer")]
        footer: String,
    },
}

fn init_logging(verbose: bool) {
    // --verbose wins over RUST_LOG
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CanvasConfig::load(cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Migrate { paths, write } => {
            let report = commands::migrate::run(&paths, write, &config)?;
            print!("{}", report);
            return Ok(if report.has_failures() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            });
        }
        Commands::Inspect { path, json } => commands::inspect::run(&path, json, &config)?,
        Commands::Outline {
            path,
            breakpoint,
            query,
            json,
        } => commands::outline::run(&path, breakpoint, query.as_deref(), json, &config)?,
        Commands::Compose {
            template,
            page,
            breakpoint,
        } => commands::compose::run(&template, &page, breakpoint, &config)?,
        Commands::Render {
            path,
            template,
            breakpoint,
            state,
            references,
        } => {
            let args = RenderArgs {
                page: &path,
                template: template.as_deref(),
                breakpoint,
                state,
                references: references.as_deref(),
            };
            commands::render::run(&args, &config)?
        }
        Commands::Sanitize { path } => commands::sanitize::run(&path, &config)?,
        Commands::Template { menu, footer } => commands::template::run(&menu, &footer)?,
    };

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(ExitCode::SUCCESS)
}
