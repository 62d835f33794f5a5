mod commands;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::Project;

#[derive(Parser)]
#[command(name = "notiblog")]
#[command(version, about = "Static site generator for blogs written in Notion", long_about = None)]
struct Cli {
    /// Path to site.toml
    #[arg(short, long, global = true, default_value = "site.toml")]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Download all pages reachable from the start page, plus their images
    Import {
        /// Re-download every page even if the cached copy is current
        #[arg(long)]
        no_cache: bool,
    },

    /// Re-download a single page
    ImportOne {
        /// Page id, with or without dashes
        id: String,
    },

    /// Generate the static site from the page cache
    Rebuild {
        /// Output directory (defaults to paths.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Preview the site, rendering pages on demand from the page cache
    Preview {
        /// Port to serve on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve a previously generated site
    Serve {
        /// Directory to serve (defaults to paths.output_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Port to serve on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Count lines of source code in the current directory
    Wc,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Import { no_cache } => {
            commands::import::run(&Project::load(&cli.config)?, no_cache).await
        }
        Command::ImportOne { id } => {
            commands::import::run_one(&Project::load(&cli.config)?, &id).await
        }
        Command::Rebuild { output } => {
            commands::rebuild::run(&Project::load(&cli.config)?, output).await
        }
        Command::Preview { port } => {
            commands::preview::run(&Project::load(&cli.config)?, port).await
        }
        Command::Serve { dir, port } => {
            commands::serve::run(&Project::load(&cli.config)?, dir, port).await
        }
        Command::Wc => commands::wc::run(&cli.config),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "notiblog", &mut io::stdout());
            Ok(())
        }
    }
}
