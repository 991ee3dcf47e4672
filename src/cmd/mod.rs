mod clean_cache;
pub(crate) mod generate;

use crate::config::EXAMPLE_CONFIG;
use crate::json_schema;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use generate::GenerateArgs;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drift-gen")]
#[command(version)]
#[command(
    about = "Generate multi-day tabular data with schema drift and anomalies",
    long_about = None
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log level filter (overrides -v; RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate day files from a configuration
    Generate(GenerateArgs),

    /// Remove every day cache from the cache directory
    CleanCache {
        /// Cache directory (default: from config, else the platform cache dir)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Configuration file whose cache_dir should be cleaned
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print an example YAML configuration
    ExampleConfig,

    /// Print JSON schemas for the config file and --json output
    Schema {
        /// Schema to print (all when omitted)
        name: Option<String>,

        /// List available schema names
        #[arg(long)]
        list: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Default tracing filter from the command line flags.
    pub fn log_filter(&self) -> String {
        if let Some(level) = &self.log_level {
            return level.clone();
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
        .to_string()
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => generate::run(args),
        Commands::CleanCache { cache_dir, config } => clean_cache::run(cache_dir, config),
        Commands::ExampleConfig => {
            print!("{}", EXAMPLE_CONFIG);
            Ok(())
        }
        Commands::Schema { name, list } => {
            if list {
                for name in json_schema::schema_names() {
                    println!("{}", name);
                }
                return Ok(());
            }
            match name {
                Some(name) => {
                    let schema = json_schema::get_schema(&name).ok_or_else(|| {
                        anyhow::anyhow!(
                            "Unknown schema: {}. Available: {}",
                            name,
                            json_schema::schema_names().join(", ")
                        )
                    })?;
                    println!("{}", serde_json::to_string_pretty(&schema)?);
                }
                None => {
                    let schemas = json_schema::all_schemas();
                    println!("{}", serde_json::to_string_pretty(&schemas)?);
                }
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "drift-gen", &mut io::stdout());
            Ok(())
        }
    }
}
