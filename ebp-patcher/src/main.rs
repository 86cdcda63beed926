use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ebp_script::{FieldGroup, GrowRequest};

mod commands;
mod config;

use config::{load_dictionary, PatcherConfig};

/// Worker table growth and worker script objects for .ebp containers
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML config (log level, dictionary, backup, layout overrides)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// YAML command dictionary; overrides the config
    #[arg(short, long, global = true)]
    dictionary: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add clones of a worker to the pointer table
    Grow {
        file: PathBuf,
        #[arg(short = 'n', long, default_value_t = 1)]
        clones: u16,
        #[arg(short, long, default_value_t = 1)]
        source: u16,
        #[arg(long)]
        no_backup: bool,
    },

    /// List worker object candidates
    Scan { file: PathBuf },

    /// Decode a worker object into rows
    Import {
        file: PathBuf,
        #[arg(short, long)]
        index: Option<usize>,
        /// Save the rows as a profile
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Append a new worker object built from a profile
    Append {
        file: PathBuf,
        profile: PathBuf,
        /// Append only, leave the worker table alone
        #[arg(long)]
        no_grow: bool,
        #[arg(short = 'n', long, default_value_t = 1)]
        clones: u16,
        #[arg(short, long, default_value_t = 1)]
        source: u16,
    },

    /// Rewrite an existing worker object from a profile
    Update {
        file: PathBuf,
        profile: PathBuf,
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// Show row offsets and pointer tables of a profile
    Tables { profile: PathBuf },

    /// Copy one field of a profile to a page file, or back
    Page {
        #[command(subcommand)]
        action: PageAction,
    },
}

#[derive(Subcommand, Debug)]
enum PageAction {
    Extract {
        profile: PathBuf,
        field: FieldGroup,
        output: PathBuf,
    },
    Insert {
        profile: PathBuf,
        field: FieldGroup,
        page: PathBuf,
    },
}

fn run(args: Args, config: PatcherConfig) -> Result<()> {
    let dictionary_path = args.dictionary.or(config.dictionary.clone());
    let layout = &config.layout;

    match args.command {
        Command::Grow {
            file,
            clones,
            source,
            no_backup,
        } => commands::run_grow(&file, clones, source, layout, config.backup && !no_backup),
        Command::Scan { file } => commands::run_scan(&file),
        Command::Import { file, index, output } => {
            let dictionary = load_dictionary(dictionary_path.as_deref())?;
            commands::run_import(&file, index, output.as_deref(), &dictionary)
        }
        Command::Append {
            file,
            profile,
            no_grow,
            clones,
            source,
        } => {
            let grow_first = (!no_grow).then_some(GrowRequest {
                clones,
                source_id: source,
                backup: config.backup,
            });
            commands::run_append(&file, &profile, layout, grow_first)
        }
        Command::Update { file, profile, index } => commands::run_update(&file, &profile, index),
        Command::Tables { profile } => {
            let dictionary = load_dictionary(dictionary_path.as_deref())?;
            commands::run_tables(&profile, &dictionary)
        }
        Command::Page { action } => match action {
            PageAction::Extract { profile, field, output } => commands::extract_page(&profile, field, &output),
            PageAction::Insert { profile, field, page } => commands::insert_page(&profile, field, &page),
        },
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = PatcherConfig::load_or_default(args.config.as_deref())?;
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()));

    if let Err(e) = run(args, config) {
        log::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
