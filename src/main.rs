use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, crate_name};
use std::path::PathBuf;

use cdp::{
    commands,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "cdp")]
#[command(about = "Claude profile manager - isolated Claude Code configuration directories")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// More log output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the cdp config and profile storage directory
    Init,

    /// Create a new profile
    Create {
        /// Name of the profile to create
        name: String,

        /// Short description shown in listings
        #[arg(short, long, default_value = "")]
        description: String,

        /// Template merged into settings.json
        #[arg(short, long)]
        template: Option<String>,
    },

    /// List all profiles, most recently used first
    #[command(visible_alias = "ls")]
    List,

    /// Show the active profile
    Current,

    /// Show detailed information about a profile
    Info {
        /// Name of the profile to inspect
        name: String,
    },

    /// Activate a profile and launch claude with it
    #[command(visible_alias = "switch")]
    Use {
        /// Only activate, don't launch claude
        #[arg(long)]
        no_run: bool,

        /// Path to the claude executable
        #[arg(long, value_name = "PATH")]
        claude_path: Option<PathBuf>,

        /// Name of the profile to activate
        name: String,

        /// Arguments passed through to claude
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        claude_args: Vec<String>,
    },

    /// Delete a profile
    #[command(visible_alias = "rm")]
    Delete {
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Copy a profile's files into a new profile
    Clone { source: String, dest: String },

    /// Rename a profile
    Rename { old_name: String, new_name: String },

    /// Import an existing Claude config directory (e.g. ~/.claude) as a profile
    Import {
        /// Directory to import
        source: String,

        /// Name of the new profile
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Answer yes to every question, overwriting an existing profile
        #[arg(short, long)]
        yes: bool,

        /// Offer to delete the source directory afterwards
        #[arg(long)]
        remove_source: bool,
    },

    /// Compare two profiles
    Diff { left: String, right: String },

    /// List available settings templates
    Templates,

    /// Manage profile backups
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Run diagnostics on the cdp setup
    Doctor,

    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Archive a profile
    Create { name: String },

    /// List backups, newest first
    #[command(visible_alias = "ls")]
    List,

    /// Restore a profile from a backup name or archive path
    Restore {
        archive: String,

        /// Replace the profile if it exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Delete one backup
    Delete {
        archive: String,

        #[arg(short, long)]
        force: bool,
    },

    /// Delete backups older than the given number of days
    Clean {
        /// Days to keep; 0 deletes every backup
        #[arg(long, default_value_t = 30)]
        days: u32,

        #[arg(short, long)]
        force: bool,
    },
}

fn init_logger(verbose: u8) -> Result<()> {
    let crate_name = crate_name!();
    let mut logger_builder = pretty_env_logger::formatted_builder();

    // User-facing output goes through Ui; the log is for diagnostics only
    let default_log_level = log::LevelFilter::Warn;
    logger_builder.filter_module(crate_name, default_log_level);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        logger_builder.parse_filters(&filter);
    }
    if verbose != 0 {
        let mut iter = log::LevelFilter::iter().fuse();
        iter.find(|level| *level == default_log_level);
        let level = iter
            .nth(usize::from(verbose) - 1)
            .unwrap_or_else(log::LevelFilter::max);
        logger_builder.filter_module(crate_name, level);
    }

    logger_builder.try_init()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose)?;

    let ui = Ui::new(cli.color, cli.no_color);

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, crate_name!(), &mut std::io::stdout());
        return Ok(());
    }

    let paths = Paths::new()?;

    match cli.command {
        Commands::Init => commands::init(&paths, &ui),
        Commands::Create {
            name,
            description,
            template,
        } => commands::create(&paths, &ui, &name, &description, template.as_deref()),
        Commands::List => commands::list(&paths, &ui),
        Commands::Current => commands::current(&paths, &ui),
        Commands::Info { name } => commands::info(&paths, &ui, &name),
        Commands::Use {
            no_run,
            claude_path,
            name,
            claude_args,
        } => {
            let code =
                commands::use_profile(&paths, &ui, &name, no_run, claude_path, &claude_args)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Delete { name, force } => commands::delete(&paths, &ui, &name, force),
        Commands::Clone { source, dest } => commands::clone(&paths, &ui, &source, &dest),
        Commands::Rename { old_name, new_name } => {
            commands::rename(&paths, &ui, &old_name, &new_name)
        }
        Commands::Import {
            source,
            name,
            description,
            yes,
            remove_source,
        } => commands::import(&paths, &ui, &source, &name, &description, yes, remove_source),
        Commands::Diff { left, right } => commands::diff(&paths, &ui, &left, &right),
        Commands::Templates => commands::templates(&paths, &ui),
        Commands::Backup(backup) => match backup {
            BackupCommands::Create { name } => commands::backup_create(&paths, &ui, &name),
            BackupCommands::List => commands::backup_list(&paths, &ui),
            BackupCommands::Restore { archive, overwrite } => {
                commands::backup_restore(&paths, &ui, &archive, overwrite)
            }
            BackupCommands::Delete { archive, force } => {
                commands::backup_delete(&paths, &ui, &archive, force)
            }
            BackupCommands::Clean { days, force } => {
                commands::backup_clean(&paths, &ui, days, force)
            }
        },
        Commands::Doctor => commands::doctor(&paths, &ui),
        Commands::Completions { .. } => Ok(()),
    }
}
