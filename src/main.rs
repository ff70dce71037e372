use clap::{Parser, Subcommand, ValueEnum, builder::styling};
use crm_migrator::{
    cli::{chunk_bytes_from_mb, run_import, run_job},
    config::{DEFAULT_CONFIG_FILE, MigrationConfig},
    jobs::{self, RenameTarget},
};
use eyre::{Result, bail};
use owo_colors::OwoColorize;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// CRM Migrator: turn a Salesforce export into chunked HubSpot import files
#[derive(Parser)]
#[command(name = "crmig", version, styles = STYLES)]
struct Cli {
    /// The migration config file; defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// The dotenv file to source credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Directory to write import files to (overrides the config file)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Chunk size limit in MiB (overrides the config file)
    #[arg(long, global = true)]
    max_chunk_mb: Option<u64>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Event.csv into call, meeting and email imports
    Activities,

    /// Convert email tasks from Task.csv into an email import
    TaskEmails,

    /// Convert Note.csv into a classic note import
    Notes,

    /// Convert enhanced notes (SNOTE content versions) into a note import
    Snotes,

    /// Build the upload manifest for attachments and documents
    Manifest,

    /// Rename exported files to "{Id} -- {name}.{ext}"
    Rename {
        /// Which export folder to rename
        #[arg(value_enum)]
        target: Target,
    },

    /// Upload the files listed in the manifest and attach them to their records
    Import {
        /// Actually upload and attach instead of reporting what would happen
        #[arg(long)]
        execute: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Attachments,
    ContentVersions,
}

impl From<Target> for RenameTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Attachments => RenameTarget::Attachments,
            Target::ContentVersions => RenameTarget::ContentVersions,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // credentials are only needed for the import
    dotenvy::from_filename(&cli.env).ok();

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let mut config = MigrationConfig::load(&cli.config)?;
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(mb) = cli.max_chunk_mb {
        config.max_chunk_bytes = chunk_bytes_from_mb(mb)?;
    }

    let report = match cli.command {
        Commands::Activities => run_job(&config, jobs::migrate_activities)?,
        Commands::TaskEmails => run_job(&config, jobs::migrate_task_emails)?,
        Commands::Notes => run_job(&config, jobs::migrate_notes)?,
        Commands::Snotes => run_job(&config, jobs::migrate_snotes)?,
        Commands::Manifest => run_job(&config, jobs::build_manifest)?,
        Commands::Rename { target } => {
            let summary = jobs::rename_files(&config, target.into())?;
            if summary.failed > 0 {
                log::warn!("{} file(s) could not be renamed", summary.failed.red());
            }
            return Ok(());
        }
        Commands::Import { execute } => {
            let dry_run = !execute && config.upload.dry_run;
            let summary = run_import(&config, dry_run).await?;
            if summary.failed > 0 {
                log::warn!("{} upload(s) failed", summary.failed.red());
            }
            return Ok(());
        }
    };

    if report.has_failures() {
        bail!("Some partitions of {} could not be written", report.job);
    }
    Ok(())
}
