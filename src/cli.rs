use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Compile configuration profiles against node facts and converge live state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory of additional profile definitions (*.toml)
    #[arg(long, global = true, env = "CONVERGE_PROFILES")]
    pub profiles: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile a profile into a catalog
    Compile(CompileArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Make live state match the catalog
    Apply(ApplyArgs),

    /// Check live state against the catalog without changing it
    Verify(VerifyArgs),

    /// Show facts loaded from a file
    Facts {
        /// Fact file (JSON or TOML)
        #[arg(long)]
        facts: PathBuf,

        /// Show only this key (dotted form, e.g. os.release.major)
        key: Option<String>,
    },

    /// List available profiles
    Profiles,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Profile, facts and optional target selection
#[derive(Args)]
pub struct CatalogArgs {
    /// Profile to compile
    pub profile: String,

    /// Fact file (JSON or TOML)
    #[arg(long)]
    pub facts: PathBuf,

    /// Only include matching resources: type, type.name or Type[name]
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// State file standing in for the live system
    #[arg(long)]
    pub state: PathBuf,

    /// Number of parallel provider calls
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// State file standing in for the live system
    #[arg(long)]
    pub state: PathBuf,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel provider calls
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// State file standing in for the live system
    #[arg(long)]
    pub state: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
