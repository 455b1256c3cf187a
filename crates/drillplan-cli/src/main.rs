//! drillplan CLI: plan dictation sessions, score papers, report progress.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "drillplan", version, about = "Spaced-repetition dictation session planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan (and optionally commit) practice sessions
    Plan {
        /// Requesting user
        #[arg(long)]
        user: String,

        /// Subject register name (e.g. "ch_zici", "en_word")
        #[arg(long)]
        subject: Option<String>,

        /// Learners to plan for (comma-separated, default: yourself or your class)
        #[arg(long)]
        targets: Option<String>,

        /// Role to act in, for users holding several
        #[arg(long)]
        role: Option<String>,

        /// Class to act for, for users holding several
        #[arg(long)]
        class: Option<String>,

        /// Textbook grade (default: from the class registration)
        #[arg(long)]
        grade: Option<u32>,

        /// Textbook volume (default: from the class registration)
        #[arg(long)]
        volume: Option<u32>,

        /// Lessons to draw from, bypassing the learning path (e.g. "1,2,5")
        #[arg(long)]
        range: Option<String>,

        /// Set mode: balanced or rocket
        #[arg(long)]
        mode: Option<String>,

        /// Session size (default: the learner's max_num setting)
        #[arg(long)]
        size: Option<usize>,

        /// Seed for new-item shuffling
        #[arg(long)]
        seed: Option<u64>,

        /// Session timestamp, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,

        /// Write placeholders to the journal
        #[arg(long)]
        commit: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Apply a score sheet to committed sessions
    Score {
        /// Score sheet, e.g. score_liyu_20240301080000.txt
        #[arg(long)]
        sheet: PathBuf,

        /// Paper timestamp, RFC 3339 (default: from the sheet's file name)
        #[arg(long)]
        timestamp: Option<String>,

        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show wins and lesson mastery
    Progress {
        /// Learner
        #[arg(long)]
        user: String,

        /// Subject register name
        #[arg(long)]
        subject: Option<String>,

        /// Textbook grade (default: from the class registration)
        #[arg(long)]
        grade: Option<u32>,

        /// Textbook volume (default: from the class registration)
        #[arg(long)]
        volume: Option<u32>,

        /// Session pass rule: max-errors, min-correct
        #[arg(long, default_value = "max-errors")]
        rule: String,

        /// Seed for picking among optional feedback
        #[arg(long)]
        seed: Option<u64>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Adjust a learner's session size from recent results
    Tune {
        /// Learner
        #[arg(long, required_unless_present = "class", conflicts_with = "class")]
        user: Option<String>,

        /// Tune every student of this class
        #[arg(long)]
        class: Option<String>,

        /// Subject register name
        #[arg(long)]
        subject: Option<String>,

        /// Number of recent sessions to consider
        #[arg(long, default_value_t = drillplan_core::tuning::DEFAULT_WINDOW)]
        window: usize,

        /// Save the new size to the profiles file
        #[arg(long)]
        write: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate catalog and profile files
    Validate {
        /// Catalog file or directory (default: from the config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Profiles file (default: from the config)
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter workspace
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drillplan=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plan {
            user,
            subject,
            targets,
            role,
            class,
            grade,
            volume,
            range,
            mode,
            size,
            seed,
            at,
            commit,
            format,
            config,
        } => commands::plan::execute(commands::plan::PlanArgs {
            user,
            subject,
            targets,
            role,
            class,
            grade,
            volume,
            range,
            mode,
            size,
            seed,
            at,
            commit,
            format,
            config,
        }),
        Commands::Score {
            sheet,
            timestamp,
            dry_run,
            config,
        } => commands::score::execute(sheet, timestamp, dry_run, config),
        Commands::Progress {
            user,
            subject,
            grade,
            volume,
            rule,
            seed,
            format,
            config,
        } => commands::progress::execute(user, subject, grade, volume, rule, seed, format, config),
        Commands::Tune {
            user,
            class,
            subject,
            window,
            write,
            config,
        } => commands::tune::execute(user, class, subject, window, write, config),
        Commands::Validate {
            catalog,
            profiles,
            config,
        } => commands::validate::execute(catalog, profiles, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
