//! smartpen: command-line dashboard for smart pen study activity.
//!
//! Reads activity records the pen uploads, and shows study-time totals, a
//! recent-session timeline and whether the pen is writing right now.
//!
//! ## Subcommands
//!
//! - `connect`: Remember which pen to follow
//! - `summary`: One-shot totals and timeline
//! - `watch`: Live view, re-rendered whenever the records change
//! - `mirror`: Copy uploaded records into the dashboard's document store

mod connect;
mod logging;
mod mirror;
mod render;
mod session;
mod summary;
mod watch;

use clap::{Parser, Subcommand};
use pen_core::StorageConfig;
use session::Source;

#[derive(Parser)]
#[command(name = "smartpen")]
#[command(about = "Smart pen study activity dashboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and remember the pen to follow
    Connect {
        /// Pen id printed on the device (e.g., LTT_6001)
        #[arg(value_name = "PEN_ID")]
        pen_id: String,
    },

    /// Print today/week/month totals and the latest sessions
    Summary {
        /// Pen to read instead of the connected one
        #[arg(long)]
        pen: Option<String>,

        /// Which copy of the records to read
        #[arg(long, value_enum, default_value_t = Source::Documents)]
        source: Source,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Follow the pen's records and print every update
    Watch {
        /// Pen to read instead of the connected one
        #[arg(long)]
        pen: Option<String>,

        /// Which copy of the records to read
        #[arg(long, value_enum, default_value_t = Source::Documents)]
        source: Source,

        /// Stop after this many polls (runs until interrupted by default)
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Copy realtime records to the document store
    Mirror {
        /// Pen whose record to copy
        #[arg(value_name = "PEN_ID", required_unless_present = "all")]
        pen_id: Option<String>,

        /// Record to copy
        #[arg(value_name = "ENTRY_ID", required_unless_present = "all")]
        entry_id: Option<String>,

        /// Copy every record of every pen
        #[arg(long, conflicts_with_all = ["pen_id", "entry_id"])]
        all: bool,
    },
}

fn main() {
    let storage = StorageConfig::resolve();
    let _logging_guard = logging::init(storage.as_ref().ok());
    let cli = Cli::parse();

    let storage = match storage {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(error = %e, "smartpen could not locate its storage");
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&storage, cli.command) {
        tracing::error!(error = %e, "smartpen command failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(storage: &StorageConfig, command: Commands) -> Result<(), String> {
    match command {
        Commands::Connect { pen_id } => {
            let pen_id = connect::run(storage, &pen_id)?;
            println!("Connected to pen {}", pen_id);
        }
        Commands::Summary { pen, source, json } => {
            let out = summary::run(storage, pen.as_deref(), source, json)?;
            println!("{}", out.trim_end());
        }
        Commands::Watch { pen, source, ticks } => {
            watch::run(storage, pen.as_deref(), source, ticks, std::io::stdout())?;
        }
        Commands::Mirror {
            pen_id,
            entry_id,
            all,
        } => {
            let target = match (all, pen_id.as_deref(), entry_id.as_deref()) {
                (true, _, _) => mirror::Target::All,
                (false, Some(pen_id), Some(entry_id)) => mirror::Target::One { pen_id, entry_id },
                _ => return Err("mirror needs <PEN_ID> <ENTRY_ID> or --all".to_string()),
            };
            println!("{}", mirror::run(storage, target)?);
        }
    }
    Ok(())
}
