#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::Notify;

use crate::cmd::{CommandIssue, CommandSchema, Executable};

mod cmd;

#[derive(Parser)]
#[command(name = "wallclock")]
#[command(version = "0.0.1")]
#[command(about = "Issue transaction sequence numbers from named wall clocks.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue TSNs from a wall clock and check they are strictly increasing
    Issue {
        /// Name of the wall clock
        #[arg(short, long)]
        clock: String,
        /// How many TSNs to issue
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Configuration file, WALLCLOCK_DB is used when absent
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Use an in-process counter instead of PostgreSQL
        #[arg(long)]
        memory: bool,
    },
    /// Print the SQL which provisions the counter of a wall clock
    Schema,
}

fn init() {
    pretty_env_logger::try_init_timed().ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let cli = Cli::parse();

    let c: Box<dyn Executable> = match cli.command {
        Commands::Issue {
            clock,
            count,
            config,
            memory,
        } => Box::new(CommandIssue::new(clock, count, config, memory)),
        Commands::Schema => Box::new(CommandSchema),
    };

    let shutdown = Arc::new(Notify::new());

    tokio::select! {
        res = c.execute(Clone::clone(&shutdown)) => {
            if let Err(e) = &res {
                error!("wallclock failed: {}", e);
            }
            res
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received signal ctrl-c, stop issuing...");
            shutdown.notify_waiters();
            Ok(())
        }
    }
}
