use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base directory holding config.yaml, catalog/ and queries/
    #[clap(short, long, default_value = ".")]
    pub dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List queries recorded in the master query log
    Queries {
        /// Only show queries still pending combination selection
        #[clap(short, long, default_value = "false")]
        pending: bool,
    },

    /// Find budget-constrained furniture combinations for a query
    Optimize {
        /// Query number (defaults to the latest pending one)
        #[clap(short, long)]
        query: Option<u64>,

        /// Budget override, e.g. "$1,500" (defaults to the query's
        /// recorded budget)
        #[clap(short, long)]
        budget: Option<String>,

        /// Number of top combinations to print
        #[clap(short, long, default_value = "5")]
        top: usize,

        /// Allow leaving a category without a selection
        #[clap(long, default_value = "false")]
        allow_skip: bool,

        /// Max candidates considered per category
        #[clap(short = 'k', long)]
        max_candidates: Option<usize>,

        /// Print the ranked combinations as JSON instead of a report
        #[clap(long, default_value = "false")]
        json: bool,

        /// Don't mark the query as selection-done in the master log
        #[clap(long, default_value = "false")]
        no_mark_done: bool,
    },

    /// Show per-category catalog size and price coverage
    CatalogStats {},
}
