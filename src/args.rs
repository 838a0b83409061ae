use clap::{ArgAction, Parser};

const CMD_NAME: &str = "atacflow";
const DEFAULT_CONFIG: &str = "atacflow.conf";

/// Submit the stages of an ATAC-seq pipeline to Slurm, chained by job dependencies.
#[derive(Parser, Debug)]
#[command(name = CMD_NAME, version, about, long_about = None)]
pub struct Args {
    /// Pipeline config file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    #[arg(env = "ATACFLOW_CONFIG")]
    pub config: String,

    /// Stages to submit (comma-separated, e.g. 'trim,map,dedup')
    #[arg(short, long, value_name = "STAGE,...", value_delimiter = ',')]
    #[arg(conflicts_with = "from")]
    pub stages: Vec<String>,

    /// Submit this stage and every stage after it
    #[arg(short, long, value_name = "STAGE")]
    pub from: Option<String>,

    /// After all stages, submit a job-check for every job's log
    #[arg(short, long)]
    pub job_check: bool,

    /// Override the run id from the config file
    #[arg(short, long, value_name = "ID")]
    pub uid: Option<String>,

    /// Bypass user confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print additional info (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Dry run; print scheduler commands instead of submitting them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}
