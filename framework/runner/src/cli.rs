use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct FootfallScenarioCli {
    /// Base URL of the target under test.
    #[clap(long, env = "BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// The named scenario to run.
    #[clap(long, short, default_value = "baseline_load")]
    pub scenario: String,

    /// Override the number of virtual users.
    ///
    /// Only meaningful for constant-concurrency scenarios; ramping scenarios keep their
    /// configured shape and ignore this flag.
    #[clap(long)]
    pub agents: Option<usize>,

    /// Override the scenario duration, in seconds.
    #[clap(long)]
    pub duration: Option<u64>,

    /// Base think time between journey steps, in milliseconds.
    ///
    /// Steps pause for a multiple of this value to model human pacing. Lowering it changes the
    /// load shape, it does not merely "speed the test up".
    #[clap(long, default_value = "1000")]
    pub think_time_ms: u64,

    /// Run as a soak test, ignoring the scenario duration and continuing until stopped.
    #[clap(long, default_value = "false")]
    pub soak: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// Recommended for CI environments where the bar only adds noise to captured logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Directory the report artifacts are written into.
    #[clap(long, default_value = ".")]
    pub report_dir: PathBuf,

    /// Identifier for this run, stamped into the report artifacts. Generated when not given.
    #[clap(long)]
    pub run_id: Option<String>,
}
