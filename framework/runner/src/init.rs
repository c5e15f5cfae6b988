use clap::Parser;

use crate::cli::FootfallScenarioCli;

/// Initialise logging and parse the command line for a scenario binary.
pub fn init() -> FootfallScenarioCli {
    env_logger::init();

    FootfallScenarioCli::parse()
}
