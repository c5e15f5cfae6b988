mod cli;
mod context;
mod definition;
mod executor;
mod init;
mod monitor;
mod profile;
mod progress;
mod run;
mod shutdown;
mod types;

pub use init::init;

pub mod prelude {
    pub use footfall_core::prelude::{
        AgentBailError, DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError,
    };
    pub use footfall_instruments::{
        CheckSample, MetricsSnapshot, ReportConfig, Reporter, RequestRecord, RunReport,
        Threshold, ThresholdSet,
    };

    pub use crate::cli::FootfallScenarioCli;
    pub use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::profile::{LoadProfile, Stage};
    pub use crate::run::run;
    pub use crate::types::FootfallResult;
}
