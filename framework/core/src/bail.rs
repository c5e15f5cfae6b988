/// Return this error from a virtual user's behaviour to retire that user without failing the run.
///
/// Use it when a condition makes further iterations from this user pointless, for example the
/// target rejecting its session outright, while the remaining users should keep generating load.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct AgentBailError {
    msg: String,
}

impl Default for AgentBailError {
    fn default() -> Self {
        Self {
            msg: "Agent is bailing".to_string(),
        }
    }
}
