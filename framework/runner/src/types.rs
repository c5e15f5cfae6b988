/// Recommended error type for a scenario `main` function and any shared behaviour code written
/// for hooks. Compatible with [crate::definition::HookResult] so `?` propagates either way.
pub type FootfallResult<T> = anyhow::Result<T>;
