/// Waits grow geometrically up to a ceiling, optionally randomised.
pub mod exponential;

/// Waits are constant.
pub mod fixed;
