pub mod aws;
pub mod clients;
pub mod config;
pub mod error;
pub mod model;
pub mod services;
pub mod telemetry;

/// Version injected at compile time via TAGWATCH_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("TAGWATCH_VERSION") {
    Some(v) => v,
    None => "dev",
};
