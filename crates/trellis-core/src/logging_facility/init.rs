//! Logging initialization
//!
//! One-shot selection of how the engine's canonical events leave the
//! process: human-readable for development, JSON for production, or the
//! in-memory capture for tests. `RUST_LOG` overrides the profile's
//! filter; without it, the engine crates log at the profile's level and
//! everything else stays at warn.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::logging_facility::capture;

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// In-memory capture for deterministic testing
    Test,
}

impl Profile {
    fn level(&self) -> &'static str {
        match self {
            Profile::Development => "debug",
            Profile::Production => "info",
            Profile::Test => "trace",
        }
    }

    /// Directives used when `RUST_LOG` is absent
    fn default_directives(&self) -> String {
        let level = self.level();
        format!("warn,trellis_core={level},trellis_core_types={level}")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Call once at application startup; later calls are no-ops. The Test
/// profile installs the capture subscriber; tests that need the capture
/// handle call `capture::install()` directly.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            tracing_subscriber::fmt()
                .with_env_filter(profile.filter())
                .init();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(profile.filter())
                .init();
        }
        Profile::Test => {
            capture::install();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
    }

    #[test]
    fn test_default_directives_scope_engine_crates() {
        let directives = Profile::Development.default_directives();
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("trellis_core=debug"));

        assert!(Profile::Production
            .default_directives()
            .contains("trellis_core=info"));
    }
}
