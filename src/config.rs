//! Runtime configuration for new feature models.
//!
//! Configuration is via environment variables:
//! - `FEATMODEL_IDENTIFIER_SCHEME` - `counter` (default) or `uuid`

use crate::identifier::{IdentifierFactory, IdentifierScheme};

/// Environment variable selecting the identifier scheme.
pub const IDENTIFIER_SCHEME_VAR: &str = "FEATMODEL_IDENTIFIER_SCHEME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Scheme used to mint the model identifier and everything inside it.
    pub identifier_scheme: IdentifierScheme,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            identifier_scheme: IdentifierScheme::Counter,
        }
    }
}

impl ModelConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(IDENTIFIER_SCHEME_VAR).ok().as_deref())
    }

    pub fn with_scheme(identifier_scheme: IdentifierScheme) -> Self {
        Self { identifier_scheme }
    }

    /// A new factory for the configured scheme.
    pub fn identifier_factory(&self) -> IdentifierFactory {
        IdentifierFactory::for_scheme(self.identifier_scheme)
    }

    fn from_value(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };

        match value.parse() {
            Ok(identifier_scheme) => Self { identifier_scheme },
            Err(e) => {
                tracing::warn!("{}; falling back to counter identifiers", e);
                Self::default()
            }
        }
    }
}
