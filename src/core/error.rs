use crate::core::Platform;
use thiserror::Error;

/// Failure taxonomy shared by every adapter and the resolver.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    /// Missing or malformed input, reported before any upstream call.
    #[error("{0}")]
    InvalidInput(String),

    #[error("unsupported platform{}; supported platforms: {}", describe(platform), list(supported))]
    UnsupportedPlatform {
        platform: Option<Platform>,
        supported: Vec<Platform>,
    },

    /// Every attempt failed, or the upstream explicitly reported an error.
    #[error("{0}")]
    Upstream(String),

    /// Resolution succeeded but nothing matches the requested kind or quality.
    #[error("{0}")]
    NoUsableFormat(String),
}

impl ResolveError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Wraps a lower-level failure, keeping its message as context.
    pub fn upstream_from(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Upstream(format!("{context}: {err}"))
    }

    pub fn no_usable_format(message: impl Into<String>) -> Self {
        Self::NoUsableFormat(format!(
            "{}. Try the /stream endpoint or a different quality",
            message.into()
        ))
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::UnsupportedPlatform { .. } | Self::NoUsableFormat(_) => 400,
            Self::Upstream(_) => 500,
        }
    }
}

fn describe(platform: &Option<Platform>) -> String {
    match platform {
        Some(Platform::Unknown) | None => String::new(),
        Some(p) => format!(" '{}'", p),
    }
}

fn list(supported: &[Platform]) -> String {
    if supported.is_empty() {
        return "none".to_string();
    }
    supported
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
