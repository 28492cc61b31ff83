//! Applier port - makes an artifact the active desktop background.
//!
//! The scheduler only observes success or failure; how the external
//! command is built is up to the implementation.

use std::io;

use async_trait::async_trait;

use crate::domain::Artifact;

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("launch {program}: {source}")]
    Launch { program: String, source: io::Error },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
}

#[async_trait]
pub trait Applier: Send + Sync {
    /// Human-readable target name (e.g. `gnome`).
    fn target(&self) -> &str;

    async fn apply(&self, artifact: &Artifact) -> Result<(), ApplyError>;
}
