use crate::challenge::{challenge_context, resolve_challenge};
use crate::config::{BaseConfig, ConfigStore};
use crate::paths::{ChallengeContext, WorkspacePaths};
use crate::runner::ToolRunner;
use anyhow::{Context, Result};
use std::path::Path;

/// Workspace state every command starts from.
pub(crate) struct KitContext {
    pub(crate) paths: WorkspacePaths,
    pub(crate) store: ConfigStore,
    pub(crate) base: BaseConfig,
}

impl KitContext {
    pub(crate) fn load(root: Option<&Path>) -> Result<Self> {
        let paths = WorkspacePaths::resolve(root);
        let store = ConfigStore::new(paths.clone());
        let base = store.load_base().context("load base config")?;
        tracing::debug!(
            root = %paths.root().display(),
            base = %base.base_path().display(),
            "workspace loaded"
        );
        Ok(Self { paths, store, base })
    }

    pub(crate) fn runner(&self) -> ToolRunner {
        ToolRunner::new(self.store.clone()).default_timeout(self.base.tool_timeout_seconds)
    }

    /// A challenge with directory and metadata in place.
    pub(crate) fn challenge(&self, name: &str) -> Result<ChallengeContext> {
        Ok(resolve_challenge(&self.base, name)?)
    }

    /// A challenge whose directory exists; metadata is optional.
    pub(crate) fn challenge_dir(&self, name: &str) -> Result<ChallengeContext> {
        let challenge = challenge_context(&self.base, name)?;
        if !challenge.path().is_dir() {
            return Err(crate::error::KitError::ChallengeNotFound {
                path: challenge.path().to_path_buf(),
            }
            .into());
        }
        Ok(challenge)
    }
}
