//! Challenge directories under the configured base directory.
use crate::challenge_log::log_action;
use crate::config::BaseConfig;
use crate::error::{KitError, KitResult};
use crate::metadata::{load_metadata, now_rfc3339, save_metadata, ChallengeMetadata};
use crate::paths::ChallengeContext;
use crate::util::capitalize;
use std::fs;

/// Normalize a user-typed challenge name into its directory name.
///
/// Names are capitalized (`lame` and `LAME` both become `Lame`) and must be a
/// single path component.
pub fn challenge_dir_name(raw: &str) -> KitResult<String> {
    let trimmed = raw.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
        || trimmed.chars().any(char::is_control);
    if invalid {
        return Err(KitError::InvalidChallengeName {
            name: raw.to_string(),
        });
    }
    Ok(capitalize(trimmed))
}

/// Path of a challenge under the base directory; does not touch the filesystem.
pub fn challenge_context(base: &BaseConfig, name: &str) -> KitResult<ChallengeContext> {
    let dir_name = challenge_dir_name(name)?;
    Ok(ChallengeContext::new(base.base_path().join(dir_name)))
}

/// Result of [`create_challenge`].
#[derive(Debug)]
pub struct CreatedChallenge {
    pub context: ChallengeContext,
    pub metadata: ChallengeMetadata,
    /// False when the directory already had metadata, which is kept.
    pub created: bool,
}

/// Create `<base>/<Name>` with fresh metadata. An existing challenge keeps its
/// metadata; only a newly supplied IP is applied to it.
pub fn create_challenge(base: &BaseConfig, name: &str, ip: &str) -> KitResult<CreatedChallenge> {
    let context = challenge_context(base, name)?;
    fs::create_dir_all(context.path())
        .map_err(|err| KitError::io("create challenge dir", context.path(), err))?;
    let ip = ip.trim();

    if context.metadata_path().is_file() {
        let mut metadata = load_metadata(&context)?;
        if !ip.is_empty() && metadata.ip != ip {
            metadata.ip = ip.to_string();
            save_metadata(&context, &metadata)?;
            log_action(&context, &format!("Target IP updated: {ip}"), &[]);
        }
        tracing::info!(challenge = %context.path().display(), "challenge already exists");
        return Ok(CreatedChallenge {
            context,
            metadata,
            created: false,
        });
    }

    let mut metadata = ChallengeMetadata::new(&context.name(), ip);
    metadata.start_timestamp = Some(now_rfc3339());
    save_metadata(&context, &metadata)?;
    log_action(
        &context,
        &format!("Challenge created: {} ({ip})", metadata.name),
        &[],
    );
    tracing::info!(challenge = %context.path().display(), "challenge created");
    Ok(CreatedChallenge {
        context,
        metadata,
        created: true,
    })
}

/// Resolve an existing challenge; both the directory and its metadata must exist.
pub fn resolve_challenge(base: &BaseConfig, name: &str) -> KitResult<ChallengeContext> {
    let context = challenge_context(base, name)?;
    if !context.path().is_dir() {
        return Err(KitError::ChallengeNotFound {
            path: context.path().to_path_buf(),
        });
    }
    if !context.metadata_path().is_file() {
        return Err(KitError::MetadataNotFound {
            path: context.path().to_path_buf(),
        });
    }
    Ok(context)
}
