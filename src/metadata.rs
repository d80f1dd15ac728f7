//! Per-challenge `metadata.json` store.
use crate::error::{KitError, KitResult};
use crate::paths::ChallengeContext;
use crate::util::write_atomic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChallengeMetadata {
    /// Empty in the file falls back to the directory name on load.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub flags_found: Vec<FlagRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<String>,
    #[serde(default)]
    pub attack_vectors: Vec<AttackVector>,
    /// Operator-defined keys preserved across load/save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChallengeMetadata {
    pub fn new(name: &str, ip: &str) -> Self {
        Self {
            name: name.to_string(),
            ip: ip.to_string(),
            ..Self::default()
        }
    }

    /// Recorded target IP, if any.
    pub fn target(&self) -> Option<&str> {
        Some(self.ip.trim()).filter(|ip| !ip.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlagRecord {
    pub flag: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttackVector {
    pub service: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub vectors: Vec<String>,
}

pub fn now_rfc3339() -> String {
    chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}

pub fn load_metadata(challenge: &ChallengeContext) -> KitResult<ChallengeMetadata> {
    let value = load_raw(challenge)?;
    decode(challenge, value)
}

pub fn save_metadata(challenge: &ChallengeContext, metadata: &ChallengeMetadata) -> KitResult<()> {
    let value = serde_json::to_value(metadata)
        .map_err(|err| KitError::Unexpected(format!("serialize metadata: {err}")))?;
    save_raw(challenge, &value)
}

/// Merge `updates` into the stored document: arrays extend existing arrays,
/// objects merge into existing objects, and everything else replaces.
pub fn update_metadata(
    challenge: &ChallengeContext,
    updates: Map<String, Value>,
) -> KitResult<ChallengeMetadata> {
    let mut value = load_raw(challenge)?;
    let Value::Object(doc) = &mut value else {
        return Err(KitError::Unexpected(format!(
            "{} is not a JSON object",
            challenge.metadata_path().display()
        )));
    };
    merge_into(doc, updates);
    let metadata = decode(challenge, value.clone())?;
    save_raw(challenge, &value)?;
    Ok(metadata)
}

fn merge_into(doc: &mut Map<String, Value>, updates: Map<String, Value>) {
    for (key, update) in updates {
        match (doc.get_mut(&key), update) {
            (Some(Value::Array(existing)), Value::Array(items)) => existing.extend(items),
            (Some(Value::Object(existing)), Value::Object(fields)) => {
                for (field, value) in fields {
                    existing.insert(field, value);
                }
            }
            (_, update) => {
                doc.insert(key, update);
            }
        }
    }
}

pub fn record_flag(challenge: &ChallengeContext, flag: &str) -> KitResult<ChallengeMetadata> {
    let record = FlagRecord {
        flag: flag.trim().to_string(),
        timestamp: now_rfc3339(),
    };
    let mut updates = Map::new();
    updates.insert(
        "flags_found".to_string(),
        Value::Array(vec![to_value(&record)?]),
    );
    update_metadata(challenge, updates)
}

pub fn add_attack_vector(
    challenge: &ChallengeContext,
    vector: &AttackVector,
) -> KitResult<ChallengeMetadata> {
    let mut updates = Map::new();
    updates.insert(
        "attack_vectors".to_string(),
        Value::Array(vec![to_value(vector)?]),
    );
    update_metadata(challenge, updates)
}

pub fn mark_finished(challenge: &ChallengeContext) -> KitResult<ChallengeMetadata> {
    let mut updates = Map::new();
    updates.insert("end_timestamp".to_string(), Value::String(now_rfc3339()));
    update_metadata(challenge, updates)
}

fn to_value<T: Serialize>(value: &T) -> KitResult<Value> {
    serde_json::to_value(value).map_err(|err| KitError::Unexpected(format!("serialize: {err}")))
}

fn load_raw(challenge: &ChallengeContext) -> KitResult<Value> {
    let path = challenge.metadata_path();
    if !path.is_file() {
        return Err(KitError::MetadataNotFound {
            path: challenge.path().to_path_buf(),
        });
    }
    let bytes = fs::read(&path).map_err(|err| KitError::io("read metadata", &path, err))?;
    serde_json::from_slice(&bytes).map_err(|source| KitError::MetadataParse { path, source })
}

fn decode(challenge: &ChallengeContext, value: Value) -> KitResult<ChallengeMetadata> {
    let mut metadata: ChallengeMetadata =
        serde_json::from_value(value).map_err(|source| KitError::MetadataParse {
            path: challenge.metadata_path(),
            source,
        })?;
    if metadata.name.trim().is_empty() {
        metadata.name = challenge.name();
    }
    Ok(metadata)
}

fn save_raw(challenge: &ChallengeContext, value: &Value) -> KitResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| KitError::Unexpected(format!("serialize metadata: {err}")))?;
    write_atomic(&challenge.metadata_path(), text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn challenge_with(metadata: &ChallengeMetadata) -> (tempfile::TempDir, ChallengeContext) {
        let root = tempfile::tempdir().expect("temp dir");
        let ctx = ChallengeContext::new(root.path().join("Lame"));
        save_metadata(&ctx, metadata).expect("save metadata");
        (root, ctx)
    }

    #[test]
    fn missing_metadata_is_reported() {
        let root = tempfile::tempdir().expect("temp dir");
        let ctx = ChallengeContext::new(root.path().to_path_buf());
        let err = load_metadata(&ctx).expect_err("missing");
        assert!(matches!(err, KitError::MetadataNotFound { .. }));
    }

    #[test]
    fn update_extends_lists_merges_maps_and_replaces_scalars() {
        let mut metadata = ChallengeMetadata::new("Lame", "10.10.10.3");
        metadata
            .extra
            .insert("notes".to_string(), json!({"smb": "anonymous"}));
        let (_root, ctx) = challenge_with(&metadata);

        let updates = json!({
            "ip": "10.10.10.4",
            "flags_found": [{"flag": "user", "timestamp": "2024-12-10T11:00:00+00:00"}],
            "notes": {"ftp": "vsftpd 2.3.4"},
            "difficulty": "easy"
        });
        let Value::Object(updates) = updates else {
            panic!("object literal");
        };
        let updated = update_metadata(&ctx, updates).expect("update");

        assert_eq!(updated.ip, "10.10.10.4");
        assert_eq!(updated.flags_found.len(), 1);
        assert_eq!(updated.extra["notes"], json!({"smb": "anonymous", "ftp": "vsftpd 2.3.4"}));
        assert_eq!(updated.extra["difficulty"], json!("easy"));
        assert_eq!(load_metadata(&ctx).expect("reload"), updated);
    }

    #[test]
    fn flags_and_vectors_accumulate() {
        let (_root, ctx) = challenge_with(&ChallengeMetadata::new("Lame", ""));
        record_flag(&ctx, "HTB{one}").expect("first flag");
        let metadata = record_flag(&ctx, " HTB{two} ").expect("second flag");
        let flags: Vec<&str> = metadata.flags_found.iter().map(|f| f.flag.as_str()).collect();
        assert_eq!(flags, vec!["HTB{one}", "HTB{two}"]);
        assert!(metadata.target().is_none());

        let vector = AttackVector {
            service: "ftp".to_string(),
            version: "vsftpd 2.3.4".to_string(),
            vectors: vec!["backdoor".to_string()],
        };
        let metadata = add_attack_vector(&ctx, &vector).expect("vector");
        assert_eq!(metadata.attack_vectors, vec![vector]);

        let metadata = mark_finished(&ctx).expect("finish");
        assert!(metadata.end_timestamp.is_some());
    }

    #[test]
    fn name_falls_back_to_directory_name() {
        let root = tempfile::tempdir().expect("temp dir");
        let ctx = ChallengeContext::new(root.path().join("Lame"));
        std::fs::create_dir_all(ctx.path()).expect("challenge dir");
        std::fs::write(ctx.metadata_path(), r#"{"ip": "10.10.10.3"}"#).expect("write metadata");

        let metadata = load_metadata(&ctx).expect("load");
        assert_eq!(metadata.name, "Lame");
        assert_eq!(metadata.target(), Some("10.10.10.3"));

        let metadata = mark_finished(&ctx).expect("finish");
        assert_eq!(metadata.name, "Lame");
    }

    #[test]
    fn malformed_metadata_is_a_resource_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let ctx = ChallengeContext::new(root.path().join("Lame"));
        std::fs::create_dir_all(ctx.path()).expect("challenge dir");
        std::fs::write(ctx.metadata_path(), "{not json").expect("write metadata");

        let err = load_metadata(&ctx).expect_err("malformed");
        assert!(matches!(err, KitError::MetadataParse { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Resource);
        assert!(err.to_string().starts_with("metadata "), "{err}");

        std::fs::write(ctx.metadata_path(), r#"{"ip": 7}"#).expect("write metadata");
        let err = record_flag(&ctx, "HTB{x}").expect_err("wrong type");
        assert!(matches!(err, KitError::MetadataParse { .. }));
    }
}
