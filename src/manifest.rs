use crate::locale::{MessageKey, Messages};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

pub const MANIFEST_FILE_NAME: &str = "mod_manifest.json";
const FRIENDLY_NAME_KEY: &str = "friendlyName";
const ENABLE_KEY: &str = "bEnable";
const MANIFEST_INDENT: &[u8] = b"    ";

/// The `bEnable` flag as it was read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnabledFlag {
    Disabled,
    /// `true`, missing, or any value other than `false`.
    Enabled,
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AlreadyEnabled,
    JustEnabled,
    FormatError,
    PermissionError,
    OtherError,
}

impl Outcome {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Outcome::FormatError | Outcome::PermissionError | Outcome::OtherError
        )
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid JSON: {0}")]
    Format(#[source] serde_json::Error),
    #[error("permission denied: {0}")]
    Permission(#[source] io::Error),
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("manifest root is not a JSON object")]
    NotAnObject,
    #[error("serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("{0}")]
    Io(#[source] io::Error),
}

impl ManifestError {
    fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            ManifestError::Permission(err)
        } else {
            ManifestError::Io(err)
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            ManifestError::Format(_) => Outcome::FormatError,
            ManifestError::Permission(_) => Outcome::PermissionError,
            ManifestError::Encoding(_)
            | ManifestError::NotAnObject
            | ManifestError::Serialize(_)
            | ManifestError::Io(_) => Outcome::OtherError,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestRecord {
    pub path: PathBuf,
    pub directory_name: String,
    pub friendly_name: Option<String>,
    pub enabled_flag: EnabledFlag,
    pub outcome: Outcome,
    pub error_detail: Option<String>,
}

impl ManifestRecord {
    /// `friendlyName` when the manifest was handled, otherwise a placeholder
    /// built from the containing folder.
    pub fn display_name(&self, messages: &Messages) -> String {
        let placeholder = match self.outcome {
            Outcome::AlreadyEnabled | Outcome::JustEnabled => {
                if let Some(name) = &self.friendly_name {
                    return name.clone();
                }
                MessageKey::ModUnknown
            }
            Outcome::FormatError => MessageKey::ModFormatError,
            Outcome::PermissionError => MessageKey::ModPermissionError,
            Outcome::OtherError => MessageKey::ModProcessFail,
        };
        messages.format(placeholder, &[("dir_name", self.directory_name.as_str())])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total_count: usize,
    pub modified_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub records: Vec<ManifestRecord>,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            total_count: self.records.len(),
            modified_count: self
                .records
                .iter()
                .filter(|record| record.outcome == Outcome::JustEnabled)
                .count(),
            error_count: self
                .records
                .iter()
                .filter(|record| record.outcome.is_error())
                .count(),
        }
    }
}

pub fn scan(root: &Path) -> ScanReport {
    info!("Scanning {} for {MANIFEST_FILE_NAME}", root.display());
    let mut records = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                continue;
            }
        };
        if !is_manifest(&entry) {
            continue;
        }
        let record = process_manifest(entry.path());
        match record.outcome {
            Outcome::JustEnabled => info!("Enabled {}", record.path.display()),
            Outcome::AlreadyEnabled => debug!("Already enabled: {}", record.path.display()),
            _ => warn!(
                "Manifest failed ({:?}) {}: {}",
                record.outcome,
                record.path.display(),
                record.error_detail.as_deref().unwrap_or_default()
            ),
        }
        records.push(record);
    }
    info!("Scan finished: {} manifest(s)", records.len());
    ScanReport {
        root: root.to_path_buf(),
        records,
    }
}

fn is_manifest(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if !name.eq_ignore_ascii_case(MANIFEST_FILE_NAME) {
        return false;
    }
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

fn directory_name(path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn process_manifest(path: &Path) -> ManifestRecord {
    let mut record = ManifestRecord {
        path: path.to_path_buf(),
        directory_name: directory_name(path),
        friendly_name: None,
        enabled_flag: EnabledFlag::Unreadable,
        outcome: Outcome::AlreadyEnabled,
        error_detail: None,
    };
    if let Err(err) = enable_manifest(path, &mut record) {
        record.outcome = err.outcome();
        record.error_detail = Some(err.to_string());
    }
    record
}

/// Fills `record` as far as processing gets; on error the flag read so far is kept.
fn enable_manifest(path: &Path, record: &mut ManifestRecord) -> Result<(), ManifestError> {
    let mut document = read_manifest(path)?;
    record.friendly_name = document
        .get(FRIENDLY_NAME_KEY)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    if let Some(Value::Bool(false)) = document.get(ENABLE_KEY) {
        record.enabled_flag = EnabledFlag::Disabled;
        document.insert(ENABLE_KEY.to_string(), Value::Bool(true));
        write_manifest(path, &document)?;
        record.outcome = Outcome::JustEnabled;
        return Ok(());
    }

    record.enabled_flag = EnabledFlag::Enabled;
    record.outcome = Outcome::AlreadyEnabled;
    Ok(())
}

fn read_manifest(path: &Path) -> Result<Map<String, Value>, ManifestError> {
    let bytes = fs::read(path).map_err(ManifestError::from_io)?;
    let raw = String::from_utf8(bytes)?;
    let value: Value = serde_json::from_str(&raw).map_err(ManifestError::Format)?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ManifestError::NotAnObject),
    }
}

pub fn to_manifest_json(document: &Map<String, Value>) -> Result<Vec<u8>, ManifestError> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(MANIFEST_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document
        .serialize(&mut serializer)
        .map_err(ManifestError::Serialize)?;
    Ok(out)
}

fn write_manifest(path: &Path, document: &Map<String, Value>) -> Result<(), ManifestError> {
    let raw = to_manifest_json(document)?;
    fs::write(path, raw).map_err(ManifestError::from_io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Language;
    use tempfile::TempDir;

    fn write_mod(root: &Path, dir: &str, contents: &str) -> PathBuf {
        let mod_dir = root.join(dir);
        fs::create_dir_all(&mod_dir).unwrap();
        let path = mod_dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, contents).unwrap();
        path
    }

    fn english() -> Messages {
        Messages::new(Language::English)
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_tree_yields_no_records() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("EmptyMod")).unwrap();
        fs::write(temp.path().join("EmptyMod").join("readme.txt"), "hi").unwrap();

        let report = scan(temp.path());
        assert!(report.records.is_empty());
        let summary = report.summary();
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.modified_count, 0);
    }

    #[test]
    fn test_two_mod_scenario() {
        let temp = TempDir::new().unwrap();
        let a = write_mod(temp.path(), "A", r#"{"friendlyName":"Foo","bEnable":false}"#);
        let b_raw = r#"{"bEnable":true}"#;
        let b = write_mod(temp.path(), "B", b_raw);

        let report = scan(temp.path());
        let messages = english();
        let rows: Vec<(String, Outcome)> = report
            .records
            .iter()
            .map(|record| (record.display_name(&messages), record.outcome))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Foo".to_string(), Outcome::JustEnabled),
                ("Unknown Mod (B)".to_string(), Outcome::AlreadyEnabled),
            ]
        );
        let summary = report.summary();
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.modified_count, 1);
        assert_eq!(summary.error_count, 0);

        assert_eq!(read_json(&a)["bEnable"], Value::Bool(true));
        assert_eq!(fs::read_to_string(&b).unwrap(), b_raw);
        assert_eq!(report.records[0].enabled_flag, EnabledFlag::Disabled);
        assert_eq!(report.records[1].enabled_flag, EnabledFlag::Enabled);
    }

    #[test]
    fn test_flip_preserves_other_keys_and_order() {
        let temp = TempDir::new().unwrap();
        let path = write_mod(
            temp.path(),
            "Keys",
            r#"{"friendlyName":"Keys","version":"1.2","bEnable":false,"tags":["a","b"],"nested":{"x":1}}"#,
        );

        let report = scan(temp.path());
        assert_eq!(report.records[0].outcome, Outcome::JustEnabled);

        let raw = fs::read_to_string(&path).unwrap();
        let expected = "{\n    \"friendlyName\": \"Keys\",\n    \"version\": \"1.2\",\n    \"bEnable\": true,\n    \"tags\": [\n        \"a\",\n        \"b\"\n    ],\n    \"nested\": {\n        \"x\": 1\n    }\n}";
        assert_eq!(raw, expected);
    }

    #[test]
    fn test_non_ascii_is_written_literally() {
        let temp = TempDir::new().unwrap();
        let path = write_mod(
            temp.path(),
            "Chinese",
            r#"{"friendlyName":"发型包","bEnable":false}"#,
        );

        let report = scan(temp.path());
        assert_eq!(report.records[0].display_name(&english()), "发型包");
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"发型包\""));
        assert!(!raw.contains("\\u"));
    }

    #[test]
    fn test_enabled_or_missing_flag_is_not_rewritten() {
        let temp = TempDir::new().unwrap();
        let missing_raw = r#"{"friendlyName":"NoFlag"}"#;
        let missing = write_mod(temp.path(), "Missing", missing_raw);
        let string_raw = r#"{"bEnable":"false"}"#;
        let string_flag = write_mod(temp.path(), "StringFlag", string_raw);
        let null_raw = r#"{"bEnable":null}"#;
        let null_flag = write_mod(temp.path(), "NullFlag", null_raw);

        let report = scan(temp.path());
        assert_eq!(report.records.len(), 3);
        assert!(report
            .records
            .iter()
            .all(|record| record.outcome == Outcome::AlreadyEnabled));
        assert_eq!(fs::read_to_string(missing).unwrap(), missing_raw);
        assert_eq!(fs::read_to_string(string_flag).unwrap(), string_raw);
        assert_eq!(fs::read_to_string(null_flag).unwrap(), null_raw);
    }

    #[test]
    fn test_malformed_json_is_recorded_and_scan_continues() {
        let temp = TempDir::new().unwrap();
        let broken_raw = r#"{"friendlyName": "Broken", "bEnable": false"#;
        let broken = write_mod(temp.path(), "A_Broken", broken_raw);
        let good = write_mod(temp.path(), "B_Good", r#"{"bEnable":false}"#);

        let report = scan(temp.path());
        assert_eq!(report.records.len(), 2);

        let first = &report.records[0];
        assert_eq!(first.outcome, Outcome::FormatError);
        assert_eq!(first.enabled_flag, EnabledFlag::Unreadable);
        assert!(first.error_detail.is_some());
        assert_eq!(first.display_name(&english()), "Format Error (A_Broken)");
        assert_eq!(fs::read_to_string(broken).unwrap(), broken_raw);

        assert_eq!(report.records[1].outcome, Outcome::JustEnabled);
        assert_eq!(read_json(&good)["bEnable"], Value::Bool(true));
        assert_eq!(report.summary().error_count, 1);
    }

    #[test]
    fn test_non_object_and_bad_encoding_are_other_errors() {
        let temp = TempDir::new().unwrap();
        write_mod(temp.path(), "Array", "[1, 2, 3]");
        let mod_dir = temp.path().join("Bytes");
        fs::create_dir_all(&mod_dir).unwrap();
        fs::write(mod_dir.join(MANIFEST_FILE_NAME), [0xff, 0xfe, 0x7b, 0x7d]).unwrap();

        let report = scan(temp.path());
        assert_eq!(report.records.len(), 2);
        for record in &report.records {
            assert_eq!(record.outcome, Outcome::OtherError);
            assert!(record.error_detail.is_some());
        }
        assert_eq!(
            report.records[0].display_name(&english()),
            "Process Failed (Array)"
        );
    }

    #[test]
    fn test_second_scan_modifies_nothing() {
        let temp = TempDir::new().unwrap();
        write_mod(temp.path(), "One", r#"{"bEnable":false}"#);
        write_mod(temp.path(), "Two", r#"{"friendlyName":"Two","bEnable":false}"#);
        write_mod(temp.path(), "Three", r#"{"bEnable":true}"#);

        assert_eq!(scan(temp.path()).summary().modified_count, 2);
        let second = scan(temp.path());
        assert_eq!(second.summary().modified_count, 0);
        assert_eq!(second.summary().total_count, 3);
    }

    #[test]
    fn test_filename_match_is_case_insensitive_and_recursive() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("Pack").join("Inner");
        fs::create_dir_all(&nested).unwrap();
        let upper = nested.join("MOD_MANIFEST.JSON");
        fs::write(&upper, r#"{"bEnable":false}"#).unwrap();
        let mixed_dir = temp.path().join("Mixed");
        fs::create_dir_all(&mixed_dir).unwrap();
        fs::write(mixed_dir.join("Mod_Manifest.json"), r#"{"bEnable":true}"#).unwrap();

        let other_raw = r#"{"bEnable":false}"#;
        let other = nested.join("settings.json");
        fs::write(&other, other_raw).unwrap();
        let lookalike = nested.join("mod_manifest.json.bak");
        fs::write(&lookalike, other_raw).unwrap();

        let report = scan(temp.path());
        assert_eq!(report.records.len(), 2);
        assert_eq!(read_json(&upper)["bEnable"], Value::Bool(true));
        assert_eq!(fs::read_to_string(other).unwrap(), other_raw);
        assert_eq!(fs::read_to_string(lookalike).unwrap(), other_raw);

        let inner = report
            .records
            .iter()
            .find(|record| record.directory_name == "Inner")
            .unwrap();
        assert_eq!(inner.outcome, Outcome::JustEnabled);
    }

    #[test]
    fn test_empty_friendly_name_uses_placeholder() {
        let temp = TempDir::new().unwrap();
        write_mod(temp.path(), "Blank", r#"{"friendlyName":"","bEnable":true}"#);
        write_mod(temp.path(), "Numeric", r#"{"friendlyName":7}"#);

        let report = scan(temp.path());
        let names: Vec<String> = report
            .records
            .iter()
            .map(|record| record.display_name(&english()))
            .collect();
        assert_eq!(names, vec!["Unknown Mod (Blank)", "Unknown Mod (Numeric)"]);
        assert_eq!(
            report.records[0].display_name(&Messages::new(Language::Chinese)),
            "未知Mod (Blank)"
        );
    }

    #[test]
    fn test_permission_denied_maps_to_permission_error() {
        let err = ManifestError::from_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.outcome(), Outcome::PermissionError);
        let err = ManifestError::from_io(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.outcome(), Outcome::OtherError);
    }

    #[test]
    fn test_flip_keeps_large_numbers_exact() {
        let temp = TempDir::new().unwrap();
        let path = write_mod(
            temp.path(),
            "BigId",
            r#"{"id":123456789012345678901234567890,"build":18446744073709551617,"bEnable":false}"#,
        );

        let report = scan(temp.path());
        assert_eq!(report.records[0].outcome, Outcome::JustEnabled);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"id\": 123456789012345678901234567890"));
        assert!(raw.contains("\"build\": 18446744073709551617"));
        assert!(raw.contains("\"bEnable\": true"));
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_manifest_is_recorded_and_scan_continues() {
        let temp = TempDir::new().unwrap();
        let locked = write_mod(temp.path(), "A_Locked", r#"{"bEnable":false}"#);
        let open = write_mod(temp.path(), "B_Open", r#"{"bEnable":false}"#);
        set_mode(&locked, 0o000);
        if fs::read(&locked).is_ok() {
            // Permission bits are not enforced for this user (root).
            set_mode(&locked, 0o644);
            return;
        }

        let report = scan(temp.path());
        set_mode(&locked, 0o644);

        assert_eq!(report.records.len(), 2);
        let first = &report.records[0];
        assert_eq!(first.outcome, Outcome::PermissionError);
        assert_eq!(first.enabled_flag, EnabledFlag::Unreadable);
        assert!(first.error_detail.is_some());
        assert_eq!(first.display_name(&english()), "Permission Denied (A_Locked)");
        assert_eq!(
            first.display_name(&Messages::new(Language::Chinese)),
            "权限不足 (A_Locked)"
        );

        assert_eq!(report.records[1].outcome, Outcome::JustEnabled);
        assert_eq!(read_json(&open)["bEnable"], Value::Bool(true));
        let summary = report.summary();
        assert_eq!(summary.modified_count, 1);
        assert_eq!(summary.error_count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_failure_after_flip_is_not_counted() {
        let temp = TempDir::new().unwrap();
        let raw = r#"{"friendlyName":"ReadOnly","bEnable":false}"#;
        let path = write_mod(temp.path(), "ReadOnly", raw);
        set_mode(&path, 0o444);
        if fs::OpenOptions::new().write(true).open(&path).is_ok() {
            set_mode(&path, 0o644);
            return;
        }

        let report = scan(temp.path());
        set_mode(&path, 0o644);

        let record = &report.records[0];
        assert_ne!(record.outcome, Outcome::JustEnabled);
        assert_eq!(record.outcome, Outcome::PermissionError);
        assert_eq!(record.enabled_flag, EnabledFlag::Disabled);
        assert_eq!(record.friendly_name.as_deref(), Some("ReadOnly"));
        assert_eq!(report.summary().modified_count, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), raw);
    }

    #[test]
    fn test_process_manifest_reports_flag_state() {
        let temp = TempDir::new().unwrap();
        let path = write_mod(temp.path(), "Flag", r#"{"bEnable":true}"#);
        let record = process_manifest(&path);
        assert_eq!(record.enabled_flag, EnabledFlag::Enabled);
        assert_eq!(record.error_detail, None);

        let missing = process_manifest(&temp.path().join("Gone").join(MANIFEST_FILE_NAME));
        assert_eq!(missing.outcome, Outcome::OtherError);
        assert_eq!(missing.enabled_flag, EnabledFlag::Unreadable);
        assert_eq!(missing.directory_name, "Gone");
    }
}
