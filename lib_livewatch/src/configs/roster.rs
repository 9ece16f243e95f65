use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::models::RosterEntry;

/// Why the roster could not be loaded. Always fatal at startup.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The file could not be read.
    #[error("cannot read roster file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not a JSON array of creator objects.
    #[error("roster is not a JSON array of creators: {0}")]
    Json(#[from] serde_json::Error),

    /// A creator without a display name.
    #[error("roster entry #{0} has an empty name")]
    EmptyName(usize),
}

/// Parses a roster document: a JSON array of `{name, twitch, youtube}`.
///
/// Names are trimmed and must not be empty. Ids are kept as written; a blank
/// id just means that platform is not tracked for the creator.
pub fn parse_roster(text: &str) -> Result<Vec<RosterEntry>, RosterError> {
    let mut entries: Vec<RosterEntry> = serde_json::from_str(text)?;
    for (index, entry) in entries.iter_mut().enumerate() {
        let trimmed = entry.name.trim();
        if trimmed.is_empty() {
            return Err(RosterError::EmptyName(index));
        }
        if trimmed.len() != entry.name.len() {
            entry.name = trimmed.to_string();
        }
    }
    Ok(entries)
}

/// Reads the roster once at startup.
pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    let text = fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let roster = parse_roster(&text)?;
    info!("Loaded {} creators from {}", roster.len(), path.display());
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_roster_accepts_both_field_spellings() {
        let roster = parse_roster(
            r#"[
                {"name": " Alice ", "twitch": "alice_tw", "youtube": "UCalice"},
                {"name": "Bob", "twitchId": "bob_tw"},
                {"name": "Cara", "youtubeId": "UCcara", "twitch": ""}
            ]"#,
        )
        .unwrap();

        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0], RosterEntry::new("Alice", "alice_tw", "UCalice"));
        assert_eq!(roster[1], RosterEntry::new("Bob", "bob_tw", ""));
        assert_eq!(roster[2], RosterEntry::new("Cara", "", "UCcara"));
    }

    #[test]
    fn test_parse_roster_rejects_bad_documents() {
        assert!(matches!(parse_roster("{}"), Err(RosterError::Json(_))));
        assert!(matches!(parse_roster("[{\"twitch\": \"x\"}]"), Err(RosterError::Json(_))));
        assert!(matches!(
            parse_roster(r#"[{"name": "ok"}, {"name": "   "}]"#),
            Err(RosterError::EmptyName(1))
        ));
    }

    #[test]
    fn test_load_roster_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name": "A", "twitch": "a_tw", "youtube": ""}}]"#).unwrap();

        let roster = load_roster(file.path()).unwrap();
        assert_eq!(roster, vec![RosterEntry::new("A", "a_tw", "")]);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_roster(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, RosterError::Io { .. }));
        assert!(err.to_string().contains("nope.json"));
    }
}
