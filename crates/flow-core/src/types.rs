use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// FileAction / FileOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Created,
    Updated,
    Skipped,
    Conflict,
}

impl FileAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FileAction::Created => "created",
            FileAction::Updated => "updated",
            FileAction::Skipped => "skipped",
            FileAction::Conflict => "conflict",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of reconciling a single destination file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub action: FileAction,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FileOutcome {
    pub fn created(path: PathBuf) -> Self {
        Self {
            action: FileAction::Created,
            path,
            reason: None,
        }
    }

    pub fn updated(path: PathBuf) -> Self {
        Self {
            action: FileAction::Updated,
            path,
            reason: None,
        }
    }

    pub fn skipped(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            action: FileAction::Skipped,
            path,
            reason: Some(reason.into()),
        }
    }

    pub fn conflict(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            action: FileAction::Conflict,
            path,
            reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// OutcomeCounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub conflict: usize,
}

impl OutcomeCounts {
    pub fn tally(outcomes: &[FileOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o.action {
                FileAction::Created => acc.created += 1,
                FileAction::Updated => acc.updated += 1,
                FileAction::Skipped => acc.skipped += 1,
                FileAction::Conflict => acc.conflict += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.conflict
    }
}

// ---------------------------------------------------------------------------
// MergeAction / reports
// ---------------------------------------------------------------------------

/// Action taken on a single managed document (config file or markdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    Created,
    Updated,
    Skipped,
}

impl MergeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeAction::Created => "created",
            MergeAction::Updated => "updated",
            MergeAction::Skipped => "skipped",
        }
    }
}

impl fmt::Display for MergeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMergeReport {
    pub action: MergeAction,
    pub entries_added: usize,
    pub backup_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
}

impl ConfigMergeReport {
    pub fn skipped() -> Self {
        Self {
            action: MergeAction::Skipped,
            entries_added: 0,
            backup_created: false,
            backup_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionReport {
    pub action: MergeAction,
    pub section_found: bool,
}

impl SectionReport {
    pub fn skipped() -> Self {
        Self {
            action: MergeAction::Skipped,
            section_found: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_each_action() {
        let outcomes = vec![
            FileOutcome::created("a".into()),
            FileOutcome::created("b".into()),
            FileOutcome::skipped("c".into(), "identical content"),
            FileOutcome::conflict("d".into(), "differs"),
        ];
        let counts = OutcomeCounts::tally(&outcomes);
        assert_eq!(counts.created, 2);
        assert_eq!(counts.updated, 0);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.conflict, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn outcome_serializes_snake_case_without_empty_reason() {
        let json = serde_json::to_value(FileOutcome::created("x.md".into())).unwrap();
        assert_eq!(json["action"], "created");
        assert!(json.get("reason").is_none());
    }
}
