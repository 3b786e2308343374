//! Medical record entity and its sync status

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Synchronization state of a single record.
///
/// `Pending` and `Error` both mean "still needs syncing"; `Error` is not
/// terminal and is retried on the next reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Pending,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Error => "error",
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> SyncResult<Self> {
        match s {
            "synced" => Ok(SyncStatus::Synced),
            "pending" => Ok(SyncStatus::Pending),
            "error" => Ok(SyncStatus::Error),
            other => Err(SyncError::InvalidStatus(other.to_string())),
        }
    }
}

/// A medical record tracked by id and sync status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    /// Creator-assigned identifier, stable for the record's lifetime
    pub id: String,
    pub patient_name: String,
    pub diagnosis: String,
    pub treatment: String,
    pub date: String,
    pub created_by: String,
    /// Reference to an attached file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub sync_status: SyncStatus,
}

impl MedicalRecord {
    /// Build a record the way a creator does: it always starts `pending`.
    pub fn new_pending(
        id: impl Into<String>,
        patient_name: impl Into<String>,
        diagnosis: impl Into<String>,
        treatment: impl Into<String>,
        date: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            patient_name: patient_name.into(),
            diagnosis: diagnosis.into(),
            treatment: treatment.into(),
            date: date.into(),
            created_by: created_by.into(),
            file_path: None,
            sync_status: SyncStatus::Pending,
        }
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = status;
        self
    }

    /// Local entry check: every required field must hold a non-blank value.
    ///
    /// Stricter than the acceptance endpoint, which only rejects empty
    /// strings; whitespace-only values are refused here as well.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidRecord`] naming every blank field.
    pub fn validate(&self) -> SyncResult<()> {
        let fields = [
            ("id", &self.id),
            ("patientName", &self.patient_name),
            ("diagnosis", &self.diagnosis),
            ("treatment", &self.treatment),
            ("date", &self.date),
            ("createdBy", &self.created_by),
        ];

        let empty: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if empty.is_empty() {
            Ok(())
        } else {
            Err(SyncError::InvalidRecord(format!(
                "empty fields: {}",
                empty.join(", ")
            )))
        }
    }

    /// Same clinical content, ignoring sync status.
    pub fn same_content(&self, other: &MedicalRecord) -> bool {
        self.id == other.id
            && self.patient_name == other.patient_name
            && self.diagnosis == other.diagnosis
            && self.treatment == other.treatment
            && self.date == other.date
            && self.created_by == other.created_by
            && self.file_path == other.file_path
    }
}
