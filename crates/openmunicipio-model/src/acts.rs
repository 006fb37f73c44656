//! Acts, supports and attachments.

use crate::{ModelError, RecordId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Act kinds
// ============================================================================

/// Who proposed a deliberation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initiative {
    Counselor,
    President,
    Assessor,
    Government,
    Mayor,
}

impl Initiative {
    /// Map the `initiative` attribute of an XML deliberation.
    pub fn from_xml_token(token: &str) -> Option<Self> {
        match token.trim() {
            "counselor" => Some(Self::Counselor),
            "president" => Some(Self::President),
            "assessor" => Some(Self::Assessor),
            "government" => Some(Self::Government),
            "mayor" => Some(Self::Mayor),
            _ => None,
        }
    }
}

impl FromStr for Initiative {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_xml_token(s).ok_or_else(|| ModelError::UnknownToken {
            field: "initiative",
            value: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Written,
    Verbal,
}

impl AnswerType {
    /// Accepts `written`/`verbal` in any case, and the numeric codes `1`/`2`.
    pub fn from_xml_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "written" | "1" => Some(Self::Written),
            "verbal" | "2" => Some(Self::Verbal),
            _ => None,
        }
    }
}

impl FromStr for AnswerType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_xml_token(s).ok_or_else(|| ModelError::UnknownToken {
            field: "answer_type",
            value: s.to_string(),
        })
    }
}

/// Per-kind payload of an act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActKind {
    Deliberation { initiative: Initiative },
    Interrogation { answer_type: AnswerType },
    Motion,
}

impl ActKind {
    pub fn tag(&self) -> ActKindTag {
        match self {
            Self::Deliberation { .. } => ActKindTag::Deliberation,
            Self::Interrogation { .. } => ActKindTag::Interrogation,
            Self::Motion => ActKindTag::Motion,
        }
    }
}

/// Discriminator of [`ActKind`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActKindTag {
    Deliberation,
    Interrogation,
    Motion,
}

impl ActKindTag {
    pub const ALL: [ActKindTag; 3] = [Self::Deliberation, Self::Interrogation, Self::Motion];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deliberation => "deliberation",
            Self::Interrogation => "interrogation",
            Self::Motion => "motion",
        }
    }
}

impl fmt::Display for ActKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Act
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Act {
    pub id: RecordId,
    /// Identification number used internally by the administration.
    pub idnum: String,
    pub title: String,
    pub presentation_date: NaiveDate,
    #[serde(default)]
    pub text: String,
    pub emitting_institution: RecordId,
    #[serde(flatten)]
    pub kind: ActKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Act {
    pub fn matches(&self, key: &ActKey) -> bool {
        self.idnum == key.idnum
            && self.presentation_date == key.presentation_date
            && self.emitting_institution == key.emitting_institution
            && self.title == key.title
            && self.kind == key.kind
    }
}

impl fmt::Display for Act {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.idnum.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.idnum, self.title)
        }
    }
}

/// Fields an act is matched on when importing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActKey {
    pub idnum: String,
    pub presentation_date: NaiveDate,
    pub emitting_institution: RecordId,
    pub title: String,
    pub kind: ActKind,
}

// ============================================================================
// Supports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportType {
    FirstSigner,
    CoSigner,
}

impl SupportType {
    /// Map the `type` attribute of an `ActSubscribers` element.
    ///
    /// Only `first_subscriber` is a first signer; any other value is a co-signer.
    pub fn from_subscriber_type(token: &str) -> Self {
        if token.trim() == "first_subscriber" {
            Self::FirstSigner
        } else {
            Self::CoSigner
        }
    }
}

/// A charge's sponsorship of an act.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Support {
    pub id: RecordId,
    pub charge_id: RecordId,
    pub act_id: RecordId,
    pub support_type: SupportType,
    pub support_date: NaiveDate,
}

// ============================================================================
// Attachments
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: RecordId,
    pub act_id: RecordId,
    pub title: String,
    pub document_date: Option<NaiveDate>,
    /// Path of the stored file, relative to the media root.
    pub file: Option<String>,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub document_size: u64,
    #[serde(default)]
    pub text: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}
