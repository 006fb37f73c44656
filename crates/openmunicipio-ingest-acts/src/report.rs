//! Per-record skips and run summaries.

use std::fmt;
use std::path::PathBuf;

/// What kind of record a skip refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Act,
    SubscriberSet,
    Support,
    Attachment,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Act => "act",
            Self::SubscriberSet => "subscriber set",
            Self::Support => "support",
            Self::Attachment => "attachment",
        };
        f.write_str(s)
    }
}

/// Why a single record was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    MissingElement {
        parent: &'static str,
        element: &'static str,
    },
    InvalidValue {
        attribute: &'static str,
        value: String,
    },
    InvalidDate {
        attribute: &'static str,
        value: String,
    },
    MalformedXRef {
        href: String,
    },
    PersonNotIndexed {
        person_ref: String,
    },
    MissingPersonAttribute {
        person_ref: String,
        attribute: &'static str,
    },
    UnknownChargeType {
        person_ref: String,
        charge_type: String,
    },
    ChargeNotFound {
        person_ref: String,
    },
    AmbiguousCharge {
        person_ref: String,
        count: usize,
    },
    AmbiguousAct {
        idnum: String,
        count: usize,
    },
    AmbiguousAttachment {
        title: String,
        count: usize,
    },
    MissingFile {
        path: PathBuf,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAttribute { element, attribute } => {
                write!(f, "{element} has no `{attribute}` attribute")
            }
            Self::MissingElement { parent, element } => {
                write!(f, "{parent} has no {element} child")
            }
            Self::InvalidValue { attribute, value } => {
                write!(f, "`{value}` is not a valid {attribute}")
            }
            Self::InvalidDate { attribute, value } => {
                write!(f, "{attribute} `{value}` is not a YYYY-MM-DD date")
            }
            Self::MalformedXRef { href } => {
                write!(f, "charge reference `{href}` has no #fragment")
            }
            Self::PersonNotIndexed { person_ref } => {
                write!(f, "{person_ref} is not in the people file")
            }
            Self::MissingPersonAttribute {
                person_ref,
                attribute,
            } => write!(f, "person {person_ref} has no `{attribute}` in the people file"),
            Self::UnknownChargeType {
                person_ref,
                charge_type,
            } => write!(f, "person {person_ref} has unknown charge type `{charge_type}`"),
            Self::ChargeNotFound { person_ref } => {
                write!(f, "no current charge for person {person_ref}")
            }
            Self::AmbiguousCharge { person_ref, count } => {
                write!(f, "{count} current charges for person {person_ref}")
            }
            Self::AmbiguousAct { idnum, count } => {
                write!(f, "{count} stored acts match {idnum}")
            }
            Self::AmbiguousAttachment { title, count } => {
                write!(f, "{count} stored attachments titled `{title}`")
            }
            Self::MissingFile { path } => write!(f, "file {} does not exist", path.display()),
        }
    }
}

/// A skipped record together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub record: RecordKind,
    pub file: PathBuf,
    /// XML `id` of the act being processed, when known
    pub act: Option<String>,
    pub reason: SkipReason,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.file.display())?;
        if let Some(act) = &self.act {
            write!(f, "act {act}: ")?;
        }
        write!(f, "{} skipped, {}", self.record, self.reason)
    }
}

/// Counters for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub files: usize,
    pub acts_created: usize,
    pub acts_found: usize,
    pub supports_created: usize,
    pub supports_updated: usize,
    pub attachments_created: usize,
    pub attachments_updated: usize,
    pub texts_extracted: usize,
    pub extraction_failures: usize,
    pub skips: Vec<Skip>,
}

impl ImportReport {
    pub fn acts(&self) -> usize {
        self.acts_created + self.acts_found
    }

    pub fn skipped(&self, record: RecordKind) -> usize {
        self.skips.iter().filter(|s| s.record == record).count()
    }

    /// Add the counters of `other` to `self`.
    pub fn absorb(&mut self, other: ImportReport) {
        self.files += other.files;
        self.acts_created += other.acts_created;
        self.acts_found += other.acts_found;
        self.supports_created += other.supports_created;
        self.supports_updated += other.supports_updated;
        self.attachments_created += other.attachments_created;
        self.attachments_updated += other.attachments_updated;
        self.texts_extracted += other.texts_extracted;
        self.extraction_failures += other.extraction_failures;
        self.skips.extend(other.skips);
    }
}
