//! OM-XML acts importer
//!
//! Reads council deliberations, interrogations and motions from OM-XML files
//! and writes them to the [`MunicipalStore`]:
//!
//! ```text
//! act.xml ──► xml tree ──► ActHandler ──► act (get-or-create)
//!                              │
//!                              ├─► ActSubscribers/ActSupport ──► ChargeResolver ──► supports
//!                              │                                     ▲
//!                              │                              people.xml index
//!                              └─► Attachment ──► media store ──► TextExtractor ──► text
//! ```
//!
//! Every write is a get-or-create/upsert, so re-importing the same files is
//! harmless. Records that cannot be imported are reported as [`Skip`]s and
//! logged; only missing inputs, an unknown act type, an unconfigured
//! municipality and storage/IO failures abort a run.

pub mod attachments;
pub mod handlers;
pub mod importer;
pub mod people_index;
pub mod report;
pub mod resolver;
pub mod signers;
pub mod xml;

pub use handlers::{ActHandler, ActType};
pub use importer::ActImporter;
pub use people_index::PeopleIndex;
pub use report::{ImportReport, RecordKind, Skip, SkipReason};
pub use resolver::ChargeResolver;

use openmunicipio_extract::TextExtractor;
use openmunicipio_model::Act;
use openmunicipio_storage::{MunicipalStore, StoreError};
use std::path::PathBuf;
use thiserror::Error;

pub const OM_NS: &str = "http://www.openmunicipio.it";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("enter at least one filename")]
    NoInputs,

    #[error("act type `{0}` is not one of CouncilDeliberation, Interrogation, Motion")]
    UnknownActType(String),

    #[error("people file {} does not exist", .0.display())]
    MissingPeopleFile(PathBuf),

    #[error("file {} does not exist", .0.display())]
    MissingInputFile(PathBuf),

    #[error("people file {}: {source}", path.display())]
    PeopleFile { path: PathBuf, source: xml::XmlError },

    #[error("{}: {source}", path.display())]
    Xml { path: PathBuf, source: xml::XmlError },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Indexing hook
// ============================================================================

/// Receives every act after it has been (re)built.
pub trait ActIndex {
    fn reindex(&self, act: &Act);
}

/// Index that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndex;

impl ActIndex for NullIndex {
    fn reindex(&self, _act: &Act) {}
}

// ============================================================================
// Run
// ============================================================================

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub files: Vec<PathBuf>,
    pub people_file: PathBuf,
    pub act_type: ActType,
    /// Rebuild supports and attachments of acts that already exist
    pub overwrite: bool,
}

/// Import every file of `request`, flushing the store after each one.
///
/// All inputs are checked before the first act is touched. A fatal error
/// stops the run, but whatever was written before it is still flushed.
pub fn import_acts(
    store: &MunicipalStore,
    request: &ImportRequest,
    extractor: Option<&dyn TextExtractor>,
    index: &dyn ActIndex,
) -> Result<ImportReport, ImportError> {
    let mut importer = ActImporter::new(store, request)?.with_index(index);
    if let Some(extractor) = extractor {
        importer = importer.with_extractor(extractor);
    }

    let mut report = ImportReport::default();
    for file in &request.files {
        match importer.import_file(file) {
            Ok(file_report) => report.absorb(file_report),
            Err(err) => {
                if let Err(flush_err) = store.flush() {
                    tracing::error!(error = %flush_err, "flush after failed import");
                }
                return Err(err);
            }
        }
        store.flush()?;
    }

    tracing::info!(
        files = report.files,
        created = report.acts_created,
        found = report.acts_found,
        skipped = report.skips.len(),
        "import finished"
    );
    Ok(report)
}
