//! Per-file act import.

use crate::handlers::{read_act_key, ActHandler};
use crate::people_index::PeopleIndex;
use crate::report::{ImportReport, RecordKind, Skip, SkipReason};
use crate::resolver::ChargeResolver;
use crate::xml::{self, XmlElement};
use crate::{ActIndex, ImportError, ImportRequest, NullIndex, OM_NS};
use chrono::NaiveDate;
use openmunicipio_extract::TextExtractor;
use openmunicipio_storage::{LookupError, MunicipalStore, Municipality, StoreError};
use std::path::Path;

/// A record-level failure: either skip the record or abort the run.
pub(crate) enum Failure {
    Skip(SkipReason),
    Fatal(ImportError),
}

impl From<SkipReason> for Failure {
    fn from(reason: SkipReason) -> Self {
        Self::Skip(reason)
    }
}

impl From<ImportError> for Failure {
    fn from(err: ImportError) -> Self {
        Self::Fatal(err)
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Self::Fatal(err.into())
    }
}

pub struct ActImporter<'a> {
    pub(crate) store: &'a MunicipalStore,
    pub(crate) municipality: Municipality,
    pub(crate) people: PeopleIndex,
    pub(crate) handler: &'static dyn ActHandler,
    pub(crate) overwrite: bool,
    pub(crate) extractor: Option<&'a dyn TextExtractor>,
    pub(crate) index: &'a dyn ActIndex,
    /// Day used for the attachment upload directory
    pub(crate) upload_day: NaiveDate,
}

impl<'a> ActImporter<'a> {
    /// Check inputs, resolve the municipality and load the people file.
    pub fn new(store: &'a MunicipalStore, request: &ImportRequest) -> Result<Self, ImportError> {
        if request.files.is_empty() {
            return Err(ImportError::NoInputs);
        }
        if !request.people_file.is_file() {
            return Err(ImportError::MissingPeopleFile(request.people_file.clone()));
        }
        if let Some(missing) = request.files.iter().find(|f| !f.is_file()) {
            return Err(ImportError::MissingInputFile(missing.clone()));
        }

        let municipality = Municipality::from_store(store)?;
        let people =
            PeopleIndex::load(&request.people_file).map_err(|source| ImportError::PeopleFile {
                path: request.people_file.clone(),
                source,
            })?;

        Ok(Self {
            store,
            municipality,
            people,
            handler: request.act_type.handler(),
            overwrite: request.overwrite,
            extractor: None,
            index: &NullIndex,
            upload_day: chrono::Local::now().date_naive(),
        })
    }

    pub fn with_extractor(mut self, extractor: &'a dyn TextExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_index(mut self, index: &'a dyn ActIndex) -> Self {
        self.index = index;
        self
    }

    pub fn with_upload_day(mut self, day: NaiveDate) -> Self {
        self.upload_day = day;
        self
    }

    pub(crate) fn resolver(&self) -> ChargeResolver<'_> {
        ChargeResolver::new(self.store, self.municipality, &self.people)
    }

    pub fn import_file(&self, path: &Path) -> Result<ImportReport, ImportError> {
        let root = xml::parse_file(path).map_err(|source| ImportError::Xml {
            path: path.to_path_buf(),
            source,
        })?;

        let act_type = self.handler.act_type();
        let name = act_type.element_name();
        let nodes: Vec<&XmlElement> = if root.is(OM_NS, name) {
            vec![&root]
        } else {
            root.children_named(OM_NS, name).collect()
        };
        tracing::info!(file = %path.display(), count = nodes.len(), "{act_type} to import");

        let mut report = ImportReport {
            files: 1,
            ..Default::default()
        };
        for node in nodes {
            self.import_act(path, node, &mut report)?;
        }

        tracing::info!(
            file = %path.display(),
            created = report.acts_created,
            found = report.acts_found,
            supports = report.supports_created + report.supports_updated,
            attachments = report.attachments_created + report.attachments_updated,
            skipped = report.skips.len(),
            "file imported"
        );
        Ok(report)
    }

    fn import_act(
        &self,
        file: &Path,
        node: &XmlElement,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        let key = match read_act_key(self.handler, node, self.municipality.council) {
            Ok(key) => key,
            Err(reason) => {
                record_skip(report, RecordKind::Act, file, node.non_empty_attr("id"), reason);
                return Ok(());
            }
        };
        let idnum = key.idnum.clone();

        let (act, created) = match self.store.get_or_create_act(key) {
            Ok(found) => found,
            Err(err) => {
                let count = match err {
                    LookupError::Multiple(n) => n,
                    LookupError::NotFound => 0,
                };
                let reason = SkipReason::AmbiguousAct {
                    idnum: idnum.clone(),
                    count,
                };
                record_skip(report, RecordKind::Act, file, Some(&idnum), reason);
                return Ok(());
            }
        };

        if created {
            tracing::info!(act = %idnum, id = act.id, "created {}", act.kind.tag());
            report.acts_created += 1;
        } else {
            tracing::info!(act = %idnum, id = act.id, "found {}", act.kind.tag());
            report.acts_found += 1;
            if self.overwrite {
                let supports = self.store.remove_supports_for_act(act.id);
                let attachments = self.store.remove_attachments_for_act(act.id)?;
                tracing::info!(act = %idnum, supports, attachments, "overwriting act");
            }
        }
        if let Some(final_id) = node.non_empty_attr("final_id") {
            tracing::debug!(act = %idnum, final_id, "final id");
        }

        for subscribers in node.children_named(OM_NS, "ActSubscribers") {
            self.fetch_signers(file, &act, subscribers, report);
        }
        self.fetch_attachments(file, &act, node, report)?;

        let act = self.store.touch_act(act.id)?;
        self.index.reindex(&act);
        Ok(())
    }
}

pub(crate) fn record_skip(
    report: &mut ImportReport,
    record: RecordKind,
    file: &Path,
    act: Option<&str>,
    reason: SkipReason,
) {
    tracing::warn!(
        file = %file.display(),
        act = act.unwrap_or("-"),
        "{record} skipped: {reason}"
    );
    report.skips.push(Skip {
        record,
        file: file.to_path_buf(),
        act: act.map(str::to_string),
        reason,
    });
}
