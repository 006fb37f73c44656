//! `om:Attachment` → stored file, attachment record and extracted text.

use crate::importer::{record_skip, ActImporter, Failure};
use crate::report::{ImportReport, RecordKind, SkipReason};
use crate::xml::XmlElement;
use crate::{ImportError, OM_NS, XLINK_NS};
use openmunicipio_model::{Act, Attachment};
use openmunicipio_storage::{LookupError, MediaStore};
use std::fs;
use std::path::Path;

/// Attachments whose text is extracted, recognised by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMarker {
    /// Proposal text; also becomes the act text
    Proposal,
    Discussion,
}

impl TextMarker {
    pub fn detect(file_name: &str) -> Option<Self> {
        let name = file_name.to_lowercase();
        if name.contains("testoproposta") {
            Some(Self::Proposal)
        } else if name.contains("testodiscussione") {
            Some(Self::Discussion)
        } else {
            None
        }
    }
}

/// `<parent dir>_<basename>` of an attachment href, or the basename alone.
pub fn stored_file_name(href: &str) -> String {
    let mut parts = href.trim().rsplit('/');
    let basename = parts.next().unwrap_or_default();
    match parts.next().filter(|dir| !dir.is_empty() && *dir != ".") {
        Some(dir) => format!("{dir}_{basename}"),
        None => basename.to_string(),
    }
}

impl ActImporter<'_> {
    pub(crate) fn fetch_attachments(
        &self,
        file: &Path,
        act: &Act,
        node: &XmlElement,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        for el in node.children_named(OM_NS, "Attachment") {
            match self.fetch_attachment(file, act, el, report) {
                Ok(()) => {}
                Err(Failure::Skip(reason)) => {
                    record_skip(report, RecordKind::Attachment, file, Some(&act.idnum), reason)
                }
                Err(Failure::Fatal(err)) => return Err(err),
            }
        }
        Ok(())
    }

    fn fetch_attachment(
        &self,
        file: &Path,
        act: &Act,
        el: &XmlElement,
        report: &mut ImportReport,
    ) -> Result<(), Failure> {
        let title = el.non_empty_attr("title").ok_or(SkipReason::MissingAttribute {
            element: "Attachment",
            attribute: "title",
        })?;
        let href = el
            .attr_ns(XLINK_NS, "href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SkipReason::MissingAttribute {
                element: "Attachment",
                attribute: "xlink:href",
            })?;

        let source = file.parent().unwrap_or(Path::new("")).join(href);
        if !source.is_file() {
            return Err(SkipReason::MissingFile { path: source }.into());
        }

        let (mut attachment, created) = self
            .store
            .get_or_create_attachment(act.id, title)
            .map_err(|err| SkipReason::AmbiguousAttachment {
                title: title.to_string(),
                count: match err {
                    LookupError::Multiple(n) => n,
                    LookupError::NotFound => 0,
                },
            })?;

        let media = self.store.media();
        if let Some(old) = attachment.file.take() {
            let removed = media.remove(&old).map_err(|source| ImportError::Io {
                path: media.path(&old),
                source,
            })?;
            tracing::debug!(act = %act.idnum, file = %old, removed, "replacing attachment file");
        }

        let bytes = fs::read(&source).map_err(|e| ImportError::Io {
            path: source.clone(),
            source: e,
        })?;
        let dir = MediaStore::attachments_dir(self.upload_day);
        let stored = media
            .save(&dir, &stored_file_name(href), &bytes)
            .map_err(|source| ImportError::Io {
                path: media.path(&dir),
                source,
            })?;

        attachment.document_date = Some(act.presentation_date);
        attachment.document_type = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        attachment.document_size = bytes.len() as u64;
        attachment.file = Some(stored);
        self.store.save_attachment(&attachment)?;

        if created {
            report.attachments_created += 1;
        } else {
            report.attachments_updated += 1;
        }
        tracing::info!(
            act = %act.idnum,
            title,
            file = attachment.file.as_deref().unwrap_or_default(),
            "attachment {}",
            if created { "created" } else { "updated" }
        );

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(marker) = TextMarker::detect(&file_name) {
            self.extract_text(&source, act, &mut attachment, marker, report)?;
        }
        Ok(())
    }

    /// Extraction failures are logged and counted, never fatal.
    fn extract_text(
        &self,
        source: &Path,
        act: &Act,
        attachment: &mut Attachment,
        marker: TextMarker,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        let Some(extractor) = self.extractor else {
            tracing::debug!(act = %act.idnum, title = %attachment.title, "no text extractor configured");
            return Ok(());
        };

        match extractor.extract(source) {
            Ok(text) => {
                attachment.text = text;
                self.store.save_attachment(attachment)?;
                if marker == TextMarker::Proposal {
                    self.store.set_act_text(act.id, &attachment.text)?;
                }
                report.texts_extracted += 1;
                tracing::info!(act = %act.idnum, title = %attachment.title, ?marker, "text extracted");
            }
            Err(err) => {
                report.extraction_failures += 1;
                tracing::warn!(
                    act = %act.idnum,
                    file = %source.display(),
                    error = %err,
                    "text extraction failed"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_prefixes_parent_dir() {
        assert_eq!(
            stored_file_name("DC_1/TestoProposta.doc"),
            "DC_1_TestoProposta.doc"
        );
        assert_eq!(stored_file_name("a/b/allegato.pdf"), "b_allegato.pdf");
        assert_eq!(stored_file_name("allegato.pdf"), "allegato.pdf");
        assert_eq!(stored_file_name("./allegato.pdf"), "allegato.pdf");
    }

    #[test]
    fn markers_are_case_insensitive() {
        assert_eq!(
            TextMarker::detect("DC_1_TestoProposta.doc"),
            Some(TextMarker::Proposal)
        );
        assert_eq!(
            TextMarker::detect("TESTODISCUSSIONE.pdf"),
            Some(TextMarker::Discussion)
        );
        assert_eq!(TextMarker::detect("allegato.pdf"), None);
    }
}
