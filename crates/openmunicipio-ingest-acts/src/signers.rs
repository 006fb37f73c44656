//! `om:ActSubscribers` → supports.

use crate::importer::{record_skip, ActImporter};
use crate::report::{ImportReport, RecordKind, SkipReason};
use crate::xml::XmlElement;
use crate::{OM_NS, XLINK_NS};
use openmunicipio_model::{parse_date, Act, SupportType};
use std::path::Path;

impl ActImporter<'_> {
    /// Upsert one support per resolvable `om:ActSupport` of a subscriber set.
    pub(crate) fn fetch_signers(
        &self,
        file: &Path,
        act: &Act,
        subscribers: &XmlElement,
        report: &mut ImportReport,
    ) {
        let support_type = match self.handler.support_type(subscribers) {
            Ok(t) => t,
            Err(reason) => {
                record_skip(report, RecordKind::SubscriberSet, file, Some(&act.idnum), reason);
                return;
            }
        };

        for support in subscribers.children_named(OM_NS, "ActSupport") {
            match self.fetch_signer(act, support, support_type) {
                Ok(true) => report.supports_created += 1,
                Ok(false) => report.supports_updated += 1,
                Err(reason) => {
                    record_skip(report, RecordKind::Support, file, Some(&act.idnum), reason)
                }
            }
        }
    }

    /// Returns whether the support was created.
    fn fetch_signer(
        &self,
        act: &Act,
        support: &XmlElement,
        support_type: SupportType,
    ) -> Result<bool, SkipReason> {
        let support_date = match support.non_empty_attr("date") {
            Some(raw) => parse_date(raw).map_err(|_| SkipReason::InvalidDate {
                attribute: "date",
                value: raw.to_string(),
            })?,
            None => act.presentation_date,
        };

        let xref = support
            .child(OM_NS, "ChargeXRef")
            .ok_or(SkipReason::MissingElement {
                parent: "ActSupport",
                element: "ChargeXRef",
            })?;
        let href = xref
            .attr_ns(XLINK_NS, "href")
            .ok_or(SkipReason::MissingAttribute {
                element: "ChargeXRef",
                attribute: "xlink:href",
            })?;
        let charge = self.resolver().resolve(href)?;

        let (support, created) =
            self.store
                .upsert_support(charge.id, act.id, support_type, support_date);
        tracing::debug!(
            act = %act.idnum,
            charge = charge.id,
            support = support.id,
            ?support_type,
            "support {}",
            if created { "created" } else { "updated" }
        );
        Ok(created)
    }
}
