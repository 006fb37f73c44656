//! Charge cross-reference resolution.
//!
//! `people.xml#P1` → people-file person `P1` → (`om_id`, `charge`) → the
//! person's current charge in the institution the charge tag names.

use crate::people_index::PeopleIndex;
use crate::report::SkipReason;
use openmunicipio_model::{ChargeType, InstitutionCharge, RecordId};
use openmunicipio_storage::{LookupError, MunicipalStore, Municipality};

/// Split `file#fragment`; `None` without a `#` or with an empty fragment.
pub fn split_xref(href: &str) -> Option<(&str, &str)> {
    let (file, fragment) = href.trim().split_once('#')?;
    if fragment.is_empty() {
        return None;
    }
    Some((file, fragment))
}

pub struct ChargeResolver<'a> {
    store: &'a MunicipalStore,
    municipality: Municipality,
    people: &'a PeopleIndex,
}

impl<'a> ChargeResolver<'a> {
    pub fn new(store: &'a MunicipalStore, municipality: Municipality, people: &'a PeopleIndex) -> Self {
        Self {
            store,
            municipality,
            people,
        }
    }

    pub fn resolve(&self, href: &str) -> Result<InstitutionCharge, SkipReason> {
        let (_, person_ref) = split_xref(href).ok_or_else(|| SkipReason::MalformedXRef {
            href: href.to_string(),
        })?;
        let person = self
            .people
            .get(person_ref)
            .ok_or_else(|| SkipReason::PersonNotIndexed {
                person_ref: person_ref.to_string(),
            })?;

        let missing = |attribute| SkipReason::MissingPersonAttribute {
            person_ref: person_ref.to_string(),
            attribute,
        };
        let om_id = person.om_id.as_deref().ok_or_else(|| missing("om_id"))?;
        let charge_tag = person.charge.as_deref().ok_or_else(|| missing("charge"))?;

        let person_id: RecordId = om_id.parse().map_err(|_| SkipReason::InvalidValue {
            attribute: "om_id",
            value: om_id.to_string(),
        })?;
        let charge_type =
            ChargeType::from_xml_token(charge_tag).ok_or_else(|| SkipReason::UnknownChargeType {
                person_ref: person_ref.to_string(),
                charge_type: charge_tag.to_string(),
            })?;
        let institution = self
            .municipality
            .institution(charge_type.institution_kind())
            .ok_or_else(|| SkipReason::UnknownChargeType {
                person_ref: person_ref.to_string(),
                charge_type: charge_tag.to_string(),
            })?;

        self.store
            .current_institution_charge(person_id, institution)
            .map_err(|e| match e {
                LookupError::NotFound => SkipReason::ChargeNotFound {
                    person_ref: person_ref.to_string(),
                },
                LookupError::Multiple(count) => SkipReason::AmbiguousCharge {
                    person_ref: person_ref.to_string(),
                    count,
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_xref_requires_fragment() {
        assert_eq!(split_xref("people.xml#P1"), Some(("people.xml", "P1")));
        assert_eq!(split_xref("#P1"), Some(("", "P1")));
        assert_eq!(split_xref("people.xml"), None);
        assert_eq!(split_xref("people.xml#"), None);
    }
}
