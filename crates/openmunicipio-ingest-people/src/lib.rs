//! Openpolis people import
//!
//! Creates persons, institution charges, council responsabilities and group
//! charges for a location from an openpolis location document. Every write is
//! get-or-create, so importing the same location twice changes nothing.

pub mod openpolis;
pub mod source;

pub use openpolis::{LocationData, Member};
pub use source::{ApiConfig, LocationSource};

use chrono::NaiveDate;
use openmunicipio_model::{parse_date, Person, RecordId, ResponsabilityKind, Sex};
use openmunicipio_storage::{MunicipalStore, Municipality, NewPerson, StoreError};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeopleImportError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("openpolis API error: {0}")]
    Api(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which body a member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Organ {
    Giunta,
    Consiglio,
}

impl Organ {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Giunta => "giunta",
            Self::Consiglio => "consiglio",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleReport {
    pub persons_created: usize,
    pub charges_created: usize,
    pub responsabilities_created: usize,
    pub groups_created: usize,
    pub group_charges_created: usize,
    /// One summary line per imported member, `giunta` first
    pub members: Vec<(Organ, String)>,
    /// Members dropped for unusable dates
    pub skipped: Vec<String>,
}

struct MemberDates {
    birth: NaiveDate,
    start: NaiveDate,
}

fn member_dates(member: &Member) -> Option<MemberDates> {
    let birth = parse_date(openpolis::prefix(&member.birth_date, 10)).ok()?;
    let start = parse_date(openpolis::prefix(&member.date_start, 10)).ok()?;
    Some(MemberDates { birth, start })
}

/// Import a location. With `overwrite`, all people data and the supports of
/// the removed charges are cleared first.
pub fn import_location(
    store: &MunicipalStore,
    data: &LocationData,
    overwrite: bool,
) -> Result<PeopleReport, PeopleImportError> {
    let municipality = Municipality::from_store(store)?;
    if overwrite {
        store.clear_people();
        tracing::info!("cleared persons, charges, groups and supports");
    }

    let mut importer = LocationImporter {
        store,
        municipality,
        mayors: HashSet::new(),
        report: PeopleReport::default(),
    };
    for member in &data.giunta {
        importer.import_member(Organ::Giunta, member);
    }
    for member in &data.consiglio {
        importer.import_member(Organ::Consiglio, member);
    }
    store.flush()?;

    let report = importer.report;
    tracing::info!(
        persons = report.persons_created,
        charges = report.charges_created,
        skipped = report.skipped.len(),
        "people import finished"
    );
    Ok(report)
}

struct LocationImporter<'a> {
    store: &'a MunicipalStore,
    municipality: Municipality,
    /// Persons holding the mayor charge
    mayors: HashSet<RecordId>,
    report: PeopleReport,
}

impl LocationImporter<'_> {
    fn import_member(&mut self, organ: Organ, member: &Member) {
        let Some(dates) = member_dates(member) else {
            tracing::warn!(
                organ = organ.as_str(),
                member = %format!("{} {}", member.first_name, member.last_name),
                birth_date = %member.birth_date,
                date_start = %member.date_start,
                "member skipped: unusable dates"
            );
            self.report.skipped.push(member.summary_line());
            return;
        };

        let (person, created) = self.store.get_or_create_person(NewPerson {
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            birth_date: dates.birth,
            birth_location: member.birth_location.clone(),
            sex: Sex::from_openpolis(&member.sex),
        });
        if created {
            self.report.persons_created += 1;
        }
        if let Some(party) = &member.party {
            tracing::debug!(person = %person, party = %party, "party");
        }

        match organ {
            Organ::Giunta => self.import_giunta_member(&person, member, dates.start),
            Organ::Consiglio => self.import_council_member(&person, member, dates.start),
        }

        let line = member.summary_line();
        tracing::info!(organ = organ.as_str(), "{line}");
        self.report.members.push((organ, line));
    }

    fn charge(&mut self, person: RecordId, institution: RecordId, description: &str, start: NaiveDate) -> RecordId {
        let (charge, created) =
            self.store
                .get_or_create_charge(person, institution, description, start);
        if created {
            self.report.charges_created += 1;
        }
        charge.id
    }

    fn import_giunta_member(&mut self, person: &Person, member: &Member, start: NaiveDate) {
        if member.charge == "Sindaco" {
            self.charge(person.id, self.municipality.mayor, "Sindaco", start);
            self.mayors.insert(person.id);
        }
        let description = format!("Assessore {}", member.charge_descr);
        self.charge(
            person.id,
            self.municipality.city_government,
            description.trim_end(),
            start,
        );
    }

    fn import_council_member(&mut self, person: &Person, member: &Member, start: NaiveDate) {
        let charge = self.charge(person.id, self.municipality.council, "", start);

        let mut responsabilities = Vec::new();
        match member.charge.as_str() {
            "Presidente" => responsabilities.push((
                ResponsabilityKind::President,
                "Presidente del Consiglio Comunale",
            )),
            "Vicepresidente" => responsabilities.push((
                ResponsabilityKind::Vice,
                "Vicepresidente del Consiglio Comunale",
            )),
            _ => {}
        }
        if self.mayors.contains(&person.id) {
            responsabilities.push((ResponsabilityKind::Mayor, "Sindaco"));
        }
        for (kind, description) in responsabilities {
            let (_, created) =
                self.store
                    .get_or_create_responsability(charge, kind, description, start);
            if created {
                self.report.responsabilities_created += 1;
            }
        }

        if let Some(name) = member.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            let (group, created) = self
                .store
                .get_or_create_group(name, openpolis::prefix(name, 15));
            if created {
                self.report.groups_created += 1;
            }
            let (_, created) = self.store.get_or_create_group_charge(group.id, charge, start);
            if created {
                self.report.group_charges_created += 1;
            }
        }
    }
}
