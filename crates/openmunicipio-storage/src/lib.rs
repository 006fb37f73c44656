//! OpenMunicipio municipal record store
//!
//! Holds the records the importers read and write:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     MUNICIPAL STORE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  institutions ─┐                                             │
//! │  persons ──────┼──► charges ──► supports ◄── acts            │
//! │  groups ───────┘       │                      │              │
//! │                        ▼                      ▼              │
//! │               responsabilities          attachments ──► media│
//! └──────────────────────────────────────────────────────────────┘
//!           │ flush()
//!           ▼
//!   <data_dir>/municipio.json         <media_root>/attached_documents/...
//! ```
//!
//! ## Key Features
//!
//! - **Get-or-create**: every importer write is keyed, so re-running an import
//!   never duplicates rows
//! - **Snapshot persistence**: tables live in memory and are written as one JSON
//!   document on [`MunicipalStore::flush`]
//! - **Media**: attachment files are kept under a dated upload directory

pub mod media;
pub mod snapshot;


pub use media::MediaStore;

use chrono::{NaiveDate, Utc};
use openmunicipio_model::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("no {table} record with id {id}")]
    UnknownRecord { table: &'static str, id: RecordId },

    #[error("{kind} institution: {source}")]
    Institution {
        kind: InstitutionKind,
        source: LookupError,
    },
}

/// Outcome of a lookup that must match exactly one record.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("not found")]
    NotFound,

    #[error("ambiguous: {0} records match")]
    Multiple(usize),
}

fn exactly_one<T>(mut matches: Vec<T>) -> Result<T, LookupError> {
    match matches.len() {
        0 => Err(LookupError::NotFound),
        1 => Ok(matches.remove(0)),
        n => Err(LookupError::Multiple(n)),
    }
}

// ============================================================================
// Storage Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the tables snapshot
    pub data_dir: PathBuf,
    /// Root directory for uploaded/attached files
    pub media_root: PathBuf,
}

impl StorageConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("municipio.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            media_root: PathBuf::from("./media"),
        }
    }
}

// ============================================================================
// Tables
// ============================================================================

/// All tables, as persisted in the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    pub next_id: RecordId,
    pub institutions: BTreeMap<RecordId, Institution>,
    pub persons: BTreeMap<RecordId, Person>,
    pub charges: BTreeMap<RecordId, InstitutionCharge>,
    pub responsabilities: BTreeMap<RecordId, InstitutionResponsability>,
    pub groups: BTreeMap<RecordId, Group>,
    pub group_charges: BTreeMap<RecordId, GroupCharge>,
    pub acts: BTreeMap<RecordId, Act>,
    pub supports: BTreeMap<RecordId, Support>,
    pub attachments: BTreeMap<RecordId, Attachment>,
}

impl Tables {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }
}

/// Row counts per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub institutions: usize,
    pub persons: usize,
    pub charges: usize,
    pub responsabilities: usize,
    pub groups: usize,
    pub group_charges: usize,
    pub acts: usize,
    pub deliberations: usize,
    pub interrogations: usize,
    pub motions: usize,
    pub supports: usize,
    pub attachments: usize,
}

/// Identity fields of a person, as provided by the people sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub birth_location: String,
    pub sex: Sex,
}

// ============================================================================
// Municipal Store
// ============================================================================

pub struct MunicipalStore {
    config: StorageConfig,
    tables: Arc<RwLock<Tables>>,
    media: MediaStore,
}

impl MunicipalStore {
    /// Open the store, loading the snapshot if one exists.
    pub fn open(config: StorageConfig) -> Result<Self, StoreError> {
        let tables = snapshot::load(&config.snapshot_path())?.unwrap_or_default();
        tracing::debug!(
            snapshot = %config.snapshot_path().display(),
            acts = tables.acts.len(),
            persons = tables.persons.len(),
            "opened municipal store"
        );
        let media = MediaStore::new(config.media_root.clone());
        Ok(Self {
            config,
            tables: Arc::new(RwLock::new(tables)),
            media,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Write the tables snapshot to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        let tables = self.tables.read();
        snapshot::save(&self.config.snapshot_path(), &tables)?;
        tracing::debug!(snapshot = %self.config.snapshot_path().display(), "flushed municipal store");
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        let t = self.tables.read();
        let count_kind =
            |tag: ActKindTag| t.acts.values().filter(|a| a.kind.tag() == tag).count();
        StoreStats {
            institutions: t.institutions.len(),
            persons: t.persons.len(),
            charges: t.charges.len(),
            responsabilities: t.responsabilities.len(),
            groups: t.groups.len(),
            group_charges: t.group_charges.len(),
            acts: t.acts.len(),
            deliberations: count_kind(ActKindTag::Deliberation),
            interrogations: count_kind(ActKindTag::Interrogation),
            motions: count_kind(ActKindTag::Motion),
            supports: t.supports.len(),
            attachments: t.attachments.len(),
        }
    }

    // ========================================================================
    // Institutions
    // ========================================================================

    /// Create an institution of `kind` unless one already exists.
    pub fn ensure_institution(&self, kind: InstitutionKind, name: &str) -> (Institution, bool) {
        let mut t = self.tables.write();
        if let Some(existing) = t.institutions.values().find(|i| i.kind == kind) {
            return (existing.clone(), false);
        }
        let id = t.allocate_id();
        let institution = Institution {
            id,
            name: name.to_string(),
            kind,
        };
        t.institutions.insert(id, institution.clone());
        (institution, true)
    }

    pub fn institution_by_kind(&self, kind: InstitutionKind) -> Result<Institution, LookupError> {
        let t = self.tables.read();
        exactly_one(
            t.institutions
                .values()
                .filter(|i| i.kind == kind)
                .cloned()
                .collect(),
        )
    }

    // ========================================================================
    // People
    // ========================================================================

    pub fn get_or_create_person(&self, new: NewPerson) -> (Person, bool) {
        let mut t = self.tables.write();
        if let Some(existing) = t.persons.values().find(|p| {
            p.first_name == new.first_name
                && p.last_name == new.last_name
                && p.birth_date == new.birth_date
                && p.birth_location == new.birth_location
                && p.sex == new.sex
        }) {
            return (existing.clone(), false);
        }
        let id = t.allocate_id();
        let person = Person {
            id,
            first_name: new.first_name,
            last_name: new.last_name,
            birth_date: new.birth_date,
            birth_location: new.birth_location,
            sex: new.sex,
        };
        t.persons.insert(id, person.clone());
        (person, true)
    }

    /// Get or create a charge keyed by `(person, institution, description, start_date)`.
    pub fn get_or_create_charge(
        &self,
        person_id: RecordId,
        institution_id: RecordId,
        description: &str,
        start_date: NaiveDate,
    ) -> (InstitutionCharge, bool) {
        let mut t = self.tables.write();
        if let Some(existing) = t.charges.values().find(|c| {
            c.person_id == person_id
                && c.institution_id == institution_id
                && c.description == description
                && c.start_date == start_date
        }) {
            return (existing.clone(), false);
        }
        let id = t.allocate_id();
        let charge = InstitutionCharge {
            id,
            person_id,
            institution_id,
            description: description.to_string(),
            start_date,
            end_date: None,
        };
        t.charges.insert(id, charge.clone());
        (charge, true)
    }

    /// Close a charge; it stops being the person's current charge.
    pub fn end_charge(&self, charge_id: RecordId, end_date: NaiveDate) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let charge = t.charges.get_mut(&charge_id).ok_or(StoreError::UnknownRecord {
            table: "charge",
            id: charge_id,
        })?;
        charge.end_date = Some(end_date);
        Ok(())
    }

    /// The person's open charge in the given institution.
    pub fn current_institution_charge(
        &self,
        person_id: RecordId,
        institution_id: RecordId,
    ) -> Result<InstitutionCharge, LookupError> {
        let t = self.tables.read();
        if !t.persons.contains_key(&person_id) {
            return Err(LookupError::NotFound);
        }
        exactly_one(
            t.charges
                .values()
                .filter(|c| {
                    c.person_id == person_id && c.institution_id == institution_id && c.is_current()
                })
                .cloned()
                .collect(),
        )
    }

    pub fn charges_in_institution(&self, institution_id: RecordId) -> Vec<InstitutionCharge> {
        let t = self.tables.read();
        t.charges
            .values()
            .filter(|c| c.institution_id == institution_id)
            .cloned()
            .collect()
    }

    pub fn get_or_create_responsability(
        &self,
        charge_id: RecordId,
        kind: ResponsabilityKind,
        description: &str,
        start_date: NaiveDate,
    ) -> (InstitutionResponsability, bool) {
        let mut t = self.tables.write();
        if let Some(existing) = t
            .responsabilities
            .values()
            .find(|r| r.charge_id == charge_id && r.kind == kind)
        {
            return (existing.clone(), false);
        }
        let id = t.allocate_id();
        let resp = InstitutionResponsability {
            id,
            charge_id,
            kind,
            description: description.to_string(),
            start_date,
        };
        t.responsabilities.insert(id, resp.clone());
        (resp, true)
    }

    pub fn responsabilities_for_charge(&self, charge_id: RecordId) -> Vec<InstitutionResponsability> {
        let t = self.tables.read();
        t.responsabilities
            .values()
            .filter(|r| r.charge_id == charge_id)
            .cloned()
            .collect()
    }

    pub fn get_or_create_group(&self, name: &str, acronym: &str) -> (Group, bool) {
        let mut t = self.tables.write();
        if let Some(existing) = t
            .groups
            .values()
            .find(|g| g.name == name && g.acronym == acronym)
        {
            return (existing.clone(), false);
        }
        let id = t.allocate_id();
        let group = Group {
            id,
            name: name.to_string(),
            acronym: acronym.to_string(),
        };
        t.groups.insert(id, group.clone());
        (group, true)
    }

    pub fn get_or_create_group_charge(
        &self,
        group_id: RecordId,
        charge_id: RecordId,
        start_date: NaiveDate,
    ) -> (GroupCharge, bool) {
        let mut t = self.tables.write();
        if let Some(existing) = t
            .group_charges
            .values()
            .find(|g| g.group_id == group_id && g.charge_id == charge_id)
        {
            return (existing.clone(), false);
        }
        let id = t.allocate_id();
        let gc = GroupCharge {
            id,
            group_id,
            charge_id,
            start_date,
        };
        t.group_charges.insert(id, gc.clone());
        (gc, true)
    }

    /// Remove persons, charges, responsabilities, groups and group charges,
    /// along with the supports of the removed charges.
    ///
    /// Acts and attachments are left alone.
    pub fn clear_people(&self) {
        let mut t = self.tables.write();
        let supports = t.supports.len();
        t.supports.clear();
        tracing::debug!(supports, "cleared supports of removed charges");
        t.persons.clear();
        t.charges.clear();
        t.responsabilities.clear();
        t.groups.clear();
        t.group_charges.clear();
    }

    // ========================================================================
    // Acts
    // ========================================================================

    pub fn act(&self, id: RecordId) -> Option<Act> {
        self.tables.read().acts.get(&id).cloned()
    }

    pub fn acts_by_kind(&self, tag: ActKindTag) -> Vec<Act> {
        let t = self.tables.read();
        t.acts
            .values()
            .filter(|a| a.kind.tag() == tag)
            .cloned()
            .collect()
    }

    pub fn find_acts_by_idnum(&self, idnum: &str) -> Vec<Act> {
        let t = self.tables.read();
        t.acts
            .values()
            .filter(|a| a.idnum == idnum)
            .cloned()
            .collect()
    }

    /// Return the act matching `key`, creating it when absent.
    ///
    /// Errors with `Multiple` if earlier writes left duplicates behind.
    pub fn get_or_create_act(&self, key: ActKey) -> Result<(Act, bool), LookupError> {
        let mut t = self.tables.write();
        let matches: Vec<Act> = t.acts.values().filter(|a| a.matches(&key)).cloned().collect();
        match exactly_one(matches) {
            Ok(act) => return Ok((act, false)),
            Err(LookupError::NotFound) => {}
            Err(err) => return Err(err),
        }
        let id = t.allocate_id();
        let now = Utc::now();
        let act = Act {
            id,
            idnum: key.idnum,
            title: key.title,
            presentation_date: key.presentation_date,
            text: String::new(),
            emitting_institution: key.emitting_institution,
            kind: key.kind,
            created: now,
            modified: now,
        };
        t.acts.insert(id, act.clone());
        Ok((act, true))
    }

    pub fn set_act_text(&self, act_id: RecordId, text: &str) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let act = t.acts.get_mut(&act_id).ok_or(StoreError::UnknownRecord {
            table: "act",
            id: act_id,
        })?;
        act.text = text.to_string();
        act.modified = Utc::now();
        Ok(())
    }

    /// Save the act again without changes, bumping `modified`.
    pub fn touch_act(&self, act_id: RecordId) -> Result<Act, StoreError> {
        let mut t = self.tables.write();
        let act = t.acts.get_mut(&act_id).ok_or(StoreError::UnknownRecord {
            table: "act",
            id: act_id,
        })?;
        act.modified = Utc::now();
        Ok(act.clone())
    }

    // ========================================================================
    // Supports
    // ========================================================================

    /// Upsert keyed by `(charge, act, support_type)`; the date is always rewritten.
    pub fn upsert_support(
        &self,
        charge_id: RecordId,
        act_id: RecordId,
        support_type: SupportType,
        support_date: NaiveDate,
    ) -> (Support, bool) {
        let mut t = self.tables.write();
        if let Some(existing) = t.supports.values_mut().find(|s| {
            s.charge_id == charge_id && s.act_id == act_id && s.support_type == support_type
        }) {
            existing.support_date = support_date;
            return (existing.clone(), false);
        }
        let id = t.allocate_id();
        let support = Support {
            id,
            charge_id,
            act_id,
            support_type,
            support_date,
        };
        t.supports.insert(id, support.clone());
        (support, true)
    }

    pub fn supports_for_act(&self, act_id: RecordId) -> Vec<Support> {
        let t = self.tables.read();
        t.supports
            .values()
            .filter(|s| s.act_id == act_id)
            .cloned()
            .collect()
    }

    pub fn remove_supports_for_act(&self, act_id: RecordId) -> usize {
        let mut t = self.tables.write();
        let before = t.supports.len();
        t.supports.retain(|_, s| s.act_id != act_id);
        before - t.supports.len()
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    /// Return the attachment with `title` on `act_id`, creating it when absent.
    pub fn get_or_create_attachment(
        &self,
        act_id: RecordId,
        title: &str,
    ) -> Result<(Attachment, bool), LookupError> {
        let mut t = self.tables.write();
        let matches: Vec<Attachment> = t
            .attachments
            .values()
            .filter(|a| a.act_id == act_id && a.title == title)
            .cloned()
            .collect();
        match exactly_one(matches) {
            Ok(att) => return Ok((att, false)),
            Err(LookupError::NotFound) => {}
            Err(err) => return Err(err),
        }
        let id = t.allocate_id();
        let now = Utc::now();
        let attachment = Attachment {
            id,
            act_id,
            title: title.to_string(),
            document_date: None,
            file: None,
            document_type: String::new(),
            document_size: 0,
            text: String::new(),
            created: now,
            modified: now,
        };
        t.attachments.insert(id, attachment.clone());
        Ok((attachment, true))
    }

    /// Replace a stored attachment row with `attachment`.
    pub fn save_attachment(&self, attachment: &Attachment) -> Result<(), StoreError> {
        let mut t = self.tables.write();
        let slot = t
            .attachments
            .get_mut(&attachment.id)
            .ok_or(StoreError::UnknownRecord {
                table: "attachment",
                id: attachment.id,
            })?;
        *slot = attachment.clone();
        slot.modified = Utc::now();
        Ok(())
    }

    pub fn attachments_for_act(&self, act_id: RecordId) -> Vec<Attachment> {
        let t = self.tables.read();
        t.attachments
            .values()
            .filter(|a| a.act_id == act_id)
            .cloned()
            .collect()
    }

    /// Remove an act's attachment rows and their stored files.
    pub fn remove_attachments_for_act(&self, act_id: RecordId) -> Result<usize, StoreError> {
        let removed: Vec<Attachment> = {
            let mut t = self.tables.write();
            let ids: Vec<RecordId> = t
                .attachments
                .values()
                .filter(|a| a.act_id == act_id)
                .map(|a| a.id)
                .collect();
            ids.iter().filter_map(|id| t.attachments.remove(id)).collect()
        };
        for attachment in &removed {
            if let Some(file) = &attachment.file {
                self.media.remove(file)?;
            }
        }
        Ok(removed.len())
    }
}

// ============================================================================
// Municipality context
// ============================================================================

/// The three institutions every act import needs, resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Municipality {
    pub council: RecordId,
    pub city_government: RecordId,
    pub mayor: RecordId,
}

impl Municipality {
    pub fn from_store(store: &MunicipalStore) -> Result<Self, StoreError> {
        let lookup = |kind: InstitutionKind| {
            store
                .institution_by_kind(kind)
                .map(|i| i.id)
                .map_err(|source| StoreError::Institution { kind, source })
        };
        Ok(Self {
            council: lookup(InstitutionKind::Council)?,
            city_government: lookup(InstitutionKind::CityGovernment)?,
            mayor: lookup(InstitutionKind::Mayor)?,
        })
    }

    pub fn institution(&self, kind: InstitutionKind) -> Option<RecordId> {
        match kind {
            InstitutionKind::Council => Some(self.council),
            InstitutionKind::CityGovernment => Some(self.city_government),
            InstitutionKind::Mayor => Some(self.mayor),
            InstitutionKind::Committee => None,
        }
    }
}

/// Create the council, city government and mayor institutions if missing.
pub fn setup_municipality(store: &MunicipalStore, name: &str) -> Municipality {
    let (council, _) = store.ensure_institution(
        InstitutionKind::Council,
        &format!("Consiglio comunale di {name}"),
    );
    let (gov, _) = store.ensure_institution(
        InstitutionKind::CityGovernment,
        &format!("Giunta comunale di {name}"),
    );
    let (mayor, _) =
        store.ensure_institution(InstitutionKind::Mayor, &format!("Sindaco di {name}"));
    Municipality {
        council: council.id,
        city_government: gov.id,
        mayor: mayor.id,
    }
}
