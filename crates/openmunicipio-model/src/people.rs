//! Institutions, persons and the charges that link them.

use crate::RecordId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionKind {
    Mayor,
    CityGovernment,
    Council,
    Committee,
}

impl fmt::Display for InstitutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mayor => "mayor",
            Self::CityGovernment => "city government",
            Self::Council => "council",
            Self::Committee => "committee",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: RecordId,
    pub name: String,
    pub kind: InstitutionKind,
}

/// The `charge` attribute of a person in the people index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargeType {
    Counselor,
    Deputy,
    FirstDeputy,
    Mayor,
}

impl ChargeType {
    pub fn from_xml_token(token: &str) -> Option<Self> {
        match token {
            "counselor" => Some(Self::Counselor),
            "deputy" => Some(Self::Deputy),
            "firstdeputy" => Some(Self::FirstDeputy),
            "mayor" => Some(Self::Mayor),
            _ => None,
        }
    }

    /// Institution a charge of this type belongs to.
    pub fn institution_kind(self) -> InstitutionKind {
        match self {
            Self::Counselor => InstitutionKind::Council,
            Self::Deputy | Self::FirstDeputy => InstitutionKind::CityGovernment,
            Self::Mayor => InstitutionKind::Mayor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Openpolis uses `M` for male; everything else is recorded as female.
    pub fn from_openpolis(token: &str) -> Self {
        if token == "M" {
            Self::Male
        } else {
            Self::Female
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub birth_location: String,
    pub sex: Sex,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// A person's role within an institution for a time span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionCharge {
    pub id: RecordId,
    pub person_id: RecordId,
    pub institution_id: RecordId,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl InstitutionCharge {
    pub fn is_current(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsabilityKind {
    Mayor,
    President,
    Vice,
}

/// A special role attached to a charge (council president, vice, mayor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionResponsability {
    pub id: RecordId,
    pub charge_id: RecordId,
    pub kind: ResponsabilityKind,
    pub description: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: RecordId,
    pub name: String,
    pub acronym: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCharge {
    pub id: RecordId,
    pub group_id: RecordId,
    pub charge_id: RecordId,
    pub start_date: NaiveDate,
}
