//! Act types and their handlers.
//!
//! Each importable act type maps to one [`ActHandler`]. Handlers read the
//! type-specific fields of an act node and decide the support type of its
//! subscriber sets; everything shared lives in [`read_act_key`].

use crate::report::SkipReason;
use crate::xml::XmlElement;
use crate::{ImportError, OM_NS};
use openmunicipio_model::{
    parse_date, ActKey, ActKind, AnswerType, Initiative, RecordId, SupportType,
};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ActType {
    #[default]
    CouncilDeliberation,
    Interrogation,
    Motion,
}

impl ActType {
    pub const ALL: [ActType; 3] = [Self::CouncilDeliberation, Self::Interrogation, Self::Motion];

    /// Local name of the act element in OM-XML.
    pub fn element_name(self) -> &'static str {
        match self {
            Self::CouncilDeliberation => "CouncilDeliberation",
            Self::Interrogation => "Interrogation",
            Self::Motion => "Motion",
        }
    }

    pub fn handler(self) -> &'static dyn ActHandler {
        match self {
            Self::CouncilDeliberation => &DeliberationHandler,
            Self::Interrogation => &InterrogationHandler,
            Self::Motion => &MotionHandler,
        }
    }
}

impl fmt::Display for ActType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

impl FromStr for ActType {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.element_name() == s)
            .ok_or_else(|| ImportError::UnknownActType(s.to_string()))
    }
}

pub trait ActHandler: Sync {
    fn act_type(&self) -> ActType;

    /// Per-kind payload read from the act node.
    fn kind(&self, node: &XmlElement) -> Result<ActKind, SkipReason>;

    /// Support type for the supports of one `om:ActSubscribers` node.
    fn support_type(&self, subscribers: &XmlElement) -> Result<SupportType, SkipReason>;
}

pub struct DeliberationHandler;

impl ActHandler for DeliberationHandler {
    fn act_type(&self) -> ActType {
        ActType::CouncilDeliberation
    }

    fn kind(&self, node: &XmlElement) -> Result<ActKind, SkipReason> {
        let token = required_attr(node, "CouncilDeliberation", "initiative")?;
        let initiative =
            Initiative::from_xml_token(token).ok_or_else(|| SkipReason::InvalidValue {
                attribute: "initiative",
                value: token.to_string(),
            })?;
        Ok(ActKind::Deliberation { initiative })
    }

    fn support_type(&self, subscribers: &XmlElement) -> Result<SupportType, SkipReason> {
        let token = required_attr(subscribers, "ActSubscribers", "type")?;
        Ok(SupportType::from_subscriber_type(token))
    }
}

pub struct InterrogationHandler;

impl ActHandler for InterrogationHandler {
    fn act_type(&self) -> ActType {
        ActType::Interrogation
    }

    fn kind(&self, node: &XmlElement) -> Result<ActKind, SkipReason> {
        let token = required_attr(node, "Interrogation", "answer_type")?;
        let answer_type =
            AnswerType::from_xml_token(token).ok_or_else(|| SkipReason::InvalidValue {
                attribute: "answer_type",
                value: token.to_string(),
            })?;
        Ok(ActKind::Interrogation { answer_type })
    }

    /// Interrogation subscribers are always first signers.
    fn support_type(&self, _subscribers: &XmlElement) -> Result<SupportType, SkipReason> {
        Ok(SupportType::FirstSigner)
    }
}

pub struct MotionHandler;

impl ActHandler for MotionHandler {
    fn act_type(&self) -> ActType {
        ActType::Motion
    }

    fn kind(&self, _node: &XmlElement) -> Result<ActKind, SkipReason> {
        Ok(ActKind::Motion)
    }

    fn support_type(&self, _subscribers: &XmlElement) -> Result<SupportType, SkipReason> {
        Ok(SupportType::FirstSigner)
    }
}

fn required_attr<'a>(
    node: &'a XmlElement,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str, SkipReason> {
    node.non_empty_attr(attribute)
        .ok_or(SkipReason::MissingAttribute { element, attribute })
}

/// Read the match tuple of an act node. The council is the emitting institution.
pub fn read_act_key(
    handler: &dyn ActHandler,
    node: &XmlElement,
    council: RecordId,
) -> Result<ActKey, SkipReason> {
    let element = handler.act_type().element_name();
    let idnum = required_attr(node, element, "id")?;

    let raw_date = required_attr(node, element, "presentation_date")?;
    let presentation_date = parse_date(raw_date).map_err(|_| SkipReason::InvalidDate {
        attribute: "presentation_date",
        value: raw_date.to_string(),
    })?;

    let kind = handler.kind(node)?;

    let title = node
        .child(OM_NS, "Title")
        .map(|t| t.text().trim())
        .filter(|t| !t.is_empty())
        .ok_or(SkipReason::MissingElement {
            parent: element,
            element: "Title",
        })?;

    Ok(ActKey {
        idnum: idnum.to_string(),
        presentation_date,
        emitting_institution: council,
        title: title.to_string(),
        kind,
    })
}
