//! The people file: `om:Person` elements mapping XML ids to internal persons.

use crate::xml::{self, XmlElement};
use crate::OM_NS;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPerson {
    pub id: String,
    /// Internal person id
    pub om_id: Option<String>,
    /// Charge-type tag (`counselor`, `deputy`, `firstdeputy`, `mayor`)
    pub charge: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PeopleIndex {
    persons: HashMap<String, IndexedPerson>,
}

impl PeopleIndex {
    pub fn load(path: &Path) -> Result<Self, xml::XmlError> {
        let root = xml::parse_file(path)?;
        let index = Self::from_document(&root);
        tracing::info!(file = %path.display(), persons = index.len(), "loaded people file");
        Ok(index)
    }

    /// Index every `om:Person` with an `id`, at any depth. The first of two
    /// persons sharing an id wins.
    pub fn from_document(root: &XmlElement) -> Self {
        let mut persons = HashMap::new();
        for el in root.descendants() {
            if !el.is(OM_NS, "Person") {
                continue;
            }
            let Some(id) = el.non_empty_attr("id") else {
                continue;
            };
            persons.entry(id.to_string()).or_insert_with(|| IndexedPerson {
                id: id.to_string(),
                om_id: el.non_empty_attr("om_id").map(str::to_string),
                charge: el.non_empty_attr("charge").map(str::to_string),
            });
        }
        Self { persons }
    }

    pub fn get(&self, id: &str) -> Option<&IndexedPerson> {
        self.persons.get(id)
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_nested_persons() {
        let root = xml::parse_str(
            r#"<om:People xmlns:om="http://www.openmunicipio.it">
                 <om:Council>
                   <om:Person id="P1" om_id="12" charge="counselor"/>
                   <om:Person id="P2" om_id="13"/>
                   <om:Person om_id="14" charge="mayor"/>
                 </om:Council>
                 <om:Person id="P1" om_id="99" charge="mayor"/>
               </om:People>"#,
        )
        .unwrap();
        let index = PeopleIndex::from_document(&root);

        assert_eq!(index.len(), 2);
        let p1 = index.get("P1").unwrap();
        assert_eq!(p1.om_id.as_deref(), Some("12"));
        assert_eq!(p1.charge.as_deref(), Some("counselor"));
        assert_eq!(index.get("P2").unwrap().charge, None);
        assert!(index.get("P3").is_none());
    }
}
