//! End-to-end act imports against a temporary store.

use chrono::NaiveDate;
use openmunicipio_extract::{ExtractError, TextExtractor};
use openmunicipio_ingest_acts::{
    import_acts, ActIndex, ActType, ImportError, ImportRequest, NullIndex, RecordKind, SkipReason,
};
use openmunicipio_model::{Act, ActKind, ActKindTag, Initiative, RecordId, Sex, SupportType};
use openmunicipio_storage::{
    setup_municipality, MunicipalStore, Municipality, NewPerson, StorageConfig,
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    dir: TempDir,
    store: MunicipalStore,
    municipality: Municipality,
    people_file: PathBuf,
    /// Council charge of P1
    counselor_charge: RecordId,
    /// Mayor charge of P2
    mayor_charge: RecordId,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_person(first: &str, last: &str) -> NewPerson {
    NewPerson {
        first_name: first.to_string(),
        last_name: last.to_string(),
        birth_date: date(1965, 3, 12),
        birth_location: "Udine".to_string(),
        sex: Sex::Female,
    }
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let store = MunicipalStore::open(StorageConfig {
        data_dir: dir.path().join("data"),
        media_root: dir.path().join("media"),
    })
    .unwrap();
    let municipality = setup_municipality(&store, "Udine");

    let (mario, _) = store.get_or_create_person(new_person("Mario", "Bianchi"));
    let (counselor, _) = store.get_or_create_charge(mario.id, municipality.council, "", date(2008, 4, 20));
    let (anna, _) = store.get_or_create_person(new_person("Anna", "Verdi"));
    let (mayor, _) = store.get_or_create_charge(anna.id, municipality.mayor, "Sindaco", date(2008, 4, 20));

    let people_file = dir.path().join("acts").join("people.xml");
    fs::create_dir_all(people_file.parent().unwrap()).unwrap();
    fs::write(
        &people_file,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<om:People xmlns:om="http://www.openmunicipio.it">
  <om:Person id="P1" om_id="{mario}" charge="counselor"/>
  <om:Person id="P2" om_id="{anna}" charge="mayor"/>
  <om:Person id="P3" om_id="{anna}" charge="unknown"/>
  <om:Person id="P4" charge="counselor"/>
</om:People>"#,
            mario = mario.id,
            anna = anna.id
        ),
    )
    .unwrap();

    Fixture {
        dir,
        store,
        municipality,
        people_file,
        counselor_charge: counselor.id,
        mayor_charge: mayor.id,
    }
}

impl Fixture {
    fn acts_dir(&self) -> PathBuf {
        self.dir.path().join("acts")
    }

    fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.acts_dir().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn request(&self, act_type: ActType, files: Vec<PathBuf>) -> ImportRequest {
        ImportRequest {
            files,
            people_file: self.people_file.clone(),
            act_type,
            overwrite: false,
        }
    }

    fn only_act(&self, tag: ActKindTag) -> Act {
        let acts = self.store.acts_by_kind(tag);
        assert_eq!(acts.len(), 1, "expected exactly one {tag}");
        acts.into_iter().next().unwrap()
    }
}

const DELIBERATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<om:CouncilDeliberation xmlns:om="http://www.openmunicipio.it"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    id="D1" presentation_date="2012-06-22" initiative="counselor" final_id="12/2012">
  <om:Title>Bilancio di previsione 2012</om:Title>
  <om:ActSubscribers type="first_subscriber">
    <om:ActSupport date="2012-06-20">
      <om:ChargeXRef xlink:href="people.xml#P1"/>
    </om:ActSupport>
  </om:ActSubscribers>
  <om:ActSubscribers type="co_subscriber">
    <om:ActSupport>
      <om:ChargeXRef xlink:href="people.xml#P2"/>
    </om:ActSupport>
    <om:ActSupport>
      <om:ChargeXRef xlink:href="people.xml#P3"/>
    </om:ActSupport>
  </om:ActSubscribers>
  <om:Attachment title="Testo della proposta" xlink:href="DC_1/TestoProposta.txt"/>
</om:CouncilDeliberation>"#;

/// Returns the file contents as text.
struct EchoExtractor;

impl TextExtractor for EchoExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        Ok(fs::read_to_string(path)?.trim().to_string())
    }
}

struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    fn extract(&self, _path: &Path) -> Result<String, ExtractError> {
        Err(ExtractError::Status { status: 500 })
    }
}

#[derive(Default)]
struct RecordingIndex(RefCell<Vec<String>>);

impl ActIndex for RecordingIndex {
    fn reindex(&self, act: &Act) {
        self.0.borrow_mut().push(act.idnum.clone());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_deliberation_import_is_idempotent() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    fx.write("DC_1/TestoProposta.txt", "Il Consiglio approva il bilancio");
    let request = fx.request(ActType::CouncilDeliberation, vec![file]);

    let first = import_acts(&fx.store, &request, None, &NullIndex).unwrap();
    assert_eq!(first.acts_created, 1);
    assert_eq!(first.supports_created, 2);
    assert_eq!(first.attachments_created, 1);
    let stats = fx.store.stats();

    let second = import_acts(&fx.store, &request, None, &NullIndex).unwrap();
    assert_eq!(second.acts_created, 0);
    assert_eq!(second.acts_found, 1);
    assert_eq!(second.supports_updated, 2);
    assert_eq!(second.attachments_updated, 1);
    assert_eq!(fx.store.stats(), stats);

    let act = fx.only_act(ActKindTag::Deliberation);
    assert_eq!(act.idnum, "D1");
    assert_eq!(act.title, "Bilancio di previsione 2012");
    assert_eq!(act.emitting_institution, fx.municipality.council);
    assert_eq!(
        act.kind,
        ActKind::Deliberation {
            initiative: Initiative::Counselor
        }
    );
}

#[test]
fn test_supports_follow_subscriber_type_and_charge_tag() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    fx.write("DC_1/TestoProposta.txt", "testo");

    let report = import_acts(
        &fx.store,
        &fx.request(ActType::CouncilDeliberation, vec![file]),
        None,
        &NullIndex,
    )
    .unwrap();

    let act = fx.only_act(ActKindTag::Deliberation);
    let mut supports = fx.store.supports_for_act(act.id);
    supports.sort_by_key(|s| s.charge_id);
    assert_eq!(supports.len(), 2);

    let first = supports.iter().find(|s| s.charge_id == fx.counselor_charge).unwrap();
    assert_eq!(first.support_type, SupportType::FirstSigner);
    assert_eq!(first.support_date, date(2012, 6, 20));

    // mayor tag resolves to the mayor's charge; missing date falls back to presentation
    let co = supports.iter().find(|s| s.charge_id == fx.mayor_charge).unwrap();
    assert_eq!(co.support_type, SupportType::CoSigner);
    assert_eq!(co.support_date, date(2012, 6, 22));

    assert_eq!(report.skipped(RecordKind::Support), 1);
    assert!(matches!(
        &report.skips[0].reason,
        SkipReason::UnknownChargeType { charge_type, .. } if charge_type == "unknown"
    ));
    assert_eq!(report.skips[0].act.as_deref(), Some("D1"));
}

#[test]
fn test_act_without_presentation_date_is_skipped() {
    let fx = fixture();
    let file = fx.write(
        "motions.xml",
        r#"<om:Acts xmlns:om="http://www.openmunicipio.it">
  <om:Motion id="M1"><om:Title>Senza data</om:Title></om:Motion>
  <om:Motion id="M2" presentation_date="2012-07-01"><om:Title>Piste ciclabili</om:Title></om:Motion>
</om:Acts>"#,
    );

    let report = import_acts(
        &fx.store,
        &fx.request(ActType::Motion, vec![file]),
        None,
        &NullIndex,
    )
    .unwrap();

    assert_eq!(report.acts_created, 1);
    assert_eq!(report.skipped(RecordKind::Act), 1);
    assert_eq!(report.skips[0].act.as_deref(), Some("M1"));
    assert!(fx.store.find_acts_by_idnum("M1").is_empty());
    assert_eq!(fx.only_act(ActKindTag::Motion).idnum, "M2");
}

#[test]
fn test_interrogation_subscribers_are_first_signers() {
    let fx = fixture();
    let file = fx.write(
        "I1.xml",
        r#"<om:Interrogation xmlns:om="http://www.openmunicipio.it"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    id="I1" presentation_date="2012-05-02" answer_type="Written">
  <om:Title>Manutenzione scuole</om:Title>
  <om:ActSubscribers type="co_subscriber">
    <om:ActSupport date="2012-05-02"><om:ChargeXRef xlink:href="people.xml#P1"/></om:ActSupport>
    <om:ActSupport><om:ChargeXRef xlink:href="people.xml#P4"/></om:ActSupport>
    <om:ActSupport><om:ChargeXRef xlink:href="people.xml"/></om:ActSupport>
  </om:ActSubscribers>
</om:Interrogation>"#,
    );

    let report = import_acts(
        &fx.store,
        &fx.request(ActType::Interrogation, vec![file]),
        None,
        &NullIndex,
    )
    .unwrap();

    let act = fx.only_act(ActKindTag::Interrogation);
    let supports = fx.store.supports_for_act(act.id);
    assert_eq!(supports.len(), 1);
    assert_eq!(supports[0].support_type, SupportType::FirstSigner);
    assert_eq!(supports[0].charge_id, fx.counselor_charge);

    let reasons: Vec<_> = report.skips.iter().map(|s| &s.reason).collect();
    assert!(matches!(
        reasons[0],
        SkipReason::MissingPersonAttribute { attribute: "om_id", .. }
    ));
    assert!(matches!(reasons[1], SkipReason::MalformedXRef { .. }));
}

#[test]
fn test_reimport_replaces_attachment_file() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    fx.write("DC_1/TestoProposta.txt", "prima versione");
    let request = fx.request(ActType::CouncilDeliberation, vec![file]);

    import_acts(&fx.store, &request, None, &NullIndex).unwrap();
    let act = fx.only_act(ActKindTag::Deliberation);
    let before = fx.store.attachments_for_act(act.id);
    assert_eq!(before.len(), 1);
    let stored = before[0].file.clone().unwrap();
    assert!(stored.ends_with("DC_1_TestoProposta.txt"));
    assert_eq!(before[0].document_type, "txt");
    assert_eq!(before[0].document_date, Some(date(2012, 6, 22)));

    fx.write("DC_1/TestoProposta.txt", "seconda versione, piu lunga");
    import_acts(&fx.store, &request, None, &NullIndex).unwrap();

    let after = fx.store.attachments_for_act(act.id);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[0].document_size, "seconda versione, piu lunga".len() as u64);

    let new_path = fx.store.media().path(after[0].file.as_deref().unwrap());
    assert_eq!(fs::read_to_string(&new_path).unwrap(), "seconda versione, piu lunga");
    let stored_files = fs::read_dir(new_path.parent().unwrap()).unwrap().count();
    assert_eq!(stored_files, 1);
}

#[test]
fn test_missing_attachment_file_is_skipped() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);

    let report = import_acts(
        &fx.store,
        &fx.request(ActType::CouncilDeliberation, vec![file]),
        None,
        &NullIndex,
    )
    .unwrap();

    assert_eq!(report.skipped(RecordKind::Attachment), 1);
    assert!(matches!(
        report.skips.last().map(|s| &s.reason),
        Some(SkipReason::MissingFile { .. })
    ));
    assert_eq!(fx.store.stats().attachments, 0);
}

#[test]
fn test_proposal_text_is_extracted_to_act() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    fx.write("DC_1/TestoProposta.txt", "  Il Consiglio approva il bilancio \n");
    let index = RecordingIndex::default();

    let report = import_acts(
        &fx.store,
        &fx.request(ActType::CouncilDeliberation, vec![file]),
        Some(&EchoExtractor),
        &index,
    )
    .unwrap();

    assert_eq!(report.texts_extracted, 1);
    let act = fx.only_act(ActKindTag::Deliberation);
    assert_eq!(act.text, "Il Consiglio approva il bilancio");
    assert_eq!(
        fx.store.attachments_for_act(act.id)[0].text,
        "Il Consiglio approva il bilancio"
    );
    assert_eq!(*index.0.borrow(), vec!["D1".to_string()]);
}

#[test]
fn test_extraction_failure_keeps_attachment() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    fx.write("DC_1/TestoProposta.txt", "testo");

    let report = import_acts(
        &fx.store,
        &fx.request(ActType::CouncilDeliberation, vec![file]),
        Some(&FailingExtractor),
        &NullIndex,
    )
    .unwrap();

    assert_eq!(report.extraction_failures, 1);
    assert_eq!(report.attachments_created, 1);
    let act = fx.only_act(ActKindTag::Deliberation);
    assert!(act.text.is_empty());
    assert!(fx.store.attachments_for_act(act.id)[0].text.is_empty());
}

#[test]
fn test_overwrite_drops_stale_supports() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    fx.write("DC_1/TestoProposta.txt", "testo");
    let mut request = fx.request(ActType::CouncilDeliberation, vec![file.clone()]);
    import_acts(&fx.store, &request, None, &NullIndex).unwrap();
    let act = fx.only_act(ActKindTag::Deliberation);
    assert_eq!(fx.store.supports_for_act(act.id).len(), 2);

    // P2 no longer co-signs
    fs::write(&file, DELIBERATION.replace("people.xml#P2", "people.xml#P9")).unwrap();
    request.overwrite = true;
    import_acts(&fx.store, &request, None, &NullIndex).unwrap();

    let supports = fx.store.supports_for_act(act.id);
    assert_eq!(supports.len(), 1);
    assert_eq!(supports[0].charge_id, fx.counselor_charge);
    assert_eq!(fx.store.attachments_for_act(act.id).len(), 1);
}

#[test]
fn test_missing_people_file_is_fatal_before_import() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    let mut request = fx.request(ActType::CouncilDeliberation, vec![file]);
    request.people_file = fx.acts_dir().join("nobody.xml");

    let err = import_acts(&fx.store, &request, None, &NullIndex).unwrap_err();
    assert!(matches!(err, ImportError::MissingPeopleFile(_)));
    assert_eq!(fx.store.stats().acts, 0);
}

#[test]
fn test_input_validation_is_fatal() {
    let fx = fixture();
    let request = fx.request(ActType::Motion, vec![]);
    assert!(matches!(
        import_acts(&fx.store, &request, None, &NullIndex),
        Err(ImportError::NoInputs)
    ));

    let request = fx.request(ActType::Motion, vec![fx.acts_dir().join("missing.xml")]);
    assert!(matches!(
        import_acts(&fx.store, &request, None, &NullIndex),
        Err(ImportError::MissingInputFile(_))
    ));
}

#[test]
fn test_malformed_act_file_is_an_error() {
    let fx = fixture();
    let file = fx.write("broken.xml", "<om:Motion xmlns:om=\"http://www.openmunicipio.it\">");
    let err = import_acts(
        &fx.store,
        &fx.request(ActType::Motion, vec![file]),
        None,
        &NullIndex,
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::Xml { .. }));
}

#[test]
fn test_fatal_error_keeps_earlier_files_on_disk() {
    let fx = fixture();
    let good = fx.write(
        "M1.xml",
        r#"<om:Motion xmlns:om="http://www.openmunicipio.it" id="M1" presentation_date="2012-07-01">
  <om:Title>Piste ciclabili</om:Title>
</om:Motion>"#,
    );
    let broken = fx.write("M2.xml", "<om:Motion xmlns:om=\"http://www.openmunicipio.it\">");

    let err = import_acts(
        &fx.store,
        &fx.request(ActType::Motion, vec![good, broken]),
        None,
        &NullIndex,
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::Xml { .. }));

    let reopened = MunicipalStore::open(fx.store.config().clone()).unwrap();
    assert_eq!(reopened.stats().motions, 1);
    assert_eq!(reopened.find_acts_by_idnum("M1").len(), 1);
}

#[test]
fn test_ambiguous_charge_skips_only_that_support() {
    let fx = fixture();
    let (luca, _) = fx.store.get_or_create_person(new_person("Luca", "Neri"));
    fx.store.get_or_create_charge(luca.id, fx.municipality.council, "", date(2008, 4, 20));
    fx.store
        .get_or_create_charge(luca.id, fx.municipality.council, "Capogruppo", date(2010, 1, 1));
    let people = fs::read_to_string(&fx.people_file).unwrap().replace(
        "</om:People>",
        &format!(
            "  <om:Person id=\"P5\" om_id=\"{}\" charge=\"counselor\"/>\n</om:People>",
            luca.id
        ),
    );
    fs::write(&fx.people_file, people).unwrap();

    let file = fx.write(
        "M1.xml",
        r#"<om:Motion xmlns:om="http://www.openmunicipio.it"
    xmlns:xlink="http://www.w3.org/1999/xlink" id="M1" presentation_date="2012-07-01">
  <om:Title>Piste ciclabili</om:Title>
  <om:ActSubscribers>
    <om:ActSupport><om:ChargeXRef xlink:href="people.xml#P5"/></om:ActSupport>
    <om:ActSupport><om:ChargeXRef xlink:href="people.xml#P1"/></om:ActSupport>
  </om:ActSubscribers>
</om:Motion>"#,
    );

    let report = import_acts(
        &fx.store,
        &fx.request(ActType::Motion, vec![file]),
        None,
        &NullIndex,
    )
    .unwrap();

    assert_eq!(report.skips.len(), 1);
    assert_eq!(report.skipped(RecordKind::Support), 1);
    assert!(matches!(
        &report.skips[0].reason,
        SkipReason::AmbiguousCharge { person_ref, count: 2 } if person_ref == "P5"
    ));
    assert_eq!(report.supports_created, 1);

    let act = fx.only_act(ActKindTag::Motion);
    let supports = fx.store.supports_for_act(act.id);
    assert_eq!(supports.len(), 1);
    assert_eq!(supports[0].charge_id, fx.counselor_charge);
}

#[test]
fn test_import_persists_snapshot() {
    let fx = fixture();
    let file = fx.write("D1.xml", DELIBERATION);
    fx.write("DC_1/TestoProposta.txt", "testo");
    import_acts(
        &fx.store,
        &fx.request(ActType::CouncilDeliberation, vec![file]),
        None,
        &NullIndex,
    )
    .unwrap();

    let reopened = MunicipalStore::open(fx.store.config().clone()).unwrap();
    assert_eq!(reopened.stats(), fx.store.stats());
}
