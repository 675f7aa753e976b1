//! End-to-end tests over a small fixture release:
//!
//! ```text
//! 100 Clinical finding
//!  └── 200 Disorder      (member of refset 900001)
//!       └── 300 Infection (member of refset 900001)
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use terminus_engine::{Engine, EngineError, SearchRequest};
use terminus_types::{well_known, SctId};

const CORE: SctId = well_known::CORE_MODULE;
const FSN: SctId = 900000000000003001;
const SYNONYM: SctId = 900000000000013009;
const CASE_INSENSITIVE: SctId = 900000000000448009;
const INFERRED: SctId = 900000000000011006;
const EXISTENTIAL: SctId = 900000000000451002;
const PREFERRED: SctId = 900000000000548007;
const US: SctId = well_known::US_ENGLISH_LANGUAGE_REFSET;
const R1: SctId = 900001;

fn concept_row(id: SctId) -> String {
    format!("{id}\t20240101\t1\t{CORE}\t900000000000074008\n")
}

fn description_row(
    id: SctId,
    effective_time: u32,
    active: u8,
    concept_id: SctId,
    type_id: SctId,
    term: &str,
) -> String {
    format!(
        "{id}\t{effective_time}\t{active}\t{CORE}\t{concept_id}\ten\t{type_id}\t{term}\t{CASE_INSENSITIVE}\n"
    )
}

fn relationship_row(id: SctId, source: SctId, destination: SctId) -> String {
    format!(
        "{id}\t20240101\t1\t{CORE}\t{source}\t{destination}\t0\t{is_a}\t{INFERRED}\t{EXISTENTIAL}\n",
        is_a = well_known::IS_A
    )
}

fn write_release(dir: &Path) {
    let terminology = dir.join("Snapshot").join("Terminology");
    let refsets = dir.join("Snapshot").join("Refset");
    fs::create_dir_all(&terminology).unwrap();
    fs::create_dir_all(&refsets).unwrap();

    let mut concepts =
        String::from("id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId\n");
    for id in [100, 200, 300] {
        concepts.push_str(&concept_row(id));
    }
    fs::write(
        terminology.join("sct2_Concept_Snapshot_INT_20240101.txt"),
        concepts,
    )
    .unwrap();

    let mut descriptions = String::from(
        "id\teffectiveTime\tactive\tmoduleId\tconceptId\tlanguageCode\ttypeId\tterm\tcaseSignificanceId\n",
    );
    descriptions.push_str(&description_row(110, 20240101, 1, 100, FSN, "Clinical finding (finding)"));
    descriptions.push_str(&description_row(111, 20240101, 1, 100, SYNONYM, "Clinical finding"));
    descriptions.push_str(&description_row(210, 20240101, 1, 200, FSN, "Disorder (disorder)"));
    descriptions.push_str(&description_row(211, 20240101, 1, 200, SYNONYM, "Disorder"));
    descriptions.push_str(&description_row(310, 20240101, 1, 300, FSN, "Infection (disorder)"));
    descriptions.push_str(&description_row(311, 20240101, 1, 300, SYNONYM, "Infection"));
    // Two rows for one id: the later, inactive row must win.
    descriptions.push_str(&description_row(199, 20200101, 1, 100, SYNONYM, "Clinical finding, NOS"));
    descriptions.push_str(&description_row(199, 20210101, 0, 100, SYNONYM, "Clinical finding, NOS"));
    fs::write(
        terminology.join("sct2_Description_Snapshot-en_INT_20240101.txt"),
        descriptions,
    )
    .unwrap();

    let mut relationships = String::from(
        "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId\n",
    );
    relationships.push_str(&relationship_row(1001, 200, 100));
    relationships.push_str(&relationship_row(1002, 300, 200));
    fs::write(
        terminology.join("sct2_Relationship_Snapshot_INT_20240101.txt"),
        relationships,
    )
    .unwrap();

    let mut simple = String::from(
        "id\teffectiveTime\tactive\tmoduleId\trefsetId\treferencedComponentId\n",
    );
    simple.push_str(&format!(
        "a0000000-0000-4000-8000-000000000001\t20240101\t1\t{CORE}\t{R1}\t200\n"
    ));
    simple.push_str(&format!(
        "a0000000-0000-4000-8000-000000000002\t20240101\t1\t{CORE}\t{R1}\t300\n"
    ));
    fs::write(
        refsets.join("der2_Refset_SimpleSnapshot_INT_20240101.txt"),
        simple,
    )
    .unwrap();

    let mut language = String::from(
        "id\teffectiveTime\tactive\tmoduleId\trefsetId\treferencedComponentId\tacceptabilityId\n",
    );
    for (member, description_id) in [(3u32, 111), (4, 211), (5, 311)] {
        language.push_str(&format!(
            "b0000000-0000-4000-8000-00000000000{member}\t20240101\t1\t{CORE}\t{US}\t{description_id}\t{PREFERRED}\n"
        ));
    }
    fs::write(
        refsets.join("der2_cRefset_LanguageSnapshot-en_INT_20240101.txt"),
        language,
    )
    .unwrap();
}

struct Fixture {
    _dirs: (tempfile::TempDir, tempfile::TempDir),
    release: std::path::PathBuf,
    engine: Engine,
}

fn fixture() -> Fixture {
    let release_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    write_release(release_dir.path());

    let engine = Engine::open(db_dir.path().join("db"), false).unwrap();
    engine.import(&[release_dir.path()]).unwrap();
    engine.build_indexes().unwrap();

    Fixture {
        release: release_dir.path().to_path_buf(),
        _dirs: (release_dir, db_dir),
        engine,
    }
}

fn ids(values: &[SctId]) -> HashSet<SctId> {
    values.iter().copied().collect()
}

#[test]
fn hierarchy_queries_after_import_and_index() {
    let fixture = fixture();
    let engine = &fixture.engine;

    assert_eq!(ids(&engine.descendants(100).unwrap()), ids(&[200, 300]));
    assert_eq!(ids(&engine.descendants(200).unwrap()), ids(&[300]));
    assert!(engine.descendants(300).unwrap().is_empty());

    assert!(engine.subsumes(100, 300).unwrap());
    assert!(engine.subsumes(100, 100).unwrap());
    assert!(!engine.subsumes(300, 100).unwrap());

    let status = engine.status().unwrap();
    assert_eq!(status.store.concepts, 3);
    assert_eq!(status.store.descriptions, 7);
    assert_eq!(status.store.relationships, 2);
    assert_eq!(status.store.refset_items, 5);
    assert_eq!(status.store.installed_refsets, 2);
    assert!(!status.store.needs_reindex);
    // One document per active description: the 199 row ends inactive.
    assert_eq!(status.search_documents, 6);
}

#[test]
fn effective_time_resolution_keeps_latest_row() {
    let fixture = fixture();

    let kept = fixture
        .engine
        .descriptions(100)
        .unwrap()
        .into_iter()
        .find(|d| d.id == 199)
        .unwrap();
    assert!(!kept.active);
    assert_eq!(kept.effective_time, 20210101);
}

#[test]
fn dirty_flag_tracks_import_and_index() {
    let release_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    write_release(release_dir.path());

    let engine = Engine::open(db_dir.path().join("db"), false).unwrap();
    engine.import(&[release_dir.path()]).unwrap();
    assert!(engine.status().unwrap().store.needs_reindex);

    engine.build_indexes().unwrap();
    assert!(!engine.status().unwrap().store.needs_reindex);
}

#[test]
fn ecl_expansion() {
    let fixture = fixture();
    let engine = &fixture.engine;

    assert_eq!(engine.expand_ecl("^ 900001").unwrap(), ids(&[200, 300]));
    assert!(engine.refsets_for(200).unwrap().contains(&R1));

    assert_eq!(engine.expand_ecl("< 100").unwrap(), ids(&[200, 300]));
    assert_eq!(
        engine.expand_ecl("<< 200 AND ^ 900001").unwrap(),
        ids(&[200, 300])
    );
    assert!(engine
        .expand_ecl("<< 200 MINUS ^ 900001")
        .unwrap()
        .is_empty());
    assert_eq!(
        engine.expand_ecl("< 100 : 116680003 = 200").unwrap(),
        ids(&[300])
    );
    assert_eq!(
        engine.expand_ecl(">> 300").unwrap(),
        ids(&[100, 200, 300])
    );

    // Unknown refsets expand to the empty set rather than failing.
    assert!(engine.expand_ecl("^ 424242").unwrap().is_empty());

    // Parse failures surface as query errors with a position.
    match engine.expand_ecl("<< ").unwrap_err() {
        EngineError::Query(terminus_engine::EclError::Parse { position, .. }) => {
            assert_eq!(position, 3)
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn search_respects_concept_filters_and_ranking() {
    let fixture = fixture();
    let engine = &fixture.engine;

    let mut request = SearchRequest::new("infec");
    request.concept_id_filter = Some(ids(&engine.descendants(100).unwrap()));
    let hits = engine.search(&request).unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].concept_id, 300);
    assert_eq!(hits[0].term, "Infection");
    assert!(hits.iter().all(|h| h.concept_id == 200 || h.concept_id == 300));

    let hits = engine
        .search_with_ecl("infec", "< 100", SearchRequest::new(""))
        .unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].concept_id, 300);

    // An ECL constraint excluding the concept removes its hits.
    let hits = engine
        .search_with_ecl("infec", "<< 200 MINUS ^ 900001", SearchRequest::new(""))
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn names_and_synonyms() {
    let fixture = fixture();
    let engine = &fixture.engine;

    assert_eq!(
        engine.fully_specified_name(300).unwrap().unwrap().term,
        "Infection (disorder)"
    );
    assert_eq!(
        engine.preferred_synonym(300, &[US]).unwrap().unwrap().term,
        "Infection"
    );
    // No language refset named: first active synonym.
    assert_eq!(
        engine.preferred_synonym(200, &[]).unwrap().unwrap().term,
        "Disorder"
    );
    assert!(engine.preferred_synonym(424242, &[US]).unwrap().is_none());
}

#[test]
fn extended_concept_projection() {
    let fixture = fixture();

    let extended = fixture.engine.extended_concept(300).unwrap().unwrap();
    assert_eq!(extended.concept.id, 300);
    assert_eq!(extended.ancestors(), ids(&[100, 200]));
    assert_eq!(extended.direct_parents(), ids(&[200]));
    assert!(extended.is_a(100));
    assert!(extended.refsets.contains(&R1));
    let description_ids: HashSet<SctId> =
        extended.descriptions.iter().map(|d| d.id).collect();
    assert_eq!(description_ids, ids(&[310, 311]));

    assert!(fixture.engine.extended_concept(424242).unwrap().is_none());
}

#[test]
fn reimport_is_idempotent() {
    let fixture = fixture();

    let before = fixture.engine.status().unwrap();
    let before_ecl = fixture.engine.expand_ecl("<< 100 AND ^ 900001").unwrap();

    let release = fixture.release.clone();
    fixture.engine.import(&[release]).unwrap();
    fixture.engine.build_indexes().unwrap();

    assert_eq!(fixture.engine.status().unwrap(), before);
    assert_eq!(
        fixture.engine.expand_ecl("<< 100 AND ^ 900001").unwrap(),
        before_ecl
    );
}

#[test]
fn compaction_preserves_every_read() {
    let mut fixture = fixture();

    let status = fixture.engine.status().unwrap();
    let descendants = fixture.engine.descendants(100).unwrap();
    let expansion = fixture.engine.expand_ecl("<< 200 AND ^ 900001").unwrap();
    let hits = fixture.engine.search(&SearchRequest::new("infec")).unwrap();

    fixture.engine.compact().unwrap();

    assert_eq!(fixture.engine.status().unwrap(), status);
    assert_eq!(fixture.engine.descendants(100).unwrap(), descendants);
    assert_eq!(
        fixture.engine.expand_ecl("<< 200 AND ^ 900001").unwrap(),
        expansion
    );
    assert_eq!(
        fixture.engine.search(&SearchRequest::new("infec")).unwrap(),
        hits
    );
    assert!(fixture.engine.subsumes(100, 300).unwrap());
}

#[test]
fn read_only_engine_serves_queries_but_rejects_imports() {
    let release_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    write_release(release_dir.path());
    let root = db_dir.path().join("db");

    {
        let engine = Engine::open(&root, false).unwrap();
        engine.import(&[release_dir.path()]).unwrap();
        engine.build_indexes().unwrap();
        engine.close();
    }

    let engine = Engine::open(&root, true).unwrap();
    assert!(engine.subsumes(100, 300).unwrap());
    assert_eq!(engine.expand_ecl("^ 900001").unwrap(), ids(&[200, 300]));

    let err = engine.import(&[release_dir.path()]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Store(terminus_store::StoreError::ReadOnly)
    ));
}

#[test]
fn cancelled_import_stops_between_batches() {
    let release_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    write_release(release_dir.path());

    let engine = Engine::open(db_dir.path().join("db"), false).unwrap();
    let cancel = AtomicBool::new(true);
    let err = engine
        .import_with_cancel(&[release_dir.path()], &cancel)
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    // The store remains flagged until an index build succeeds.
    assert!(engine.status().unwrap().store.needs_reindex);
}

#[test]
fn unknown_paths_are_usage_or_input_errors() {
    let db_dir = tempfile::tempdir().unwrap();
    let engine = Engine::open(db_dir.path().join("db"), false).unwrap();

    let empty: [&Path; 0] = [];
    assert!(matches!(
        engine.import(&empty).unwrap_err(),
        EngineError::Usage(_)
    ));
    assert!(matches!(
        engine.import(&["/no/such/release"]).unwrap_err(),
        EngineError::Input(_)
    ));
}

#[test]
fn list_import_files_reports_classified_files() {
    let release_dir = tempfile::tempdir().unwrap();
    write_release(release_dir.path());

    let files = Engine::list_import_files(&[release_dir.path()]).unwrap();
    assert_eq!(files.len(), 5);
    assert!(files
        .iter()
        .any(|f| f.content_subtype.as_deref() == Some("Language")));
}
