//! End-to-end pipeline tests over a temporary workspace.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use health_warehouse_core::commit::CommitError;
use health_warehouse_core::config::{PathsConfig, PipelineConfig};
use health_warehouse_core::db::Database;
use health_warehouse_core::models::EntityKind;
use health_warehouse_core::pipeline::{Pipeline, PipelineError};
use health_warehouse_core::report::run_quality_checks;
use health_warehouse_core::stage::{RunStatus, Stage, StageWriter};
use health_warehouse_core::validate::Rule;
use tempfile::TempDir;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn pipeline_in(root: &Path) -> Pipeline {
    let config = PipelineConfig {
        paths: PathsConfig {
            bronze_path: root.join("bronze"),
            silver_path: root.join("silver"),
            gold_path: root.join("gold"),
            database_path: root.join("warehouse.db"),
        },
        ..Default::default()
    };
    Pipeline::new(config).unwrap()
}

/// Write a source directory: 50 patients, 5 providers, 3 medications,
/// 2 diagnosis codes, 1000 claims (one with a negative cost) and 20
/// prescriptions.
fn write_source(dir: &Path) {
    fs::create_dir_all(dir).unwrap();

    let mut patients = String::from(
        "patient_id,age,gender,race,zip_code,insurance_type,chronic_conditions,last_visit_date\n",
    );
    for id in 1..=50 {
        let gender = ["M", "F", "Male", "female", ""][id % 5];
        writeln!(
            patients,
            "{},{},{},White,{:05},Medicare,{},2024-0{}-15",
            id,
            20 + id,
            gender,
            id * 7,
            id % 4,
            1 + id % 6
        )
        .unwrap();
    }
    fs::write(dir.join("patients.csv"), patients).unwrap();

    let mut providers = String::from("provider_id,hospital_name,provider_type,state,city,beds\n");
    for id in 1..=5 {
        writeln!(providers, "{},mercy general {},Hospital,ca,los angeles,{}", 100 + id, id, id * 150).unwrap();
    }
    fs::write(dir.join("providers.csv"), providers).unwrap();

    fs::write(
        dir.join("medications.csv"),
        "medication_id,medication_name,medication_category\n\
         1,metformin,Diabetes\n2,Lisinopril,Cardiac\n3,atorvastatin,\n",
    )
    .unwrap();

    fs::write(
        dir.join("diagnosis_codes.csv"),
        "diagnosis_code,description,category\nE11.9,Type 2 diabetes,Endocrine\nI10,Hypertension,Circulatory\n",
    )
    .unwrap();

    let mut claims = String::from(
        "claim_id,patient_id,provider_id,diagnosis_code,admission_date,discharge_date,readmission_date,cost\n",
    );
    for id in 1..=1000 {
        let cost = if id == 500 { -5.0 } else { 500.0 + (id % 40) as f64 * 250.0 };
        let code = if id % 2 == 0 { "E119" } else { "I10" };
        let readmission = if id % 10 == 0 { "2024-02-20" } else { "" };
        writeln!(
            claims,
            "{},{},{},{},2024-01-{:02},2024-02-{:02},{},{}",
            id,
            1 + id % 50,
            101 + id % 5,
            code,
            1 + id % 28,
            1 + id % 10,
            readmission,
            cost
        )
        .unwrap();
    }
    fs::write(dir.join("claims.csv"), claims).unwrap();

    let mut prescriptions = String::from(
        "prescription_id,patient_id,provider_id,medication_name,prescription_date,days_supplied,days_prescribed,quantity,cost\n",
    );
    for id in 1..=20 {
        let name = ["Metformin", "LISINOPRIL", "atorvastatin"][id % 3];
        writeln!(
            prescriptions,
            "{},{},{},{},2024-03-01,{},30,30,{}",
            id,
            id,
            101 + id % 5,
            name,
            10 + id,
            15.5 + id as f64
        )
        .unwrap();
    }
    fs::write(dir.join("prescriptions.csv"), prescriptions).unwrap();
}

/// Every staged file under the stage roots, path to bytes.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, out);
            } else {
                out.insert(path.clone(), fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    for stage in ["bronze", "silver", "gold"] {
        walk(&root.join(stage), &mut out);
    }
    out
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        write_source(&ws.source());
        ws
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn source(&self) -> PathBuf {
        self.dir.path().join("source")
    }
}

#[test]
fn test_run_accepts_valid_rows_and_logs_rejection() {
    let ws = Workspace::new();
    let pipeline = pipeline_in(ws.root());
    let db = pipeline.open_database().unwrap();

    let summary = pipeline.run(&ws.source(), as_of(), &db).unwrap();
    let manifest = &summary.manifest;

    assert_eq!(manifest.status, RunStatus::CompletedWithRejections);
    let claims = &manifest.entities["claims"];
    assert_eq!(claims.read, 1000);
    assert_eq!(claims.accepted, 999);
    assert_eq!(claims.rejected, 1);
    assert_eq!(claims.rejections_by_rule["out_of_range"], 1);
    assert_eq!(manifest.entities["prescriptions"].accepted, 20);
    assert_eq!(manifest.total_rejected(), 1);

    let silver = StageWriter::new(ws.root().join("silver"), Stage::Silver);
    let rejections = silver.read_rejections(&manifest.batch_id).unwrap();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].entity, EntityKind::Claims);
    assert_eq!(rejections[0].row, 500);
    assert_eq!(rejections[0].rule, Rule::OutOfRange);
    assert_eq!(rejections[0].raw["cost"], "-5");

    assert_eq!(db.count_rows(EntityKind::Claims).unwrap(), 999);
    assert_eq!(db.count_rows(EntityKind::Patients).unwrap(), 50);
    assert_eq!(summary.commit.load_count, 1);

    let claim = db.get_claim(10).unwrap().unwrap();
    assert_eq!(claim.attributes.diagnosis_code.as_deref(), Some("E11.9"));
    assert_eq!(claim.features.length_of_stay, Some(31 - 11 + 1));
    assert!(claim.features.readmission_flag);

    let provider = db.get_provider(101).unwrap().unwrap();
    assert_eq!(provider.attributes.hospital_name, "Mercy General 1");
    assert_eq!(provider.features.full_address, "Los Angeles, CA");

    let report = run_quality_checks(&db).unwrap();
    assert!(report.passed(), "{:?}", report.failures().collect::<Vec<_>>());

    let metrics = db.provider_metrics().unwrap();
    assert_eq!(metrics.len(), 5);
    assert_eq!(metrics.iter().map(|m| m.claim_count).sum::<i64>(), 999);
}

#[test]
fn test_undecodable_cell_rejects_only_its_row() {
    let ws = Workspace::new();
    let mut patients = fs::read(ws.source().join("patients.csv")).unwrap();
    patients.extend_from_slice(b"51,40,");
    patients.extend_from_slice(&[0xFF, 0xFE]);
    patients.extend_from_slice(b",White,11111,Medicare,0,2024-06-01\n52,41,F,White,11111,Medicare,0,2024-06-01\n");
    fs::write(ws.source().join("patients.csv"), patients).unwrap();

    let pipeline = pipeline_in(ws.root());
    let db = pipeline.open_database().unwrap();
    let summary = pipeline.run(&ws.source(), as_of(), &db).unwrap();

    let patients = &summary.manifest.entities["patients"];
    assert_eq!(patients.read, 52);
    assert_eq!(patients.accepted, 51);
    assert_eq!(patients.rejections_by_rule["invalid_type"], 1);
    assert!(db.get_patient(51).unwrap().is_none());
    assert!(db.get_patient(52).unwrap().is_some());
}

#[test]
fn test_medication_name_clash_with_warehouse_rejects_only_that_row() {
    let ws = Workspace::new();
    let pipeline = pipeline_in(ws.root());
    let db = pipeline.open_database().unwrap();
    pipeline.run(&ws.source(), as_of(), &db).unwrap();

    let next = ws.root().join("next");
    fs::create_dir_all(&next).unwrap();
    fs::write(
        next.join("medications.csv"),
        "medication_id,medication_name\n9,METFORMIN\n10,Warfarin\n",
    )
    .unwrap();
    fs::write(
        next.join("patients.csv"),
        "patient_id,age,gender\n77,45,F\n",
    )
    .unwrap();

    let summary = pipeline.run(&next, as_of(), &db).unwrap();
    let medications = &summary.manifest.entities["medications"];
    assert_eq!(medications.accepted, 1);
    assert_eq!(medications.rejections_by_rule["duplicate_key"], 1);
    assert!(db.get_patient(77).unwrap().is_some());
    assert!(db.get_medication(9).unwrap().is_none());
    assert!(db.get_medication(10).unwrap().is_some());
}

#[test]
fn test_rerun_is_byte_identical() {
    let ws = Workspace::new();
    let pipeline = pipeline_in(ws.root());
    let db = pipeline.open_database().unwrap();

    let first = pipeline.run(&ws.source(), as_of(), &db).unwrap();
    let files = snapshot(ws.root());
    let counts = db.table_counts().unwrap();

    let second = pipeline.run(&ws.source(), as_of(), &db).unwrap();

    assert_eq!(second.manifest, first.manifest);
    assert_eq!(snapshot(ws.root()), files);
    assert_eq!(db.table_counts().unwrap(), counts);
    assert_eq!(second.commit.load_count, 2);
    assert_eq!(db.load_batch_count().unwrap(), 1);
}

#[test]
fn test_changed_input_gets_new_batch() {
    let ws = Workspace::new();
    let pipeline = pipeline_in(ws.root());
    let db = pipeline.open_database().unwrap();

    let first = pipeline.extract(&ws.source(), as_of()).unwrap();
    let same = pipeline.extract(&ws.source(), as_of()).unwrap();
    assert_eq!(same.batch_id, first.batch_id);

    let mut patients = fs::read_to_string(ws.source().join("patients.csv")).unwrap();
    patients.push_str("51,33,F,Asian,99999,Medicaid,0,2024-06-01\n");
    fs::write(ws.source().join("patients.csv"), patients).unwrap();

    let changed = pipeline.extract(&ws.source(), as_of()).unwrap();
    assert_ne!(changed.batch_id, first.batch_id);

    pipeline.transform(&changed.batch_id, &db).unwrap();
    let report = pipeline.load(&changed.batch_id, &db).unwrap();
    assert_eq!(report.row_counts["patients"], 51);
}

#[test]
fn test_later_batch_references_loaded_dimensions() {
    let ws = Workspace::new();
    let pipeline = pipeline_in(ws.root());
    let db = pipeline.open_database().unwrap();
    pipeline.run(&ws.source(), as_of(), &db).unwrap();

    let facts_only = ws.root().join("facts_only");
    fs::create_dir_all(&facts_only).unwrap();
    fs::write(
        facts_only.join("claims.csv"),
        "claim_id,patient_id,provider_id,admission_date,discharge_date,cost\n\
         5001,1,101,2024-05-01,2024-05-03,300\n\
         5002,999,101,2024-05-01,2024-05-03,300\n",
    )
    .unwrap();

    let summary = pipeline.run(&facts_only, as_of(), &db).unwrap();
    assert_eq!(summary.manifest.entities["claims"].accepted, 1);
    assert_eq!(summary.manifest.entities["claims"].rejections_by_rule["unknown_reference"], 1);
    assert_eq!(db.count_rows(EntityKind::Claims).unwrap(), 1000);
}

#[test]
fn test_failed_load_leaves_warehouse_untouched() {
    let ws = Workspace::new();
    let pipeline = pipeline_in(ws.root());

    // Stage the dimensions into one warehouse, then a facts-only batch
    // against it.
    let staging_db = Database::open_in_memory().unwrap();
    pipeline.run(&ws.source(), as_of(), &staging_db).unwrap();

    let facts_only = ws.root().join("facts_only");
    fs::create_dir_all(&facts_only).unwrap();
    fs::write(
        facts_only.join("claims.csv"),
        "claim_id,patient_id,provider_id,admission_date,cost\n7001,1,101,2024-05-01,300\n",
    )
    .unwrap();
    let info = pipeline.extract(&facts_only, as_of()).unwrap();
    pipeline.transform(&info.batch_id, &staging_db).unwrap();

    // Loading that batch into an empty warehouse must fail as a whole.
    let empty = Database::open_in_memory().unwrap();
    let err = pipeline.load(&info.batch_id, &empty).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Commit(CommitError::MissingReference { column: "patient_id", .. })
    ));
    assert!(empty.table_counts().unwrap().values().all(|rows| *rows == 0));
    assert_eq!(empty.load_batch_count().unwrap(), 0);
}

#[test]
fn test_as_of_change_restages_same_batch() {
    let ws = Workspace::new();
    let pipeline = pipeline_in(ws.root());
    let db = pipeline.open_database().unwrap();

    let first = pipeline.run(&ws.source(), as_of(), &db).unwrap();
    let later = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let second = pipeline.run(&ws.source(), later, &db).unwrap();

    assert_eq!(second.manifest.batch_id, first.manifest.batch_id);
    assert_eq!(second.manifest.as_of, later);
    assert_eq!(second.manifest.processed_at, "2024-12-31T00:00:00Z");

    let patient = db.get_patient(1).unwrap().unwrap();
    assert_eq!(patient.features.patient_status.as_deref(), Some("Inactive"));
}
