//! Warehouse data-quality checks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::models::EntityKind;

/// PASS/FAIL outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityCheck {
    pub name: String,
    pub status: CheckStatus,
    /// Row count for volume checks, violation count otherwise
    pub value: i64,
    pub detail: String,
}

impl QualityCheck {
    /// Passes while the table has rows.
    fn non_empty(entity: EntityKind, rows: i64) -> Self {
        Self {
            name: format!("{}_row_count", entity),
            status: if rows > 0 { CheckStatus::Pass } else { CheckStatus::Fail },
            value: rows,
            detail: format!("{} rows", rows),
        }
    }

    /// Passes while no row violates the rule.
    fn no_violations(name: &str, violations: i64, what: &str) -> Self {
        Self {
            name: name.to_string(),
            status: if violations == 0 { CheckStatus::Pass } else { CheckStatus::Fail },
            value: violations,
            detail: format!("{}: {}", what, violations),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityReport {
    pub checks: Vec<QualityCheck>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status == CheckStatus::Pass)
    }

    pub fn failures(&self) -> impl Iterator<Item = &QualityCheck> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }
}

const INCOMPLETE_CLAIMS: &str = r#"
    SELECT COUNT(*) FROM claims
    WHERE cost IS NULL OR cost <= 0 OR admission_date IS NULL
"#;

const ORPHANED_CLAIMS: &str = r#"
    SELECT COUNT(*) FROM claims c
    LEFT JOIN patients pa ON c.patient_id = pa.patient_id
    LEFT JOIN providers pr ON c.provider_id = pr.provider_id
    WHERE pa.patient_id IS NULL OR pr.provider_id IS NULL
"#;

const ORPHANED_PRESCRIPTIONS: &str = r#"
    SELECT COUNT(*) FROM prescriptions rx
    LEFT JOIN patients pa ON rx.patient_id = pa.patient_id
    LEFT JOIN providers pr ON rx.provider_id = pr.provider_id
    LEFT JOIN medications m ON rx.medication_id = m.medication_id
    WHERE pa.patient_id IS NULL
       OR pr.provider_id IS NULL
       OR (rx.medication_id IS NOT NULL AND m.medication_id IS NULL)
"#;

const INVALID_AGES: &str = "SELECT COUNT(*) FROM patients WHERE age < 0 OR age > 120";

const READMISSION_WITHOUT_DISCHARGE: &str = r#"
    SELECT COUNT(*) FROM claims
    WHERE discharge_date IS NULL AND (readmission_flag = 1 OR length_of_stay IS NOT NULL)
"#;

/// Run every check against the warehouse.
pub fn run_quality_checks(db: &Database) -> DbResult<QualityReport> {
    let mut checks = Vec::new();

    for entity in [
        EntityKind::Patients,
        EntityKind::Providers,
        EntityKind::Claims,
        EntityKind::Prescriptions,
    ] {
        checks.push(QualityCheck::non_empty(entity, db.count_rows(entity)?));
    }

    let probes = [
        ("claims_completeness", INCOMPLETE_CLAIMS, "Claims with invalid cost or admission date"),
        ("referential_integrity", ORPHANED_CLAIMS, "Orphaned claims"),
        ("prescription_integrity", ORPHANED_PRESCRIPTIONS, "Orphaned prescriptions"),
        ("age_validation", INVALID_AGES, "Invalid ages"),
        ("readmission_consistency", READMISSION_WITHOUT_DISCHARGE, "Open claims with stay features"),
    ];
    for (name, probe, what) in probes {
        checks.push(QualityCheck::no_violations(name, db.count_violations(probe)?, what));
    }

    let report = QualityReport { checks };
    for check in report.failures() {
        log::warn!("Quality check {} failed: {}", check.name, check.detail);
    }
    Ok(report)
}
