//! Shared rows for database tests.

use chrono::NaiveDate;

use super::Database;
use crate::models::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn patient(patient_id: i64) -> Patient {
    Patient {
        attributes: PatientAttributes {
            patient_id,
            age: 52,
            gender: Gender::Female,
            race: "White".into(),
            zip_code: Some("02139".into()),
            insurance_type: "Private".into(),
            chronic_conditions: 2,
            last_visit_date: Some(date(2024, 5, 1)),
        },
        features: PatientFeatures {
            age_category: "Adult".into(),
            risk_level: "Medium".into(),
            days_since_last_visit: Some(60),
            patient_status: Some("Active".into()),
        },
    }
}

pub fn provider(provider_id: i64) -> Provider {
    Provider {
        attributes: ProviderAttributes {
            provider_id,
            hospital_name: "Mercy General".into(),
            provider_type: ProviderType::Hospital,
            state: "CA".into(),
            city: "Sacramento".into(),
            beds: 250,
            teaching_hospital: true,
        },
        features: ProviderFeatures {
            hospital_size: HospitalSize::Medium,
            full_address: "Sacramento, CA".into(),
        },
    }
}

pub fn medication(medication_id: i64, name: &str) -> Medication {
    Medication {
        medication_id,
        medication_name: name.into(),
        medication_category: "Diabetes".into(),
    }
}

pub fn diagnosis_code(code: &str) -> DiagnosisCode {
    DiagnosisCode {
        diagnosis_code: code.into(),
        description: "Type 2 diabetes mellitus".into(),
        category: Some("Endocrine".into()),
    }
}

pub fn claim(claim_id: i64, patient_id: i64, provider_id: i64) -> Claim {
    Claim {
        attributes: ClaimAttributes {
            claim_id,
            patient_id,
            provider_id,
            diagnosis_code: Some("E11.9".into()),
            procedure_code: Some("99213".into()),
            admission_date: date(2024, 1, 1),
            discharge_date: Some(date(2024, 1, 5)),
            readmission_date: Some(date(2024, 1, 20)),
            cost: 12000.0,
            insurance_type: "Medicare".into(),
        },
        features: ClaimFeatures {
            readmission_flag: true,
            length_of_stay: Some(4),
            cost_per_day: Some(2400.0),
            cost_category: "High".into(),
            los_category: Some("Medium".into()),
            admission_month: 1,
            admission_quarter: 1,
            admission_year: 2024,
            admission_day_of_week: "Monday".into(),
        },
    }
}

pub fn prescription(
    prescription_id: i64,
    patient_id: i64,
    provider_id: i64,
    medication_id: Option<i64>,
) -> Prescription {
    Prescription {
        attributes: PrescriptionAttributes {
            prescription_id,
            patient_id,
            provider_id,
            medication_id,
            prescription_date: date(2024, 5, 10),
            days_supplied: 20,
            days_prescribed: 30,
            quantity: 20,
            cost: 90.0,
        },
        features: PrescriptionFeatures {
            adherence_rate: 20.0 / 30.0,
            adherence_category: "Needs Improvement".into(),
            cost_per_day: 4.5,
            prescription_month: 5,
            prescription_quarter: 2,
            prescription_year: 2024,
        },
    }
}

/// Patient 1, provider 10, medication 100 and code E11.9.
pub fn seed_dimensions(db: &Database) {
    db.upsert_patient(&patient(1)).unwrap();
    db.upsert_provider(&provider(10)).unwrap();
    db.upsert_medication(&medication(100, "Metformin")).unwrap();
    db.upsert_diagnosis_code(&diagnosis_code("E11.9")).unwrap();
}
