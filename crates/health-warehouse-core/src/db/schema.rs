//! SQLite schema definition.

/// Complete warehouse schema.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Dimensions
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id INTEGER PRIMARY KEY,
    age INTEGER NOT NULL CHECK (age BETWEEN 0 AND 120),
    gender TEXT NOT NULL CHECK (gender IN ('Male', 'Female', 'Unknown')),
    race TEXT NOT NULL DEFAULT 'Unknown',
    zip_code TEXT CHECK (zip_code IS NULL OR length(zip_code) <= 5),
    insurance_type TEXT NOT NULL DEFAULT 'Unknown',
    chronic_conditions INTEGER NOT NULL DEFAULT 0 CHECK (chronic_conditions >= 0),
    last_visit_date TEXT,                         -- YYYY-MM-DD
    age_category TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    days_since_last_visit INTEGER,
    patient_status TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS providers (
    provider_id INTEGER PRIMARY KEY,
    hospital_name TEXT NOT NULL,
    provider_type TEXT NOT NULL
        CHECK (provider_type IN ('Hospital', 'Clinic', 'Emergency', 'Specialty')),
    state TEXT NOT NULL CHECK (length(state) = 2),
    city TEXT NOT NULL DEFAULT 'Unknown',
    beds INTEGER NOT NULL CHECK (beds > 0),
    teaching_hospital INTEGER NOT NULL DEFAULT 0 CHECK (teaching_hospital IN (0, 1)),
    hospital_size TEXT NOT NULL
        CHECK (hospital_size IN ('Small', 'Medium', 'Large', 'Very Large')),
    full_address TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_providers_state ON providers(state);

CREATE TABLE IF NOT EXISTS medications (
    medication_id INTEGER PRIMARY KEY,
    medication_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    medication_category TEXT NOT NULL DEFAULT 'Other',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS diagnosis_codes (
    diagnosis_code TEXT PRIMARY KEY,              -- canonical form, e.g. E11.9
    description TEXT NOT NULL,
    category TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Facts
-- ============================================================================

CREATE TABLE IF NOT EXISTS claims (
    claim_id INTEGER PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES patients(patient_id),
    provider_id INTEGER NOT NULL REFERENCES providers(provider_id),
    diagnosis_code TEXT REFERENCES diagnosis_codes(diagnosis_code),
    procedure_code TEXT,
    admission_date TEXT NOT NULL,
    discharge_date TEXT CHECK (discharge_date IS NULL OR discharge_date >= admission_date),
    readmission_date TEXT,
    cost REAL NOT NULL CHECK (cost > 0),
    insurance_type TEXT NOT NULL DEFAULT 'Unknown',
    readmission_flag INTEGER NOT NULL CHECK (readmission_flag IN (0, 1)),
    length_of_stay INTEGER CHECK (length_of_stay IS NULL OR length_of_stay >= 0),
    cost_per_day REAL,
    cost_category TEXT NOT NULL,
    los_category TEXT,
    admission_month INTEGER NOT NULL CHECK (admission_month BETWEEN 1 AND 12),
    admission_quarter INTEGER NOT NULL CHECK (admission_quarter BETWEEN 1 AND 4),
    admission_year INTEGER NOT NULL,
    admission_day_of_week TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (discharge_date IS NOT NULL OR (readmission_flag = 0 AND length_of_stay IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_claims_patient ON claims(patient_id);
CREATE INDEX IF NOT EXISTS idx_claims_provider ON claims(provider_id);
CREATE INDEX IF NOT EXISTS idx_claims_admission ON claims(admission_date);

CREATE TABLE IF NOT EXISTS prescriptions (
    prescription_id INTEGER PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES patients(patient_id),
    provider_id INTEGER NOT NULL REFERENCES providers(provider_id),
    medication_id INTEGER REFERENCES medications(medication_id),
    prescription_date TEXT NOT NULL,
    days_supplied INTEGER NOT NULL CHECK (days_supplied > 0),
    days_prescribed INTEGER NOT NULL CHECK (days_prescribed > 0),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    cost REAL NOT NULL CHECK (cost > 0),
    adherence_rate REAL NOT NULL CHECK (adherence_rate BETWEEN 0 AND 1),
    adherence_category TEXT NOT NULL,
    cost_per_day REAL NOT NULL,
    prescription_month INTEGER NOT NULL CHECK (prescription_month BETWEEN 1 AND 12),
    prescription_quarter INTEGER NOT NULL CHECK (prescription_quarter BETWEEN 1 AND 4),
    prescription_year INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);
CREATE INDEX IF NOT EXISTS idx_prescriptions_medication ON prescriptions(medication_id);

-- ============================================================================
-- Load bookkeeping
-- ============================================================================

CREATE TABLE IF NOT EXISTS load_batches (
    batch_id TEXT PRIMARY KEY,
    as_of TEXT NOT NULL,
    row_counts TEXT NOT NULL,                     -- JSON object {table: rows}
    total_rows INTEGER NOT NULL,
    first_loaded_at TEXT NOT NULL DEFAULT (datetime('now')),
    last_loaded_at TEXT NOT NULL DEFAULT (datetime('now')),
    load_count INTEGER NOT NULL DEFAULT 1
);

-- ============================================================================
-- Read-time projections
-- ============================================================================

CREATE VIEW IF NOT EXISTS provider_metrics AS
SELECT
    p.provider_id,
    p.hospital_name,
    p.provider_type,
    p.state,
    p.hospital_size,
    COUNT(c.claim_id) AS claim_count,
    AVG(c.cost) AS avg_cost,
    AVG(c.readmission_flag) AS readmission_rate,
    COUNT(DISTINCT c.patient_id) AS patient_volume
FROM providers p
LEFT JOIN claims c ON c.provider_id = p.provider_id
GROUP BY p.provider_id;
"#;
