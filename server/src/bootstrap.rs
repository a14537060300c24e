//! First-start import of reference data and demo records from CSV seed files.
//!
//! Importers run in a fixed order and each one only touches an empty table.
//! A missing or unreadable file is logged and skipped; so is any row that
//! does not parse or fails to insert.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use sqlx::SqlitePool;

use crate::db::{
    AddressRepository, PatientRepository, ProcedureRepository, QuestionnaireRepository,
    UserRepository,
};
use crate::error::DbError;
use crate::models::{Address, Patient, Procedure, Questionnaire, User, ROLE_CONSULTANT};
use crate::security::{
    generate_password, generate_reset_key, hash_password_with_iterations, PBKDF2_ITERATIONS,
};

pub const PROCEDURES_FILE: &str = "procedures.csv";
pub const QUESTIONNAIRES_FILE: &str = "questionnaires.csv";
pub const PATIENTS_FILE: &str = "patients.csv";
pub const CONSULTANTS_FILE: &str = "consultants.csv";

const CONSULTANT_EMAIL_DOMAIN: &str = "promsapp.com";
const BIRTH_DATE_FORMAT: &str = "%d/%m/%Y";

/// Rows imported per seed file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub procedures: usize,
    pub questionnaires: usize,
    pub patients: usize,
    pub consultants: usize,
}

pub struct Bootstrap {
    pool: SqlitePool,
    seed_dir: PathBuf,
    hash_iterations: u32,
}

impl Bootstrap {
    pub fn new(pool: SqlitePool, seed_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            seed_dir: seed_dir.into(),
            hash_iterations: PBKDF2_ITERATIONS,
        }
    }

    /// PBKDF2 rounds used for generated consultant passwords
    pub fn with_hash_iterations(mut self, iterations: u32) -> Self {
        self.hash_iterations = iterations;
        self
    }

    /// Run every importer in order. Never fails; problems are logged.
    pub async fn run(&self) -> BootstrapSummary {
        BootstrapSummary {
            procedures: logged(PROCEDURES_FILE, self.import_procedures()).await,
            questionnaires: logged(QUESTIONNAIRES_FILE, self.import_questionnaires()).await,
            patients: logged(PATIENTS_FILE, self.import_patients()).await,
            consultants: logged(CONSULTANTS_FILE, self.import_consultants()).await,
        }
    }

    pub async fn import_procedures(&self) -> Result<usize, DbError> {
        let mut conn = self.pool.acquire().await?;
        let existing = ProcedureRepository::new(&mut conn).count().await?;
        tracing::info!("No of existing procedures {}", existing);
        if existing > 0 {
            return Ok(0);
        }

        let mut imported = 0;
        for (line, record) in self.read_rows(PROCEDURES_FILE, true) {
            let result = match parse_procedure(&record) {
                Ok(procedure) => ProcedureRepository::new(&mut conn)
                    .insert(&procedure)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => imported += 1,
                Err(e) => skip_row(PROCEDURES_FILE, line, &e),
            }
        }
        tracing::info!("Imported {} procedures", imported);
        Ok(imported)
    }

    pub async fn import_questionnaires(&self) -> Result<usize, DbError> {
        let mut conn = self.pool.acquire().await?;
        let existing = QuestionnaireRepository::new(&mut conn).count().await?;
        tracing::info!("No of existing questionnaires {}", existing);
        if existing > 0 {
            return Ok(0);
        }

        let mut imported = 0;
        for (line, record) in self.read_rows(QUESTIONNAIRES_FILE, true) {
            let result = match parse_questionnaire(&record) {
                Ok(questionnaire) => QuestionnaireRepository::new(&mut conn)
                    .insert(&questionnaire)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => imported += 1,
                Err(e) => skip_row(QUESTIONNAIRES_FILE, line, &e),
            }
        }
        tracing::info!("Imported {} questionnaires", imported);
        Ok(imported)
    }

    /// Patients file has no header; rows whose first field starts with `#`
    /// are comments.
    pub async fn import_patients(&self) -> Result<usize, DbError> {
        let existing = {
            let mut conn = self.pool.acquire().await?;
            PatientRepository::new(&mut conn).count().await?
        };
        tracing::info!("No of existing patients {}", existing);
        if existing > 0 {
            return Ok(0);
        }

        let mut imported = 0;
        for (line, record) in self.read_rows(PATIENTS_FILE, false) {
            let patient = match parse_patient(&record) {
                Ok(Some(patient)) => patient,
                Ok(None) => continue,
                Err(e) => {
                    skip_row(PATIENTS_FILE, line, &e);
                    continue;
                }
            };
            match self.insert_patient(&patient).await {
                Ok(()) => imported += 1,
                Err(e) => skip_row(PATIENTS_FILE, line, &e.to_string()),
            }
        }
        tracing::info!("Imported {} patients", imported);
        Ok(imported)
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let id = PatientRepository::new(&mut tx).insert(patient).await?;
        for address in &patient.addresses {
            AddressRepository::new(&mut tx).insert(id, address).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Consultants get a random password, a reset key and the consultant role
    pub async fn import_consultants(&self) -> Result<usize, DbError> {
        let mut conn = self.pool.acquire().await?;
        let existing = UserRepository::new(&mut conn)
            .count_by_authority(ROLE_CONSULTANT)
            .await?;
        tracing::info!("No of existing consultants {}", existing);
        if existing > 0 {
            return Ok(0);
        }

        let mut imported = 0;
        for (line, record) in self.read_rows(CONSULTANTS_FILE, true) {
            let result = match parse_consultant(&record, self.hash_iterations) {
                Ok(user) => UserRepository::new(&mut conn)
                    .insert(&user)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => imported += 1,
                Err(e) => skip_row(CONSULTANTS_FILE, line, &e),
            }
        }
        tracing::info!("Imported {} consultants", imported);
        Ok(imported)
    }

    /// Records of a seed file with their line numbers. An unreadable file
    /// yields no rows.
    fn read_rows(&self, file: &str, has_headers: bool) -> Vec<(u64, StringRecord)> {
        let path = self.seed_dir.join(file);
        read_records(&path, has_headers).unwrap_or_else(|e| {
            tracing::error!("Unable to read {}. Nested exception is : {}", path.display(), e);
            Vec::new()
        })
    }
}

async fn logged(file: &str, import: impl Future<Output = Result<usize, DbError>>) -> usize {
    import.await.unwrap_or_else(|e| {
        tracing::error!("Import of {} failed: {}", file, e);
        0
    })
}

fn skip_row(file: &str, line: u64, reason: &str) {
    tracing::warn!("Skipping {} line {}: {}", file, line, reason);
}

fn read_records(path: &Path, has_headers: bool) -> Result<Vec<(u64, StringRecord)>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => {
                let line = record.position().map_or(0, |p| p.line());
                rows.push((line, record));
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                skip_row(&path.display().to_string(), line, &e.to_string());
            }
        }
    }
    Ok(rows)
}

fn field<'r>(record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str, String> {
    match record.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("missing {} (column {})", name, index)),
    }
}

fn optional(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_procedure(record: &StringRecord) -> Result<Procedure, String> {
    let code = field(record, 0, "localCode")?;
    Ok(Procedure {
        id: None,
        local_code: code
            .parse()
            .map_err(|_| format!("invalid localCode '{}'", code))?,
        name: field(record, 1, "name")?.to_string(),
    })
}

fn parse_questionnaire(record: &StringRecord) -> Result<Questionnaire, String> {
    Ok(Questionnaire {
        id: None,
        name: field(record, 0, "name")?.to_string(),
        copyright: None,
    })
}

/// `Ok(None)` for comment rows
fn parse_patient(record: &StringRecord) -> Result<Option<Patient>, String> {
    if record.get(0).is_some_and(|first| first.starts_with('#')) {
        return Ok(None);
    }

    let mut address = Address::with_street(field(record, 4, "street")?);
    if let Some(line) = optional(record, 5) {
        address.add_line(line);
    }
    address.city = optional(record, 6);
    address.postal_code = optional(record, 7);

    let birth_date = field(record, 9, "birthDate")?;
    let gender = field(record, 10, "gender")?;
    let nhs_number = field(record, 11, "nhsNumber")?;

    Ok(Some(Patient {
        id: None,
        given_name: field(record, 2, "givenName")?.to_string(),
        family_name: field(record, 3, "familyName")?.to_string(),
        birth_date: parse_birth_date(birth_date)?,
        gender: gender.parse()?,
        nhs_number: nhs_number
            .parse()
            .map_err(|_| format!("invalid nhsNumber '{}'", nhs_number))?,
        email: None,
        addresses: vec![address],
    }))
}

fn parse_birth_date(value: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(value, BIRTH_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("invalid birthDate '{}'", value))
}

fn parse_consultant(record: &StringRecord, hash_iterations: u32) -> Result<User, String> {
    let mut user = User::new(field(record, 3, "login")?);
    user.title = optional(record, 0);
    user.first_name = optional(record, 1);
    user.last_name = optional(record, 2);
    user.email = Some(format!(
        "{}@{}",
        field(record, 4, "email")?,
        CONSULTANT_EMAIL_DOMAIN
    ));
    user.add_authority(ROLE_CONSULTANT);
    user.password_hash = hash_password_with_iterations(&generate_password(), hash_iterations);
    user.reset_key = Some(generate_reset_key());
    user.reset_date = Some(Utc::now());
    user.activated = true;
    Ok(user)
}
