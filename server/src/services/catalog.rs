//! Admin maintenance of the exercise catalog.
//!
//! DESIGN
//! ======
//! Writes go through [`CatalogExercise`], a fully validated row: creation
//! requires every text field, an update overlays only the fields it names
//! onto the stored row and revalidates the result. Enumerated columns are
//! checked against the values the planner understands, so an admin cannot
//! store a level or intensity that the workout month caps would never match.
//! Bulk creation validates each item on its own and inserts the good ones
//! in a single transaction.

use contract::{BulkCreated, CatalogExerciseInput, CatalogFilter, CatalogPage, ExerciseSummary};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::info;

use super::exercises::{CATALOG_COLUMNS, HOME_CATEGORY, HYBRID_CATEGORY, MACHINE_CATEGORY, summary_from_row};
use crate::error::{ApiError, ErrorCode};

pub const CATEGORIES: [&str; 3] = [MACHINE_CATEGORY, HOME_CATEGORY, HYBRID_CATEGORY];
pub const LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];
pub const INTENSITIES: [&str; 3] = ["light", "medium", "heavy"];
pub const GENDERS: [&str; 3] = ["male", "female", "both"];

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Missing required field: {0}")]
    Missing(&'static str),
    #[error("Invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },
    #[error("No exercises provided")]
    Empty,
    #[error("Exercise not found")]
    NotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl ErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound => "E_NOT_FOUND",
            Self::Db(_) => "E_DATABASE",
            _ => "E_BAD_REQUEST",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Db(_))
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => Self::not_found(err.to_string()),
            CatalogError::Db(e) => Self::Database(e),
            other => Self::bad_request(other.to_string()),
        }
    }
}

/// A validated catalog row, without its id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogExercise {
    pub category: String,
    pub name_fa: String,
    pub name_en: String,
    pub target_muscle_fa: String,
    pub target_muscle_en: String,
    pub level: String,
    pub intensity: String,
    pub gender_suitability: String,
    pub injury_contraindications: Vec<String>,
}

impl CatalogExercise {
    fn from_row(r: &PgRow) -> Self {
        let contraindications: Json<Vec<String>> = r.get("injury_contraindications");
        Self {
            category: r.get("category"),
            name_fa: r.get("name_fa"),
            name_en: r.get("name_en"),
            target_muscle_fa: r.get("target_muscle_fa"),
            target_muscle_en: r.get("target_muscle_en"),
            level: r.get("level"),
            intensity: r.get("intensity"),
            gender_suitability: r.get("gender_suitability"),
            injury_contraindications: contraindications.0,
        }
    }

    fn check(self) -> Result<Self, CatalogError> {
        let text = [
            ("category", &self.category),
            ("name_fa", &self.name_fa),
            ("name_en", &self.name_en),
            ("target_muscle_fa", &self.target_muscle_fa),
            ("target_muscle_en", &self.target_muscle_en),
            ("level", &self.level),
            ("intensity", &self.intensity),
            ("gender_suitability", &self.gender_suitability),
        ];
        if let Some(&(field, _)) = text.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(CatalogError::Missing(field));
        }
        one_of("category", &self.category, &CATEGORIES)?;
        one_of("level", &self.level, &LEVELS)?;
        one_of("intensity", &self.intensity, &INTENSITIES)?;
        one_of("gender_suitability", &self.gender_suitability, &GENDERS)?;
        Ok(self)
    }
}

fn one_of(field: &'static str, value: &str, allowed: &[&str]) -> Result<(), CatalogError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CatalogError::Invalid { field, value: value.to_owned() })
    }
}

fn trimmed(value: Option<&String>) -> String {
    value.map(|s| s.trim().to_owned()).unwrap_or_default()
}

fn clean_list(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate a creation request.
///
/// # Errors
///
/// `Missing` for the first absent or blank field, `Invalid` for a value
/// outside its enumeration.
pub fn validate_new(input: &CatalogExerciseInput) -> Result<CatalogExercise, CatalogError> {
    CatalogExercise {
        category: trimmed(input.category.as_ref()),
        name_fa: trimmed(input.name_fa.as_ref()),
        name_en: trimmed(input.name_en.as_ref()),
        target_muscle_fa: trimmed(input.target_muscle_fa.as_ref()),
        target_muscle_en: trimmed(input.target_muscle_en.as_ref()),
        level: trimmed(input.level.as_ref()),
        intensity: trimmed(input.intensity.as_ref()),
        gender_suitability: trimmed(input.gender_suitability.as_ref()),
        injury_contraindications: input.injury_contraindications.as_deref().map(clean_list).unwrap_or_default(),
    }
    .check()
}

/// Overlay the fields `patch` names onto `current`.
///
/// # Errors
///
/// Same rules as [`validate_new`], applied to the merged row.
pub fn apply_patch(current: CatalogExercise, patch: &CatalogExerciseInput) -> Result<CatalogExercise, CatalogError> {
    let pick = |new: Option<&String>, old: String| new.map_or(old, |s| s.trim().to_owned());
    CatalogExercise {
        category: pick(patch.category.as_ref(), current.category),
        name_fa: pick(patch.name_fa.as_ref(), current.name_fa),
        name_en: pick(patch.name_en.as_ref(), current.name_en),
        target_muscle_fa: pick(patch.target_muscle_fa.as_ref(), current.target_muscle_fa),
        target_muscle_en: pick(patch.target_muscle_en.as_ref(), current.target_muscle_en),
        level: pick(patch.level.as_ref(), current.level),
        intensity: pick(patch.intensity.as_ref(), current.intensity),
        gender_suitability: pick(patch.gender_suitability.as_ref(), current.gender_suitability),
        injury_contraindications: patch
            .injury_contraindications
            .as_deref()
            .map_or(current.injury_contraindications, clean_list),
    }
    .check()
}

/// Split bulk items into valid rows and per-item error lines. Items are
/// numbered from 1 in the error text.
#[must_use]
pub fn bulk_items(items: &[Value]) -> (Vec<CatalogExercise>, Vec<String>) {
    let mut valid = Vec::new();
    let mut errors = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let parsed = serde_json::from_value::<CatalogExerciseInput>(item.clone())
            .map_err(|e| e.to_string())
            .and_then(|input| validate_new(&input).map_err(|e| e.to_string()));
        match parsed {
            Ok(ex) => valid.push(ex),
            Err(msg) => errors.push(format!("Exercise {}: {msg}", idx + 1)),
        }
    }
    (valid, errors)
}

// =============================================================================
// PAGING
// =============================================================================

/// Resolve `(page, per_page, offset)`. Pages start at 1; `per_page` is
/// capped at [`MAX_PER_PAGE`].
#[must_use]
pub fn paging(filter: &CatalogFilter) -> (i64, i64, i64) {
    let page = filter.page.filter(|p| *p >= 1).unwrap_or(1);
    let per_page = filter.per_page.filter(|p| *p >= 1).map_or(DEFAULT_PER_PAGE, |p| p.min(MAX_PER_PAGE));
    (page, per_page, (page - 1).saturating_mul(per_page))
}

#[must_use]
pub fn page_count(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 { 0 } else { (total + per_page - 1) / per_page }
}

fn filter_value(raw: Option<&String>) -> Option<&str> {
    raw.map(|s| s.trim()).filter(|s| !s.is_empty())
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// One page of the catalog, optionally filtered by category and level.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn list(pool: &PgPool, filter: &CatalogFilter, language: &str) -> Result<CatalogPage, CatalogError> {
    let (page, per_page, offset) = paging(filter);
    let category = filter_value(filter.category.as_ref());
    let level = filter_value(filter.level.as_ref());

    let total: i64 = sqlx::query_scalar(
        r"SELECT COUNT(*) FROM exercises
          WHERE ($1::TEXT IS NULL OR category = $1) AND ($2::TEXT IS NULL OR level = $2)",
    )
    .bind(category)
    .bind(level)
    .fetch_one(pool)
    .await?;

    let sql = format!(
        r"SELECT {CATALOG_COLUMNS} FROM exercises
          WHERE ($1::TEXT IS NULL OR category = $1) AND ($2::TEXT IS NULL OR level = $2)
          ORDER BY id LIMIT $3 OFFSET $4"
    );
    let rows = sqlx::query(&sql)
        .bind(category)
        .bind(level)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(CatalogPage {
        exercises: rows.iter().map(|r| summary_from_row(r, language)).collect(),
        total,
        pages: page_count(total, per_page),
        current_page: page,
    })
}

/// # Errors
///
/// `NotFound` for an unknown id, or a database error.
pub async fn get(pool: &PgPool, id: i64, language: &str) -> Result<ExerciseSummary, CatalogError> {
    let sql = format!("SELECT {CATALOG_COLUMNS} FROM exercises WHERE id = $1");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.map(|r| summary_from_row(&r, language)).ok_or(CatalogError::NotFound)
}

async fn insert_row<'e, E>(executor: E, ex: &CatalogExercise) -> Result<PgRow, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let sql = format!(
        r"INSERT INTO exercises (category, name_fa, name_en, target_muscle_fa, target_muscle_en,
                                 level, intensity, gender_suitability, injury_contraindications)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
          RETURNING {CATALOG_COLUMNS}"
    );
    sqlx::query(&sql)
        .bind(&ex.category)
        .bind(&ex.name_fa)
        .bind(&ex.name_en)
        .bind(&ex.target_muscle_fa)
        .bind(&ex.target_muscle_en)
        .bind(&ex.level)
        .bind(&ex.intensity)
        .bind(&ex.gender_suitability)
        .bind(Json(&ex.injury_contraindications))
        .fetch_one(executor)
        .await
}

/// Validate and insert one exercise.
///
/// # Errors
///
/// A validation error, or a database error if the insert fails.
pub async fn create(pool: &PgPool, input: &CatalogExerciseInput, language: &str) -> Result<ExerciseSummary, CatalogError> {
    let ex = validate_new(input)?;
    let row = insert_row(pool, &ex).await?;
    let created = summary_from_row(&row, language);
    info!(exercise_id = created.id, name = %ex.name_en, "catalog: created");
    Ok(created)
}

/// Apply `patch` to exercise `id`.
///
/// # Errors
///
/// `NotFound` for an unknown id, a validation error for the merged row, or
/// a database error.
pub async fn update(
    pool: &PgPool,
    id: i64,
    patch: &CatalogExerciseInput,
    language: &str,
) -> Result<ExerciseSummary, CatalogError> {
    let mut tx = pool.begin().await?;
    let sql = format!("SELECT {CATALOG_COLUMNS} FROM exercises WHERE id = $1 FOR UPDATE");
    let Some(row) = sqlx::query(&sql).bind(id).fetch_optional(&mut *tx).await? else {
        return Err(CatalogError::NotFound);
    };
    let merged = apply_patch(CatalogExercise::from_row(&row), patch)?;

    let sql = format!(
        r"UPDATE exercises SET category = $2, name_fa = $3, name_en = $4, target_muscle_fa = $5,
                 target_muscle_en = $6, level = $7, intensity = $8, gender_suitability = $9,
                 injury_contraindications = $10
          WHERE id = $1
          RETURNING {CATALOG_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(&merged.category)
        .bind(&merged.name_fa)
        .bind(&merged.name_en)
        .bind(&merged.target_muscle_fa)
        .bind(&merged.target_muscle_en)
        .bind(&merged.level)
        .bind(&merged.intensity)
        .bind(&merged.gender_suitability)
        .bind(Json(&merged.injury_contraindications))
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    info!(exercise_id = id, "catalog: updated");
    Ok(summary_from_row(&row, language))
}

/// # Errors
///
/// `NotFound` for an unknown id, or a database error.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), CatalogError> {
    let result = sqlx::query("DELETE FROM exercises WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::NotFound);
    }
    info!(exercise_id = id, "catalog: deleted");
    Ok(())
}

/// Insert every valid item of `items` in one transaction.
///
/// # Errors
///
/// `Empty` when `items` is empty, or a database error, in which case
/// nothing is inserted.
pub async fn bulk_create(pool: &PgPool, items: &[Value]) -> Result<BulkCreated, CatalogError> {
    if items.is_empty() {
        return Err(CatalogError::Empty);
    }
    let (valid, errors) = bulk_items(items);
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(valid.len());
    for ex in &valid {
        insert_row(&mut *tx, ex).await?;
        created.push(ex.name_fa.clone());
    }
    tx.commit().await?;
    info!(created = created.len(), skipped = errors.len(), "catalog: bulk create");
    Ok(BulkCreated { message: format!("Created {} exercises", created.len()), created, errors })
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
