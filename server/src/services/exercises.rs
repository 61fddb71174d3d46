//! Exercise history and the exercise catalog.
//!
//! History is the member's own log (`user_exercises`). The catalog
//! (`exercises`) is shared, bilingual, and searched by the planner. Catalog
//! filtering runs in memory over the rows of the allowed categories so that
//! injury checks can use substring matching in both directions.

use contract::{ExerciseEntry, ExerciseSummary, NewExercise};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

pub const MACHINE_CATEGORY: &str = "bodybuilding_machine";
/// Catalog category available without gym access.
pub const HOME_CATEGORY: &str = "functional_home";
pub const HYBRID_CATEGORY: &str = "hybrid_hiit_machine";

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const MAX_RESULTS_CAP: usize = 50;

// =============================================================================
// HISTORY
// =============================================================================

/// The user's logged exercises, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_history(pool: &PgPool, user_id: i64) -> Result<Vec<ExerciseEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, exercise_name, exercise_type, duration, calories_burned, notes,
                  to_char(date AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS') AS logged_at
           FROM user_exercises WHERE user_id = $1
           ORDER BY date DESC, id DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| ExerciseEntry {
            id: r.get("id"),
            exercise_name: r.get("exercise_name"),
            exercise_type: r.get("exercise_type"),
            duration: r.get("duration"),
            calories_burned: r.get("calories_burned"),
            date: r.get("logged_at"),
            notes: r.get("notes"),
        })
        .collect())
}

/// Log one exercise and return its id.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn add_history(pool: &PgPool, user_id: i64, entry: &NewExercise) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r"INSERT INTO user_exercises (user_id, exercise_name, exercise_type, duration, calories_burned, notes)
          VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(user_id)
    .bind(entry.exercise_name.trim())
    .bind(&entry.exercise_type)
    .bind(entry.duration)
    .bind(entry.calories_burned)
    .bind(&entry.notes)
    .fetch_one(pool)
    .await
}

// =============================================================================
// CATALOG
// =============================================================================

pub(crate) const CATALOG_COLUMNS: &str = "id, category, name_fa, name_en, target_muscle_fa, target_muscle_en, level, \
     intensity, gender_suitability, injury_contraindications";

/// Map a row selected with [`CATALOG_COLUMNS`], localized for `language`.
pub(crate) fn summary_from_row(r: &PgRow, language: &str) -> ExerciseSummary {
    let contraindications: Json<Vec<String>> = r.get("injury_contraindications");
    localize(
        ExerciseSummary {
            id: r.get("id"),
            category: r.get("category"),
            name_fa: r.get("name_fa"),
            name_en: r.get("name_en"),
            target_muscle_fa: r.get("target_muscle_fa"),
            target_muscle_en: r.get("target_muscle_en"),
            level: r.get("level"),
            intensity: r.get("intensity"),
            gender_suitability: r.get("gender_suitability"),
            injury_contraindications: contraindications.0,
            ..ExerciseSummary::default()
        },
        language,
    )
}

/// Load catalog rows, localized for `language`. With `home_only`, only the
/// home category is loaded. `limit` caps the row count in catalog order.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn load_catalog(
    pool: &PgPool,
    language: &str,
    home_only: bool,
    limit: Option<i64>,
) -> Result<Vec<ExerciseSummary>, sqlx::Error> {
    let sql = format!(
        r"SELECT {CATALOG_COLUMNS}
          FROM exercises
          WHERE ($1 = false OR category = $2)
          ORDER BY id
          LIMIT $3"
    );
    let rows = sqlx::query(&sql)
        .bind(home_only)
        .bind(HOME_CATEGORY)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| summary_from_row(r, language)).collect())
}

/// Fill the display `name` and `target_muscle` for `language`.
#[must_use]
pub fn localize(mut ex: ExerciseSummary, language: &str) -> ExerciseSummary {
    let fa = language == "fa";
    ex.name = if fa { ex.name_fa.clone() } else { ex.name_en.clone() };
    ex.target_muscle = if fa { ex.target_muscle_fa.clone() } else { ex.target_muscle_en.clone() };
    ex
}

/// Whether `ex` is safe for someone with `injuries`. A contraindication
/// matches when either string contains the other, case-insensitively.
#[must_use]
pub fn is_safe_for(ex: &ExerciseSummary, injuries: &[String]) -> bool {
    injuries.iter().all(|injury| {
        let injury = injury.trim().to_lowercase();
        if injury.is_empty() {
            return true;
        }
        ex.injury_contraindications.iter().all(|contra| {
            let contra = contra.to_lowercase();
            !(contra.contains(&injury) || injury.contains(&contra))
        })
    })
}

fn mentions(haystacks: [&str; 2], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

/// Search filters for `search_exercises`. Empty strings mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub text: String,
    pub target_muscle: String,
    pub level: String,
    pub intensity: String,
    pub max_results: usize,
}

impl CatalogQuery {
    #[must_use]
    pub fn matches(&self, ex: &ExerciseSummary) -> bool {
        let names = [ex.name_fa.as_str(), ex.name_en.as_str()];
        let muscles = [ex.target_muscle_fa.as_str(), ex.target_muscle_en.as_str()];
        (self.level.is_empty() || ex.level == self.level)
            && (self.intensity.is_empty() || ex.intensity == self.intensity)
            && (self.text.is_empty() || mentions(names, &self.text) || mentions(muscles, &self.text))
            && (self.target_muscle.is_empty() || mentions(muscles, &self.target_muscle))
    }
}

/// Apply `query` and the injury filter, keeping catalog order.
#[must_use]
pub fn search(catalog: Vec<ExerciseSummary>, query: &CatalogQuery, injuries: &[String]) -> Vec<ExerciseSummary> {
    catalog
        .into_iter()
        .filter(|ex| query.matches(ex) && is_safe_for(ex, injuries))
        .take(query.max_results.clamp(1, MAX_RESULTS_CAP))
        .collect()
}

#[cfg(test)]
#[path = "exercises_test.rs"]
mod tests;
