//! Fitness profile storage.
//!
//! DESIGN
//! ======
//! One row per user in `user_profiles`. Writes are merge-upserts: a field
//! that is `None` in the patch keeps its stored value. List fields are JSONB
//! arrays.

use contract::UserProfile;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, Row};

/// Profile keys the planner may write through `update_user_profile`.
pub const PLANNER_WRITABLE_FIELDS: [&str; 14] = [
    "age",
    "weight",
    "height",
    "gender",
    "training_level",
    "fitness_goals",
    "injuries",
    "equipment_access",
    "gym_access",
    "preferred_intensity",
    "workout_days_per_week",
    "medical_conditions",
    "home_equipment",
    "preferred_workout_time",
];

const COLUMNS: &str = "age, weight, height, gender, training_level, fitness_goals, injuries, injury_details, \
     medical_conditions, medical_condition_details, exercise_history_years, exercise_history_description, \
     equipment_access, gym_access, home_equipment, preferred_workout_time, workout_days_per_week, \
     preferred_intensity";

fn list(row: &PgRow, col: &str) -> Option<Vec<String>> {
    row.get::<Option<Json<Vec<String>>>, _>(col).map(|j| j.0)
}

fn from_row(row: &PgRow) -> UserProfile {
    UserProfile {
        age: row.get("age"),
        weight: row.get("weight"),
        height: row.get("height"),
        gender: row.get("gender"),
        training_level: row.get("training_level"),
        fitness_goals: list(row, "fitness_goals"),
        injuries: list(row, "injuries"),
        injury_details: row.get("injury_details"),
        medical_conditions: list(row, "medical_conditions"),
        medical_condition_details: row.get("medical_condition_details"),
        exercise_history_years: row.get("exercise_history_years"),
        exercise_history_description: row.get("exercise_history_description"),
        equipment_access: list(row, "equipment_access"),
        gym_access: row.get("gym_access"),
        home_equipment: list(row, "home_equipment"),
        preferred_workout_time: row.get("preferred_workout_time"),
        workout_days_per_week: row.get("workout_days_per_week"),
        preferred_intensity: row.get("preferred_intensity"),
    }
}

/// Load the stored profile for `user_id`, if any.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn load<'e>(db: impl PgExecutor<'e>, user_id: i64) -> Result<Option<UserProfile>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM user_profiles WHERE user_id = $1");
    let row = sqlx::query(&sql).bind(user_id).fetch_optional(db).await?;
    Ok(row.as_ref().map(from_row))
}

/// Merge `patch` into the stored profile and return the result.
///
/// # Errors
///
/// Returns a database error if the upsert fails.
pub async fn upsert<'e>(db: impl PgExecutor<'e>, user_id: i64, patch: &UserProfile) -> Result<UserProfile, sqlx::Error> {
    let sql = format!(
        r"INSERT INTO user_profiles (user_id, {COLUMNS})
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
          ON CONFLICT (user_id) DO UPDATE SET
              age = COALESCE(EXCLUDED.age, user_profiles.age),
              weight = COALESCE(EXCLUDED.weight, user_profiles.weight),
              height = COALESCE(EXCLUDED.height, user_profiles.height),
              gender = COALESCE(EXCLUDED.gender, user_profiles.gender),
              training_level = COALESCE(EXCLUDED.training_level, user_profiles.training_level),
              fitness_goals = COALESCE(EXCLUDED.fitness_goals, user_profiles.fitness_goals),
              injuries = COALESCE(EXCLUDED.injuries, user_profiles.injuries),
              injury_details = COALESCE(EXCLUDED.injury_details, user_profiles.injury_details),
              medical_conditions = COALESCE(EXCLUDED.medical_conditions, user_profiles.medical_conditions),
              medical_condition_details = COALESCE(EXCLUDED.medical_condition_details, user_profiles.medical_condition_details),
              exercise_history_years = COALESCE(EXCLUDED.exercise_history_years, user_profiles.exercise_history_years),
              exercise_history_description = COALESCE(EXCLUDED.exercise_history_description, user_profiles.exercise_history_description),
              equipment_access = COALESCE(EXCLUDED.equipment_access, user_profiles.equipment_access),
              gym_access = COALESCE(EXCLUDED.gym_access, user_profiles.gym_access),
              home_equipment = COALESCE(EXCLUDED.home_equipment, user_profiles.home_equipment),
              preferred_workout_time = COALESCE(EXCLUDED.preferred_workout_time, user_profiles.preferred_workout_time),
              workout_days_per_week = COALESCE(EXCLUDED.workout_days_per_week, user_profiles.workout_days_per_week),
              preferred_intensity = COALESCE(EXCLUDED.preferred_intensity, user_profiles.preferred_intensity),
              updated_at = now()
          RETURNING {COLUMNS}"
    );
    let json_list = |v: &Option<Vec<String>>| v.clone().map(Json);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(patch.age)
        .bind(patch.weight)
        .bind(patch.height)
        .bind(&patch.gender)
        .bind(&patch.training_level)
        .bind(json_list(&patch.fitness_goals))
        .bind(json_list(&patch.injuries))
        .bind(&patch.injury_details)
        .bind(json_list(&patch.medical_conditions))
        .bind(&patch.medical_condition_details)
        .bind(patch.exercise_history_years)
        .bind(&patch.exercise_history_description)
        .bind(json_list(&patch.equipment_access))
        .bind(patch.gym_access)
        .bind(json_list(&patch.home_equipment))
        .bind(&patch.preferred_workout_time)
        .bind(patch.workout_days_per_week)
        .bind(&patch.preferred_intensity)
        .fetch_one(db)
        .await?;
    Ok(from_row(&row))
}

// =============================================================================
// LENIENT PATCHES
// =============================================================================

fn as_i32(v: &Value) -> Option<i32> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_list(v: &Value) -> Option<Vec<String>> {
    v.as_array().map(|items| items.iter().filter_map(as_text).collect())
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn apply_field(patch: &mut UserProfile, key: &str, value: &Value) -> bool {
    match key {
        "age" => patch.age.insert_some(as_i32(value)),
        "weight" => patch.weight.insert_some(as_f64(value)),
        "height" => patch.height.insert_some(as_f64(value)),
        "gender" => patch.gender.insert_some(as_text(value)),
        "training_level" => patch.training_level.insert_some(as_text(value)),
        "fitness_goals" => patch.fitness_goals.insert_some(as_list(value)),
        "injuries" => patch.injuries.insert_some(as_list(value)),
        "injury_details" => patch.injury_details.insert_some(as_text(value)),
        "medical_conditions" => patch.medical_conditions.insert_some(as_list(value)),
        "medical_condition_details" => patch.medical_condition_details.insert_some(as_text(value)),
        "exercise_history_years" => patch.exercise_history_years.insert_some(as_i32(value)),
        "exercise_history_description" => patch.exercise_history_description.insert_some(as_text(value)),
        "equipment_access" => patch.equipment_access.insert_some(as_list(value)),
        "gym_access" => patch.gym_access.insert_some(as_bool(value)),
        "home_equipment" => patch.home_equipment.insert_some(as_list(value)),
        "preferred_workout_time" => patch.preferred_workout_time.insert_some(as_text(value)),
        "workout_days_per_week" => patch.workout_days_per_week.insert_some(as_i32(value)),
        "preferred_intensity" => patch.preferred_intensity.insert_some(as_text(value)),
        _ => false,
    }
}

/// Build a profile patch from loosely typed planner fields.
///
/// Only [`PLANNER_WRITABLE_FIELDS`] are read. A value whose type does not fit
/// its field is skipped; list fields accept only arrays. Returns the patch
/// and the subset of `fields` that was applied.
#[must_use]
pub fn patch_from_fields(fields: &Map<String, Value>) -> (UserProfile, Map<String, Value>) {
    let mut patch = UserProfile::default();
    let mut applied = Map::new();
    for (key, value) in fields {
        if !PLANNER_WRITABLE_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if key == "workout_days_per_week" && as_i32(value).is_none_or(|d| !(1..=7).contains(&d)) {
            continue;
        }
        if apply_field(&mut patch, key, value) {
            applied.insert(key.clone(), value.clone());
        }
    }
    (patch, applied)
}

/// Build a profile patch from a `PUT /api/user/profile` body. Every profile
/// field is accepted, with the same coercions as [`patch_from_fields`];
/// `null` and mistyped values leave the stored value untouched.
#[must_use]
pub fn patch_from_body(fields: &Map<String, Value>) -> UserProfile {
    let mut patch = UserProfile::default();
    for (key, value) in fields {
        apply_field(&mut patch, key, value);
    }
    patch
}

trait InsertSome<T> {
    fn insert_some(&mut self, value: Option<T>) -> bool;
}

impl<T> InsertSome<T> for Option<T> {
    fn insert_some(&mut self, value: Option<T>) -> bool {
        match value {
            Some(v) => {
                *self = Some(v);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
