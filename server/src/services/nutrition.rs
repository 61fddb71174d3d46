//! Nutrition plans.
//!
//! A plan is a list of meals for one plan type: `2week` spans days 1 to 14,
//! `4week` days 1 to 28. Entries are listed in day order, then insertion
//! order within a day.

use contract::{NUTRITION_PLAN_TYPES, NewNutritionPlan, NutritionPlanEntry};
use sqlx::{PgPool, Row};

use crate::error::{ApiError, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum NutritionError {
    #[error("Unknown plan type: {0}")]
    PlanType(String),
    #[error("Day is required")]
    MissingDay,
    #[error("Day must be between 1 and {max}")]
    DayOutOfRange { max: i32 },
    #[error("Food item is required")]
    MissingFood,
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl ErrorCode for NutritionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Db(_) => "E_DATABASE",
            _ => "E_BAD_REQUEST",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Db(_))
    }
}

impl From<NutritionError> for ApiError {
    fn from(err: NutritionError) -> Self {
        match err {
            NutritionError::Db(e) => Self::Database(e),
            other => Self::bad_request(other.to_string()),
        }
    }
}

/// Number of days covered by `plan_type`, or `None` for an unknown type.
#[must_use]
pub fn plan_days(plan_type: &str) -> Option<i32> {
    match plan_type {
        "2week" => Some(14),
        "4week" => Some(28),
        _ => None,
    }
}

/// Resolve a plan type from a query string, where absent means the default.
///
/// # Errors
///
/// `PlanType` when the type is not one of [`NUTRITION_PLAN_TYPES`].
pub fn plan_type_or_default(raw: Option<&str>) -> Result<&str, NutritionError> {
    let plan_type = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(contract::DEFAULT_NUTRITION_PLAN_TYPE);
    if NUTRITION_PLAN_TYPES.contains(&plan_type) {
        Ok(plan_type)
    } else {
        Err(NutritionError::PlanType(plan_type.to_owned()))
    }
}

/// Check a new entry before it is stored. Returns the validated day.
///
/// # Errors
///
/// Returns the first rule the entry breaks.
pub fn validate(plan: &NewNutritionPlan) -> Result<i32, NutritionError> {
    let Some(max) = plan_days(plan.plan_type.trim()) else {
        return Err(NutritionError::PlanType(plan.plan_type.clone()));
    };
    let day = plan.day.ok_or(NutritionError::MissingDay)?;
    if !(1..=max).contains(&day) {
        return Err(NutritionError::DayOutOfRange { max });
    }
    if plan.food_item.trim().is_empty() {
        return Err(NutritionError::MissingFood);
    }
    if plan.calories.is_some_and(|c| c < 0) {
        return Err(NutritionError::Negative("Calories"));
    }
    for (name, value) in [("Protein", plan.protein), ("Carbs", plan.carbs), ("Fats", plan.fats)] {
        if value.is_some_and(|v| v < 0.0) {
            return Err(NutritionError::Negative(name));
        }
    }
    Ok(day)
}

/// Entries of `plan_type` for `user_id`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &PgPool, user_id: i64, plan_type: &str) -> Result<Vec<NutritionPlanEntry>, NutritionError> {
    let rows = sqlx::query(
        r"SELECT id, day, meal_type, food_item, calories, protein, carbs, fats, notes
          FROM nutrition_plans WHERE user_id = $1 AND plan_type = $2
          ORDER BY day, id",
    )
    .bind(user_id)
    .bind(plan_type)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| NutritionPlanEntry {
            id: r.get("id"),
            day: r.get("day"),
            meal_type: r.get("meal_type"),
            food_item: r.get("food_item"),
            calories: r.get("calories"),
            protein: r.get("protein"),
            carbs: r.get("carbs"),
            fats: r.get("fats"),
            notes: r.get("notes"),
        })
        .collect())
}

/// Validate and store one entry, returning its id.
///
/// # Errors
///
/// A validation error, or a database error if the insert fails.
pub async fn add(pool: &PgPool, user_id: i64, plan: &NewNutritionPlan) -> Result<i64, NutritionError> {
    let day = validate(plan)?;
    let id = sqlx::query_scalar(
        r"INSERT INTO nutrition_plans (user_id, plan_type, day, meal_type, food_item, calories, protein, carbs, fats, notes)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(user_id)
    .bind(plan.plan_type.trim())
    .bind(day)
    .bind(&plan.meal_type)
    .bind(plan.food_item.trim())
    .bind(plan.calories)
    .bind(plan.protein)
    .bind(plan.carbs)
    .bind(plan.fats)
    .bind(&plan.notes)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[cfg(test)]
#[path = "nutrition_test.rs"]
mod tests;
