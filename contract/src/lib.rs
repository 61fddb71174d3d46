//! Shared REST contract for the Raha API.
//!
//! This crate owns the JSON bodies exchanged between `server`, `client`, and
//! `cli`. Response bodies are lenient (`default` everywhere) because the
//! client must keep working when the backend adds or omits fields. Required
//! text fields of request bodies default to empty, so a missing field reaches
//! the server's own validation and gets its message.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// PATHS
// =============================================================================

/// Endpoint paths, relative to the API base URL.
pub mod paths {
    pub const LOGIN: &str = "/api/login";
    pub const REGISTER: &str = "/api/register";
    /// Server-side session revocation. Client logout stays local.
    pub const LOGOUT: &str = "/api/logout";
    pub const USER: &str = "/api/user";
    pub const USER_PROFILE: &str = "/api/user/profile";
    pub const EXERCISES: &str = "/api/exercises";
    pub const CHAT: &str = "/api/chat";
    pub const CHAT_HISTORY: &str = "/api/chat/history";
    pub const AI_PLAN: &str = "/api/ai/plan";
    pub const HEALTH: &str = "/api/health";
    pub const NUTRITION_PLANS: &str = "/api/nutrition/plans";
    pub const ADMIN_CHECK: &str = "/api/admin/check-admin";
    pub const ADMIN_EXERCISES: &str = "/api/admin/exercises";
    pub const ADMIN_EXERCISES_BULK: &str = "/api/admin/exercises/bulk";
    /// Router pattern for one catalog exercise; see [`admin_exercise`].
    pub const ADMIN_EXERCISE: &str = "/api/admin/exercises/{id}";

    /// Concrete path of catalog exercise `id`.
    #[must_use]
    pub fn admin_exercise(id: i64) -> String {
        format!("{ADMIN_EXERCISES}/{id}")
    }
}

/// HTTP statuses the backend uses to reject a bearer token.
///
/// 401 covers missing or expired tokens, 422 covers malformed ones.
pub const AUTH_FAILURE_STATUSES: [u16; 2] = [401, 422];

/// Whether `status` means the bearer token was rejected.
#[must_use]
pub fn is_auth_failure(status: u16) -> bool {
    AUTH_FAILURE_STATUSES.contains(&status)
}

/// Default UI language when a user or request does not name one.
pub const DEFAULT_LANGUAGE: &str = "fa";

// =============================================================================
// USERS
// =============================================================================

/// Account role. Unknown roles from a newer backend decode as `Member`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Assistant,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Assistant => "assistant",
            Self::Admin => "admin",
        }
    }

    /// Parse a stored role column. Anything unrecognized is a member.
    #[must_use]
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "admin" => Self::Admin,
            "assistant" => Self::Assistant,
            _ => Self::Member,
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_db(&raw))
    }
}

/// The authenticated user as returned by login, register and `GET /api/user`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Fitness profile. Every field is optional; absent fields are left untouched
/// on update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_goals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injuries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injury_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_conditions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_condition_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_history_years: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_history_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_access: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gym_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_equipment: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_workout_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_days_per_week: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_intensity: Option<String>,
}

impl UserProfile {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// `GET /api/user` body: the user plus their profile, if one exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

/// `PUT /api/user` body.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// `PUT /api/user` reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateUserResponse {
    #[serde(default)]
    pub message: String,
    pub user: User,
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

/// Successful login or register reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// Error body produced by the backend on any non-2xx response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    /// Human-readable text, preferring `error` then `message`.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Best-effort decode of a raw response body.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// =============================================================================
// EXERCISES
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub id: i64,
    pub exercise_name: String,
    #[serde(default)]
    pub exercise_type: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub calories_burned: Option<i32>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewExercise {
    #[serde(default)]
    pub exercise_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_burned: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: i64,
    #[serde(default)]
    pub message: String,
}

/// Bare `{message}` acknowledgement.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// NUTRITION
// =============================================================================

/// Plan lengths a nutrition plan entry can belong to.
pub const NUTRITION_PLAN_TYPES: [&str; 2] = ["2week", "4week"];

/// Plan type used when a request does not name one.
pub const DEFAULT_NUTRITION_PLAN_TYPE: &str = "2week";

/// One meal of a nutrition plan, as listed by `GET /api/nutrition/plans`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionPlanEntry {
    pub id: i64,
    pub day: i32,
    pub meal_type: Option<String>,
    pub food_item: String,
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub notes: Option<String>,
}

/// `POST /api/nutrition/plans` body.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewNutritionPlan {
    #[serde(default = "default_nutrition_plan_type")]
    pub plan_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub food_item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fats: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_nutrition_plan_type() -> String {
    DEFAULT_NUTRITION_PLAN_TYPE.to_owned()
}

// =============================================================================
// ADMIN CATALOG
// =============================================================================

/// `GET /api/admin/check-admin` body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCheck {
    #[serde(default)]
    pub is_admin: bool,
}

/// Filters and paging for `GET /api/admin/exercises`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

/// One page of the exercise catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPage {
    pub exercises: Vec<ExerciseSummary>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

/// A catalog exercise as written by an admin. Creation requires every field
/// except `injury_contraindications`; an update sends only what changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogExerciseInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_fa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_muscle_fa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_muscle_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_suitability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injury_contraindications: Option<Vec<String>>,
}

/// `POST /api/admin/exercises/bulk` body.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkCatalogRequest {
    pub exercises: Vec<Value>,
}

/// `POST /api/admin/exercises/bulk` reply. `created` names the inserted
/// exercises; `errors` explains each skipped item by its 1-based position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkCreated {
    pub message: String,
    pub created: Vec<String>,
    pub errors: Vec<String>,
}

// =============================================================================
// CHAT
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_time: Option<String>,
}

/// `POST /api/chat` reply. Older backends answer with `message` instead of
/// `response`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChatReply {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().or(self.message.as_deref())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub id: i64,
    pub message: String,
    pub response: String,
    pub timestamp: String,
}

/// Speaker of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn in a planner conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: ChatRole,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

// =============================================================================
// ACTION PLANNER
// =============================================================================

/// Error returned when an action name is not part of [`ActionKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

/// The closed set of actions the planner may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SearchExercises,
    CreateWorkoutPlan,
    UpdateUserProfile,
    ProgressCheck,
    TrainerMessage,
    SiteSettings,
}

impl ActionKind {
    pub const ALL: [Self; 6] = [
        Self::SearchExercises,
        Self::CreateWorkoutPlan,
        Self::UpdateUserProfile,
        Self::ProgressCheck,
        Self::TrainerMessage,
        Self::SiteSettings,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SearchExercises => "search_exercises",
            Self::CreateWorkoutPlan => "create_workout_plan",
            Self::UpdateUserProfile => "update_user_profile",
            Self::ProgressCheck => "progress_check",
            Self::TrainerMessage => "trainer_message",
            Self::SiteSettings => "site_settings",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| UnknownAction(name.to_owned()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A requested action. The name stays a string on the wire so a client never
/// rejects a plan containing an action it does not know yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl PlannedAction {
    /// Typed kind of this action, if known.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAction`] when the name is not in [`ActionKind`].
    pub fn kind(&self) -> Result<ActionKind, UnknownAction> {
        self.action.parse()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Ok,
    Error,
}

/// Outcome of executing one planned action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    #[must_use]
    pub fn ok(kind: ActionKind, data: Value) -> Self {
        Self { action: kind.as_str().to_owned(), status: ResultStatus::Ok, data: Some(data), error: None }
    }

    #[must_use]
    pub fn error(action: impl Into<String>, error: impl Into<String>) -> Self {
        Self { action: action.into(), status: ResultStatus::Error, data: None, error: Some(error.into()) }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

/// `POST /api/ai/plan` reply.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanResponse {
    pub assistant_response: String,
    pub actions: Vec<PlannedAction>,
    pub results: Vec<ActionResult>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

// =============================================================================
// ACTION RESULT DATA
// =============================================================================

/// An exercise from the catalog, localized for the requesting user.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseSummary {
    pub id: i64,
    pub category: String,
    pub name: String,
    pub name_fa: String,
    pub name_en: String,
    pub target_muscle: String,
    pub target_muscle_fa: String,
    pub target_muscle_en: String,
    pub level: String,
    pub intensity: String,
    pub gender_suitability: String,
    pub injury_contraindications: Vec<String>,
}

/// `create_workout_plan` result data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkoutPlan {
    pub month: u8,
    pub response: String,
    pub exercises: Vec<ExerciseSummary>,
    pub safety_checked: bool,
}

/// `update_user_profile` result data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub user_id: i64,
    pub updated: Map<String, Value>,
}

/// `progress_check` result data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressCheckData {
    pub request_id: i64,
    pub status: String,
}

/// `trainer_message` result data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSent {
    pub id: i64,
    pub recipient_id: i64,
}

/// `site_settings` result data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub updated: Map<String, Value>,
}

/// `GET /api/health` body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
