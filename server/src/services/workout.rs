//! Monthly progressive workout plans.
//!
//! DESIGN
//! ======
//! A plan is picked from an already loaded exercise pool. Each of the six
//! program months caps intensity and level, and gates the hybrid HIIT
//! category. Exercises contraindicated for the user's injuries never make
//! it in. With a target muscle group, one exercise per group is chosen;
//! otherwise the first six eligible exercises are.

use std::fmt::Write;

use contract::{ExerciseSummary, WorkoutPlan};
use serde_json::Value;

use super::exercises::{HYBRID_CATEGORY, is_safe_for};

pub const FIRST_MONTH: u8 = 1;
pub const LAST_MONTH: u8 = 6;
const DEFAULT_PLAN_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Intensity {
    Light,
    Medium,
    Heavy,
}

impl Intensity {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "light" => Some(Self::Light),
            "medium" => Some(Self::Medium),
            "heavy" => Some(Self::Heavy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MonthRule {
    pub name_fa: &'static str,
    pub name_en: &'static str,
    pub max_intensity: Intensity,
    pub include_hybrid: bool,
    pub include_advanced: bool,
    pub sets: (u8, u8),
    pub reps: (u8, u8),
    pub rest_secs: u16,
}

pub const MONTHLY_RULES: [MonthRule; 6] = [
    MonthRule {
        name_fa: "آشنایی و فرم صحیح",
        name_en: "Foundation and form",
        max_intensity: Intensity::Light,
        include_hybrid: false,
        include_advanced: false,
        sets: (2, 3),
        reps: (12, 15),
        rest_secs: 90,
    },
    MonthRule {
        name_fa: "افزایش استقامت",
        name_en: "Building endurance",
        max_intensity: Intensity::Medium,
        include_hybrid: false,
        include_advanced: false,
        sets: (3, 3),
        reps: (10, 12),
        rest_secs: 75,
    },
    MonthRule {
        name_fa: "هایپرتروفی پایه",
        name_en: "Base hypertrophy",
        max_intensity: Intensity::Medium,
        include_hybrid: true,
        include_advanced: false,
        sets: (3, 4),
        reps: (8, 12),
        rest_secs: 75,
    },
    MonthRule {
        name_fa: "قدرت",
        name_en: "Strength",
        max_intensity: Intensity::Heavy,
        include_hybrid: true,
        include_advanced: false,
        sets: (4, 4),
        reps: (6, 10),
        rest_secs: 120,
    },
    MonthRule {
        name_fa: "ترکیبی پیشرفته",
        name_en: "Advanced hybrid",
        max_intensity: Intensity::Heavy,
        include_hybrid: true,
        include_advanced: true,
        sets: (4, 5),
        reps: (6, 10),
        rest_secs: 90,
    },
    MonthRule {
        name_fa: "اوج عملکرد",
        name_en: "Peak performance",
        max_intensity: Intensity::Heavy,
        include_hybrid: true,
        include_advanced: true,
        sets: (4, 5),
        reps: (5, 8),
        rest_secs: 120,
    },
];

/// Rule for `month`, clamped to the program.
#[must_use]
pub fn rule_for(month: u8) -> &'static MonthRule {
    let idx = usize::from(month.clamp(FIRST_MONTH, LAST_MONTH) - 1);
    &MONTHLY_RULES[idx]
}

/// Read the `month` param. Anything missing, non-numeric or outside the
/// program is month 1.
#[must_use]
pub fn month_from_param(raw: Option<&Value>) -> u8 {
    let n = match raw {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    n.and_then(|n| u8::try_from(n).ok())
        .filter(|m| (FIRST_MONTH..=LAST_MONTH).contains(m))
        .unwrap_or(FIRST_MONTH)
}

/// Whether `ex` fits the level, intensity and category limits of `month`.
#[must_use]
pub fn eligible(ex: &ExerciseSummary, month: u8) -> bool {
    let rule = rule_for(month);
    let advanced = ex.level == "advanced";
    if month == 1 && ex.level != "beginner" {
        return false;
    }
    if month == 2 && advanced {
        return false;
    }
    let Some(intensity) = Intensity::parse(&ex.intensity) else {
        return false;
    };
    if intensity > rule.max_intensity {
        return false;
    }
    if !rule.include_hybrid && ex.category == HYBRID_CATEGORY {
        return false;
    }
    !(advanced && !rule.include_advanced)
}

const MUSCLE_KEYWORDS: [(&str, &str); 8] = [
    ("سینه", "chest"),
    ("پشت", "back"),
    ("شانه", "shoulder"),
    ("بازو", "arm"),
    ("پا", "leg"),
    ("باسن", "glute"),
    ("شکم", "abs"),
    ("کاردیو", "cardio"),
];

/// Muscle groups named in `target`, as (Persian, English) search terms. An
/// unrecognized non-empty target is searched verbatim in both languages.
#[must_use]
pub fn muscle_groups(target: &str) -> Vec<(String, String)> {
    let target = target.trim().to_lowercase();
    if target.is_empty() {
        return Vec::new();
    }
    let found: Vec<(String, String)> = MUSCLE_KEYWORDS
        .iter()
        .filter(|(fa, en)| target.contains(fa) || target.contains(en))
        .map(|(fa, en)| ((*fa).to_owned(), (*en).to_owned()))
        .collect();
    if found.is_empty() { vec![(target.clone(), target)] } else { found }
}

fn works(ex: &ExerciseSummary, (fa, en): &(String, String)) -> bool {
    ex.target_muscle_fa.to_lowercase().contains(fa.as_str()) || ex.target_muscle_en.to_lowercase().contains(en.as_str())
}

/// Choose the plan's exercises from `pool`.
#[must_use]
pub fn select(pool: Vec<ExerciseSummary>, month: u8, target: &str, injuries: &[String]) -> Vec<ExerciseSummary> {
    let eligible: Vec<ExerciseSummary> = pool
        .into_iter()
        .filter(|ex| is_safe_for(ex, injuries) && eligible(ex, month))
        .collect();

    let groups = muscle_groups(target);
    if groups.is_empty() {
        return eligible.into_iter().take(DEFAULT_PLAN_SIZE).collect();
    }
    let mut picked: Vec<ExerciseSummary> = Vec::new();
    for group in &groups {
        if let Some(ex) = eligible
            .iter()
            .find(|ex| works(ex, group) && !picked.iter().any(|p| p.id == ex.id))
        {
            picked.push(ex.clone());
        }
    }
    picked
}

/// Build a plan for `month` from `pool`.
#[must_use]
pub fn build_plan(
    pool: Vec<ExerciseSummary>,
    month: u8,
    target: &str,
    injuries: &[String],
    language: &str,
) -> WorkoutPlan {
    let month = month.clamp(FIRST_MONTH, LAST_MONTH);
    let exercises = select(pool, month, target, injuries);
    let response = if exercises.is_empty() {
        no_match_text(language).to_owned()
    } else {
        render_plan(month, &exercises, injuries, language)
    };
    WorkoutPlan { month, response, exercises, safety_checked: true }
}

fn no_match_text(language: &str) -> &'static str {
    if language == "fa" {
        "متأسفانه با توجه به محدودیت‌های شما (آسیب‌ها یا تجهیزات)، نمی‌توانم تمرین مناسبی پیدا کنم. \
         لطفاً با پزشک یا فیزیوتراپیست مشورت کنید."
    } else {
        "Sorry, I could not find suitable exercises for your limitations (injuries or equipment). \
         Please consult a doctor or physiotherapist."
    }
}

fn render_plan(month: u8, exercises: &[ExerciseSummary], injuries: &[String], language: &str) -> String {
    let rule = rule_for(month);
    let fa = language == "fa";
    let mut out = String::new();
    if fa {
        let _ = writeln!(out, "## برنامه تمرینی - ماه {month}: {}\n", rule.name_fa);
        if !injuries.is_empty() {
            let _ = writeln!(out, "✅ بررسی ایمنی: تمرینات با در نظر گرفتن {} انتخاب شده‌اند.\n", injuries.join("، "));
        }
        out.push_str("| حرکت | عضله هدف | ست | تکرار | استراحت |\n|------|----------|-----|--------|----------|\n");
    } else {
        let _ = writeln!(out, "## Workout plan - month {month}: {}\n", rule.name_en);
        if !injuries.is_empty() {
            let _ = writeln!(out, "✅ Safety check: exercises were chosen around {}.\n", injuries.join(", "));
        }
        out.push_str("| Exercise | Target | Sets | Reps | Rest |\n|----------|--------|------|------|------|\n");
    }
    for ex in exercises {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {}s |",
            ex.name, ex.target_muscle, rule.sets.1, rule.reps.1, rule.rest_secs
        );
    }
    out.push('\n');
    out.push_str(if fa {
        "- قبل از شروع ۵ تا ۱۰ دقیقه گرم کنید و بعد از تمرین کشش انجام دهید.\n- شدت را به تدریج افزایش دهید."
    } else {
        "- Warm up for 5-10 minutes before starting and stretch afterwards.\n- Increase intensity gradually."
    });
    out
}

#[cfg(test)]
#[path = "workout_test.rs"]
mod tests;
