use serde_json::json;

use super::*;

fn input() -> CatalogExerciseInput {
    CatalogExerciseInput {
        category: Some("functional_home".into()),
        name_fa: Some("اسکات".into()),
        name_en: Some(" Squat ".into()),
        target_muscle_fa: Some("پا".into()),
        target_muscle_en: Some("Legs".into()),
        level: Some("beginner".into()),
        intensity: Some("light".into()),
        gender_suitability: Some("both".into()),
        injury_contraindications: Some(vec!["knee".into(), "  ".into()]),
    }
}

#[test]
fn new_exercise_is_trimmed_and_cleaned() {
    let ex = validate_new(&input()).unwrap();
    assert_eq!(ex.name_en, "Squat");
    assert_eq!(ex.injury_contraindications, vec!["knee".to_owned()]);
}

#[test]
fn contraindications_are_optional_on_create() {
    let ex = validate_new(&CatalogExerciseInput { injury_contraindications: None, ..input() }).unwrap();
    assert!(ex.injury_contraindications.is_empty());
}

#[test]
fn missing_field_is_named() {
    let err = validate_new(&CatalogExerciseInput { target_muscle_en: None, ..input() }).unwrap_err();
    assert_eq!(err.to_string(), "Missing required field: target_muscle_en");
    let err = validate_new(&CatalogExerciseInput { name_fa: Some("  ".into()), ..input() }).unwrap_err();
    assert_eq!(err.to_string(), "Missing required field: name_fa");
}

#[test]
fn enumerated_fields_are_checked() {
    let err = validate_new(&CatalogExerciseInput { level: Some("expert".into()), ..input() }).unwrap_err();
    assert_eq!(err.to_string(), "Invalid level: expert");
    let err = validate_new(&CatalogExerciseInput { category: Some("yoga".into()), ..input() }).unwrap_err();
    assert!(matches!(err, CatalogError::Invalid { field: "category", .. }));
}

#[test]
fn patch_overlays_only_named_fields() {
    let current = validate_new(&input()).unwrap();
    let patch = CatalogExerciseInput { intensity: Some("heavy".into()), ..CatalogExerciseInput::default() };
    let merged = apply_patch(current.clone(), &patch).unwrap();
    assert_eq!(merged.intensity, "heavy");
    assert_eq!(merged.name_en, current.name_en);
    assert_eq!(merged.injury_contraindications, current.injury_contraindications);

    let cleared = CatalogExerciseInput { injury_contraindications: Some(vec![]), ..CatalogExerciseInput::default() };
    assert!(apply_patch(current, &cleared).unwrap().injury_contraindications.is_empty());
}

#[test]
fn patch_cannot_blank_or_corrupt_a_field() {
    let current = validate_new(&input()).unwrap();
    let blank = CatalogExerciseInput { name_en: Some(String::new()), ..CatalogExerciseInput::default() };
    assert!(matches!(apply_patch(current.clone(), &blank), Err(CatalogError::Missing("name_en"))));
    let bad = CatalogExerciseInput { gender_suitability: Some("any".into()), ..CatalogExerciseInput::default() };
    assert!(matches!(apply_patch(current, &bad), Err(CatalogError::Invalid { .. })));
}

#[test]
fn bulk_items_reports_bad_entries_by_position() {
    let good = serde_json::to_value(input()).unwrap();
    let items = vec![good.clone(), json!({ "name_fa": "x" }), json!("not an object"), good];
    let (valid, errors) = bulk_items(&items);
    assert_eq!(valid.len(), 2);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], "Exercise 2: Missing required field: category");
    assert!(errors[1].starts_with("Exercise 3: "), "{}", errors[1]);
}

#[test]
fn paging_defaults_and_caps() {
    assert_eq!(paging(&CatalogFilter::default()), (1, DEFAULT_PER_PAGE, 0));
    let filter = CatalogFilter { page: Some(3), per_page: Some(20), ..CatalogFilter::default() };
    assert_eq!(paging(&filter), (3, 20, 40));
    let filter = CatalogFilter { page: Some(0), per_page: Some(10_000), ..CatalogFilter::default() };
    assert_eq!(paging(&filter), (1, MAX_PER_PAGE, 0));
}

#[test]
fn page_count_rounds_up() {
    assert_eq!(page_count(0, 50), 0);
    assert_eq!(page_count(50, 50), 1);
    assert_eq!(page_count(51, 50), 2);
}

#[test]
fn not_found_maps_to_404() {
    let err = ApiError::from(CatalogError::NotFound);
    assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    assert_eq!(CatalogError::Empty.error_code(), "E_BAD_REQUEST");
}
