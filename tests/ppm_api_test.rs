// ==========================================
// PPM API 测试（行动计划编辑）
// ==========================================


use chrono::NaiveDate;
use ppm_tracker::api::ApiError;
use ppm_tracker::domain::{ActionPlanEntry, Category, WeekLabel};
use test_helpers::{create_test_state, entry, seed_families};

fn action(text: &str, responsible: &str, status: &str) -> ActionPlanEntry {
    ActionPlanEntry {
        action: text.to_string(),
        responsible: responsible.to_string(),
        due_date: "2025-05-01".to_string(),
        status: status.to_string(),
    }
}

async fn setup_week() -> (tempfile::NamedTempFile, ppm_tracker::AppState) {
    let (tmp, state) = create_test_state();
    seed_families(&state);
    state
        .upload_api
        .save_week_on(
            vec![
                entry("Rayado", "Herramienta", "CD100", 6.0, "CDEF"),
                entry("Golpe", "Manejo", "CD101", 2.0, "CDEF"),
            ],
            18,
            None,
            NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
        )
        .await
        .unwrap();
    (tmp, state)
}

#[tokio::test]
async fn test_update_action_plan_replaces_list() {
    let (_tmp, state) = setup_week().await;
    let week = WeekLabel::new(18).unwrap();
    let rows = state
        .ppm_api
        .get_action_plan(Category::Cdef, week, 2025, false)
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].actions.is_empty());
    let row_id = rows[0].row_id.clone();

    state
        .ppm_api
        .update_action_plan(
            Category::Cdef,
            &row_id,
            vec![
                action("  Cambiar herramienta ", " Mantenimiento ", "En proceso"),
                action("Capacitar", "Calidad", "En proceso"),
            ],
        )
        .unwrap();

    state
        .ppm_api
        .update_status(Category::Cdef, &row_id, ActionPlanEntry::STATUS_COMPLETED)
        .unwrap();

    let rows = state
        .ppm_api
        .get_action_plan(Category::Cdef, week, 2025, false)
        .unwrap();
    let updated = rows.iter().find(|r| r.row_id == row_id).unwrap();
    assert_eq!(updated.actions.len(), 2);
    assert_eq!(updated.actions[0].action, "Cambiar herramienta");
    assert_eq!(updated.actions[0].responsible, "Mantenimiento");
    assert_eq!(updated.actions[0].status, "Completado");
    assert_eq!(updated.actions[1].status, "En proceso");
}

#[tokio::test]
async fn test_update_action_plan_rejects_blank_fields() {
    let (_tmp, state) = setup_week().await;
    let rows = state
        .ppm_api
        .get_action_plan(Category::Cdef, WeekLabel::new(18).unwrap(), 2025, false)
        .unwrap();

    let err = state
        .ppm_api
        .update_action_plan(
            Category::Cdef,
            &rows[0].row_id,
            vec![action("Revisar", "   ", "En proceso")],
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));

    let unchanged = state
        .ppm_api
        .get_action_plan(Category::Cdef, WeekLabel::new(18).unwrap(), 2025, false)
        .unwrap();
    assert!(unchanged[0].actions.is_empty());
}

#[tokio::test]
async fn test_action_plan_edits_target_live_rows_only() {
    let (_tmp, state) = setup_week().await;

    let err = state
        .ppm_api
        .update_status(Category::Cdef, "missing-row", "Completado")
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    // 类别不匹配同样视为不存在
    let rows = state
        .ppm_api
        .get_action_plan(Category::Cdef, WeekLabel::new(18).unwrap(), 2025, false)
        .unwrap();
    let err = state
        .ppm_api
        .update_action_plan(
            Category::Cdu,
            &rows[0].row_id,
            vec![action("Revisar", "Calidad", "En proceso")],
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_current_week() {
    let (_tmp, state) = setup_week().await;
    let current = state.ppm_api.current_week().unwrap().unwrap();
    assert_eq!(current.week.number(), 18);
    assert_eq!(current.year, 2025);
}
