// ==========================================
// 年度 PPM API 测试
// ==========================================


use ppm_tracker::config::config_keys;
use ppm_tracker::domain::AnnualPpmUpdate;
use test_helpers::create_test_state;

fn update(month: &str, escapes: Option<i64>, shipped: Option<i64>) -> AnnualPpmUpdate {
    AnnualPpmUpdate {
        month: month.to_string(),
        escapes,
        shipped,
    }
}

#[test]
fn test_ensure_year_uses_configured_target() {
    let (_tmp, state) = create_test_state();
    state
        .config_manager
        .set_global_config_value(config_keys::ANNUAL_PPM_TARGET, "250")
        .unwrap();

    let rows = state.annual_api.ensure_year(2026).unwrap();
    assert_eq!(rows.len(), 12);
    assert!(rows.iter().all(|r| r.target == 250));
    assert_eq!(
        rows.iter().map(|r| r.month_no).collect::<Vec<_>>(),
        (1..=12).collect::<Vec<u32>>()
    );
}

#[test]
fn test_update_months_computes_ppm() {
    let (_tmp, state) = create_test_state();
    state.annual_api.ensure_year(2025).unwrap();

    let rows = state
        .annual_api
        .update_months(
            2025,
            vec![
                update("Enero", Some(3), Some(10_000)),
                update("febrero", Some(1), Some(3)),
                update("Marzo", Some(4), Some(0)),
                update("Abril", None, Some(500)),
            ],
        )
        .unwrap();

    assert_eq!(rows[0].ppm, Some(300));
    assert_eq!(rows[1].ppm, Some(333_333));
    assert_eq!(rows[2].ppm, None);
    assert_eq!(rows[2].shipped, Some(0));
    assert_eq!(rows[3].ppm, None);
    assert_eq!(rows[4].escapes, None);
}

#[test]
fn test_update_months_for_unseeded_year_fails() {
    let (_tmp, state) = create_test_state();
    let err = state
        .annual_api
        .update_months(2030, vec![update("Enero", Some(1), Some(100))])
        .unwrap_err();
    assert!(matches!(err, ppm_tracker::api::ApiError::NotFound(_)));
    assert!(state.annual_api.ensure_year(2030).unwrap().iter().all(|r| r.ppm.is_none()));
}
