// ==========================================
// 上传 API 端到端测试
// ==========================================
// 测试范围: 文件 → 规范化 / 合并 / 分类 → 周切换 → 帕累托 / 根因读取 → 导出
// ==========================================


use chrono::NaiveDate;
use ppm_tracker::api::EXPORT_HEADERS;
use ppm_tracker::domain::{Category, WeekLabel};
use test_helpers::{create_test_state, entry, seed_families, write_upload_csv};

const ROWS: [&str; 6] = [
    "R-1,2025-04-07,1001,Ensamble,Linea A,1,L1,Doblado,A,48V123,S1,5,",
    "R-2,2025-04-08,1002,Ensamble,Linea A,1,L1,doblado,B,48V123,S2,3,",
    "R-3,2025-04-08,1003,Ensamble,Linea B,2,L2,Rayado,C,48V123,S3,2,",
    "R-4,2025-04-09,1004,Ensamble,Linea B,2,L2,Rayado,C,48V123,S4,2,dup",
    "R-5,2025-04-09,1005,Pintura,,2,L3,Golpe,D,,S5,7,sin parte",
    "R-6,2025-04-10,1006,Pintura,,3,L3,Golpe,E,ZZ900,S6,1,",
];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 11).unwrap()
}

#[tokio::test]
async fn test_preview_normalizes_merges_and_classifies() {
    let (_tmp, state) = create_test_state();
    seed_families(&state);
    let file = write_upload_csv(&ROWS);

    let preview = state
        .upload_api
        .preview_file(file.path().to_str().unwrap())
        .await
        .unwrap();

    let batch = &preview.batch;
    assert_eq!(batch.stats.rows_read, 6);
    assert_eq!(batch.stats.skipped_missing_part, 1);
    assert_eq!(batch.stats.merged_duplicates, 1);
    assert_eq!(batch.entries.len(), 4);

    let doblado: Vec<_> = batch
        .entries
        .iter()
        .filter(|e| e.defect == "Mal Doblado")
        .collect();
    assert_eq!(doblado.len(), 2);
    assert!(doblado.iter().all(|e| e.part_number == "48VV123"));
    assert!(doblado.iter().all(|e| e.category == "Rooftop"));

    let rayado = batch.entries.iter().find(|e| e.defect == "Rayado").unwrap();
    assert_eq!(rayado.quantity, 4.0);

    assert_eq!(batch.unclassified_parts, vec!["ZZ900".to_string()]);
    assert_eq!(preview.unclassified_entries, 1);

    // 预览不落库
    assert!(state.ppm_api.current_week().unwrap().is_none());
}

#[tokio::test]
async fn test_upload_produces_pareto_and_root_causes() {
    let (_tmp, state) = create_test_state();
    seed_families(&state);
    let file = write_upload_csv(&ROWS);

    let preview = state
        .upload_api
        .preview_file(file.path().to_str().unwrap())
        .await
        .unwrap();
    let response = state
        .upload_api
        .save_week_on(preview.batch.entries, 15, Some(0), today())
        .await
        .unwrap();

    assert_eq!(response.report.inserted_entries, 4);
    assert_eq!(response.report.unclassified_entries, 1);

    let week = WeekLabel::new(15).unwrap();
    let pareto = state
        .ppm_api
        .get_pareto(Category::Rooftop, week, 2025, false)
        .unwrap();
    assert_eq!(pareto.total_qty, 12.0);
    assert_eq!(pareto.rows.len(), 2);
    assert_eq!(pareto.rows[0].defect, "Mal Doblado");
    assert_eq!(pareto.rows[0].frequency, 8.0);
    assert_eq!(pareto.rows[0].cumulative_pct, 66.67);
    assert_eq!(pareto.rows[1].cumulative_pct, 100.0);
    let pct_sum: f64 = pareto.rows.iter().map(|r| r.percentage).sum();
    assert!((pct_sum - 1.0).abs() < 1e-9);

    let causes = state
        .ppm_api
        .get_action_plan(Category::Rooftop, week, 2025, false)
        .unwrap();
    assert_eq!(causes.len(), 2);
    assert_eq!(causes[0].item, 1);
    assert_eq!(causes[0].issue, "Mal Doblado");
    assert_eq!(causes[0].root_cause, "A / B");
    assert_eq!(causes[0].qty, 8.0);
    assert_eq!(causes[0].month, "Abril");
    assert_eq!(causes[1].root_cause, "C");

    // 未分类条目不计入任何类别
    for category in Category::ALL {
        if category == Category::Rooftop {
            continue;
        }
        assert!(state
            .ppm_api
            .get_pareto(category, week, 2025, false)
            .unwrap()
            .rows
            .is_empty());
    }
}

#[tokio::test]
async fn test_export_entries_uses_upload_headers() {
    let (_tmp, state) = create_test_state();
    seed_families(&state);
    let file = write_upload_csv(&ROWS);
    let preview = state
        .upload_api
        .preview_file(file.path().to_str().unwrap())
        .await
        .unwrap();
    state
        .upload_api
        .save_week_on(preview.batch.entries, 15, None, today())
        .await
        .unwrap();

    let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    let written = state
        .ppm_api
        .export_entries(
            WeekLabel::new(15).unwrap(),
            2025,
            Category::Rooftop,
            false,
            out.path(),
        )
        .unwrap();
    assert_eq!(written, 3);

    let mut reader = csv::Reader::from_path(out.path()).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, EXPORT_HEADERS.to_vec());

    let folios: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[0].to_string())
        .collect();
    let mut sorted = folios.clone();
    sorted.sort();
    assert_eq!(folios, sorted);
}

#[tokio::test]
async fn test_save_week_normalizes_direct_entries() {
    let (_tmp, state) = create_test_state();
    seed_families(&state);

    // 不经预览直接保存: 空料号被跳过，旧别名与料号前缀被改写
    let response = state
        .upload_api
        .save_week_on(
            vec![
                entry("doblado", "A", "", 3.0, "Rooftop"),
                entry("Doblado", "B", "48V123", 2.0, "AHUS"),
            ],
            15,
            None,
            today(),
        )
        .await
        .unwrap();
    assert_eq!(response.report.inserted_entries, 1);
    assert_eq!(response.report.unclassified_entries, 0);

    let week = WeekLabel::new(15).unwrap();
    let causes = state
        .ppm_api
        .get_action_plan(Category::Rooftop, week, 2025, false)
        .unwrap();
    assert_eq!(causes.len(), 1);
    assert_eq!(causes[0].issue, "Mal Doblado");
    assert_eq!(causes[0].root_cause, "B");
    assert_eq!(causes[0].qty, 2.0);

    // 分类以参照表为准（48VV123 → Rooftop）
    assert!(state
        .ppm_api
        .get_pareto(Category::Ahus, week, 2025, false)
        .unwrap()
        .rows
        .is_empty());
}
