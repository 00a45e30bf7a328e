// ==========================================
// 导入层集成测试
// ==========================================
// 测试范围: 文件解析 → 字段映射 → 规范化（注入 Mock 配置）→ 分类
// ==========================================

mod helpers;


use helpers::mock_config::MockConfig;
use ppm_tracker::importer::{
    DefectImporter, DefectImporterImpl, EntryNormalizerImpl, FieldMapperImpl, ImportError,
    UniversalFileParser,
};
use ppm_tracker::repository::ClassificationRepository;
use std::sync::Arc;
use test_helpers::{create_test_state, seed_families, write_upload_csv};

fn importer(state: &ppm_tracker::AppState, config: MockConfig) -> DefectImporterImpl<MockConfig> {
    DefectImporterImpl::new(
        Arc::new(ClassificationRepository::new(state.connection())),
        config,
        Box::new(UniversalFileParser),
        Box::new(FieldMapperImpl),
        Box::new(EntryNormalizerImpl),
    )
}

#[tokio::test]
async fn test_custom_alias_and_prefix_rules() {
    let (_tmp, state) = create_test_state();
    seed_families(&state);
    let config = MockConfig::default()
        .with_alias("RAYON", "Rayado")
        .with_prefix_fix("CB", "CD");
    let importer = importer(&state, config);

    let file = write_upload_csv(&[
        "R-1,2025-04-07,1,,,1,L1,rayon,A,CB100,,2,",
        "R-2,2025-04-07,1,,,1,L1,Rayado,A,cd100,,3,",
        "R-3,2025-04-07,1,,,1,L1,Doblado,B,CBX1,,1,",
    ]);

    let batch = importer.prepare_file(file.path()).await.unwrap();

    // rayon → Rayado，CB100 → CD100；与 R-2 仅料号大小写不同
    let rayado: Vec<_> = batch.entries.iter().filter(|e| e.defect == "Rayado").collect();
    assert_eq!(rayado[0].part_number, "CD100");
    assert!(rayado.iter().all(|e| e.category == "CDEF"));
    assert_eq!(batch.stats.defect_rewrites, 2);
    assert_eq!(batch.stats.part_fixes, 1);

    // CBX1: 前缀后不是数字，不修正；仍按 CB 前缀归类
    let box_entry = batch.entries.iter().find(|e| e.part_number == "CBX1").unwrap();
    assert_eq!(box_entry.defect, "Mal Doblado");
    assert_eq!(box_entry.category, "Control Box");
    assert!(batch.unclassified_parts.is_empty());
}

#[tokio::test]
async fn test_excel_extension_with_bad_content_is_parse_error() {
    let (_tmp, state) = create_test_state();
    let importer = importer(&state, MockConfig::default());

    let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    std::fs::write(file.path(), b"not a workbook").unwrap();

    let err = importer.prepare_file(file.path()).await.unwrap_err();
    assert!(matches!(err, ImportError::ExcelParseError(_)));
}

#[tokio::test]
async fn test_unsupported_extension() {
    let (_tmp, state) = create_test_state();
    let importer = importer(&state, MockConfig::default());

    let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    let err = importer.prepare_file(file.path()).await.unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(_)));
}
