// ==========================================
// 周缺陷 PPM 追踪系统 - 导入层
// ==========================================
// 职责: 上传文件 → 规范化、已分类的条目批次
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod defect_importer_impl;
pub mod defect_importer_trait;
pub mod error;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use data_cleaner::{EntryNormalizer as EntryNormalizerImpl, NormalizeRules};
pub use defect_importer_impl::DefectImporterImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};

// 重导出 Trait 接口
pub use defect_importer_trait::{DefectImporter, EntryNormalizer, FieldMapper, FileParser};
