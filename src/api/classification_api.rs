// ==========================================
// 周缺陷 PPM 追踪系统 - 分类参照 API
// ==========================================
// 职责: 料号查分类、维护 classification_family 参照表
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{Classification, ClassificationRecord};
use crate::engine::ClassificationIndex;
use crate::importer::field_mapper::normalize_header;
use crate::importer::{FileParser, ImportError, UniversalFileParser};
use crate::repository::ClassificationRepository;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const FAMILY_COLUMN: &str = "familia";
const PRODUCT_COLUMN: &str = "producto";
const CATEGORY_COLUMN: &str = "tipo";

pub struct ClassificationApi {
    repo: ClassificationRepository,
}

impl ClassificationApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repo: ClassificationRepository::new(conn),
        }
    }

    /// 料号 → (产品族, 类别)；未命中映射为空字符串
    pub fn lookup(&self, parts: &[String]) -> ApiResult<HashMap<String, Classification>> {
        let index = ClassificationIndex::new(self.repo.list_all()?);
        Ok(index.resolve_batch(parts.iter().map(String::as_str)))
    }

    pub fn upsert_families(&self, records: Vec<ClassificationRecord>) -> ApiResult<usize> {
        let records: Vec<ClassificationRecord> = records
            .into_iter()
            .map(|r| ClassificationRecord {
                family: r.family.trim().to_string(),
                product_family: r.product_family.trim().to_string(),
                category: r.category.trim().to_string(),
            })
            .filter(|r| !r.family.is_empty())
            .collect();

        if records.is_empty() {
            return Err(ApiError::InvalidInput("没有有效的料号前缀".to_string()));
        }
        Ok(self.repo.batch_upsert(&records)?)
    }

    /// 从 CSV / Excel 导入参照表（列: Familia, Producto, Tipo）
    pub fn import_families(&self, file_path: &str) -> ApiResult<usize> {
        let rows = UniversalFileParser.parse_to_raw_records(Path::new(file_path))?;

        let mut records = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            let row: HashMap<String, String> = row
                .into_iter()
                .map(|(k, v)| (normalize_header(&k), v))
                .collect();
            if idx == 0 {
                for column in [FAMILY_COLUMN, PRODUCT_COLUMN, CATEGORY_COLUMN] {
                    if !row.contains_key(column) {
                        return Err(ImportError::MissingColumn(column.to_string()).into());
                    }
                }
            }

            let field = |name: &str| row.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
            let family = field(FAMILY_COLUMN);
            if family.is_empty() {
                warn!(row_number = idx + 2, "料号前缀为空，跳过该行");
                continue;
            }
            records.push(ClassificationRecord {
                family,
                product_family: field(PRODUCT_COLUMN),
                category: field(CATEGORY_COLUMN),
            });
        }

        let count = self.upsert_families(records)?;
        info!(count, "分类参照表导入完成");
        Ok(count)
    }

    pub fn count(&self) -> ApiResult<usize> {
        Ok(self.repo.count()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn api() -> ClassificationApi {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ClassificationApi::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_import_and_lookup() {
        let api = api();
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Familia,Producto,Tipo").unwrap();
        writeln!(file, "48V,Short,AHUS").unwrap();
        writeln!(file, "48VV1,Roof,Rooftop").unwrap();
        writeln!(file, ",Nada,CDU").unwrap();

        let count = api
            .import_families(file.path().to_str().unwrap())
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(api.count().unwrap(), 2);

        let result = api
            .lookup(&["48VV123".to_string(), "XYZ".to_string()])
            .unwrap();
        assert_eq!(result["48VV123"].product_family, "Roof");
        assert_eq!(result["XYZ"], Classification::unresolved());
    }

    #[test]
    fn test_import_requires_columns() {
        let api = api();
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Familia,Producto").unwrap();
        writeln!(file, "48V,Short").unwrap();

        let err = api
            .import_families(file.path().to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }
}
