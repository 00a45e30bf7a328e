// ==========================================
// 周缺陷 PPM 追踪系统 - 字段映射器实现
// ==========================================
// 职责: 源列名（含别名）→ DefectCandidate
// 列名匹配: 忽略大小写、重音符号与多余空白
// ==========================================

use crate::domain::DefectCandidate;
use crate::importer::defect_importer_trait::FieldMapper as FieldMapperTrait;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;

/// 标准字段 → 可接受的列名（已做列名规范化）
const FOLIO: &[&str] = &["folio reorden", "folio"];
const REPORT_DATE: &[&str] = &["fecha", "fecha reporte", "fecha de reporte"];
const EMPLOYEE: &[&str] = &["empleado", "no empleado", "numero de empleado"];
const AREA: &[&str] = &["area"];
const SUB_AREA: &[&str] = &["subarea", "sub area"];
const SHIFT: &[&str] = &["turno"];
const LINE: &[&str] = &["linea"];
const DEFECT: &[&str] = &["defecto"];
const CAUSE: &[&str] = &["causa"];
const PART_NUMBER: &[&str] = &["numero de parte", "no de parte", "no parte", "numero parte"];
const SEQUENCE: &[&str] = &["secuencia"];
const QUANTITY: &[&str] = &["cantidad"];
const COMMENTS: &[&str] = &["comentarios", "comentario"];

/// 必需列（显示名, 别名）
const REQUIRED: [(&str, &[&str]); 3] = [
    ("Defecto", DEFECT),
    ("Numero de Parte", PART_NUMBER),
    ("Cantidad", QUANTITY),
];

/// 列名规范化：小写、去重音、下划线视为空格、合并空白
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            '_' | '.' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct FieldMapper;

impl FieldMapper {
    fn get(&self, row: &HashMap<String, String>, aliases: &[&str]) -> String {
        aliases
            .iter()
            .find_map(|alias| row.get(*alias))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }
}

impl FieldMapperTrait for FieldMapper {
    fn validate_headers(&self, headers: &[String]) -> ImportResult<()> {
        let present: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        for (display, aliases) in REQUIRED {
            if !aliases.iter().any(|a| present.iter().any(|p| p == a)) {
                return Err(ImportError::MissingColumn(display.to_string()));
            }
        }
        Ok(())
    }

    fn map_to_candidate(
        &self,
        row: HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<DefectCandidate> {
        // 同一规范化列名出现多次时保留第一个非空值
        let mut normalized: HashMap<String, String> = HashMap::with_capacity(row.len());
        for (key, value) in row {
            let entry = normalized.entry(normalize_header(&key)).or_default();
            if entry.trim().is_empty() {
                *entry = value;
            }
        }

        Ok(DefectCandidate {
            folio: self.get(&normalized, FOLIO),
            report_date: self.get(&normalized, REPORT_DATE),
            employee_id: self.get(&normalized, EMPLOYEE),
            area: self.get(&normalized, AREA),
            sub_area: self.get(&normalized, SUB_AREA),
            shift: self.get(&normalized, SHIFT),
            line: self.get(&normalized, LINE),
            defect: self.get(&normalized, DEFECT),
            cause: self.get(&normalized, CAUSE),
            part_number: self.get(&normalized, PART_NUMBER),
            sequence: self.get(&normalized, SEQUENCE),
            quantity: self.get(&normalized, QUANTITY),
            comments: self.get(&normalized, COMMENTS),
            row_number,
        })
    }
}
