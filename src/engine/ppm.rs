// ==========================================
// 周缺陷 PPM 追踪系统 - PPM 计算
// ==========================================
// PPM = round(逃逸件数 ÷ 发运件数 × 1 000 000)
// 任一值缺失或发运件数 ≤ 0 时不计算
// ==========================================

use crate::domain::{month_number, AnnualPpmUpdate, MONTH_NAMES};

pub const PPM_SCALE: f64 = 1_000_000.0;

pub fn compute_ppm(escapes: Option<i64>, shipped: Option<i64>) -> Option<i64> {
    match (escapes, shipped) {
        (Some(esc), Some(ship)) if ship > 0 && esc >= 0 => {
            Some((esc as f64 / ship as f64 * PPM_SCALE).round() as i64)
        }
        _ => None,
    }
}

/// 年度表的 12 个月（月序号, 月份名）
pub fn annual_months() -> Vec<(u32, &'static str)> {
    MONTH_NAMES
        .iter()
        .enumerate()
        .map(|(idx, name)| (idx as u32 + 1, *name))
        .collect()
}

/// 月度更新 → (month_no, escapes, shipped, ppm)；月份名无法识别时返回 Err(月份名)
pub fn resolve_update(
    update: &AnnualPpmUpdate,
) -> Result<(u32, Option<i64>, Option<i64>, Option<i64>), String> {
    let month_no = month_number(&update.month).ok_or_else(|| update.month.clone())?;
    Ok((
        month_no,
        update.escapes,
        update.shipped,
        compute_ppm(update.escapes, update.shipped),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_ppm() {
        assert_eq!(compute_ppm(Some(3), Some(10_000)), Some(300));
        assert_eq!(compute_ppm(Some(1), Some(3)), Some(333_333));
        assert_eq!(compute_ppm(Some(2), Some(3)), Some(666_667));
        assert_eq!(compute_ppm(Some(0), Some(50)), Some(0));
        assert_eq!(compute_ppm(Some(1), Some(0)), None);
        assert_eq!(compute_ppm(None, Some(10)), None);
        assert_eq!(compute_ppm(Some(1), None), None);
    }

    #[test]
    fn test_resolve_update() {
        let update = AnnualPpmUpdate {
            month: "marzo".to_string(),
            escapes: Some(4),
            shipped: Some(20_000),
        };
        assert_eq!(resolve_update(&update), Ok((3, Some(4), Some(20_000), Some(200))));

        let bad = AnnualPpmUpdate {
            month: "Marchember".to_string(),
            escapes: None,
            shipped: None,
        };
        assert_eq!(resolve_update(&bad), Err("Marchember".to_string()));
        assert_eq!(annual_months().len(), 12);
        assert_eq!(annual_months()[11], (12, "Diciembre"));
    }
}
