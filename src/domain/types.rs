// ==========================================
// 周缺陷 PPM 追踪系统 - 领域类型定义
// ==========================================
// 职责: 产品类别 / 周标签 / 月份名称表
// 约束: 类别固定为 5 个，月份名称为固定表（不依赖 locale）
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 产品类别 (Category)
// ==========================================
// 序列化格式与数据库一致（Tipo 列原值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Rooftop")]
    Rooftop,
    #[serde(rename = "AHUS")]
    Ahus,
    #[serde(rename = "CDEF")]
    Cdef,
    #[serde(rename = "Control Box")]
    ControlBox,
    #[serde(rename = "CDU")]
    Cdu,
}

impl Category {
    /// 周切换时的处理顺序
    pub const ALL: [Category; 5] = [
        Category::Rooftop,
        Category::Ahus,
        Category::Cdef,
        Category::ControlBox,
        Category::Cdu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rooftop => "Rooftop",
            Category::Ahus => "AHUS",
            Category::Cdef => "CDEF",
            Category::ControlBox => "Control Box",
            Category::Cdu => "CDU",
        }
    }

    /// 按分类表中的原值解析（大小写/空白不敏感）
    ///
    /// 返回 None 表示未分类或不属于 5 个固定类别
    pub fn parse(value: &str) -> Option<Category> {
        let normalized = value.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(normalized))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s).ok_or_else(|| format!("未知类别: {}", s))
    }
}

// ==========================================
// 周标签 (WeekLabel)
// ==========================================
// 存储格式: "Semana {n}"，n 为正整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekLabel(u32);

impl WeekLabel {
    pub const PREFIX: &'static str = "Semana ";

    /// 创建周标签（0 视为无效）
    pub fn new(number: u32) -> Option<Self> {
        if number == 0 {
            None
        } else {
            Some(Self(number))
        }
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    /// 解析 "12" 或 "Semana 12"
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix(Self::PREFIX.trim_end())
            .map(str::trim)
            .unwrap_or(trimmed);
        digits.parse::<u32>().ok().and_then(Self::new)
    }
}

impl fmt::Display for WeekLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for WeekLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeekLabel::parse(s).ok_or_else(|| format!("无效的周标签: {}", s))
    }
}

// ==========================================
// 月份名称表
// ==========================================
pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// 由日期派生月份名称
pub fn month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

/// 月份名称 → 1..=12
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name.trim()))
        .map(|idx| idx as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("AHUS"), Some(Category::Ahus));
        assert_eq!(Category::parse(" control box "), Some(Category::ControlBox));
        assert_eq!(Category::parse("rooftop"), Some(Category::Rooftop));
        assert_eq!(Category::parse(""), None);
        assert_eq!(Category::parse("Chiller"), None);
    }

    #[test]
    fn test_category_serde_uses_db_value() {
        let json = serde_json::to_string(&Category::ControlBox).unwrap();
        assert_eq!(json, "\"Control Box\"");
        let back: Category = serde_json::from_str("\"CDEF\"").unwrap();
        assert_eq!(back, Category::Cdef);
    }

    #[test]
    fn test_week_label() {
        assert_eq!(WeekLabel::parse("12").unwrap().to_string(), "Semana 12");
        assert_eq!(WeekLabel::parse("Semana 7").unwrap().number(), 7);
        assert_eq!(WeekLabel::parse(" Semana  3 ").unwrap().number(), 3);
        assert!(WeekLabel::parse("0").is_none());
        assert!(WeekLabel::parse("").is_none());
        assert!(WeekLabel::parse("-4").is_none());
        assert!(WeekLabel::parse("Semana x").is_none());
    }

    #[test]
    fn test_month_name() {
        let d = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        assert_eq!(month_name(d), "Septiembre");
        let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(month_name(d), "Enero");
        assert_eq!(month_number("diciembre"), Some(12));
        assert_eq!(month_number("Smarch"), None);
    }
}
