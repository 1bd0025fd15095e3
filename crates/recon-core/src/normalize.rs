//! 欄位正規化
//!
//! 進入核心的識別碼一律以去空白字串比較，
//! 數量與日期在解析點就轉成預設值。

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 試算表匯出常見的空值文字
const NULL_SENTINELS: [&str; 4] = ["nan", "NaN", "None", "NaT"];

/// 日先格式；兩位年份必須排在前面，否則 %Y 會把 "24" 讀成西元 24 年
const DAY_FIRST_FORMATS: [&str; 4] = ["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// ISO 格式
const ISO_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// 判斷是否為空值文字
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NULL_SENTINELS.contains(&trimmed)
}

/// 正規化識別碼：去除空白與數字格式尾碼（"1030.0" → "1030"）
pub fn normalize_id(value: &str) -> String {
    let trimmed = value.trim();
    if is_blank(trimmed) {
        return String::new();
    }

    if let Some(dot) = trimmed.rfind('.') {
        let (head, tail) = trimmed.split_at(dot);
        let zeros = &tail[1..];
        if !head.is_empty() && !zeros.is_empty() && zeros.chars().all(|c| c == '0') {
            return head.to_string();
        }
    }

    trimmed.to_string()
}

/// 寬鬆解析數量，失敗時回傳 0
pub fn parse_quantity(value: &str) -> Decimal {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if is_blank(&cleaned) {
        return Decimal::ZERO;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO)
}

/// 日先解析日期，可帶時間部分；無法解析回傳 None
pub fn parse_date_dayfirst(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if is_blank(trimmed) {
        return None;
    }

    // 去掉時間部分（"31/12/2024 00:00:00"、"2024-12-31T08:00:00"）
    let date_part = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);

    let is_iso = date_part.len() >= 5 && date_part.as_bytes()[4] == b'-'
        || date_part.len() >= 5 && date_part.as_bytes()[4] == b'/';

    let formats: Vec<&str> = if is_iso {
        ISO_FORMATS.iter().chain(DAY_FIRST_FORMATS.iter()).copied().collect()
    } else {
        DAY_FIRST_FORMATS.iter().chain(ISO_FORMATS.iter()).copied().collect()
    };

    formats
        .into_iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// 日期輸出格式 dd/mm/yyyy
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// 格式化到期日；無法解析時回傳空字串
pub fn format_expiry(raw: &str) -> String {
    parse_date_dayfirst(raw).map(format_date).unwrap_or_default()
}

/// 正規化多個識別碼欄位
pub fn normalize_ids(fields: &mut [&mut String]) {
    for field in fields.iter_mut() {
        let normalized = normalize_id(field.as_str());
        **field = normalized;
    }
}

/// serde 寬鬆欄位解析
///
/// 試算表匯出的欄位常混用數字、文字與空值；數字轉成文字後再走同一套解析。
pub mod lenient {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};

    use super::{parse_date_dayfirst, parse_quantity};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Text(String),
        Number(serde_json::Number),
    }

    fn cell<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = match Option::<Cell>::deserialize(deserializer)? {
            Some(Cell::Text(text)) => text,
            Some(Cell::Number(number)) => number.to_string(),
            None => String::new(),
        };
        Ok(text)
    }

    /// 文字或數字欄位（識別碼、代碼）
    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        cell(deserializer)
    }

    /// 數量欄位，無法解析時為 0
    pub fn quantity<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(parse_quantity(&cell(deserializer)?))
    }

    /// 日先日期欄位，無法解析時為 None
    pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(parse_date_dayfirst(&cell(deserializer)?))
    }
}
