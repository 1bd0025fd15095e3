//! 月份期間模型

use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 日曆月份（依 年、月 排序，不依交易先後）
///
/// 序列化為 MM/YYYY 標籤。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthPeriod {
    /// 年
    pub year: i32,
    /// 月（1-12）
    pub month: u32,
}

impl MonthPeriod {
    /// 創建月份期間
    pub fn new(year: i32, month: u32) -> crate::Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(crate::ReconError::InvalidPeriod(format!("{:02}/{}", month, year)));
        }
        Ok(Self { year, month })
    }

    /// 取得日期所屬月份
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// 解析 MM/YYYY 標籤
    pub fn parse_label(label: &str) -> crate::Result<Self> {
        let invalid = || crate::ReconError::InvalidPeriod(label.to_string());

        let (month, year) = label.trim().split_once('/').ok_or_else(invalid)?;
        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        let year: i32 = year.trim().parse().map_err(|_| invalid())?;

        Self::new(year, month)
    }

    /// MM/YYYY 標籤
    pub fn label(&self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }

    /// 數值鍵 YYYYMM
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 100 + i64::from(self.month)
    }

    /// 兩個月份之間相差的月數（self - earlier）
    pub fn months_since(&self, earlier: &MonthPeriod) -> i64 {
        (i64::from(self.year) - i64::from(earlier.year)) * 12 + i64::from(self.month)
            - i64::from(earlier.month)
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for MonthPeriod {
    type Err = crate::ReconError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse_label(s)
    }
}

impl Serialize for MonthPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for MonthPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse_label(&label).map_err(de::Error::custom)
    }
}
