//! 對帳配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::supply::SourceKind;

/// 組合來源搜尋策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinationPolicy {
    /// 搜尋所有其他來源
    AllSources,
    /// 第一個有符合列的來源即停止
    FirstMatch,
}

/// 對帳引擎配置（倉庫拓撲與來源順序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// 啟用的來源（依優先順序）
    pub active_sources: Vec<SourceKind>,

    /// 已宣告的其他庫存池名稱
    pub pool_sources: Vec<String>,

    /// 主要儲位（逐儲位庫存 / 在途欄位）
    pub primary_locations: Vec<String>,

    /// 調撥用儲位（跨中心彙總時只看這些儲位）
    pub bulk_locations: Vec<String>,

    /// 主要中心（逐中心庫存 / 未結需求欄位）
    pub primary_centers: Vec<String>,

    /// 調撥中心
    pub redistribution_center: String,

    /// 調撥中心要顯示的儲位
    pub redistribution_locations: Vec<String>,

    /// 信用凍結代碼
    pub credit_block_code: String,

    /// 移動平均視窗（月）
    pub trailing_window_months: u32,

    /// 有庫存但無消耗時的涵蓋月數
    pub coverage_sentinel: Decimal,

    /// 替代料組合搜尋策略
    pub substitute_policy: CombinationPolicy,

    /// 慢動料組合搜尋策略
    pub slow_moving_policy: CombinationPolicy,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            active_sources: vec![
                SourceKind::NearExpiry,
                SourceKind::SlowMoving,
                SourceKind::Pool("Cosmopark".to_string()),
                SourceKind::Substitute,
                SourceKind::Pnc,
                SourceKind::Expired,
            ],
            pool_sources: vec!["Cosmopark".to_string()],
            primary_locations: strings(&["1030", "1031", "1032"]),
            bulk_locations: strings(&["1030", "1031", "1060"]),
            primary_centers: strings(&["1001", "1003", "1004", "1017", "1018", "1022", "1036"]),
            redistribution_center: "1031".to_string(),
            redistribution_locations: strings(&["1030", "1032"]),
            credit_block_code: "B".to_string(),
            trailing_window_months: 12,
            coverage_sentinel: Decimal::from(999),
            substitute_policy: CombinationPolicy::AllSources,
            slow_moving_policy: CombinationPolicy::FirstMatch,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl ReconConfig {
    /// 從 JSON 載入配置，未提供的欄位使用預設值
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| crate::ReconError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置啟用來源（順序即優先順序）
    pub fn with_active_sources(mut self, sources: Vec<SourceKind>) -> Self {
        self.active_sources = sources;
        self
    }

    /// 建構器模式：宣告其他庫存池
    pub fn with_pool_sources(mut self, pools: Vec<String>) -> Self {
        self.pool_sources = pools;
        self
    }

    /// 建構器模式：設置主要儲位
    pub fn with_primary_locations(mut self, locations: Vec<String>) -> Self {
        self.primary_locations = locations;
        self
    }

    /// 建構器模式：設置調撥用儲位
    pub fn with_bulk_locations(mut self, locations: Vec<String>) -> Self {
        self.bulk_locations = locations;
        self
    }

    /// 建構器模式：設置主要中心
    pub fn with_primary_centers(mut self, centers: Vec<String>) -> Self {
        self.primary_centers = centers;
        self
    }

    /// 建構器模式：設置調撥中心與其儲位
    pub fn with_redistribution(mut self, center: String, locations: Vec<String>) -> Self {
        self.redistribution_center = center;
        self.redistribution_locations = locations;
        self
    }

    /// 建構器模式：設置信用凍結代碼
    pub fn with_credit_block_code(mut self, code: String) -> Self {
        self.credit_block_code = code;
        self
    }

    /// 建構器模式：設置移動平均視窗
    pub fn with_trailing_window_months(mut self, months: u32) -> Self {
        self.trailing_window_months = months;
        self
    }

    /// 建構器模式：設置涵蓋月數上限值
    pub fn with_coverage_sentinel(mut self, sentinel: Decimal) -> Self {
        self.coverage_sentinel = sentinel;
        self
    }

    /// 建構器模式：設置組合搜尋策略
    pub fn with_combination_policies(
        mut self,
        substitute: CombinationPolicy,
        slow_moving: CombinationPolicy,
    ) -> Self {
        self.substitute_policy = substitute;
        self.slow_moving_policy = slow_moving;
        self
    }

    /// 是否為調撥用儲位
    pub fn is_bulk_location(&self, location: &str) -> bool {
        self.bulk_locations.iter().any(|l| l == location)
    }

    /// 是否為主要儲位
    pub fn is_primary_location(&self, location: &str) -> bool {
        self.primary_locations.iter().any(|l| l == location)
    }

    /// 可與替代料 / 慢動料組合的其他來源（保持優先順序）
    pub fn combinable_sources(&self) -> Vec<SourceKind> {
        self.active_sources
            .iter()
            .filter(|s| !matches!(s, SourceKind::Substitute | SourceKind::SlowMoving))
            .cloned()
            .collect()
    }

    /// 驗證配置
    pub fn validate(&self) -> crate::Result<()> {
        if self.trailing_window_months == 0 {
            return Err(crate::ReconError::ConfigError(
                "移動平均視窗必須大於 0".to_string(),
            ));
        }

        for source in &self.active_sources {
            if let SourceKind::Pool(name) = source {
                if !self.pool_sources.contains(name) {
                    return Err(crate::ReconError::UnknownSource(name.clone()));
                }
            }
        }

        for (i, source) in self.active_sources.iter().enumerate() {
            if self.active_sources[..i].contains(source) {
                return Err(crate::ReconError::ConfigError(format!(
                    "來源重複: {}",
                    source.label()
                )));
            }
        }

        if self.coverage_sentinel < Decimal::ZERO {
            return Err(crate::ReconError::ConfigError(
                "涵蓋月數上限值不可為負".to_string(),
            ));
        }

        Ok(())
    }
}
