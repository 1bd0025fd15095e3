//! 對帳流程
//!
//! 依報表選擇執行比對、消耗統計、彙總與消耗報表。
//! 彙總需要建議列與消耗統計，未選擇輸出時仍會在內部計算。
//! 識別碼在進入流程時統一正規化，各引擎只看正規化後的輸入。

use chrono::NaiveDate;
use recon_cache::{CacheError, ResultCache, RunKey, RunTables};
use recon_calc::{
    ConsumptionEngine, ConsumptionOutcome, ConsumptionReport, InventoryAggregator, MatchOutcome,
    MatchingEngine, ReconWarning, ReportOutcome, SummaryBuilder, SummaryOutcome, SupplyIndex,
};
use recon_core::{
    render_table, DemandLine, InventoryRecord, ReconConfig, ReconError, SubstituteMapping,
    SupplyPool, Transaction,
};
use serde::{Deserialize, Serialize};

/// 流程錯誤
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Recon(#[from] ReconError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// 對帳輸入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconInputs {
    pub demand: Vec<DemandLine>,
    pub inventory: Vec<InventoryRecord>,
    pub supply: Vec<SupplyPool>,
    pub substitutes: Vec<SubstituteMapping>,
    pub transactions: Vec<Transaction>,

    /// 消耗報表的基準日（未設置時取今天）
    pub as_of: Option<NaiveDate>,
}

impl ReconInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置需求
    pub fn with_demand(mut self, demand: Vec<DemandLine>) -> Self {
        self.demand = demand;
        self
    }

    /// 建構器模式：設置庫存
    pub fn with_inventory(mut self, inventory: Vec<InventoryRecord>) -> Self {
        self.inventory = inventory;
        self
    }

    /// 建構器模式：設置供應池
    pub fn with_supply(mut self, supply: Vec<SupplyPool>) -> Self {
        self.supply = supply;
        self
    }

    /// 建構器模式：設置替代料對照
    pub fn with_substitutes(mut self, substitutes: Vec<SubstituteMapping>) -> Self {
        self.substitutes = substitutes;
        self
    }

    /// 建構器模式：設置歷史交易
    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions = transactions;
        self
    }

    /// 建構器模式：設置基準日
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn tables(&self) -> RunTables<'_> {
        RunTables {
            demand: &self.demand,
            inventory: &self.inventory,
            supply: &self.supply,
            substitutes: &self.substitutes,
            transactions: &self.transactions,
        }
    }

    /// 正規化所有表的識別碼（"1030.0" → "1030"、去除空白）
    pub fn normalized(&self) -> Self {
        Self {
            demand: self.demand.iter().cloned().map(DemandLine::normalized).collect(),
            inventory: self
                .inventory
                .iter()
                .cloned()
                .map(InventoryRecord::normalized)
                .collect(),
            supply: self.supply.iter().cloned().map(SupplyPool::normalized).collect(),
            substitutes: self
                .substitutes
                .iter()
                .cloned()
                .map(SubstituteMapping::normalized)
                .collect(),
            transactions: self
                .transactions
                .iter()
                .cloned()
                .map(Transaction::normalized)
                .collect(),
            as_of: self.as_of,
        }
    }

    fn resolved_as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// 要輸出的報表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportSelection {
    pub suggestions: bool,
    pub summary: bool,
    pub consumption_report: bool,
}

impl ReportSelection {
    /// 全部報表
    pub fn all() -> Self {
        Self {
            suggestions: true,
            summary: true,
            consumption_report: true,
        }
    }

    pub fn none() -> Self {
        Self {
            suggestions: false,
            summary: false,
            consumption_report: false,
        }
    }

    /// 建構器模式：輸出供應建議
    pub fn with_suggestions(mut self) -> Self {
        self.suggestions = true;
        self
    }

    /// 建構器模式：輸出對帳彙總
    pub fn with_summary(mut self) -> Self {
        self.summary = true;
        self
    }

    /// 建構器模式：輸出消耗報表
    pub fn with_consumption_report(mut self) -> Self {
        self.consumption_report = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        !(self.suggestions || self.summary || self.consumption_report)
    }
}

impl Default for ReportSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// 對帳輸出（未選擇的報表為 None）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconOutputs {
    pub suggestions: Option<MatchOutcome>,
    pub summary: Option<SummaryOutcome>,

    /// 彙總用的消耗統計
    pub consumption: Option<ConsumptionOutcome>,
    pub consumption_report: Option<ReportOutcome>,

    /// 輸入層級的警告（例如庫存彙總時略過的紀錄）
    pub warnings: Vec<ReconWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

/// (表頭, 資料列)
pub type Table = (Vec<String>, Vec<Vec<String>>);

impl ReconOutputs {
    fn empty() -> Self {
        Self {
            suggestions: None,
            summary: None,
            consumption: None,
            consumption_report: None,
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 供應建議表
    pub fn suggestion_table(&self, config: &ReconConfig) -> Option<Table> {
        self.suggestions
            .as_ref()
            .map(|o| render_table(&o.suggestions, config))
    }

    /// 對帳彙總表
    pub fn summary_table(&self, config: &ReconConfig) -> Option<Table> {
        self.summary.as_ref().map(|o| render_table(&o.rows, config))
    }

    /// 消耗報表
    pub fn consumption_table(&self, config: &ReconConfig) -> Option<Table> {
        self.consumption_report
            .as_ref()
            .map(|o| render_table(&o.rows, config))
    }

    /// 所有報表的警告數量
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
            + self.suggestions.as_ref().map_or(0, |o| o.warnings.len())
            + self.summary.as_ref().map_or(0, |o| o.warnings.len())
            + self.consumption.as_ref().map_or(0, |o| o.warnings.len())
            + self.consumption_report.as_ref().map_or(0, |o| o.warnings.len())
    }
}

/// 對帳流程
#[derive(Debug)]
pub struct ReconPipeline {
    config: ReconConfig,
    engine: MatchingEngine,
}

impl ReconPipeline {
    /// 創建流程（配置會先驗證）
    pub fn new(config: ReconConfig) -> Result<Self> {
        config.validate()?;
        let engine = MatchingEngine::new(config.clone());
        Ok(Self { config, engine })
    }

    /// 建構器模式：設置比對引擎（自訂數量規則）
    ///
    /// 引擎的配置取代原配置，同樣先驗證。
    pub fn with_engine(mut self, engine: MatchingEngine) -> Result<Self> {
        engine.config().validate()?;
        self.config = engine.config().clone();
        self.engine = engine;
        Ok(self)
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// 執行對帳
    pub fn run(&self, inputs: &ReconInputs, selection: ReportSelection) -> Result<ReconOutputs> {
        tracing::info!(
            "開始對帳：需求 {} 筆，庫存 {} 筆，供應池 {} 個，交易 {} 筆",
            inputs.demand.len(),
            inputs.inventory.len(),
            inputs.supply.len(),
            inputs.transactions.len()
        );
        let start_time = std::time::Instant::now();
        let mut outputs = ReconOutputs::empty();
        let inputs = &inputs.normalized();

        if selection.suggestions || selection.summary {
            // Step 1: 建立索引與庫存彙總
            let index = SupplyIndex::build(&inputs.supply, &inputs.substitutes);
            let inventory = InventoryAggregator::build(&inputs.inventory, &self.config);
            outputs.warnings.extend_from_slice(inventory.warnings());
            tracing::debug!("Step 1: 索引與庫存彙總完成");

            // Step 2: 供應建議
            let matched = self.engine.run(&inputs.demand, &index, &inventory);
            tracing::debug!("Step 2: 建議列 {} 筆", matched.suggestions.len());

            // Step 3: 消耗統計 + 彙總
            if selection.summary {
                let consumption =
                    ConsumptionEngine::from_config(&self.config).compute(&inputs.transactions);
                let summary = SummaryBuilder::new(self.config.clone()).build(
                    &matched.suggestions,
                    &inventory,
                    &consumption.stats,
                );
                tracing::debug!("Step 3: 彙總列 {} 筆", summary.rows.len());
                outputs.summary = Some(summary);
                outputs.consumption = Some(consumption);
            }

            if selection.suggestions {
                outputs.suggestions = Some(matched);
            }
        }

        // Step 4: 消耗報表
        if selection.consumption_report {
            let report =
                ConsumptionReport::generate(&inputs.transactions, inputs.resolved_as_of());
            tracing::debug!("Step 4: 消耗報表 {} 列", report.rows.len());
            outputs.consumption_report = Some(report);
        }

        outputs.calculation_time_ms = Some(start_time.elapsed().as_millis());
        tracing::info!(
            "對帳完成，警告 {} 筆，耗時 {:?}",
            outputs.warning_count(),
            start_time.elapsed()
        );

        Ok(outputs)
    }

    /// 緩存鍵（輸入 + 配置 + 報表選擇 + 基準日 + 數量規則表）
    pub fn run_key(&self, inputs: &ReconInputs, selection: ReportSelection) -> Result<RunKey> {
        let as_of = selection
            .consumption_report
            .then(|| inputs.resolved_as_of());
        let scope = (selection, as_of, self.engine.resolver_signature());
        let key = RunKey::compute(&inputs.tables(), &self.config)?.with_scope(&scope)?;
        Ok(key)
    }

    /// 執行對帳，相同輸入直接回傳緩存結果
    pub fn run_cached(
        &self,
        cache: &mut ResultCache<ReconOutputs>,
        inputs: &ReconInputs,
        selection: ReportSelection,
    ) -> Result<ReconOutputs> {
        let key = self.run_key(inputs, selection)?;
        let outputs = cache.get_or_try_compute(key, || self.run(inputs, selection))?;
        Ok(outputs.clone())
    }
}
