//! 內容雜湊與緩存鍵

use recon_core::{
    DemandLine, InventoryRecord, ReconConfig, SubstituteMapping, SupplyPool, Transaction,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 內容指紋（SHA-256 十六進位）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// 計算任意可序列化值的指紋
    pub fn of<T: Serialize + ?Sized>(value: &T) -> crate::Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        let digest = Sha256::digest(&bytes);
        Ok(Self(hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 輸入表類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InputTable {
    Demand,
    Inventory,
    /// 供應池與替代料對照
    Supply,
    Transactions,
    Config,
}

/// 一次對帳的輸入表（借用）
#[derive(Debug, Clone, Copy)]
pub struct RunTables<'a> {
    pub demand: &'a [DemandLine],
    pub inventory: &'a [InventoryRecord],
    pub supply: &'a [SupplyPool],
    pub substitutes: &'a [SubstituteMapping],
    pub transactions: &'a [Transaction],
}

/// 緩存鍵
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey {
    pub demand: Fingerprint,
    pub inventory: Fingerprint,
    pub supply: Fingerprint,
    pub transactions: Fingerprint,
    pub config: Fingerprint,

    /// 其他影響結果的參數（報表選擇、基準日等）
    pub scope: Option<Fingerprint>,
}

impl RunKey {
    /// 計算緩存鍵
    pub fn compute(tables: &RunTables<'_>, config: &ReconConfig) -> crate::Result<Self> {
        let key = Self {
            demand: Fingerprint::of(tables.demand)?,
            inventory: Fingerprint::of(tables.inventory)?,
            supply: Fingerprint::of(&(tables.supply, tables.substitutes))?,
            transactions: Fingerprint::of(tables.transactions)?,
            config: Fingerprint::of(config)?,
            scope: None,
        };
        tracing::debug!("緩存鍵: demand={} config={}", key.demand, key.config);
        Ok(key)
    }

    /// 建構器模式：設置額外參數
    pub fn with_scope<S: Serialize + ?Sized>(mut self, scope: &S) -> crate::Result<Self> {
        self.scope = Some(Fingerprint::of(scope)?);
        Ok(self)
    }

    /// 某張輸入表的指紋
    pub fn fingerprint(&self, table: InputTable) -> &Fingerprint {
        match table {
            InputTable::Demand => &self.demand,
            InputTable::Inventory => &self.inventory,
            InputTable::Supply => &self.supply,
            InputTable::Transactions => &self.transactions,
            InputTable::Config => &self.config,
        }
    }
}
