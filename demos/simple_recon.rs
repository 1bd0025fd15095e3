//! 簡單對帳範例
//!
//! 兩條訂單、三個供應池、一組替代料，輸出三份報表。

use chrono::NaiveDate;
use recon::{ReconConfig, ReconInputs, ReconPipeline, ReportSelection, ResultCache};
use recon_core::{
    DemandLine, InventoryRecord, SourceKind, SubstituteMapping, SupplyPool, SupplyRow, Transaction,
};
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    recon::logging::init();
    println!("===== Simple Reconciliation Example =====\n");

    // 步驟 1: 配置
    let config = ReconConfig::default();
    println!("[1] Active sources:");
    for source in &config.active_sources {
        println!("    - {}", source);
    }
    println!();

    // 步驟 2: 輸入資料
    println!("[2] Build inputs");
    let inputs = build_inputs()?;
    println!(
        "    Demand: {}, Inventory: {}, Pools: {}, Transactions: {}\n",
        inputs.demand.len(),
        inputs.inventory.len(),
        inputs.supply.len(),
        inputs.transactions.len()
    );

    // 步驟 3: 執行
    println!("[3] Run pipeline");
    let pipeline = ReconPipeline::new(config.clone())?;
    let mut cache = ResultCache::new();
    let outputs = pipeline.run_cached(&mut cache, &inputs, ReportSelection::all())?;
    println!("    Warnings: {}\n", outputs.warning_count());

    // 步驟 4: 輸出
    if let Some((headers, rows)) = outputs.suggestion_table(&config) {
        print_table("Suggestions", &headers, &rows, 17);
    }
    if let Some((headers, rows)) = outputs.summary_table(&config) {
        print_table("Summary", &headers, &rows, 12);
    }
    if let Some((headers, rows)) = outputs.consumption_table(&config) {
        print_table("Consumption", &headers, &rows, 12);
    }

    // 相同輸入再跑一次：直接命中緩存
    pipeline.run_cached(&mut cache, &inputs, ReportSelection::all())?;
    println!("Cache: {:?}", cache.stats());

    Ok(())
}

fn build_inputs() -> anyhow::Result<ReconInputs> {
    let date = |y, m, d| {
        NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| anyhow::anyhow!("invalid date {y}-{m}-{d}"))
    };

    let demand = vec![
        DemandLine::new(
            "SO-1001".to_string(),
            "1001".to_string(),
            "1030".to_string(),
            "100200".to_string(),
            Decimal::from(50),
        )
        .with_customer("R-01".to_string(), "C-01".to_string(), "Clinica Norte".to_string())
        .with_description("Gasa esteril".to_string())
        .with_unit_price(Decimal::new(125, 1)),
        DemandLine::new(
            "SO-1002".to_string(),
            "1003".to_string(),
            "1030".to_string(),
            "300400".to_string(),
            Decimal::from(20),
        )
        .with_credit_status("B".to_string()),
    ];

    let inventory = vec![
        InventoryRecord::new("1001".into(), "100200".into(), "1030".into(), Decimal::from(80))
            .with_committed(Decimal::from(10))
            .with_in_transit(Decimal::from(5)),
        InventoryRecord::new("1003".into(), "100200".into(), "1060".into(), Decimal::from(40)),
        InventoryRecord::new("1031".into(), "300401".into(), "1030".into(), Decimal::from(15)),
    ];

    let supply = vec![
        SupplyPool::new(
            SourceKind::NearExpiry,
            vec![SupplyRow::new("100200".into(), "1001".into(), "1030".into(), Decimal::from(12))
                .with_lot("L-77".to_string())
                .with_expiry("2024-07-31".to_string())],
        ),
        SupplyPool::new(
            SourceKind::Pnc,
            vec![SupplyRow::new("300401".into(), "1031".into(), "1030".into(), Decimal::from(9))],
        ),
        SupplyPool::new(
            SourceKind::SlowMoving,
            vec![SupplyRow::candidate("100200".to_string())],
        ),
    ];

    let substitutes = vec![SubstituteMapping::new("300400".to_string(), "300401".to_string())
        .with_description("Jeringa 5ml alt".to_string())];

    let invoice = |day: NaiveDate, qty: i64, amount: i64| {
        Transaction::new("1001".into(), "100200".into(), "1030".into(), day, Decimal::from(qty))
            .with_customer("R-01".to_string(), "C-01".to_string())
            .with_amount(Decimal::from(amount))
    };
    let transactions = vec![
        invoice(date(2024, 3, 10)?, 30, 360),
        invoice(date(2024, 4, 12)?, 45, 562),
    ];

    Ok(ReconInputs::new()
        .with_demand(demand)
        .with_inventory(inventory)
        .with_supply(supply)
        .with_substitutes(substitutes)
        .with_transactions(transactions)
        .with_as_of(date(2024, 5, 15)?))
}

fn print_table(title: &str, headers: &[String], rows: &[Vec<String>], columns: usize) {
    println!("--- {} ({} rows) ---", title, rows.len());
    let shown = columns.min(headers.len());
    println!("{}", headers[..shown].join(" | "));
    for row in rows {
        println!("{}", row[..shown.min(row.len())].join(" | "));
    }
    println!();
}
