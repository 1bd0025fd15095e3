//! 表格輸出
//!
//! 結果以固定欄位順序輸出為字串表格（標題列 + 資料列）。
//! 動態欄位群組（每個主要儲位、調撥儲位、主要中心各一欄）由配置展開。

use rust_decimal::Decimal;

use crate::config::ReconConfig;
use crate::consumption::ConsumptionReportRow;
use crate::inventory::QtyBreakdown;
use crate::normalize::format_date;
use crate::period::MonthPeriod;
use crate::suggestion::SuggestionLine;
use crate::summary::SummaryRow;

/// 可輸出為表格列的結果
pub trait TabularRow {
    /// 標題列
    fn headers(config: &ReconConfig) -> Vec<String>;

    /// 資料列（與標題欄位一一對應）
    fn cells(&self, config: &ReconConfig) -> Vec<String>;
}

/// 輸出整張表格
pub fn render_table<R: TabularRow>(
    rows: &[R],
    config: &ReconConfig,
) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = R::headers(config);
    let body = rows.iter().map(|row| row.cells(config)).collect();
    (headers, body)
}

fn fmt_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

/// 無法計算的數字輸出為空白
fn fmt_optional(value: Option<Decimal>) -> String {
    value.map(fmt_decimal).unwrap_or_default()
}

fn fmt_period(period: Option<MonthPeriod>) -> String {
    period.map(|p| p.label()).unwrap_or_default()
}

/// 依配置鍵順序輸出分項數量
fn breakdown_cells(breakdown: &QtyBreakdown, keys: &[String]) -> Vec<String> {
    keys.iter().map(|k| fmt_decimal(breakdown.get(k))).collect()
}

fn redistribution_headers(config: &ReconConfig) -> Vec<String> {
    config
        .redistribution_locations
        .iter()
        .map(|loc| format!("Available {}-{}", config.redistribution_center, loc))
        .collect()
}

fn prefixed(prefix: &str, keys: &[String]) -> Vec<String> {
    keys.iter().map(|k| format!("{} {}", prefix, k)).collect()
}

impl TabularRow for SuggestionLine {
    fn headers(config: &ReconConfig) -> Vec<String> {
        let mut headers: Vec<String> = [
            "Client Group",
            "Date",
            "Order",
            "Seller Group",
            "Requester",
            "Recipient",
            "Legal Name",
            "Order Center",
            "Location",
            "Requested Material",
            "Base Material",
            "Requested Description",
            "Ordered Qty",
            "Pending Qty",
            "Offerable Qty",
            "Price",
            "Source",
            "Suggested Material",
            "Suggested Description",
            "Suggested Center",
            "Suggested Location",
            "Available",
            "Lot",
            "Expiry Date",
            "Center (Inv)",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        headers.extend(prefixed("Inv", &config.primary_locations));
        headers.push("In Transit".to_string());
        headers.extend(prefixed("In Transit", &config.primary_locations));
        headers.extend(redistribution_headers(config));
        headers.extend(prefixed("Inv", &config.primary_centers));
        headers.push("Blocked".to_string());
        headers
    }

    fn cells(&self, config: &ReconConfig) -> Vec<String> {
        let d = &self.demand;
        let mut cells = vec![
            d.client_group.clone(),
            d.date.map(format_date).unwrap_or_default(),
            d.order_id.clone(),
            d.seller_group.clone(),
            d.requester_id.clone(),
            d.recipient_id.clone(),
            d.legal_name.clone(),
            d.center.clone(),
            d.location.clone(),
            d.material.clone(),
            d.base_material.clone(),
            d.description.clone(),
            fmt_decimal(d.ordered_qty),
            fmt_decimal(d.pending_qty),
            fmt_decimal(self.offerable_qty),
            fmt_decimal(d.unit_price),
            self.source.label(),
            self.suggested_material.clone(),
            self.suggested_description.clone(),
            self.suggested_center.clone(),
            self.suggested_location.clone(),
            fmt_decimal(self.available_qty),
            self.lot.clone(),
            self.expiry.clone(),
            self.snapshot.center.clone(),
        ];

        let snap = &self.snapshot;
        cells.extend(breakdown_cells(&snap.stock_by_location, &config.primary_locations));
        cells.push(fmt_optional(snap.transit_total));
        cells.extend(breakdown_cells(&snap.transit_by_location, &config.primary_locations));
        cells.extend(breakdown_cells(&snap.redistribution_stock, &config.redistribution_locations));
        cells.extend(breakdown_cells(&snap.bulk_by_center, &config.primary_centers));
        cells.push(self.block_status.label().to_string());
        cells
    }
}

impl TabularRow for SummaryRow {
    fn headers(config: &ReconConfig) -> Vec<String> {
        let mut headers: Vec<String> = vec![
            "Center".to_string(),
            "Location".to_string(),
            "Orders".to_string(),
            "Material".to_string(),
            "Description".to_string(),
            "Pending Qty".to_string(),
            "Pending Amount".to_string(),
            format!("Avg Consumption {}M", config.trailing_window_months),
            "Last Consumption Month".to_string(),
            "Last Month Qty".to_string(),
            "Previous Consumption Month".to_string(),
            "Previous Month Qty".to_string(),
            "Coverage Months".to_string(),
        ];

        headers.extend(prefixed("Inv", &config.primary_locations));
        headers.push("In Transit".to_string());
        headers.extend(redistribution_headers(config));
        headers.extend(prefixed("Pending", &config.primary_centers));
        headers.push("Origin".to_string());
        headers
    }

    fn cells(&self, config: &ReconConfig) -> Vec<String> {
        let mut cells = vec![
            self.key.center.clone(),
            self.key.location.clone(),
            self.order_count.to_string(),
            self.key.material.clone(),
            self.description.clone(),
            fmt_decimal(self.pending_qty),
            fmt_decimal(self.pending_amount),
            fmt_decimal(self.trailing_avg),
            fmt_period(self.last_period),
            fmt_decimal(self.last_qty),
            fmt_period(self.previous_period),
            fmt_decimal(self.previous_qty),
            fmt_decimal(self.coverage_months),
        ];

        cells.extend(breakdown_cells(&self.stock_by_location, &config.primary_locations));
        cells.push(fmt_decimal(self.transit_at_location));
        cells.extend(breakdown_cells(&self.redistribution_stock, &config.redistribution_locations));
        cells.extend(breakdown_cells(&self.pending_by_center, &config.primary_centers));
        cells.push(self.origin.label().to_string());
        cells
    }
}

impl TabularRow for ConsumptionReportRow {
    fn headers(_config: &ReconConfig) -> Vec<String> {
        [
            "Center",
            "Client Group",
            "Seller Group",
            "Requester",
            "Recipient",
            "Legal Name",
            "Material",
            "Description",
            "Last Purchase",
            "Recipient Last Invoice",
            "Avg Monthly Consumption",
            "Current Consumption",
            "Unit",
            "Trend",
            "Quantity Trend",
            "Last Invoice Month",
            "Last Qty",
            "Last Amount",
            "Last Unit Price",
            "Previous Invoice Month",
            "Previous Qty",
            "Previous Amount",
            "Previous Unit Price",
            "Price Min",
            "Price Max",
            "Price Avg",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn cells(&self, _config: &ReconConfig) -> Vec<String> {
        vec![
            self.center.clone(),
            self.client_group.clone(),
            self.seller_group.clone(),
            self.requester_id.clone(),
            self.recipient_id.clone(),
            self.legal_name.clone(),
            self.material.clone(),
            self.description.clone(),
            // 兩欄同值：收貨方最後交易月份
            self.recipient_last_invoice.clone(),
            self.recipient_last_invoice.clone(),
            fmt_decimal(self.avg_monthly_consumption),
            fmt_decimal(self.current_consumption),
            self.unit.clone(),
            fmt_decimal(self.trend),
            fmt_decimal(self.quantity_trend),
            fmt_period(self.last_period),
            fmt_decimal(self.last_qty),
            fmt_decimal(self.last_amount),
            fmt_decimal(self.last_unit_price),
            fmt_period(self.previous_period),
            fmt_decimal(self.previous_qty),
            fmt_decimal(self.previous_amount),
            fmt_decimal(self.previous_unit_price),
            fmt_decimal(self.price_min),
            fmt_decimal(self.price_max),
            fmt_decimal(self.price_avg),
        ]
    }
}
