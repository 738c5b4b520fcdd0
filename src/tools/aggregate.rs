//! spending_by_category 工具：最近 N 天按分类汇总支出

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::CategoryAggregator;
use crate::tools::schema::{clamp_rounded, decode_args, parameters_schema_for};
use crate::tools::Tool;

const MAX_DAYS: i64 = 365;

#[derive(Debug, Deserialize, JsonSchema)]
struct AggregateArgs {
    /// Size of the look-back window in days (1-365).
    #[serde(default = "default_days")]
    days: f64,
    /// Number of top categories to return, ordered by total spend.
    #[serde(default = "default_top")]
    top: f64,
}

fn default_days() -> f64 {
    30.0
}

fn default_top() -> f64 {
    10.0
}

pub struct SpendingByCategoryTool {
    backend: Arc<dyn CategoryAggregator>,
    max_categories: usize,
    today: Option<NaiveDate>,
}

impl SpendingByCategoryTool {
    pub fn new(backend: Arc<dyn CategoryAggregator>, max_categories: usize) -> Self {
        Self {
            backend,
            max_categories: max_categories.max(1),
            today: None,
        }
    }

    /// 固定“今天”，用于测试
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn since(&self, days: f64) -> NaiveDate {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let days = clamp_rounded(days, 1, MAX_DAYS) as u64;
        today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
    }
}

#[async_trait]
impl Tool for SpendingByCategoryTool {
    fn name(&self) -> &str {
        "spending_by_category"
    }

    fn description(&self) -> &str {
        "Total the user's spending per category over the last N days. \
         Call this first to see where money goes; then drill into a category with search_transactions. \
         Returns categories ordered by total with transaction counts."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<AggregateArgs>()
    }

    async fn execute(&self, subject_id: &str, args: Value) -> Result<Value, String> {
        let args: AggregateArgs = decode_args(self.name(), args)?;
        let since = self.since(args.days);
        let top = clamp_rounded(args.top, 1, self.max_categories as i64) as usize;
        tracing::info!(subject = %subject_id, %since, top, "spending_by_category");

        let mut totals = self
            .backend
            .totals_by_category(subject_id, since)
            .await
            .map_err(|e| e.to_string())?;
        let grand_total: f64 = totals.iter().map(|t| t.total).sum();
        totals.truncate(top);
        Ok(json!({
            "since": since,
            "grand_total": grand_total,
            "categories": totals,
        }))
    }
}
