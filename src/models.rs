use crate::error::{FeedError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const NATIVE_ASSET_CODE: &str = "XLM";
pub const STROOPS_PER_LUMEN: f64 = 10_000_000.0;

/// Operation types that move an asset between accounts.
pub const PAYMENT_OPERATION_TYPES: [&str; 4] = [
    "payment",
    "path_payment_strict_receive",
    "path_payment_strict_send",
    "create_account",
];

/// Reads a decimal amount that Horizon may send as a string or a number.
/// Missing, null or unparsable amounts count as zero.
pub fn parse_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_u64(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    }
}

fn parse_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

fn parse_timestamp(kind: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FeedError::malformed(kind, format!("bad timestamp {:?}: {}", raw, e)))
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    id: Option<String>,
    hash: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    source_account: Option<String>,
    #[serde(default)]
    operation_count: Option<u32>,
    #[serde(default)]
    fee_charged: Option<Value>,
    #[serde(default)]
    memo: Option<String>,
    #[serde(default)]
    successful: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub source_account: String,
    pub operation_count: u32,
    pub total_amount: f64,
    /// In lumens.
    pub fee_charged: f64,
    pub memo: Option<String>,
    pub successful: bool,
}

impl TransactionRecord {
    pub fn from_record(record: &Value) -> Result<Self> {
        let raw: RawTransaction = serde_json::from_value(record.clone())
            .map_err(|e| FeedError::malformed("transaction", e.to_string()))?;

        let id = raw
            .id
            .ok_or_else(|| FeedError::malformed("transaction", "missing id"))?;
        let hash = raw
            .hash
            .ok_or_else(|| FeedError::malformed("transaction", format!("{} has no hash", id)))?;
        let created_at = raw
            .created_at
            .ok_or_else(|| FeedError::malformed("transaction", format!("{} has no created_at", id)))?;
        let created_at = parse_timestamp("transaction", &created_at)?;

        Ok(Self {
            id,
            hash,
            created_at,
            source_account: raw.source_account.unwrap_or_default(),
            operation_count: raw.operation_count.unwrap_or(0),
            total_amount: 0.0,
            fee_charged: parse_amount(raw.fee_charged.as_ref()) / STROOPS_PER_LUMEN,
            memo: raw.memo,
            successful: raw.successful.unwrap_or(true),
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Deserialize)]
struct RawOperation {
    #[serde(rename = "type")]
    op_type: Option<String>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    asset_code: Option<String>,
    #[serde(default)]
    asset_issuer: Option<String>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    starting_balance: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    pub op_type: String,
    pub asset_type: Option<String>,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub amount: f64,
}

impl OperationRecord {
    pub fn from_record(record: &Value) -> Result<Self> {
        let raw: RawOperation = serde_json::from_value(record.clone())
            .map_err(|e| FeedError::malformed("operation", e.to_string()))?;

        let op_type = raw
            .op_type
            .ok_or_else(|| FeedError::malformed("operation", "missing type"))?;

        // create_account funds a new account with the native asset
        if op_type == "create_account" {
            return Ok(Self {
                op_type,
                asset_type: Some("native".to_string()),
                asset_code: None,
                asset_issuer: None,
                amount: parse_amount(raw.starting_balance.as_ref()),
            });
        }

        Ok(Self {
            op_type,
            asset_type: raw.asset_type,
            asset_code: raw.asset_code,
            asset_issuer: raw.asset_issuer,
            amount: parse_amount(raw.amount.as_ref()),
        })
    }

    pub fn is_payment(&self) -> bool {
        PAYMENT_OPERATION_TYPES.contains(&self.op_type.as_str())
    }

    pub fn is_native(&self) -> bool {
        match self.asset_type.as_deref() {
            Some(asset_type) => asset_type == "native",
            None => match self.asset_code.as_deref() {
                None => true,
                Some(code) => code == NATIVE_ASSET_CODE,
            },
        }
    }
}

/// The asset a volume query is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetFilter {
    Native,
    Credit { code: String, issuer: Option<String> },
}

impl AssetFilter {
    pub fn new(asset_code: &str, asset_issuer: Option<&str>) -> Self {
        let code = asset_code.trim();
        if code.eq_ignore_ascii_case(NATIVE_ASSET_CODE) || code.eq_ignore_ascii_case("native") {
            return AssetFilter::Native;
        }

        AssetFilter::Credit {
            code: code.to_string(),
            issuer: asset_issuer
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(str::to_string),
        }
    }

    pub fn matches(&self, operation: &OperationRecord) -> bool {
        match self {
            AssetFilter::Native => operation.is_native(),
            AssetFilter::Credit { code, issuer } => {
                if operation.is_native() || operation.asset_code.as_deref() != Some(code.as_str()) {
                    return false;
                }
                match issuer {
                    Some(issuer) => operation.asset_issuer.as_deref() == Some(issuer.as_str()),
                    None => true,
                }
            }
        }
    }

    /// Amount of this asset the operation moves, zero when it moves something else.
    pub fn amount_moved(&self, operation: &OperationRecord) -> f64 {
        if operation.is_payment() && self.matches(operation) {
            operation.amount
        } else {
            0.0
        }
    }
}

pub fn bucket_label(index: usize) -> String {
    format!("hour_{}", index)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeData {
    pub asset_code: String,
    pub asset_issuer: Option<String>,
    pub time_period_hours: u32,
    pub total_volume: f64,
    pub transaction_count: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub volume_by_hour: BTreeMap<String, f64>,
}

impl VolumeData {
    pub fn average_hourly_volume(&self) -> f64 {
        if self.time_period_hours == 0 {
            return 0.0;
        }
        self.total_volume / self.time_period_hours as f64
    }

    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert(
                "average_hourly_volume".to_string(),
                Value::from(self.average_hourly_volume()),
            );
        }
        value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeeStats {
    #[serde(rename = "fee_last_ledger")]
    pub last_ledger: Option<u64>,
    #[serde(rename = "fee_last_ledger_base_fee")]
    pub last_ledger_base_fee: Option<u64>,
    #[serde(rename = "fee_ledger_capacity_usage")]
    pub ledger_capacity_usage: Option<f64>,
    #[serde(rename = "fee_charged_min")]
    pub charged_min: Option<u64>,
    #[serde(rename = "fee_charged_mode")]
    pub charged_mode: Option<u64>,
    #[serde(rename = "fee_charged_p50")]
    pub charged_p50: Option<u64>,
    #[serde(rename = "fee_charged_p90")]
    pub charged_p90: Option<u64>,
    #[serde(rename = "fee_charged_p99")]
    pub charged_p99: Option<u64>,
    #[serde(rename = "fee_charged_max")]
    pub charged_max: Option<u64>,
}

impl FeeStats {
    pub fn from_record(record: &Value) -> Self {
        let charged = record.get("fee_charged");
        let charged_field = |key: &str| parse_u64(charged.and_then(|c| c.get(key)));

        Self {
            last_ledger: parse_u64(record.get("last_ledger")),
            last_ledger_base_fee: parse_u64(record.get("last_ledger_base_fee")),
            ledger_capacity_usage: parse_f64(record.get("ledger_capacity_usage")),
            charged_min: charged_field("min"),
            charged_mode: charged_field("mode"),
            charged_p50: charged_field("p50"),
            charged_p90: charged_field("p90"),
            charged_p99: charged_field("p99"),
            charged_max: charged_field("max"),
        }
    }
}

/// Point-in-time view of network health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStats {
    pub latest_ledger: u64,
    pub ledger_closed_at: Option<DateTime<Utc>>,
    pub transaction_count: u64,
    pub failed_transaction_count: u64,
    pub operation_count: u64,
    pub protocol_version: Option<u64>,
    pub total_coins: Option<f64>,
    pub fee_pool: Option<f64>,
    pub base_fee_in_stroops: Option<u64>,
    pub base_reserve_in_stroops: Option<u64>,
    #[serde(flatten)]
    pub fees: FeeStats,
}

impl NetworkStats {
    pub fn from_records(ledger: &Value, fee_stats: &Value) -> Result<Self> {
        let latest_ledger = parse_u64(ledger.get("sequence"))
            .ok_or_else(|| FeedError::malformed("ledger", "missing sequence"))?;

        let ledger_closed_at = match ledger.get("closed_at").and_then(Value::as_str) {
            Some(raw) => Some(parse_timestamp("ledger", raw)?),
            None => None,
        };

        let transaction_count = parse_u64(ledger.get("successful_transaction_count"))
            .or_else(|| parse_u64(ledger.get("transaction_count")))
            .unwrap_or(0);

        Ok(Self {
            latest_ledger,
            ledger_closed_at,
            transaction_count,
            failed_transaction_count: parse_u64(ledger.get("failed_transaction_count")).unwrap_or(0),
            operation_count: parse_u64(ledger.get("operation_count")).unwrap_or(0),
            protocol_version: parse_u64(ledger.get("protocol_version")),
            total_coins: parse_f64(ledger.get("total_coins")),
            fee_pool: parse_f64(ledger.get("fee_pool")),
            base_fee_in_stroops: parse_u64(ledger.get("base_fee_in_stroops")),
            base_reserve_in_stroops: parse_u64(ledger.get("base_reserve_in_stroops")),
            fees: FeeStats::from_record(fee_stats),
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
