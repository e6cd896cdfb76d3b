//! Input decoding and sequence normalization.
//!
//! Either an equity curve or a list of trades is turned into one
//! [`NormalizedSequence`]: per-step return, cumulative equity, hour bucket,
//! side and duration, all of the same length. Validation happens here once so
//! nothing downstream has to re-check the input shape.

use crate::config::EquityBaseline;
use crate::errors::{validate_all_finite, validate_finite, PatternAnalysisError, PatternResult};
use crate::math_utils::cumulative_sum;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Largest step return or equity magnitude accepted after normalization.
pub const MAX_MAGNITUDE: f64 = 1e100;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d"];

/// One trade as supplied by a collaborator. Only `pnl` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Profit or loss of the trade
    #[serde(default)]
    pub pnl: Option<f64>,
    /// Any timestamp representation (string or epoch number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    /// Explicit hour-of-day bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<i64>,
    /// Trade direction (e.g. 1 long, -1 short)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<i32>,
    /// Holding duration in caller-defined units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl TradeRecord {
    /// Trade with only a P&L value.
    pub fn with_pnl(pnl: f64) -> Self {
        Self {
            pnl: Some(pnl),
            ..Self::default()
        }
    }

    /// Attach an explicit hour bucket.
    pub fn at_hour(mut self, hour: i64) -> Self {
        self.hour = Some(hour);
        self
    }
}

/// The two accepted input shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SequenceInput {
    /// An equity curve
    Equity {
        /// Equity values in time order
        #[serde(alias = "equity_curve")]
        equity: Vec<f64>,
    },
    /// A list of discrete trades
    Trades {
        /// Trades in the order they occurred
        trades: Vec<TradeRecord>,
    },
}

impl SequenceInput {
    /// Build an equity input.
    pub fn equity(equity: Vec<f64>) -> Self {
        SequenceInput::Equity { equity }
    }

    /// Build a trades input.
    pub fn trades(trades: Vec<TradeRecord>) -> Self {
        SequenceInput::Trades { trades }
    }

    /// Decode from JSON text.
    pub fn from_json_str(text: &str) -> PatternResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PatternAnalysisError::validation("input", format!("invalid JSON: {}", e)))?;
        Self::from_json_value(value)
    }

    /// Decode from a parsed JSON value.
    ///
    /// Objects must carry `equity` (or `equity_curve`) or `trades`; a bare array
    /// is read as a list of trades. Decoding errors name the offending element,
    /// e.g. `trades[3].pnl` or `equity[7]`.
    pub fn from_json_value(value: Value) -> PatternResult<Self> {
        match value {
            Value::Array(items) => decode_trades("trades", &items),
            Value::Object(map) => {
                let equity = map
                    .get("equity")
                    .map(|v| ("equity", v))
                    .or_else(|| map.get("equity_curve").map(|v| ("equity_curve", v)));
                if let Some((key, value)) = equity {
                    return decode_equity(key, value);
                }
                match map.get("trades") {
                    Some(Value::Array(items)) => decode_trades("trades", items),
                    Some(_) => Err(PatternAnalysisError::validation(
                        "trades",
                        "expected an array of trades",
                    )),
                    None => Err(PatternAnalysisError::validation(
                        "input",
                        "expected an `equity` or `trades` key",
                    )),
                }
            }
            _ => Err(PatternAnalysisError::validation(
                "input",
                "expected a JSON object or array",
            )),
        }
    }
}

fn decode_equity(key: &str, value: &Value) -> PatternResult<SequenceInput> {
    let items = value
        .as_array()
        .ok_or_else(|| PatternAnalysisError::validation(key, "expected an array of numbers"))?;
    let equity = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64().ok_or_else(|| {
                PatternAnalysisError::validation(
                    format!("{}[{}]", key, i),
                    format!("expected a number, got {}", item),
                )
            })
        })
        .collect::<PatternResult<Vec<f64>>>()?;
    Ok(SequenceInput::Equity { equity })
}

fn decode_trades(key: &str, items: &[Value]) -> PatternResult<SequenceInput> {
    let trades = items
        .iter()
        .enumerate()
        .map(|(i, item)| decode_trade(&format!("{}[{}]", key, i), item))
        .collect::<PatternResult<Vec<TradeRecord>>>()?;
    Ok(SequenceInput::Trades { trades })
}

/// Decode one trade object field by field; unknown keys are ignored.
fn decode_trade(path: &str, value: &Value) -> PatternResult<TradeRecord> {
    let map = value
        .as_object()
        .ok_or_else(|| PatternAnalysisError::validation(path, "expected a trade object"))?;
    let field = |name: &str| map.get(name).filter(|v| !v.is_null());
    let mistyped = |name: &str, expected: &str, got: &Value| {
        PatternAnalysisError::validation(
            format!("{}.{}", path, name),
            format!("expected {}, got {}", expected, got),
        )
    };

    let pnl = field("pnl")
        .map(|v| v.as_f64().ok_or_else(|| mistyped("pnl", "a number", v)))
        .transpose()?;
    let hour = field("hour")
        .map(|v| whole_number(v).ok_or_else(|| mistyped("hour", "an integer", v)))
        .transpose()?;
    let side = field("side")
        .map(|v| {
            whole_number(v)
                .and_then(|s| i32::try_from(s).ok())
                .ok_or_else(|| mistyped("side", "an integer", v))
        })
        .transpose()?;
    let duration = field("duration")
        .map(|v| v.as_f64().ok_or_else(|| mistyped("duration", "a number", v)))
        .transpose()?;

    Ok(TradeRecord {
        pnl,
        timestamp: field("timestamp").cloned(),
        hour,
        side,
        duration,
    })
}

/// Integer JSON numbers, or floats with no fractional part (`9.0`).
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Canonical per-step representation shared by the whole pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSequence {
    /// Per-step P&L
    pub step_return: Vec<f64>,
    /// Cumulative sum of `step_return`
    pub equity: Vec<f64>,
    /// Hour-of-day bucket in 0..=23
    pub hour: Vec<u8>,
    /// Trade side, 0 when unknown
    pub side: Vec<i32>,
    /// Trade duration, 0.0 when unknown
    pub duration: Vec<f64>,
}

impl NormalizedSequence {
    /// Number of steps (N).
    pub fn len(&self) -> usize {
        self.step_return.len()
    }

    /// True when there are no steps.
    pub fn is_empty(&self) -> bool {
        self.step_return.is_empty()
    }
}

/// Normalize either input shape into a [`NormalizedSequence`].
pub fn normalize_sequence(
    input: &SequenceInput,
    baseline: EquityBaseline,
) -> PatternResult<NormalizedSequence> {
    match input {
        SequenceInput::Equity { equity } => normalize_equity(equity, baseline),
        SequenceInput::Trades { trades } => normalize_trades(trades),
    }
}

fn normalize_equity(equity: &[f64], baseline: EquityBaseline) -> PatternResult<NormalizedSequence> {
    if equity.is_empty() {
        return Err(PatternAnalysisError::validation(
            "equity",
            "must contain at least one value",
        ));
    }
    validate_all_finite(equity, "equity")?;

    let n = equity.len();
    let mut step_return = Vec::with_capacity(n);
    step_return.push(match baseline {
        EquityBaseline::FirstValueAsReturn => equity[0],
        EquityBaseline::Rebased => 0.0,
    });
    step_return.extend(equity.windows(2).map(|w| w[1] - w[0]));

    let equity = cumulative_sum(&step_return);
    ensure_representable(&step_return, &equity)?;
    let hour = (0..n).map(|i| (i % 24) as u8).collect();

    Ok(NormalizedSequence {
        step_return,
        equity,
        hour,
        side: vec![0; n],
        duration: vec![0.0; n],
    })
}

fn normalize_trades(trades: &[TradeRecord]) -> PatternResult<NormalizedSequence> {
    if trades.is_empty() {
        return Err(PatternAnalysisError::validation(
            "trades",
            "must contain at least one trade",
        ));
    }

    let n = trades.len();
    let mut step_return = Vec::with_capacity(n);
    let mut hour = Vec::with_capacity(n);
    let mut side = Vec::with_capacity(n);
    let mut duration = Vec::with_capacity(n);

    for (i, trade) in trades.iter().enumerate() {
        let pnl = trade.pnl.ok_or_else(|| {
            PatternAnalysisError::validation(format!("trades[{}].pnl", i), "missing required field")
        })?;
        validate_finite(pnl, &format!("trades[{}].pnl", i))?;

        let bucket = match trade.hour {
            Some(h) if (0..24).contains(&h) => h as u8,
            Some(h) => {
                return Err(PatternAnalysisError::validation(
                    format!("trades[{}].hour", i),
                    format!("must be in 0..=23, got {}", h),
                ))
            }
            None => trade.timestamp.as_ref().and_then(hour_from_timestamp).unwrap_or(0),
        };

        step_return.push(pnl);
        hour.push(bucket);
        side.push(trade.side.unwrap_or(0));
        duration.push(trade.duration.filter(|d| d.is_finite()).unwrap_or(0.0));
    }

    let equity = cumulative_sum(&step_return);
    ensure_representable(&step_return, &equity)?;

    Ok(NormalizedSequence {
        step_return,
        equity,
        hour,
        side,
        duration,
    })
}

/// Reject sequences whose differences or running sums leave the range where
/// squared-deviation statistics stay finite.
fn ensure_representable(step_return: &[f64], equity: &[f64]) -> PatternResult<()> {
    for (name, values) in [("step_return", step_return), ("equity", equity)] {
        if let Some((i, v)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && v.abs() <= MAX_MAGNITUDE))
        {
            return Err(PatternAnalysisError::NumericalError {
                reason: format!(
                    "{}[{}] = {} is outside +/-{:e}; rescale the input",
                    name, i, v, MAX_MAGNITUDE
                ),
            });
        }
    }
    Ok(())
}

/// Hour of day (UTC) for a loosely typed timestamp, or `None` if unparseable.
pub fn hour_from_timestamp(value: &Value) -> Option<u8> {
    match value {
        Value::Number(number) => number.as_f64().and_then(hour_from_epoch),
        Value::String(text) => hour_from_text(text.trim()),
        _ => None,
    }
}

fn hour_from_epoch(epoch: f64) -> Option<u8> {
    if !epoch.is_finite() {
        return None;
    }
    let millis = if epoch.abs() > EPOCH_MILLIS_THRESHOLD {
        epoch
    } else {
        epoch * 1000.0
    };
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .map(|dt| dt.hour() as u8)
}

fn hour_from_text(text: &str) -> Option<u8> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).hour() as u8);
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.hour() as u8);
        }
    }
    if DATE_FORMATS
        .iter()
        .any(|format| NaiveDate::parse_from_str(text, format).is_ok())
    {
        return Some(0);
    }
    // numeric epoch encoded as a string
    text.parse::<f64>().ok().and_then(hour_from_epoch)
}
