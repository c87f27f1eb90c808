use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ── Enumerations ───────────────────────────────────────────────────

/// Side of a binary bet or sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "YES" => Ok(Outcome::Yes),
            "NO" => Ok(Outcome::No),
            other => Err(Error::InvalidArgument(format!(
                "outcome must be YES or NO, got {other:?}"
            ))),
        }
    }
}

/// Sort key for market positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionOrder {
    #[default]
    Profit,
    Shares,
}

impl PositionOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionOrder::Profit => "profit",
            PositionOrder::Shares => "shares",
        }
    }
}

impl fmt::Display for PositionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "profit" => Ok(PositionOrder::Profit),
            "shares" => Ok(PositionOrder::Shares),
            other => Err(Error::InvalidArgument(format!(
                "order must be profit or shares, got {other:?}"
            ))),
        }
    }
}

// ── Request bodies ─────────────────────────────────────────────────

/// Body of `POST /bet`. Optional fields are left out of the JSON when unset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub contract_id: String,
    pub amount: f64,
    pub outcome: Outcome,
    /// Limit order target probability, strictly between 0 and 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_prob: Option<f64>,
    /// Limit order expiry in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

impl PlaceBetRequest {
    pub fn new(contract_id: impl Into<String>, amount: f64, outcome: Outcome) -> Self {
        Self {
            contract_id: contract_id.into(),
            amount,
            outcome,
            limit_prob: None,
            expires_at: None,
            dry_run: false,
        }
    }

    pub fn limit_prob(mut self, prob: f64) -> Self {
        self.limit_prob = Some(prob);
        self
    }

    pub fn expires_at(mut self, millis: i64) -> Self {
        self.expires_at = Some(millis);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reject obviously invalid bets before they reach the network.
    pub fn validate(&self) -> Result<()> {
        if self.contract_id.trim().is_empty() {
            return Err(Error::InvalidArgument("contract id must not be empty".into()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "amount must be a positive number, got {}",
                self.amount
            )));
        }
        if let Some(p) = self.limit_prob {
            if !(p > 0.0 && p < 1.0) {
                return Err(Error::InvalidArgument(format!(
                    "limit probability must be between 0 and 1, got {p}"
                )));
            }
        }
        Ok(())
    }
}

/// Body of `POST /market/{id}/sell`. Without `shares` the whole position is sold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<f64>,
    /// Only meaningful for multiple-choice markets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<String>,
}

impl SellRequest {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            shares: None,
            answer_id: None,
        }
    }

    pub fn shares(mut self, shares: f64) -> Self {
        self.shares = Some(shares);
        self
    }

    pub fn answer_id(mut self, answer_id: impl Into<String>) -> Self {
        self.answer_id = Some(answer_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(shares) = self.shares {
            if !shares.is_finite() || shares <= 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "shares must be a positive number, got {shares}"
                )));
            }
        }
        Ok(())
    }
}

// ── Query strings ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    pub term: String,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetsQuery {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
}

impl BetsQuery {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            contract_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsQuery {
    pub order: PositionOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

// ── Display views ──────────────────────────────────────────────────
//
// Responses are passed through as raw JSON. These views only pick out the
// fields shown on the console and tolerate anything missing or null.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketHit {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnswerView {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub probability: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketView {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub outcome_type: String,
    pub probability: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub answers: Vec<AnswerView>,
    pub total_liquidity: Option<f64>,
    #[serde(rename = "volume24Hours")]
    pub volume_24h: Option<f64>,
    pub url: Option<String>,
}

impl MarketView {
    pub fn is_multiple_choice(&self) -> bool {
        self.outcome_type == "MULTIPLE_CHOICE"
    }

    pub fn is_binary(&self) -> bool {
        self.outcome_type == "BINARY"
    }

    /// Answers ordered by probability, highest first.
    pub fn sorted_answers(&self) -> Vec<&AnswerView> {
        let mut answers: Vec<&AnswerView> = self.answers.iter().collect();
        answers.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        answers
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfitCached {
    pub all_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserView {
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub bio: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub balance: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub profit_cached: ProfitCached,
    #[serde(deserialize_with = "null_as_default")]
    pub follower_count_cached: f64,
    pub url: Option<String>,
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// Deserialize a display view out of a raw response.
pub fn view<T: DeserializeOwned>(value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| Error::Decode(e.to_string()))
}

/// Parse a limit order expiry given as epoch milliseconds or an RFC 3339 timestamp.
pub fn parse_expires_at(s: &str) -> Result<i64> {
    let s = s.trim();
    if let Ok(millis) = s.parse::<i64>() {
        return Ok(millis);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| {
            Error::InvalidArgument(format!(
                "expiry must be epoch milliseconds or an RFC 3339 timestamp, got {s:?}: {e}"
            ))
        })
}
