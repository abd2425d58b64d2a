use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Identity of a submitted order, rendered as `P###`.
///
/// The sequence number is kept as an integer so that ordering stays numeric
/// past `P999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct JobId(u64);

impl JobId {
    pub fn from_sequence(sequence: u64) -> Self {
        Self(sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:03}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed order id {0:?}")]
pub struct ParseJobIdError(String);

impl FromStr for JobId {
    type Err = ParseJobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('P')
            .ok_or_else(|| ParseJobIdError(s.to_string()))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseJobIdError(s.to_string()));
        }
        let sequence: u64 = digits.parse().map_err(|_| ParseJobIdError(s.to_string()))?;
        let id = JobId(sequence);
        // Only the canonical spelling names an order: "P7" and "P0007" do not.
        if sequence == 0 || id.to_string() != s {
            return Err(ParseJobIdError(s.to_string()));
        }
        Ok(id)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for JobId {
    type Error = ParseJobIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A validated, strictly positive order quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DispatchError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(DispatchError::InvalidQuantity(format!(
                "quantity must be greater than zero, got {}",
                value
            )));
        }
        u32::try_from(value).map(Quantity).map_err(|_| {
            DispatchError::InvalidQuantity(format!("quantity {} is too large", value))
        })
    }
}

impl TryFrom<&serde_json::Value> for Quantity {
    type Error = DispatchError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Quantity::try_from(v),
                None if n.is_u64() => Err(DispatchError::InvalidQuantity(format!(
                    "quantity {} is too large",
                    n
                ))),
                None => Err(DispatchError::InvalidQuantity(format!(
                    "quantity must be a whole number, got {}",
                    n
                ))),
            },
            other => Err(DispatchError::InvalidQuantity(format!(
                "quantity must be a number, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Ready,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Ready => write!(f, "ready"),
        }
    }
}

/// Outcome reported by the worker that prepared an order.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepResult {
    pub duration: Duration,
    pub worker: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: String,
    pub quantity: Quantity,
    pub submitted_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub result: Option<PrepResult>,
}

impl JobRecord {
    pub fn new(id: JobId, kind: String, quantity: Quantity) -> Self {
        Self {
            id,
            kind,
            quantity,
            submitted_at: Utc::now(),
            status: OrderStatus::Pending,
            result: None,
        }
    }

    /// Attach the preparation result. Returns false if the record was
    /// already ready, in which case nothing changes.
    pub fn complete(&mut self, result: PrepResult) -> bool {
        if self.status == OrderStatus::Ready {
            return false;
        }
        self.status = OrderStatus::Ready;
        self.result = Some(result);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.status == OrderStatus::Ready
    }
}
