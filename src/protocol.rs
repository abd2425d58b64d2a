//! Newline-delimited JSON wire protocol.
//!
//! Every request and every response is one JSON object on a single line.
//! Requests carry an `action` discriminator; responses are distinguished by
//! their fields (`error`, `status`, `menu`, ...).

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::order::{JobId, JobRecord, OrderStatus};

fn default_quantity() -> serde_json::Value {
    serde_json::Value::from(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    GetMenu,
    SubmitOrder {
        kind: String,
        /// Kept raw so that non-numeric quantities surface as
        /// `invalid quantity` rather than `bad request`.
        #[serde(default = "default_quantity")]
        quantity: serde_json::Value,
    },
    QueryOrder {
        id: String,
    },
    ListPending,
    AwaitAll,
}

impl Request {
    pub fn submit(kind: impl Into<String>, quantity: i64) -> Self {
        Request::SubmitOrder {
            kind: kind.into(),
            quantity: serde_json::Value::from(quantity),
        }
    }

    pub fn query(id: impl Into<String>) -> Self {
        Request::QueryOrder { id: id.into() }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Request::GetMenu => "get_menu",
            Request::SubmitOrder { .. } => "submit_order",
            Request::QueryOrder { .. } => "query_order",
            Request::ListPending => "list_pending",
            Request::AwaitAll => "await_all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Present on `unknown kind` so the client can pick a valid dish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyOrder {
    pub status: OrderStatus,
    pub id: JobId,
    pub kind: String,
    pub quantity: u32,
    /// Realized preparation time in seconds, rounded to two decimals
    pub duration: f64,
    pub worker: String,
    pub submitted_at: String,
    pub completed_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub status: OrderStatus,
    pub id: JobId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submitted {
    pub success: bool,
    pub id: JobId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drained {
    pub success: bool,
    pub message: String,
    pub drained: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingList {
    pub pending: Vec<JobId>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuBody {
    pub menu: Vec<String>,
}

/// A single response line.
///
/// Variant order matters for deserialization: more specific shapes come
/// before the shapes they contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Error(ErrorBody),
    Ready(ReadyOrder),
    Pending(PendingOrder),
    Submitted(Submitted),
    Drained(Drained),
    PendingList(PendingList),
    Menu(MenuBody),
}

impl Response {
    pub fn pending(id: JobId) -> Self {
        Response::Pending(PendingOrder {
            status: OrderStatus::Pending,
            id,
        })
    }

    /// Build a ready response from a completed record. A record without a
    /// result is reported as pending.
    pub fn from_record(record: &JobRecord) -> Self {
        match &record.result {
            Some(result) if record.is_ready() => Response::Ready(ReadyOrder {
                status: OrderStatus::Ready,
                id: record.id,
                kind: record.kind.clone(),
                quantity: record.quantity.get(),
                duration: (result.duration.as_secs_f64() * 100.0).round() / 100.0,
                worker: result.worker.clone(),
                submitted_at: record.submitted_at.to_rfc3339(),
                completed_at: result.completed_at.to_rfc3339(),
            }),
            _ => Response::pending(record.id),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// The `error` code, if this is an error response.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Response::Error(body) => Some(body.error.as_str()),
            _ => None,
        }
    }
}

impl From<&DispatchError> for Response {
    fn from(err: &DispatchError) -> Self {
        let menu = match err {
            DispatchError::UnknownKind { menu, .. } => Some(menu.clone()),
            _ => None,
        };
        Response::Error(ErrorBody {
            error: err.code().to_string(),
            message: Some(err.to_string()),
            menu,
        })
    }
}

impl From<DispatchError> for Response {
    fn from(err: DispatchError) -> Self {
        Response::from(&err)
    }
}
