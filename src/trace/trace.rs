use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceOperation {
    Scan,
    Plan,
    Apply,
    Rollback,
}

/// One line of the JSONL trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub timestamp: DateTime<Utc>,
    pub operation: TraceOperation,

    pub host: Option<String>,

    pub candidates: Option<usize>,
    pub plan_entries: Option<usize>,
    pub applied: Option<usize>,
    pub restored: Option<usize>,

    pub repaired: Option<bool>,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(operation: TraceOperation) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            host: None,
            candidates: None,
            plan_entries: None,
            applied: None,
            restored: None,
            repaired: None,
            error: None,
        }
    }

    pub fn with_host(mut self, host: Option<&str>) -> Self {
        self.host = host.map(str::to_string);
        self
    }

    pub fn with_candidates(mut self, count: usize) -> Self {
        self.candidates = Some(count);
        self
    }

    pub fn with_plan_entries(mut self, count: usize) -> Self {
        self.plan_entries = Some(count);
        self
    }

    pub fn with_applied(mut self, count: usize) -> Self {
        self.applied = Some(count);
        self
    }

    pub fn with_restored(mut self, count: usize) -> Self {
        self.restored = Some(count);
        self
    }

    pub fn with_repaired(mut self, repaired: bool) -> Self {
        self.repaired = Some(repaired);
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
