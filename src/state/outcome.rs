use serde_json::Value;

/// Result of one paginated fetch for a single target
///
/// Produced by [`fetch_all`](crate::collector::fetch_all) and consumed once by
/// [`transition`](crate::collector::transition).
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The upstream signaled the end of results for the current window
    Drained {
        /// Raw events across every page fetched, in upstream order
        records: Vec<Value>,
    },

    /// The page budget ran out before the upstream stopped returning tokens
    Pending {
        records: Vec<Value>,
        /// Cursor for resuming the same window next invocation
        continuation_token: String,
    },

    /// The daily quota was exhausted; anything fetched before it was discarded
    QuotaExceeded,
}

impl FetchOutcome {
    /// An outcome with no records and no remaining pages
    pub fn empty() -> Self {
        Self::Drained {
            records: Vec::new(),
        }
    }

    /// The continuation token, if more pages remain
    pub fn continuation_token(&self) -> Option<&str> {
        match self {
            Self::Pending {
                continuation_token, ..
            } => Some(continuation_token),
            _ => None,
        }
    }

    /// Consumes the outcome, yielding its raw events
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Drained { records } | Self::Pending { records, .. } => records,
            Self::QuotaExceeded => Vec::new(),
        }
    }
}
