use serde::{Deserialize, Serialize};
use validator::Validate;

/// Search query parameters for the city and user pickers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchQuery {
    /// The search query string
    #[validate(length(min = 1, max = 100, message = "Search query cannot be empty"))]
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Trimmed query; empty when the user only typed whitespace
    pub fn term(&self) -> &str {
        self.q.trim()
    }

    /// Requested limit, defaulted and capped (never zero)
    pub fn effective_limit(&self, default: usize, max: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

/// Offset pagination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PageQuery {
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self, default: usize, max: usize) -> usize {
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

/// Common error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
