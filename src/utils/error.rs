use crate::core::session::SessionState;
use crate::domain::model::ProductId;
use thiserror::Error;

/// 單次 HTTP 呼叫失敗 (非 200 或網路例外)
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response body from {url}: {message}")]
    InvalidBody { url: String, message: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::UnexpectedStatus { status, .. } => Some(*status),
            TransportError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 後端回傳的原始內容 (若有)
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            TransportError::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOperation {
    ResolveMemberId,
    MemberInfo,
    Balance,
    ActiveProducts,
}

impl std::fmt::Display for LookupOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LookupOperation::ResolveMemberId => "member id lookup",
            LookupOperation::MemberInfo => "member info lookup",
            LookupOperation::Balance => "balance lookup",
            LookupOperation::ActiveProducts => "active products lookup",
        };
        f.write_str(name)
    }
}

/// 銷售送出失敗，保留後端的原始錯誤內容
#[derive(Error, Debug)]
#[error("Sale rejected: {}", .reason.as_deref().unwrap_or("no reason given"))]
pub struct SaleError {
    pub status: Option<u16>,
    pub reason: Option<String>,
    pub raw: String,
    #[source]
    pub source: TransportError,
}

impl SaleError {
    pub fn from_transport(source: TransportError) -> Self {
        let raw = source.raw_body().unwrap_or_default().to_string();
        // 後端錯誤通常帶有 {"status": ..., "msg": "..."}
        let reason = serde_json::from_str::<serde_json::Value>(&raw)
            .ok()
            .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
            .or_else(|| match &source {
                TransportError::UnexpectedStatus { .. } => None,
                other => Some(other.to_string()),
            });

        Self {
            status: source.status(),
            reason,
            raw,
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum StregError {
    #[error("{operation} failed: {source}")]
    Lookup {
        operation: LookupOperation,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Sale(#[from] SaleError),

    #[error("Invalid quantity {quantity} for product {product_id}: must be between 0 and 4294967295")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error("Invalid cart item '{token}': {reason}")]
    InvalidCartItem { token: String, reason: String },

    #[error("Stregsystem is unavailable")]
    Unavailable,

    #[error("Session is not ready (state: {state:?})")]
    NotReady { state: SessionState },

    #[error("Product {product_id} is not sold in room {room}")]
    UnknownProduct { product_id: ProductId, room: i64 },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("No member selected")]
    NoMemberSelected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Lookup,
    Sale,
    Cart,
    Session,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl StregError {
    pub fn lookup(operation: LookupOperation, source: TransportError) -> Self {
        StregError::Lookup { operation, source }
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, StregError::Lookup { .. })
    }

    pub fn is_sale(&self) -> bool {
        matches!(self, StregError::Sale(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StregError::Unavailable)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            StregError::Unavailable => ErrorCategory::Network,
            StregError::Lookup { .. } => ErrorCategory::Lookup,
            StregError::Sale(_) => ErrorCategory::Sale,
            StregError::InvalidQuantity { .. }
            | StregError::InvalidCartItem { .. }
            | StregError::UnknownProduct { .. }
            | StregError::EmptyCart => ErrorCategory::Cart,
            StregError::NotReady { .. } | StregError::NoMemberSelected => ErrorCategory::Session,
            StregError::IoError(_)
            | StregError::ConfigError { .. }
            | StregError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Cart => ErrorSeverity::Low,
            ErrorCategory::Lookup | ErrorCategory::Sale | ErrorCategory::Session => {
                ErrorSeverity::Medium
            }
            ErrorCategory::Network => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            StregError::Unavailable => "Could not reach the stregsystem".to_string(),
            StregError::Lookup {
                operation: LookupOperation::ResolveMemberId,
                ..
            } => "Unknown username".to_string(),
            StregError::Lookup { operation, .. } => format!("The {} failed", operation),
            StregError::Sale(e) => match &e.reason {
                Some(reason) => format!("The purchase was rejected: {}", reason),
                None => "The purchase was rejected".to_string(),
            },
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            StregError::Unavailable => {
                "Check the network connection and the configured base URL, then start a new session"
            }
            StregError::Lookup {
                operation: LookupOperation::ResolveMemberId,
                ..
            } => "Check the spelling of the username",
            StregError::Lookup { .. } => "Try again; the backend may be busy",
            StregError::Sale(_) => "Correct the cart or top up the balance, then submit again",
            StregError::InvalidQuantity { .. } => {
                "Use a quantity between 0 and 4294967295 (repeated ids are added together)"
            }
            StregError::InvalidCartItem { .. } => "Write each item as `id` or `id:qty`, e.g. `14 32:2`",
            StregError::UnknownProduct { .. } => "Pick a product from the active product list",
            StregError::EmptyCart => "Add at least one product before buying",
            StregError::NotReady { .. } => "Wait for the product list to load before selling",
            StregError::NoMemberSelected => "Select a member before buying",
            StregError::IoError(_)
            | StregError::ConfigError { .. }
            | StregError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line options"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StregError>;
