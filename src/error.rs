use alloy::primitives::Bytes;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] BackendError),
    #[error("{stage} middleware failed: {source}")]
    Middleware {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("encode error: {0}")]
    Encode(String),
}

impl Error {
    pub(crate) fn middleware(stage: Stage, source: Error) -> Self {
        Error::Middleware { stage, source: Box::new(source) }
    }

    /// The error underneath any middleware wrapping.
    pub fn root(&self) -> &Error {
        match self {
            Error::Middleware { source, .. } => source.root(),
            e => e,
        }
    }

    /// Returns true for the sentinel raised when a block hash and state overrides meet.
    pub fn is_incompatible_call_params(&self) -> bool {
        matches!(self.root(), Error::Config(ConfigError::IncompatibleCallParams))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BeforeRequest,
    AfterResponse,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::BeforeRequest => f.write_str("before-request"),
            Stage::AfterResponse => f.write_str("after-response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("incompatible call parameters: block hash and state overrides cannot be used together")]
    IncompatibleCallParams,
    #[error("request has no calls")]
    EmptyRequest,
    #[error("multicall contract address is not configured")]
    MissingMulticallContract,
    #[error("no call message was prepared before dispatch")]
    MissingCallMessage,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("rpc error: {0}")]
    Rpc(#[from] alloy::transports::TransportError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("abi error: {0}")]
    Abi(String),
    #[error("expected {expected} results, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("call reverted{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Reverted { data: Bytes, reason: Option<String> },
}

impl From<alloy::sol_types::Error> for DecodeError {
    fn from(e: alloy::sol_types::Error) -> Self {
        DecodeError::Abi(e.to_string())
    }
}

impl From<alloy::dyn_abi::Error> for DecodeError {
    fn from(e: alloy::dyn_abi::Error) -> Self {
        DecodeError::Abi(e.to_string())
    }
}
