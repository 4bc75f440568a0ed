use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Bytes, B256},
    sol_types::SolCall,
};
use tracing::trace;

use crate::{
    abi,
    error::{DecodeError, Error, Result},
    multicall::IMulticall3,
    request::{CallDescriptor, Request},
};

/// Result of one call in a batch; `per_call[i]` always belongs to `calls[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Bytes,
    pub decoded: Option<Vec<DynSolValue>>,
    pub error: Option<DecodeError>,
}

impl CallOutcome {
    pub(crate) fn new(call: &CallDescriptor, result: IMulticall3::Result) -> Self {
        let IMulticall3::Result { success, returnData: return_data } = result;
        if !success {
            let reason = abi::revert_reason(&return_data);
            trace!(to = %call.target, ?reason, "call reverted");
            return Self {
                success,
                error: Some(DecodeError::Reverted { data: return_data.clone(), reason }),
                return_data,
                decoded: None,
            };
        }

        let (decoded, error) = match call.schema.as_ref().map(|schema| schema.decode(&return_data)) {
            None => (None, None),
            Some(Ok(values)) => (Some(values), None),
            Some(Err(e)) => {
                trace!(to = %call.target, error = %e, "failed to decode call result");
                (None, Some(e))
            }
        };
        Self { success, return_data, decoded, error }
    }

    pub fn is_ok(&self) -> bool {
        self.success && self.error.is_none()
    }

    /// Decodes the return data with a `sol!` generated call type.
    pub fn decode_as<C: SolCall>(&self) -> Result<C::Return, DecodeError> {
        if let Some(DecodeError::Reverted { data, reason }) = &self.error {
            return Err(DecodeError::Reverted { data: data.clone(), reason: reason.clone() });
        }
        Ok(C::abi_decode_returns(&self.return_data)?)
    }
}

/// What came back from the backend, plus whatever the response middleware made of it.
pub struct Response<'c, B> {
    pub request: Request<'c, B>,
    pub raw: Bytes,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub block_timestamp: Option<u64>,
    pub per_call: Vec<CallOutcome>,
    pub(crate) error: Option<Error>,
}

impl<B> std::fmt::Debug for Response<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("request", &self.request)
            .field("raw", &self.raw)
            .field("block_number", &self.block_number)
            .field("block_hash", &self.block_hash)
            .field("block_timestamp", &self.block_timestamp)
            .field("per_call", &self.per_call)
            .field("error", &self.error)
            .finish()
    }
}

impl<'c, B> Response<'c, B> {
    pub(crate) fn new(request: Request<'c, B>, raw: Bytes) -> Self {
        Self {
            request,
            raw,
            block_number: None,
            block_hash: None,
            block_timestamp: None,
            per_call: Vec::new(),
            error: None,
        }
    }

    /// First response middleware failure, if any. The raw bytes and anything
    /// decoded before it stay available.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn into_result(mut self) -> Result<Self> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}
