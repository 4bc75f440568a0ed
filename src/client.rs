use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, B256, U256},
    rpc::types::state::StateOverride,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::{
    abi::Schema,
    backend::{Backend, CallMessage},
    error::{BackendError, ConfigError, Error, Result, Stage},
    middleware::{self, RequestMiddleware, ResponseMiddleware},
    request::{DispatchTarget, Request},
    response::Response,
};

/// Batches contract reads through an aggregator contract over a [`Backend`].
///
/// Configuration is fixed once the client is built; share it by reference or
/// clone it. Cloning keeps the backend and middleware but drops default overrides.
pub struct Client<B> {
    backend: Arc<B>,
    multicall_contract: Option<Address>,
    before_request: Vec<RequestMiddleware<B>>,
    after_response: Vec<ResponseMiddleware<B>>,
    overrides: Option<StateOverride>,
}

impl<B> Clone for Client<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            multicall_contract: self.multicall_contract,
            before_request: self.before_request.clone(),
            after_response: self.after_response.clone(),
            overrides: None,
        }
    }
}

impl<B> std::fmt::Debug for Client<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("multicall_contract", &self.multicall_contract)
            .field("before_request", &self.before_request.len())
            .field("after_response", &self.after_response.len())
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Client<B> {
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        Self {
            backend,
            multicall_contract: None,
            before_request: vec![Arc::new(middleware::prepare_call_message::<B>) as RequestMiddleware<B>],
            after_response: vec![Arc::new(middleware::decode_response::<B>) as ResponseMiddleware<B>],
            overrides: None,
        }
    }

    pub fn with_multicall_contract(mut self, multicall_contract: Address) -> Self {
        self.multicall_contract = Some(multicall_contract);
        self
    }

    /// Default overrides inherited by every request this client creates.
    pub fn with_overrides(mut self, overrides: StateOverride) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Appends a hook that runs after the ones already registered.
    pub fn with_request_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&Client<B>, &mut Request<'_, B>) -> Result<()> + Send + Sync + 'static,
    {
        self.before_request.push(Arc::new(middleware));
        self
    }

    pub fn with_response_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&Client<B>, &mut Response<'_, B>) -> Result<()> + Send + Sync + 'static,
    {
        self.after_response.push(Arc::new(middleware));
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn multicall_contract(&self) -> Option<Address> {
        self.multicall_contract
    }

    pub fn overrides(&self) -> Option<&StateOverride> {
        self.overrides.as_ref()
    }

    pub fn new_request(&self) -> Request<'_, B> {
        Request::new(self)
    }

    pub async fn suggest_gas_price(&self) -> Result<u128> {
        Ok(self.backend.suggest_gas_price().await?)
    }

    pub async fn estimate_gas(&self, msg: &CallMessage) -> Result<u64> {
        Ok(self.backend.estimate_gas(msg).await?)
    }

    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.backend.block_number().await?)
    }

    pub async fn balance_at(&self, account: Address, block_number: Option<u64>) -> Result<U256> {
        Ok(self.backend.balance_at(account, block_number).await?)
    }

    /// Reads one storage slot at the latest block and unpacks it with `schema`.
    pub async fn storage_at(&self, account: Address, key: B256, schema: &Schema) -> Result<Vec<DynSolValue>> {
        let word = self.backend.storage_at(account, key, None).await.map_err(|e| {
            error!(%account, %key, error = %e, "failed to call StorageAt");
            e
        })?;
        debug!(raw = %word, "raw storage word");

        schema.unpack(&word).map_err(|e| {
            error!(%account, %key, error = %e, "failed to unpack StorageAt");
            e.into()
        })
    }

    pub(crate) async fn execute<'c>(&'c self, mut req: Request<'c, B>) -> Result<Response<'c, B>> {
        for middleware in &self.before_request {
            if let Err(e) = middleware(self, &mut req) {
                error!(error = %e, "request middleware failed");
                return Err(Error::middleware(Stage::BeforeRequest, e));
            }
        }

        let msg = req.call_message().cloned().ok_or(ConfigError::MissingCallMessage)?;
        let raw = self.dispatch(&req, &msg).await.map_err(|e| {
            error!(error = %e, "failed to call multicall");
            Error::Transport(e)
        })?;
        debug!(raw = %raw, "raw response");

        let mut response = Response::new(req, raw);
        for middleware in &self.after_response {
            if let Err(e) = middleware(self, &mut response) {
                error!(error = %e, "response middleware failed");
                response.error = Some(Error::middleware(Stage::AfterResponse, e));
                break;
            }
        }
        Ok(response)
    }

    async fn dispatch(&self, req: &Request<'_, B>, msg: &CallMessage) -> Result<Bytes, BackendError> {
        let target = req.dispatch_target();
        debug!(?target, calls = req.calls().len(), "dispatching call");

        match target {
            DispatchTarget::AtHash(hash) => self.backend.call_at_hash(msg, hash).await,
            DispatchTarget::WithOverrides(block_number, overrides) => {
                self.backend.call_with_overrides(msg, block_number, overrides).await
            }
            DispatchTarget::AtNumber(block_number) => self.backend.call(msg, block_number).await,
        }
    }
}
