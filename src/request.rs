use alloy::{
    dyn_abi::DynSolValue,
    json_abi::Function,
    primitives::{Address, Bytes, B256},
    rpc::types::state::StateOverride,
    sol_types::SolCall,
};
use tracing::error;

use crate::{
    abi::{self, Schema},
    backend::{Backend, CallMessage},
    client::Client,
    error::{ConfigError, Error, Result},
    response::Response,
};

/// One logical contract read inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    pub target: Address,
    pub data: Bytes,
    /// Output types; `None` leaves the result as raw bytes.
    pub schema: Option<Schema>,
    pub allow_failure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A single call sent straight to its target.
    Call,
    /// Every call must succeed or the whole batch reverts.
    Aggregate,
    /// Calls flagged `allow_failure` report failure individually.
    TryAggregate,
    /// Like `TryAggregate`, plus block number, hash and timestamp.
    TryBlockAndAggregate,
}

/// Which backend capability a validated request goes to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchTarget<'a> {
    AtNumber(Option<u64>),
    AtHash(B256),
    WithOverrides(Option<u64>, &'a StateOverride),
}

/// A batch of calls bound to the client that created it.
///
/// A request executes once; middleware may rewrite it in place, so it is consumed
/// by [`Request::execute`].
pub struct Request<'c, B> {
    client: &'c Client<B>,
    calls: Vec<CallDescriptor>,
    block_number: Option<u64>,
    block_hash: Option<B256>,
    overrides: Option<StateOverride>,
    block_metadata: bool,
    call_message: Option<CallMessage>,
}

impl<B> std::fmt::Debug for Request<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("calls", &self.calls)
            .field("block_number", &self.block_number)
            .field("block_hash", &self.block_hash)
            .field("overrides", &self.overrides)
            .field("block_metadata", &self.block_metadata)
            .field("call_message", &self.call_message)
            .finish_non_exhaustive()
    }
}

impl<'c, B: Backend> Request<'c, B> {
    pub(crate) fn new(client: &'c Client<B>) -> Self {
        Self {
            client,
            calls: Vec::new(),
            block_number: None,
            block_hash: None,
            overrides: client.overrides().cloned(),
            block_metadata: false,
            call_message: None,
        }
    }

    pub fn client(&self) -> &'c Client<B> {
        self.client
    }

    /// Appends a call. Targets are neither deduplicated nor validated here.
    pub fn add_call(mut self, target: Address, data: impl Into<Bytes>, schema: Option<Schema>, allow_failure: bool) -> Self {
        self.calls.push(CallDescriptor { target, data: data.into(), schema, allow_failure });
        self
    }

    /// Encodes `args` against `function` and decodes the result with its outputs.
    pub fn add_function_call(
        self,
        target: Address,
        function: &Function,
        args: &[DynSolValue],
        allow_failure: bool,
    ) -> Result<Self> {
        let data = abi::encode_function_call(function, args)?;
        let schema = Schema::from_function(function)?;
        Ok(self.add_call(target, data, Some(schema), allow_failure))
    }

    /// Adds a `sol!` generated call. Its result stays raw; read it back with
    /// [`CallOutcome::decode_as`](crate::response::CallOutcome::decode_as).
    pub fn add_sol_call<C: SolCall>(self, target: Address, call: &C, allow_failure: bool) -> Self {
        self.add_call(target, call.abi_encode(), None, allow_failure)
    }

    pub fn set_block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    pub fn set_block_hash(mut self, block_hash: B256) -> Result<Self> {
        if self.overrides.is_some() {
            error!(%block_hash, "block hash and overrides are not supported at the same time");
            return Err(ConfigError::IncompatibleCallParams.into());
        }
        self.block_hash = Some(block_hash);
        Ok(self)
    }

    pub fn set_overrides(mut self, overrides: StateOverride) -> Result<Self> {
        if self.block_hash.is_some() {
            error!("block hash and overrides are not supported at the same time");
            return Err(ConfigError::IncompatibleCallParams.into());
        }
        self.overrides = Some(overrides);
        Ok(self)
    }

    /// Asks for block number, hash and timestamp alongside the results. Ignored for
    /// single-call requests, which never touch the aggregator.
    pub fn with_block_metadata(mut self) -> Self {
        self.block_metadata = true;
        self
    }

    pub fn set_from(mut self, from: Address) -> Self {
        self.call_message.get_or_insert_with(CallMessage::default).from = Some(from);
        self
    }

    pub fn set_gas(mut self, gas: u64) -> Self {
        self.call_message.get_or_insert_with(CallMessage::default).gas = Some(gas);
        self
    }

    pub fn calls(&self) -> &[CallDescriptor] {
        &self.calls
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number
    }

    pub fn block_hash(&self) -> Option<B256> {
        self.block_hash
    }

    pub fn overrides(&self) -> Option<&StateOverride> {
        self.overrides.as_ref()
    }

    pub fn call_message(&self) -> Option<&CallMessage> {
        self.call_message.as_ref()
    }

    pub fn call_message_mut(&mut self) -> &mut Option<CallMessage> {
        &mut self.call_message
    }

    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        match self.calls.len() {
            0 => Err(ConfigError::EmptyRequest),
            1 => Ok(Strategy::Call),
            _ if self.block_metadata => Ok(Strategy::TryBlockAndAggregate),
            _ if self.calls.iter().any(|call| call.allow_failure) => Ok(Strategy::TryAggregate),
            _ => Ok(Strategy::Aggregate),
        }
    }

    /// Block hash and overrides never coexist, so exactly one branch applies.
    pub fn dispatch_target(&self) -> DispatchTarget<'_> {
        match (self.block_hash, &self.overrides) {
            (Some(hash), _) => DispatchTarget::AtHash(hash),
            (None, Some(overrides)) => DispatchTarget::WithOverrides(self.block_number, overrides),
            (None, None) => DispatchTarget::AtNumber(self.block_number),
        }
    }

    pub async fn execute(self) -> Result<Response<'c, B>, Error> {
        self.client.execute(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use alloy::{
        primitives::{address, b256, U256},
        rpc::types::state::AccountOverride,
        sol,
    };

    sol! {
        interface IERC20 {
            function balanceOf(address owner) external view returns (uint256);
        }
    }

    const TOKEN: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    const HASH: B256 = b256!("1111111111111111111111111111111111111111111111111111111111111111");

    fn overrides() -> StateOverride {
        let mut account = AccountOverride::default();
        account.balance = Some(U256::from(1));
        let mut overrides = StateOverride::default();
        overrides.insert(TOKEN, account);
        overrides
    }

    #[test]
    fn strategy_follows_calls() {
        let client = Client::new(MockBackend::new());
        assert_eq!(client.new_request().strategy(), Err(ConfigError::EmptyRequest));

        let one = client.new_request().add_call(TOKEN, vec![1u8], None, true);
        assert_eq!(one.strategy(), Ok(Strategy::Call));

        let strict = client.new_request().add_call(TOKEN, vec![1u8], None, false).add_call(TOKEN, vec![2u8], None, false);
        assert_eq!(strict.strategy(), Ok(Strategy::Aggregate));

        let tolerant = strict.add_call(TOKEN, vec![3u8], None, true);
        assert_eq!(tolerant.strategy(), Ok(Strategy::TryAggregate));
        assert_eq!(tolerant.with_block_metadata().strategy(), Ok(Strategy::TryBlockAndAggregate));
    }

    #[test]
    fn single_call_ignores_block_metadata() {
        let client = Client::new(MockBackend::new());
        let req = client.new_request().add_call(TOKEN, vec![1u8], None, false).with_block_metadata();
        assert_eq!(req.strategy(), Ok(Strategy::Call));
    }

    #[test]
    fn calls_keep_insertion_order_and_duplicates() {
        let client = Client::new(MockBackend::new());
        let req = client
            .new_request()
            .add_call(TOKEN, vec![1u8], None, false)
            .add_call(TOKEN, vec![1u8], None, false)
            .add_call(Address::ZERO, vec![2u8], None, true);
        let data: Vec<u8> = req.calls().iter().map(|call| call.data[0]).collect();
        assert_eq!(data, vec![1, 1, 2]);
        assert_eq!(req.calls()[0], req.calls()[1]);
    }

    #[test]
    fn block_hash_after_overrides_is_rejected() {
        let client = Client::new(MockBackend::new());
        let err = client.new_request().set_overrides(overrides()).unwrap().set_block_hash(HASH).unwrap_err();
        assert!(err.is_incompatible_call_params());
    }

    #[test]
    fn overrides_after_block_hash_is_rejected() {
        let client = Client::new(MockBackend::new());
        let err = client.new_request().set_block_hash(HASH).unwrap().set_overrides(overrides()).unwrap_err();
        assert!(err.is_incompatible_call_params());
    }

    #[test]
    fn client_overrides_are_inherited() {
        let client = Client::new(MockBackend::new()).with_overrides(overrides());
        let req = client.new_request();
        assert_eq!(req.overrides(), Some(&overrides()));
        assert!(req.set_block_hash(HASH).unwrap_err().is_incompatible_call_params());
    }

    #[test]
    fn dispatch_target_picks_one_branch() {
        let client = Client::new(MockBackend::new());
        assert_eq!(client.new_request().dispatch_target(), DispatchTarget::AtNumber(None));
        assert_eq!(
            client.new_request().set_block_number(7).dispatch_target(),
            DispatchTarget::AtNumber(Some(7))
        );
        assert_eq!(
            client.new_request().set_block_number(7).set_block_hash(HASH).unwrap().dispatch_target(),
            DispatchTarget::AtHash(HASH)
        );
        let state = overrides();
        let req = client.new_request().set_overrides(state.clone()).unwrap();
        assert_eq!(req.dispatch_target(), DispatchTarget::WithOverrides(None, &state));
    }

    #[test]
    fn sol_call_is_encoded_without_schema() {
        let client = Client::new(MockBackend::new());
        let owner = address!("00000000000000000000000000000000000000aa");
        let req = client.new_request().add_sol_call(TOKEN, &IERC20::balanceOfCall { owner }, false);
        let call = &req.calls()[0];
        assert_eq!(call.data, Bytes::from(IERC20::balanceOfCall { owner }.abi_encode()));
        assert!(call.schema.is_none());
    }

    #[test]
    fn function_call_carries_output_schema() {
        let client = Client::new(MockBackend::new());
        let function = Function::parse("function balanceOf(address owner) view returns (uint256)").unwrap();
        let req = client
            .new_request()
            .add_function_call(TOKEN, &function, &[DynSolValue::Address(Address::ZERO)], true)
            .unwrap();
        assert_eq!(req.calls()[0].schema, Some(Schema::parse("uint256").unwrap()));
        assert!(req.calls()[0].allow_failure);
    }

    #[test]
    fn sender_and_gas_seed_the_call_message() {
        let client = Client::new(MockBackend::new());
        let from = address!("00000000000000000000000000000000000000bb");
        let req = client.new_request().set_from(from).set_gas(50_000);
        let msg = req.call_message().unwrap();
        assert_eq!(msg.from, Some(from));
        assert_eq!(msg.gas, Some(50_000));
        assert_eq!(msg.to, None);
    }
}
