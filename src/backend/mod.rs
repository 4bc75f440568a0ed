//! Chain backends the execution pipeline dispatches to.
//!
//! Every chain family gets its own adapter behind [`Backend`]; the pipeline only
//! ever talks to the trait.

pub mod avalanche;
pub mod evm;
pub mod mock;

pub use avalanche::AvalancheBackend;
pub use evm::EvmBackend;
pub use mock::MockBackend;

use alloy::{
    primitives::{Address, Bytes, TxKind, B256, U256},
    rpc::types::{state::StateOverride, AccessList, BlockId, TransactionInput, TransactionRequest},
};
use std::future::Future;

use crate::error::BackendError;

pub type BackendResult<T> = Result<T, BackendError>;

/// Logical parameters of a contract read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMessage {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub value: Option<U256>,
    pub data: Bytes,
    pub access_list: Option<AccessList>,
}

impl CallMessage {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self { to: Some(to), data, ..Default::default() }
    }

    pub(crate) fn to_transaction_request(&self) -> TransactionRequest {
        TransactionRequest {
            from: self.from,
            to: self.to.map(TxKind::Call),
            gas: self.gas,
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            value: self.value,
            input: TransactionInput::new(self.data.clone()),
            access_list: self.access_list.clone(),
            ..Default::default()
        }
    }
}

/// `None` means the latest block.
pub(crate) fn block_id(block_number: Option<u64>) -> BlockId {
    block_number.map(BlockId::number).unwrap_or_else(BlockId::latest)
}

/// Capabilities a chain adapter exposes to the client.
pub trait Backend: Send + Sync + 'static {
    fn suggest_gas_price(&self) -> impl Future<Output = BackendResult<u128>> + Send;

    fn estimate_gas(&self, msg: &CallMessage) -> impl Future<Output = BackendResult<u64>> + Send;

    fn storage_at(
        &self,
        account: Address,
        key: B256,
        block_number: Option<u64>,
    ) -> impl Future<Output = BackendResult<Bytes>> + Send;

    fn balance_at(
        &self,
        account: Address,
        block_number: Option<u64>,
    ) -> impl Future<Output = BackendResult<U256>> + Send;

    fn call_at_hash(
        &self,
        msg: &CallMessage,
        block_hash: B256,
    ) -> impl Future<Output = BackendResult<Bytes>> + Send;

    fn call(
        &self,
        msg: &CallMessage,
        block_number: Option<u64>,
    ) -> impl Future<Output = BackendResult<Bytes>> + Send;

    fn call_with_overrides(
        &self,
        msg: &CallMessage,
        block_number: Option<u64>,
        overrides: &StateOverride,
    ) -> impl Future<Output = BackendResult<Bytes>> + Send;

    fn block_number(&self) -> impl Future<Output = BackendResult<u64>> + Send;
}
