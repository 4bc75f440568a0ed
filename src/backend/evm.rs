use alloy::{
    primitives::{Address, Bytes, B256, U256},
    providers::Provider,
    rpc::types::{state::StateOverride, BlockId},
};

use super::{block_id, Backend, BackendResult, CallMessage};

/// Adapter for geth compatible nodes reachable through an alloy [`Provider`].
#[derive(Debug, Clone)]
pub struct EvmBackend<P> {
    provider: P,
}

impl<P> EvmBackend<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: Provider + 'static> Backend for EvmBackend<P> {
    async fn suggest_gas_price(&self) -> BackendResult<u128> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn estimate_gas(&self, msg: &CallMessage) -> BackendResult<u64> {
        Ok(self.provider.estimate_gas(msg.to_transaction_request()).await?)
    }

    async fn storage_at(&self, account: Address, key: B256, block_number: Option<u64>) -> BackendResult<Bytes> {
        let word = self
            .provider
            .get_storage_at(account, U256::from_be_bytes(key.0))
            .block_id(block_id(block_number))
            .await?;
        Ok(Bytes::from(word.to_be_bytes::<32>().to_vec()))
    }

    async fn balance_at(&self, account: Address, block_number: Option<u64>) -> BackendResult<U256> {
        Ok(self.provider.get_balance(account).block_id(block_id(block_number)).await?)
    }

    async fn call_at_hash(&self, msg: &CallMessage, block_hash: B256) -> BackendResult<Bytes> {
        Ok(self
            .provider
            .call(msg.to_transaction_request())
            .block(BlockId::hash(block_hash))
            .await?)
    }

    async fn call(&self, msg: &CallMessage, block_number: Option<u64>) -> BackendResult<Bytes> {
        Ok(self
            .provider
            .call(msg.to_transaction_request())
            .block(block_id(block_number))
            .await?)
    }

    async fn call_with_overrides(
        &self,
        msg: &CallMessage,
        block_number: Option<u64>,
        overrides: &StateOverride,
    ) -> BackendResult<Bytes> {
        Ok(self
            .provider
            .call(msg.to_transaction_request())
            .block(block_id(block_number))
            .overrides(overrides.clone())
            .await?)
    }

    async fn block_number(&self) -> BackendResult<u64> {
        Ok(self.provider.get_block_number().await?)
    }
}
