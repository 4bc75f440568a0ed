//! Scripted in-memory backend. Each call pops the next queued reply and is
//! recorded so tests can assert which capability the pipeline reached for.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    rpc::types::state::StateOverride,
    transports::TransportErrorKind,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use super::{Backend, BackendResult, CallMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Call { msg: CallMessage, block_number: Option<u64> },
    CallAtHash { msg: CallMessage, block_hash: B256 },
    CallWithOverrides { msg: CallMessage, block_number: Option<u64>, overrides: StateOverride },
}

impl Dispatch {
    pub fn message(&self) -> &CallMessage {
        match self {
            Dispatch::Call { msg, .. }
            | Dispatch::CallAtHash { msg, .. }
            | Dispatch::CallWithOverrides { msg, .. } => msg,
        }
    }
}

enum Reply {
    Data(Bytes),
    Error(String),
}

#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<VecDeque<Reply>>,
    dispatches: Mutex<Vec<Dispatch>>,
    storage: Mutex<HashMap<(Address, B256), B256>>,
    balances: Mutex<HashMap<Address, U256>>,
    block_number: Mutex<u64>,
    gas_price: Mutex<u128>,
    delay: Mutex<Duration>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").field("dispatches", &self.dispatch_count()).finish()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues raw bytes for the next call.
    pub fn push_response(&self, data: impl Into<Bytes>) -> &Self {
        lock(&self.replies).push_back(Reply::Data(data.into()));
        self
    }

    /// Queues a transport failure for the next call.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        lock(&self.replies).push_back(Reply::Error(message.into()));
        self
    }

    pub fn set_storage(&self, account: Address, key: B256, value: B256) -> &Self {
        lock(&self.storage).insert((account, key), value);
        self
    }

    pub fn set_balance(&self, account: Address, balance: U256) -> &Self {
        lock(&self.balances).insert(account, balance);
        self
    }

    pub fn set_block_number(&self, block_number: u64) -> &Self {
        *lock(&self.block_number) = block_number;
        self
    }

    pub fn set_gas_price(&self, gas_price: u128) -> &Self {
        *lock(&self.gas_price) = gas_price;
        self
    }

    /// Holds every call for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) -> &Self {
        *lock(&self.delay) = delay;
        self
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        lock(&self.dispatches).clone()
    }

    pub fn dispatch_count(&self) -> usize {
        lock(&self.dispatches).len()
    }

    async fn reply(&self, dispatch: Dispatch) -> BackendResult<Bytes> {
        lock(&self.dispatches).push(dispatch);
        let delay = *lock(&self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match lock(&self.replies).pop_front() {
            Some(Reply::Data(data)) => Ok(data),
            Some(Reply::Error(message)) => Err(TransportErrorKind::custom_str(&message).into()),
            None => Err(TransportErrorKind::custom_str("mock backend has no queued response").into()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Backend for MockBackend {
    async fn suggest_gas_price(&self) -> BackendResult<u128> {
        Ok(*lock(&self.gas_price))
    }

    async fn estimate_gas(&self, msg: &CallMessage) -> BackendResult<u64> {
        // intrinsic cost plus calldata, close enough for tests
        let calldata: u64 = msg.data.iter().map(|b| if *b == 0 { 4 } else { 16 }).sum();
        Ok(21_000 + calldata)
    }

    async fn storage_at(&self, account: Address, key: B256, _block_number: Option<u64>) -> BackendResult<Bytes> {
        let word = lock(&self.storage).get(&(account, key)).copied().unwrap_or_default();
        Ok(Bytes::copy_from_slice(word.as_slice()))
    }

    async fn balance_at(&self, account: Address, _block_number: Option<u64>) -> BackendResult<U256> {
        Ok(lock(&self.balances).get(&account).copied().unwrap_or_default())
    }

    async fn call_at_hash(&self, msg: &CallMessage, block_hash: B256) -> BackendResult<Bytes> {
        self.reply(Dispatch::CallAtHash { msg: msg.clone(), block_hash }).await
    }

    async fn call(&self, msg: &CallMessage, block_number: Option<u64>) -> BackendResult<Bytes> {
        self.reply(Dispatch::Call { msg: msg.clone(), block_number }).await
    }

    async fn call_with_overrides(
        &self,
        msg: &CallMessage,
        block_number: Option<u64>,
        overrides: &StateOverride,
    ) -> BackendResult<Bytes> {
        self.reply(Dispatch::CallWithOverrides {
            msg: msg.clone(),
            block_number,
            overrides: overrides.clone(),
        })
        .await
    }

    async fn block_number(&self) -> BackendResult<u64> {
        Ok(*lock(&self.block_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_queue_order() {
        let backend = MockBackend::new();
        backend.push_response(vec![1u8]).push_error("boom");
        let msg = CallMessage::default();

        assert_eq!(backend.call(&msg, None).await.unwrap(), Bytes::from(vec![1u8]));
        assert!(backend.call(&msg, Some(3)).await.is_err());
        assert!(backend.call(&msg, None).await.is_err());
        assert_eq!(backend.dispatch_count(), 3);
        assert_eq!(backend.dispatches()[1], Dispatch::Call { msg, block_number: Some(3) });
    }

    #[tokio::test]
    async fn unknown_storage_reads_zero() {
        let backend = MockBackend::new();
        let word = backend.storage_at(Address::ZERO, B256::ZERO, None).await.unwrap();
        assert_eq!(word.len(), 32);
        assert!(word.iter().all(|b| *b == 0));
    }
}
