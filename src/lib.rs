//! Batch read-only contract calls into a single `eth_call` through a Multicall3
//! style aggregator, and get one decoded outcome back per call.

pub mod abi;
pub mod backend;
pub mod client;
pub mod error;
pub mod middleware;
pub mod multicall;
pub mod request;
pub mod response;

pub use abi::Schema;
pub use alloy::rpc::types::state::{AccountOverride, StateOverride};
pub use backend::{AvalancheBackend, Backend, CallMessage, EvmBackend, MockBackend};
pub use client::Client;
pub use error::{BackendError, ConfigError, DecodeError, Error, Result};
pub use multicall::MULTICALL3_ADDRESS;
pub use request::{CallDescriptor, DispatchTarget, Request, Strategy};
pub use response::{CallOutcome, Response};
