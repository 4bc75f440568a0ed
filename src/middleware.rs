//! Default hooks installed on every client.

use std::sync::Arc;
use tracing::trace;

use crate::{
    backend::{Backend, CallMessage},
    client::Client,
    error::{ConfigError, Result},
    multicall,
    request::{Request, Strategy},
    response::{CallOutcome, Response},
};

/// Runs before dispatch; may rewrite the request in place.
pub type RequestMiddleware<B> = Arc<dyn Fn(&Client<B>, &mut Request<'_, B>) -> Result<()> + Send + Sync>;

/// Runs after a response arrived; may rewrite the response in place.
pub type ResponseMiddleware<B> = Arc<dyn Fn(&Client<B>, &mut Response<'_, B>) -> Result<()> + Send + Sync>;

/// Resolves the strategy and fills `to` and `data` of the outgoing call message.
/// Any sender or gas already set on the request is kept.
pub fn prepare_call_message<B: Backend>(client: &Client<B>, req: &mut Request<'_, B>) -> Result<()> {
    let strategy = req.strategy()?;
    let (to, data) = match strategy {
        Strategy::Call => {
            let call = &req.calls()[0];
            (call.target, call.data.clone())
        }
        _ => {
            let multicall = client.multicall_contract().ok_or(ConfigError::MissingMulticallContract)?;
            (multicall, multicall::encode(strategy, multicall, req.calls()))
        }
    };
    trace!(?strategy, %to, len = data.len(), "prepared call message");

    let msg = req.call_message_mut().get_or_insert_with(CallMessage::default);
    msg.to = Some(to);
    msg.data = data;
    Ok(())
}

/// Splits the raw response into one [`CallOutcome`] per call.
///
/// For `Call` and `Aggregate` the first undecodable result fails the whole batch and
/// `per_call` stays empty. The tolerant strategies record failures per call, except
/// that a revert of a call added with `allow_failure = false` still fails the batch:
/// `tryBlockAndAggregate` only carries one batch-wide success flag.
pub fn decode_response<B: Backend>(_client: &Client<B>, resp: &mut Response<'_, B>) -> Result<()> {
    let strategy = resp.request.strategy()?;
    let calls = resp.request.calls();
    let aggregated = multicall::decode(strategy, &resp.raw, calls.len())?;
    let strict = matches!(strategy, Strategy::Call | Strategy::Aggregate);

    let mut per_call = Vec::with_capacity(calls.len());
    for (call, result) in calls.iter().zip(aggregated.results) {
        let outcome = CallOutcome::new(call, result);
        if strict || (!call.allow_failure && !outcome.success) {
            if let Some(e) = outcome.error {
                return Err(e.into());
            }
        }
        per_call.push(outcome);
    }

    resp.block_number = aggregated.block_number;
    resp.block_hash = aggregated.block_hash;
    resp.block_timestamp = aggregated.block_timestamp;
    resp.per_call = per_call;
    Ok(())
}
