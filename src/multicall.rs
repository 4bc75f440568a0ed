use alloy::{
    primitives::{address, Address, Bytes, B256, U256},
    sol,
    sol_types::SolCall,
};

use crate::{
    error::DecodeError,
    request::{CallDescriptor, Strategy},
};

/// Canonical Multicall3 deployment, present on most EVM chains. The client never
/// falls back to it on its own.
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

sol! {
    #[sol(all_derives)]
    interface IMulticall3 {
        struct Call {
            // Target contract to call.
            address target;
            // Data to call on the target contract.
            bytes callData;
        }

        struct Call3 {
            // Target contract to call.
            address target;
            // If false, the entire call will revert if the call fails.
            bool allowFailure;
            // Data to call on the target contract.
            bytes callData;
        }

        struct Result {
            // True if the call succeeded, false otherwise.
            bool success;
            // Return data if the call succeeded, or revert data if the call reverted.
            bytes returnData;
        }

        function aggregate(Call[] calldata calls) public payable returns (uint256 blockNumber, bytes[] memory returnData);

        function tryBlockAndAggregate(bool requireSuccess, Call[] calldata calls)
            public
            payable
            returns (uint256 blockNumber, bytes32 blockHash, Result[] memory returnData);

        /// @notice Aggregate calls, ensuring each returns success if required
        function aggregate3(Call3[] calldata calls) public payable returns (Result[] memory returnData);

        function getCurrentBlockTimestamp() public view returns (uint256 timestamp);
    }
}

/// What the aggregator hands back once its envelope is peeled off.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub block_timestamp: Option<u64>,
    pub results: Vec<IMulticall3::Result>,
}

/// Builds the aggregator call data for `calls` under `strategy`.
///
/// `TryBlockAndAggregate` appends a `getCurrentBlockTimestamp` probe against the
/// aggregator itself; [`decode`] strips it again. Its `requireSuccess` flag is set
/// only when every call is strict, so a mixed batch relies on the response
/// middleware to fail on a strict call's revert.
pub fn encode(strategy: Strategy, multicall: Address, calls: &[CallDescriptor]) -> Bytes {
    let plain = |calls: &[CallDescriptor]| -> Vec<IMulticall3::Call> {
        calls
            .iter()
            .map(|call| IMulticall3::Call { target: call.target, callData: call.data.clone() })
            .collect()
    };

    let data = match strategy {
        Strategy::Call => return calls.first().map(|call| call.data.clone()).unwrap_or_default(),
        Strategy::Aggregate => IMulticall3::aggregateCall { calls: plain(calls) }.abi_encode(),
        Strategy::TryAggregate => IMulticall3::aggregate3Call {
            calls: calls
                .iter()
                .map(|call| IMulticall3::Call3 {
                    target: call.target,
                    allowFailure: call.allow_failure,
                    callData: call.data.clone(),
                })
                .collect(),
        }
        .abi_encode(),
        Strategy::TryBlockAndAggregate => {
            let mut batch = plain(calls);
            batch.push(IMulticall3::Call {
                target: multicall,
                callData: IMulticall3::getCurrentBlockTimestampCall {}.abi_encode().into(),
            });
            IMulticall3::tryBlockAndAggregateCall {
                requireSuccess: calls.iter().all(|call| !call.allow_failure),
                calls: batch,
            }
            .abi_encode()
        }
    };
    data.into()
}

/// Splits the aggregator's return blob into one result per submitted call.
pub fn decode(strategy: Strategy, raw: &[u8], expected: usize) -> Result<Aggregated, DecodeError> {
    let aggregated = match strategy {
        Strategy::Call => Aggregated {
            results: vec![IMulticall3::Result { success: true, returnData: Bytes::copy_from_slice(raw) }],
            ..Default::default()
        },
        Strategy::Aggregate => {
            let ret = IMulticall3::aggregateCall::abi_decode_returns(raw)?;
            Aggregated {
                block_number: Some(to_u64(ret.blockNumber)),
                results: ret
                    .returnData
                    .into_iter()
                    .map(|data| IMulticall3::Result { success: true, returnData: data })
                    .collect(),
                ..Default::default()
            }
        }
        Strategy::TryAggregate => Aggregated {
            results: IMulticall3::aggregate3Call::abi_decode_returns(raw)?,
            ..Default::default()
        },
        Strategy::TryBlockAndAggregate => {
            let ret = IMulticall3::tryBlockAndAggregateCall::abi_decode_returns(raw)?;
            let mut results = ret.returnData;
            if results.len() != expected + 1 {
                return Err(DecodeError::LengthMismatch { expected: expected + 1, actual: results.len() });
            }
            let block_timestamp = results
                .pop()
                .filter(|probe| probe.success)
                .and_then(|probe| IMulticall3::getCurrentBlockTimestampCall::abi_decode_returns(&probe.returnData).ok())
                .map(to_u64);
            Aggregated {
                block_number: Some(to_u64(ret.blockNumber)),
                block_hash: Some(ret.blockHash),
                block_timestamp,
                results,
            }
        }
    };

    if aggregated.results.len() != expected {
        return Err(DecodeError::LengthMismatch { expected, actual: aggregated.results.len() });
    }
    Ok(aggregated)
}

fn to_u64(value: U256) -> u64 {
    value.saturating_to()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{primitives::b256, sol_types::SolValue};

    fn descriptor(target: u8, data: &'static [u8], allow_failure: bool) -> CallDescriptor {
        CallDescriptor {
            target: Address::with_last_byte(target),
            data: Bytes::from_static(data),
            schema: None,
            allow_failure,
        }
    }

    #[test]
    fn single_call_is_not_wrapped() {
        let calls = [descriptor(1, &[0xde, 0xad], false)];
        assert_eq!(encode(Strategy::Call, MULTICALL3_ADDRESS, &calls), Bytes::from_static(&[0xde, 0xad]));
    }

    #[test]
    fn aggregate_uses_plain_calls() {
        let calls = [descriptor(1, &[1], false), descriptor(2, &[2], false)];
        let data = encode(Strategy::Aggregate, MULTICALL3_ADDRESS, &calls);
        assert_eq!(&data[..4], &IMulticall3::aggregateCall::SELECTOR);

        let decoded = IMulticall3::aggregateCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.calls.len(), 2);
        assert_eq!(decoded.calls[1].target, Address::with_last_byte(2));
    }

    #[test]
    fn try_aggregate_carries_allow_failure_per_call() {
        let calls = [descriptor(1, &[1], false), descriptor(2, &[2], true)];
        let data = encode(Strategy::TryAggregate, MULTICALL3_ADDRESS, &calls);
        let decoded = IMulticall3::aggregate3Call::abi_decode(&data).unwrap();
        let flags: Vec<bool> = decoded.calls.iter().map(|call| call.allowFailure).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn try_block_and_aggregate_appends_timestamp_probe() {
        let calls = [descriptor(1, &[1], true), descriptor(2, &[2], false)];
        let data = encode(Strategy::TryBlockAndAggregate, MULTICALL3_ADDRESS, &calls);
        let decoded = IMulticall3::tryBlockAndAggregateCall::abi_decode(&data).unwrap();
        assert!(!decoded.requireSuccess);
        assert_eq!(decoded.calls.len(), 3);
        assert_eq!(decoded.calls[2].target, MULTICALL3_ADDRESS);
        assert_eq!(
            decoded.calls[2].callData.as_ref(),
            IMulticall3::getCurrentBlockTimestampCall::SELECTOR.as_slice()
        );
    }

    #[test]
    fn strict_block_batch_requires_success() {
        let calls = [descriptor(1, &[1], false), descriptor(2, &[2], false)];
        let data = encode(Strategy::TryBlockAndAggregate, MULTICALL3_ADDRESS, &calls);
        assert!(IMulticall3::tryBlockAndAggregateCall::abi_decode(&data).unwrap().requireSuccess);
    }

    #[test]
    fn decode_aggregate_reports_block_number() {
        let raw = (U256::from(19_000_000u64), vec![Bytes::from_static(&[1]), Bytes::from_static(&[2])])
            .abi_encode_params();
        let aggregated = decode(Strategy::Aggregate, &raw, 2).unwrap();
        assert_eq!(aggregated.block_number, Some(19_000_000));
        assert!(aggregated.results.iter().all(|r| r.success));
        assert_eq!(aggregated.results[1].returnData, Bytes::from_static(&[2]));
    }

    #[test]
    fn decode_rejects_wrong_result_count() {
        let raw = (U256::from(1), vec![Bytes::from_static(&[1])]).abi_encode_params();
        assert_eq!(
            decode(Strategy::Aggregate, &raw, 2),
            Err(DecodeError::LengthMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn decode_try_block_and_aggregate_strips_probe() {
        let hash = b256!("00000000000000000000000000000000000000000000000000000000000000ff");
        let results = vec![
            IMulticall3::Result { success: false, returnData: Bytes::new() },
            IMulticall3::Result { success: true, returnData: U256::from(5).abi_encode().into() },
            IMulticall3::Result { success: true, returnData: U256::from(1_700_000_000u64).abi_encode().into() },
        ];
        let raw = (U256::from(42), hash, results).abi_encode_params();

        let aggregated = decode(Strategy::TryBlockAndAggregate, &raw, 2).unwrap();
        assert_eq!(aggregated.block_number, Some(42));
        assert_eq!(aggregated.block_hash, Some(hash));
        assert_eq!(aggregated.block_timestamp, Some(1_700_000_000));
        assert_eq!(aggregated.results.len(), 2);
        assert!(!aggregated.results[0].success);
    }

    #[test]
    fn decode_garbage_is_an_abi_error() {
        assert!(matches!(decode(Strategy::TryAggregate, &[0xff; 7], 1), Err(DecodeError::Abi(_))));
    }
}
