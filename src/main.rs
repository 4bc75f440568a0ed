use alloy::{
    primitives::{address, Address},
    providers::ProviderBuilder,
    sol,
};
use clap::Parser;
use eyre::{eyre, Result};
use futures::future::try_join;
use multicall_rpc::{Client, EvmBackend, MULTICALL3_ADDRESS};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

sol! {
    interface IERC20 {
        function totalSupply() external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Reads a token's metadata and a set of balances in one eth_call.
#[derive(Debug, Parser)]
struct Args {
    #[arg(long, env = "RPC_URL", default_value = "https://eth.llamarpc.com")]
    rpc_url: String,

    #[arg(long, env = "MULTICALL_ADDRESS", default_value_t = MULTICALL3_ADDRESS)]
    multicall: Address,

    /// Token to inspect (USDC by default).
    #[arg(long, default_value_t = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"))]
    token: Address,

    /// Holders whose balance to read.
    #[arg(long = "holder", num_args = 1.., default_values_t = [address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")])]
    holders: Vec<Address>,

    #[arg(long)]
    block: Option<u64>,

    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let provider = ProviderBuilder::new().connect_http(args.rpc_url.parse()?);
    let client = Client::new(EvmBackend::new(provider)).with_multicall_contract(args.multicall);

    let mut request = client
        .new_request()
        .with_block_metadata()
        .add_sol_call(args.token, &IERC20::symbolCall {}, true)
        .add_sol_call(args.token, &IERC20::decimalsCall {}, true)
        .add_sol_call(args.token, &IERC20::totalSupplyCall {}, false);
    for holder in &args.holders {
        request = request.add_sol_call(args.token, &IERC20::balanceOfCall { owner: *holder }, true);
    }
    if let Some(block) = args.block {
        request = request.set_block_number(block);
    }

    let deadline = Duration::from_secs(args.timeout_secs);
    let (head, response) = tokio::time::timeout(deadline, try_join(client.block_number(), request.execute()))
        .await
        .map_err(|_| eyre!("batch did not complete within {deadline:?}"))??;
    let response = response.into_result()?;
    info!(
        head,
        block = ?response.block_number,
        timestamp = ?response.block_timestamp,
        "batch executed"
    );

    let outcomes = &response.per_call;
    let symbol = outcomes[0].decode_as::<IERC20::symbolCall>().unwrap_or_else(|_| "?".to_string());
    let decimals = outcomes[1].decode_as::<IERC20::decimalsCall>().unwrap_or(0);
    let total_supply = outcomes[2].decode_as::<IERC20::totalSupplyCall>()?;
    println!("{symbol}: decimals {decimals}, total supply {total_supply}");

    for (holder, outcome) in args.holders.iter().zip(&outcomes[3..]) {
        match outcome.decode_as::<IERC20::balanceOfCall>() {
            Ok(balance) => println!("  {holder}: {balance}"),
            Err(e) => println!("  {holder}: failed ({e})"),
        }
    }
    Ok(())
}
