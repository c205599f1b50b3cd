pub mod erc20_abi;
pub mod ethereum;
pub mod rpc_client;
pub mod validation;

pub use ethereum::EthereumChain;
pub use rpc_client::JsonRpcClient;
