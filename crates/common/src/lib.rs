// Keep Address, H256 from ethereum_types; U256 is our "Word".
pub use ethereum_types::{Address, H256, U256};

pub mod account;
pub mod blockchain;
pub mod bloom;
pub mod constants;
pub mod precompiles;
pub mod transaction;

pub use account::Account;
pub use blockchain::{BlockHashSource, ZeroBlockHashSource};
pub use bloom::LogsBloom;
pub use transaction::{BlockHeader, Transaction};

use sha3::{Digest, Keccak256};

/// keccak256 over arbitrary bytes.
pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256(Keccak256::digest(data).into())
}

/// keccak256(RLP(address, nonce))[12..], used by the Call Executor to derive
/// the address of a freshly created contract.
pub fn create_address(sender: Address, sender_nonce: u64) -> Address {
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(&sender);
    stream.append(&sender_nonce);
    let hash = keccak(stream.out());
    Address::from_slice(&hash.0[12..])
}
