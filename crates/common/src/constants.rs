/// Base intrinsic gas cost of any transaction.
pub const TX_BASE_GAS: u64 = 21_000;
/// Additional intrinsic gas charged per zero byte of calldata.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Additional intrinsic gas charged per non-zero byte of calldata.
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;
/// Surcharge added to the intrinsic gas of a contract-creation transaction.
pub const TX_CREATE_GAS: u64 = 32_000;
/// Per-byte surcharge for installing the code returned by a CREATE/CREATE2 frame.
pub const CREATE_DATA_GAS: u64 = 200;

/// `intrinsicGas(tx)` — basefee per spec §4.5 stage 7.
pub fn intrinsic_gas(data: &[u8], is_contract_creation: bool) -> u64 {
    let data_cost: u64 = data
        .iter()
        .map(|b| {
            if *b == 0 {
                TX_DATA_ZERO_GAS
            } else {
                TX_DATA_NON_ZERO_GAS
            }
        })
        .sum();
    let creation_surcharge = if is_contract_creation { TX_CREATE_GAS } else { 0 };
    TX_BASE_GAS + data_cost + creation_surcharge
}
