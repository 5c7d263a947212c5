//! Fixed precompile address table (0x01..0x04 in this revision). Cost
//! schedules for each precompile are the interpreter's responsibility, not
//! this crate's — see spec §4.4.

use crate::Address;

fn precompile_address(last_byte: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last_byte;
    Address::from(bytes)
}

/// ecrecover, sha256, ripemd160, identity.
pub const PRECOMPILE_COUNT: u8 = 4;

pub fn is_precompile(addr: &Address) -> bool {
    (1..=PRECOMPILE_COUNT).any(|i| &precompile_address(i) == addr)
}
