//! Tawf Sharia Ijarah contract interface

use super::abi::{AbiType, Method};
use crate::constants::BOX_PREFIX;
use crate::types::Address;

const LEASE_INFO: AbiType = AbiType::Tuple(&[AbiType::Uint64, AbiType::Uint64, AbiType::Uint64]);
const LESSOR_INFO: AbiType = AbiType::Tuple(&[AbiType::Uint64, AbiType::Uint64]);

/// Deposit the grouped payment and start (or top up) a lease
pub const LEASE_VALIDATION_RIGHTS: Method = Method {
    name: "lease_validation_rights",
    args: &[AbiType::Pay],
    returns: Some(AbiType::String),
};

/// Pay out accrued ujrah and reset the accrual clock
pub const CLAIM_UJRAH: Method = Method {
    name: "claim_ujrah",
    args: &[],
    returns: Some(AbiType::String),
};

/// Withdraw `amount` of principal plus all accrued ujrah
pub const TERMINATE_LEASE: Method = Method {
    name: "terminate_lease",
    args: &[AbiType::Uint64],
    returns: Some(AbiType::String),
};

/// `(principal, ujrah, duration)` for the sender
pub const GET_MY_IJARAH_INFO: Method = Method {
    name: "get_my_ijarah_info",
    args: &[],
    returns: Some(LEASE_INFO),
};

/// `(principal, ujrah)` for any lessor
pub const CHECK_LESSOR_INFO: Method = Method {
    name: "check_lessor_info",
    args: &[AbiType::Address],
    returns: Some(LESSOR_INFO),
};

/// Balance held by the application account
pub const TOTAL_CONTRACT_BALANCE: Method = Method {
    name: "total_contract_balance",
    args: &[],
    returns: Some(AbiType::Uint64),
};

pub static ALL_METHODS: [Method; 6] = [
    LEASE_VALIDATION_RIGHTS,
    CLAIM_UJRAH,
    TERMINATE_LEASE,
    GET_MY_IJARAH_INFO,
    CHECK_LESSOR_INFO,
    TOTAL_CONTRACT_BALANCE,
];

/// Global state keys
pub const ANNUAL_UJRAH_RATE_KEY: &str = "ANNUAL_UJRAH_RATE_BP";
pub const SECONDS_PER_YEAR_KEY: &str = "SECONDS_PER_YEAR";

/// Look a method up by its selector
#[cfg(test)]
pub(crate) fn method_by_selector(selector: &[u8]) -> Option<&'static Method> {
    ALL_METHODS.iter().find(|m| m.selector()[..] == *selector)
}

/// Box key holding a lessor's record: `"ijarah_"` followed by the raw public key
pub fn box_name(lessor: &Address) -> Vec<u8> {
    let mut name = Vec::with_capacity(BOX_PREFIX.len() + 32);
    name.extend_from_slice(BOX_PREFIX);
    name.extend_from_slice(lessor.as_bytes());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_signatures() {
        let signatures: Vec<String> = ALL_METHODS.iter().map(Method::signature).collect();
        assert_eq!(
            signatures,
            vec![
                "lease_validation_rights(pay)string",
                "claim_ujrah()string",
                "terminate_lease(uint64)string",
                "get_my_ijarah_info()(uint64,uint64,uint64)",
                "check_lessor_info(address)(uint64,uint64)",
                "total_contract_balance()uint64",
            ]
        );
    }

    #[test]
    fn test_selectors_are_distinct() {
        let selectors: HashSet<[u8; 4]> = ALL_METHODS.iter().map(Method::selector).collect();
        assert_eq!(selectors.len(), ALL_METHODS.len());
        for method in ALL_METHODS.iter() {
            assert_eq!(method_by_selector(&method.selector()), Some(method));
        }
        assert_eq!(method_by_selector(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn test_box_name() {
        let lessor = Address([9u8; 32]);
        let name = box_name(&lessor);
        assert_eq!(name.len(), 39);
        assert!(name.starts_with(b"ijarah_"));
        assert_eq!(&name[7..], lessor.as_bytes());
    }
}
