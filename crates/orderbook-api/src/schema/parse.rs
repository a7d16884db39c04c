use alloy_primitives::{Address, B256, U256};

use crate::ApiError;

pub(crate) fn address(input: &str) -> Result<Address, ApiError> {
    input
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("not an address: {input}")))
}

pub(crate) fn bytes32(input: &str) -> Result<B256, ApiError> {
    input
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("not a bytes32: {input}")))
}

/// Decimal or 0x-prefixed integer
pub(crate) fn uint(input: &str) -> Result<U256, ApiError> {
    input
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("not an unsigned integer: {input}")))
}

/// Result limit between 1 and `max`
pub(crate) fn limit(requested: i32, max: usize) -> usize {
    (requested.max(1) as usize).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsers() {
        assert_eq!(address(" 0x0000000000000000000000000000000000000001 ").unwrap(), Address::with_last_byte(1));
        assert!(address("0x01").is_err());
        assert!(bytes32("0x01").is_err());
        assert_eq!(uint("1000").unwrap(), U256::from(1000u64));
        assert_eq!(uint("0x10").unwrap(), U256::from(16u64));
        assert!(uint("-1").is_err());
        assert_eq!(limit(0, 50), 1);
        assert_eq!(limit(500, 50), 50);
    }
}
