//! Parsing helpers for numeric values coming off the wire.
//!
//! Nodes report large numbers inconsistently: JSON numbers, decimal strings,
//! or 0x-prefixed hex strings, depending on the RPC and runtime version.
//! Everything funnels through [`parse_u128`] so the rest of the crate only
//! ever sees exact integers.

use serde_json::Value;

/// Extract a u128 from a JSON value, handling numbers, decimal strings and
/// hex strings. Returns `None` for anything else.
pub fn parse_u128(value: &Value) -> Option<u128> {
    match value {
        Value::Number(number) => number.as_u64().map(u128::from),
        Value::String(string) => {
            if let Some(hex_digits) = string.strip_prefix("0x") {
                u128::from_str_radix(hex_digits, 16).ok()
            } else {
                string.parse::<u128>().ok()
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_u128_number() {
        assert_eq!(parse_u128(&json!(125000000)), Some(125000000));
        assert_eq!(parse_u128(&json!(0)), Some(0));
    }

    #[test]
    fn test_parse_u128_decimal_string() {
        assert_eq!(
            parse_u128(&json!("941325000000")),
            Some(941_325_000_000)
        );
    }

    #[test]
    fn test_parse_u128_hex_string() {
        // 0x7643c00 = 124009472
        assert_eq!(parse_u128(&json!("0x7643c00")), Some(124_009_472));
    }

    #[test]
    fn test_parse_u128_beyond_u64() {
        assert_eq!(
            parse_u128(&json!("340282366920938463463374607431768211455")),
            Some(u128::MAX)
        );
    }

    #[test]
    fn test_parse_u128_rejects_garbage() {
        assert_eq!(parse_u128(&json!("not a number")), None);
        assert_eq!(parse_u128(&json!(null)), None);
        assert_eq!(parse_u128(&json!(["1"])), None);
        assert_eq!(parse_u128(&json!(-1)), None);
    }
}
