//! Unit conversion and display formatting

const WEI_PER_GWEI: f64 = 1e9;
const WEI_PER_ETH: f64 = 1e18;

/// Convert wei to Gwei
pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / WEI_PER_GWEI
}

/// Convert wei to ETH
pub fn wei_to_eth(wei: u128) -> f64 {
    wei as f64 / WEI_PER_ETH
}

/// Gwei amount as a hex wei quantity (fractional wei truncated)
pub fn gwei_to_wei_hex(gwei: f64) -> String {
    let wei = (gwei.max(0.0) * WEI_PER_GWEI).floor() as u128;
    format!("{:#x}", wei)
}

/// Shorten an address to `0x1234...abcd`
pub fn format_address(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Render a wei balance as ETH with four decimals
pub fn format_balance(wei: u128) -> String {
    format!("{:.4} ETH", wei_to_eth(wei))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_conversions() {
        assert_eq!(wei_to_gwei(25_000_000_000), 25.0);
        assert_eq!(wei_to_eth(1_500_000_000_000_000_000), 1.5);
    }

    #[test]
    fn test_gwei_to_wei_hex() {
        assert_eq!(gwei_to_wei_hex(25.0), "0x5d21dba00");
        assert_eq!(gwei_to_wei_hex(12.5), "0x2e90edd00");
        assert_eq!(gwei_to_wei_hex(0.0), "0x0");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("0x71C7656EC7ab88b098defB751B7401B5f6d8976F"),
            "0x71C7...976F"
        );
        assert_eq!(format_address(""), "");
        assert_eq!(format_address("0xabc"), "0xabc");
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(1_250_000_000_000_000_000), "1.2500 ETH");
        assert_eq!(format_balance(0), "0.0000 ETH");
    }
}
