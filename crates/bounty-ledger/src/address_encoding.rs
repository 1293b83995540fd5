use anyhow::{anyhow, Result};
use bech32::{Bech32, Hrp};

const BOUNTY_HRP: &str = "bnty";

pub fn encode_address(bytes: &[u8; 32]) -> Result<String> {
    let hrp = Hrp::parse(BOUNTY_HRP)?;

    let address = bech32::encode::<Bech32>(hrp, bytes)
        .map_err(|e| anyhow!("Failed to encode address: {}", e))?;

    Ok(address)
}

pub fn decode_address(address: &str) -> Result<[u8; 32]> {
    let (hrp, data) =
        bech32::decode(address).map_err(|e| anyhow!("Failed to decode address: {}", e))?;

    if hrp.as_str() != BOUNTY_HRP {
        return Err(anyhow!(
            "Invalid address prefix: expected '{}', got '{}'",
            BOUNTY_HRP,
            hrp.as_str()
        ));
    }

    if data.len() != 32 {
        return Err(anyhow!(
            "Invalid address length: expected 32 bytes, got {}",
            data.len()
        ));
    }

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data);

    Ok(bytes)
}

pub fn is_hex_address(address: &str) -> bool {
    let hex_str = address.strip_prefix("0x").unwrap_or(address);
    hex::decode(hex_str).map(|b| b.len() == 32).unwrap_or(false)
}

pub fn from_hex_address(hex_addr: &str) -> Result<[u8; 32]> {
    let hex_str = hex_addr.strip_prefix("0x").unwrap_or(hex_addr);

    let bytes = hex::decode(hex_str).map_err(|e| anyhow!("Invalid hex address: {}", e))?;

    if bytes.len() != 32 {
        return Err(anyhow!(
            "Invalid address length: expected 32 bytes, got {}",
            bytes.len()
        ));
    }

    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
