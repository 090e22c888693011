//! Argument parsers for hex input.

pub fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{s}': {e}"))
}

/// Bytes given as one hex argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexPayload(pub Vec<u8>);

pub fn parse_hex_payload(s: &str) -> Result<HexPayload, String> {
    parse_hex_bytes(s).map(HexPayload)
}

/// Accepts `"2C 06"`, `"2c,06"`, `"0x2C 0x06"` or `"2C06"`.
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let tokens: Vec<&str> = s
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if let [single] = tokens.as_slice() {
        let digits = single
            .strip_prefix("0x")
            .or_else(|| single.strip_prefix("0X"))
            .unwrap_or(single);
        if digits.len() > 2 {
            return parse_packed(digits).ok_or_else(|| format!("invalid hex string '{s}'"));
        }
    }

    tokens.into_iter().map(parse_hex_u8).collect()
}

fn parse_packed(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 || !digits.is_ascii() {
        return None;
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}
