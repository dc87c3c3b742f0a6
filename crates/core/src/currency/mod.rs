//! Currency codec
//!
//! The ledger identifies issued currencies either by a standard code of up
//! to three characters ("USD") or by a 160-bit code written as 40 hex digits,
//! which token issuers use to carry longer ASCII symbols ("534F4C4F00..."
//! for "SOLO"). These helpers convert between the two forms. They never fail:
//! anything that cannot be decoded is passed through unchanged.

/// Length of a non-standard currency code in hex digits
pub const HEX_CODE_LEN: usize = 40;

/// Maximum number of symbol bytes a hex code can carry
const MAX_SYMBOL_BYTES: usize = HEX_CODE_LEN / 2;

/// True if `code` is a 40-digit hex currency code
pub fn is_hex_code(code: &str) -> bool {
    code.len() == HEX_CODE_LEN && code.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_symbol_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

/// Convert a ledger currency code into a human-readable symbol.
///
/// Codes of three characters or fewer are returned trimmed. Hex codes are
/// decoded as ASCII up to the first zero byte; if that yields nothing or a
/// disallowed character, the original code is returned.
pub fn to_readable(code: &str) -> String {
    if code.len() <= 3 {
        return code.trim().to_string();
    }

    if !is_hex_code(code) {
        return code.to_string();
    }

    let bytes = match hex::decode(code) {
        Ok(b) => b,
        Err(_) => return code.to_string(),
    };

    let symbol: Vec<u8> = bytes.into_iter().take_while(|b| *b != 0).collect();
    if symbol.is_empty() || !symbol.iter().all(|b| is_symbol_byte(*b)) {
        return code.to_string();
    }

    // Only ASCII bytes survive the filter above
    String::from_utf8(symbol).unwrap_or_else(|_| code.to_string())
}

/// Convert a human-readable symbol into the ledger's currency-code form.
///
/// Symbols of three characters or fewer are standard codes and pass through.
/// Longer symbols are hex-encoded (upper case) and zero-padded to 40 digits;
/// anything past 20 bytes is dropped.
pub fn to_ledger_format(symbol: &str) -> String {
    let symbol = symbol.trim();
    if symbol.len() <= 3 {
        return symbol.to_string();
    }
    if is_hex_code(symbol) {
        return symbol.to_ascii_uppercase();
    }

    let bytes = &symbol.as_bytes()[..symbol.len().min(MAX_SYMBOL_BYTES)];
    let mut code = hex::encode_upper(bytes);
    while code.len() < HEX_CODE_LEN {
        code.push('0');
    }
    code
}
