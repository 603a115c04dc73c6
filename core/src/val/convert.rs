/// Renders a number the way `tostring` does: integral values without a
/// fractional part, everything else in the shortest form that reads back
/// to the same value.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // every integral value in [-2^63, 2^63) converts to i64 exactly
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        let mut buf = itoa::Buffer::new();
        return buf.format(n as i64).to_string();
    }
    let mut buf = ryu::Buffer::new();
    let text = buf.format_finite(n);
    text.strip_suffix(".0").unwrap_or(text).to_string()
}

/// Reads a numeric string: surrounding whitespace is ignored, decimal,
/// exponent and `0x` hexadecimal integer forms are accepted.
pub fn parse_number(bytes: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    let (negative, unsigned) = match text.as_bytes()[0] {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if let Some(hex) = unsigned.strip_prefix("0x").or_else(|| unsigned.strip_prefix("0X")) {
        let value = u64::from_str_radix(hex, 16).ok()? as f64;
        return Some(if negative { -value } else { value });
    }

    // `f64::from_str` also takes "inf" and "NaN"; numeric strings do not.
    let well_formed = text.bytes().any(|b| b.is_ascii_digit())
        && text.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !well_formed {
        return None;
    }
    text.parse::<f64>().ok()
}
