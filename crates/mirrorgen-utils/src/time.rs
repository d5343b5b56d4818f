use std::time::Duration;

/// Parses a compact duration such as `90s`, `10m` or `1h30m`.
///
/// Units are `s`, `m`, `h` and `d`; every number must carry a unit. Returns `None` for
/// malformed input or on overflow. An empty string is a zero duration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use mirrorgen_utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
/// assert_eq!(parse_duration("10x"), None);
/// ```
pub fn parse_duration(input: &str) -> Option<Duration> {
    let mut total_secs: u64 = 0;
    let mut chars = input.trim().chars().peekable();

    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(c);
            chars.next();
        }

        if digits.is_empty() {
            return None;
        }

        let number: u64 = digits.parse().ok()?;
        let unit: u64 = match chars.next()? {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return None,
        };

        total_secs = total_secs.checked_add(number.checked_mul(unit)?)?;
    }

    Some(Duration::from_secs(total_secs))
}
