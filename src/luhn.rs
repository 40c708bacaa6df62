// ✔️ Luhn (mod-10) checksum

/// Check digit that makes `prefix` followed by it pass the Luhn check
///
/// Walking from the rightmost prefix digit, every other digit starting with
/// that one is doubled (minus 9 when it exceeds 9).
pub fn check_digit(prefix: &[u8]) -> u8 {
    let sum: u32 = prefix
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = u32::from(d);
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    ((10 - (sum % 10)) % 10) as u8
}

/// Digits of an all-digit string, or `None` if anything else is present
pub fn digits(number: &str) -> Option<Vec<u8>> {
    number
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

/// Full-number validation, including the trailing check digit
pub fn is_valid(number: &str) -> bool {
    match digits(number) {
        Some(d) if d.len() >= 2 => {
            let (body, last) = d.split_at(d.len() - 1);
            check_digit(body) == last[0]
        }
        _ => false,
    }
}
