const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number '{0}' contains no digits")]
    Empty(String),
    #[error("phone number '{raw}' normalizes to {digits} digits, expected 8-15")]
    Length { raw: String, digits: usize },
}

/// Rewrite a subscriber-entered number into `+<country><number>` form.
///
/// Separators are dropped and a leading `+` is kept. Numbers without `+` are
/// read as local (`0...`), already carrying the default country code, or
/// bare subscriber numbers.
pub fn normalize(raw: &str, default_country_code: &str) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    let international = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return Err(PhoneError::Empty(raw.to_string()));
    }

    let full = if international {
        digits
    } else if let Some(local) = digits.strip_prefix('0') {
        format!("{default_country_code}{local}")
    } else if digits.starts_with(default_country_code) {
        digits
    } else {
        format!("{default_country_code}{digits}")
    };

    if !(MIN_DIGITS..=MAX_DIGITS).contains(&full.len()) {
        return Err(PhoneError::Length {
            raw: raw.to_string(),
            digits: full.len(),
        });
    }

    Ok(format!("+{full}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_numbers_gain_the_default_country_code() {
        assert_eq!(normalize("0772123456", "263").unwrap(), "+263772123456");
        assert_eq!(normalize("077 212-3456", "263").unwrap(), "+263772123456");
    }

    #[test]
    fn country_code_without_plus_is_prefixed() {
        assert_eq!(normalize("263772123456", "263").unwrap(), "+263772123456");
    }

    #[test]
    fn international_numbers_are_unchanged() {
        assert_eq!(normalize("+263772123456", "263").unwrap(), "+263772123456");
        assert_eq!(normalize("+44 20 7946 0958", "263").unwrap(), "+442079460958");
    }

    #[test]
    fn bare_subscriber_numbers_are_prefixed() {
        assert_eq!(normalize("772123456", "263").unwrap(), "+263772123456");
    }

    #[test]
    fn rejects_empty_and_implausible_numbers() {
        assert_eq!(
            normalize(" - ", "263"),
            Err(PhoneError::Empty(" - ".to_string()))
        );
        assert!(matches!(
            normalize("+12", "263"),
            Err(PhoneError::Length { digits: 2, .. })
        ));
        assert!(matches!(
            normalize("+1234567890123456", "263"),
            Err(PhoneError::Length { digits: 16, .. })
        ));
    }
}
