/// Prefix and grouping rules for rendering whole-unit amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub prefix: String,
    pub group_separator: char,
}

impl CurrencyFormat {
    pub fn rupiah() -> Self {
        CurrencyFormat {
            prefix: "Rp ".to_string(),
            group_separator: '.',
        }
    }

    /// Rounds to whole units (ties to even) and groups thousands.
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return format!("{}{}", self.prefix, value);
        }

        let rounded = format!("{:.0}", value.abs());
        let negative = value < 0.0 && rounded.bytes().any(|b| b != b'0');

        let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
        for (i, digit) in rounded.chars().enumerate() {
            if i > 0 && (rounded.len() - i) % 3 == 0 {
                grouped.push(self.group_separator);
            }
            grouped.push(digit);
        }

        format!("{}{}{}", self.prefix, if negative { "-" } else { "" }, grouped)
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat::rupiah()
    }
}

pub fn format_currency(value: f64) -> String {
    CurrencyFormat::rupiah().format(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_currency(1234567.0), "Rp 1.234.567");
        assert_eq!(format_currency(1_000_000_000.0), "Rp 1.000.000.000");
        assert_eq!(format_currency(999.0), "Rp 999");
        assert_eq!(format_currency(0.0), "Rp 0");
    }

    #[test]
    fn rounds_to_whole_units() {
        assert_eq!(format_currency(1234.4), "Rp 1.234");
        assert_eq!(format_currency(1234.6), "Rp 1.235");
        assert_eq!(format_currency(999_999.7), "Rp 1.000.000");
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(format_currency(0.5), "Rp 0");
        assert_eq!(format_currency(1.5), "Rp 2");
        assert_eq!(format_currency(2.5), "Rp 2");
        assert_eq!(format_currency(1234.5), "Rp 1.234");
    }

    #[test]
    fn negative_values_keep_sign() {
        assert_eq!(format_currency(-1500.0), "Rp -1.500");
        assert_eq!(format_currency(-0.2), "Rp 0");
    }

    #[test]
    fn custom_separator() {
        let format = CurrencyFormat {
            prefix: "$".to_string(),
            group_separator: ',',
        };
        assert_eq!(format.format(1234567.0), "$1,234,567");
    }
}
