//! Symbol normalization between the external "BASEQUOTE" form and the
//! internal "BASE/QUOTE" form (§4.1).

const KNOWN_QUOTES: &[&str] = &["USDT", "USD", "EUR", "GBP", "KAU"];

/// `"XAUTUSD"` → `"XAUT/USD"`. Longest known quote suffix wins so `"USDT"`
/// is preferred over `"USD"` when both would match.
pub fn to_internal(external: &str) -> Option<String> {
    if external.contains('/') {
        return Some(external.to_ascii_uppercase());
    }
    let upper = external.to_ascii_uppercase();
    let mut candidates: Vec<&&str> = KNOWN_QUOTES.iter().filter(|q| upper.ends_with(*q) && upper.len() > q.len()).collect();
    candidates.sort_by_key(|q| std::cmp::Reverse(q.len()));
    candidates.first().map(|quote| {
        let base = &upper[..upper.len() - quote.len()];
        format!("{base}/{quote}")
    })
}

/// `"XAUT/USD"` → `"XAUTUSD"`.
pub fn to_external(internal: &str) -> String {
    internal.to_ascii_uppercase().replace('/', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_longest_known_quote() {
        assert_eq!(to_internal("XAUTUSDT").unwrap(), "XAUT/USDT");
        assert_eq!(to_internal("XAUTUSD").unwrap(), "XAUT/USD");
        assert_eq!(to_internal("KAUUSD").unwrap(), "KAU/USD");
    }

    #[test]
    fn passes_through_already_internal_form() {
        assert_eq!(to_internal("XAUT/USD").unwrap(), "XAUT/USD");
    }

    #[test]
    fn round_trips_to_external() {
        assert_eq!(to_external("XAUT/USD"), "XAUTUSD");
    }

    #[test]
    fn unknown_quote_fails_to_normalize() {
        assert!(to_internal("XAUTZZZ").is_none());
    }
}
