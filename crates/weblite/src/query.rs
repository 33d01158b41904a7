//! Decoded query strings.

/// Percent-decoded `k=v` pairs in occurrence order.
///
/// Repeated keys keep every occurrence. [`Query::get`] answers with the last
/// one, which is what collecting the pairs into a map would leave behind;
/// [`Query::all`] exposes the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Decodes a raw query string (the part after `?`) under the WHATWG form
    /// rules. `+` decodes to a space and a key without `=` carries the empty
    /// value. Decoding is lenient; a broken percent escape stays literal
    /// instead of failing.
    pub fn parse(raw: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs = serde_urlencoded::from_str(raw)?;
        Ok(Self { pairs })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn all(&self, name: &str) -> Vec<&str> {
        self.pairs.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == name)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Percent-encodes the pairs back into a query string.
    pub fn encode(&self) -> String {
        serde_urlencoded::to_string(&self.pairs).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percent_escapes_and_plus() {
        let query = Query::parse("Hello=W%C3%B6rld&1=2&note=a+b").unwrap();
        assert_eq!(query.get("Hello"), Some("Wörld"));
        assert_eq!(query.get("1"), Some("2"));
        assert_eq!(query.get("note"), Some("a b"));
    }

    #[test]
    fn last_occurrence_wins_but_all_are_kept() {
        let query = Query::parse("a=&b=2&c&a=42").unwrap();
        assert_eq!(query.get("a"), Some("42"));
        assert_eq!(query.all("a"), vec!["", "42"]);
        assert_eq!(query.get("b"), Some("2"));
        assert_eq!(query.get("c"), Some(""));
        assert_eq!(query.get("missing"), None);
        assert!(!query.contains("missing"));
    }

    #[test]
    fn empty_string_has_no_pairs() {
        assert!(Query::parse("").unwrap().is_empty());
    }

    #[test]
    fn broken_escapes_decode_leniently() {
        let query = Query::parse("a=%zz&b=%FF").unwrap();
        assert_eq!(query.get("a"), Some("%zz"));
        // a non-UTF-8 escape decodes to the replacement character
        assert_eq!(query.get("b"), Some("\u{FFFD}"));
    }

    #[test]
    fn encode_round_trips_decoded_pairs() {
        let query = Query::parse("Hello=W%C3%B6rld&note=a+b").unwrap();
        assert_eq!(Query::parse(&query.encode()).unwrap(), query);
    }
}
