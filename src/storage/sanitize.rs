/// Identifier allow-list for names that must be interpolated into SQL.
///
/// Only ASCII alphanumerics and `_` survive. Values never go through here;
/// they are always bound as parameters.
pub fn clean_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_identifiers() {
        assert_eq!(clean_identifier("category_id"), "category_id");
        assert_eq!(clean_identifier("Phrases2"), "Phrases2");
    }

    #[test]
    fn strips_injection_attempts() {
        assert_eq!(clean_identifier("users; DROP TABLE"), "usersDROPTABLE");
        assert_eq!(clean_identifier("id=1 OR 1=1 --"), "id1OR11");
        assert_eq!(clean_identifier("\"line\""), "line");
    }

    #[test]
    fn drops_non_ascii() {
        assert_eq!(clean_identifier("naïve"), "nave");
        assert_eq!(clean_identifier("; --"), "");
    }
}
