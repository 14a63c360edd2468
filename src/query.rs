//! Filters, sort order and paging for listing and bulk deletion.

use std::collections::BTreeMap;

/// Predicate applied to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    /// `column = value`
    Exact(String),
    /// `column IN (values)`
    OneOf(Vec<String>),
    /// `column = v1 OR column = v2 ...`
    Or(Vec<String>),
    /// Substring match, ignoring ASCII case
    Fuzzy(String),
}

impl Keyword {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Keyword::Exact(expected) => value == expected,
            Keyword::OneOf(values) | Keyword::Or(values) => values.iter().any(|v| v == value),
            Keyword::Fuzzy(needle) => value
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub key: String,
    pub order: SortOrder,
}

/// Query over report rows.
///
/// Keywords are AND-ed. A query is paged only when both `page_number` and
/// `page_size` are at least 1; page numbers start at 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub keywords: BTreeMap<String, Keyword>,
    pub page_number: u64,
    pub page_size: u64,
    pub sort: Option<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, key: impl Into<String>, keyword: Keyword) -> Self {
        self.keywords.insert(key.into(), keyword);
        self
    }

    pub fn page(mut self, number: u64, size: u64) -> Self {
        self.page_number = number;
        self.page_size = size;
        self
    }

    pub fn sort_by(mut self, key: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(Sort {
            key: key.into(),
            order,
        });
        self
    }

    /// `(limit, offset)` for a paged query, `None` for the full result set.
    pub fn page_window(&self) -> Option<(u64, u64)> {
        if self.page_number == 0 || self.page_size == 0 {
            return None;
        }
        Some((
            self.page_size,
            (self.page_number - 1).saturating_mul(self.page_size),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_exact() {
        let kw = Keyword::Exact("sha256:abc".to_string());
        assert!(kw.matches("sha256:abc"));
        assert!(!kw.matches("sha256:abcd"));
    }

    #[test]
    fn test_keyword_one_of_and_or() {
        let values = vec!["a".to_string(), "b".to_string()];
        for kw in [Keyword::OneOf(values.clone()), Keyword::Or(values)] {
            assert!(kw.matches("a"));
            assert!(kw.matches("b"));
            assert!(!kw.matches("c"));
        }
    }

    #[test]
    fn test_keyword_empty_list_matches_nothing() {
        assert!(!Keyword::OneOf(vec![]).matches(""));
        assert!(!Keyword::Or(vec![]).matches("a"));
    }

    #[test]
    fn test_keyword_fuzzy() {
        let kw = Keyword::Fuzzy("vnd.scanner".to_string());
        assert!(kw.matches("application/vnd.scanner.report+json"));
        assert!(!kw.matches("application/json"));
    }

    #[test]
    fn test_keyword_fuzzy_ignores_case() {
        let kw = Keyword::Fuzzy("VND.Scanner".to_string());
        assert!(kw.matches("application/vnd.scanner.report+json"));
        assert!(kw.matches("APPLICATION/VND.SCANNER"));
        assert!(!kw.matches("application/vnd_scanner"));
    }

    #[test]
    fn test_unpaged_by_default() {
        assert_eq!(Query::new().page_window(), None);
        assert_eq!(Query::new().page(0, 10).page_window(), None);
        assert_eq!(Query::new().page(2, 0).page_window(), None);
    }

    #[test]
    fn test_page_window() {
        assert_eq!(Query::new().page(1, 10).page_window(), Some((10, 0)));
        assert_eq!(Query::new().page(3, 25).page_window(), Some((25, 50)));
    }

    #[test]
    fn test_builder_replaces_keyword() {
        let query = Query::new()
            .keyword("digest", Keyword::Exact("a".to_string()))
            .keyword("digest", Keyword::Exact("b".to_string()))
            .sort_by("created_at", SortOrder::Desc);

        assert_eq!(query.keywords.len(), 1);
        assert_eq!(
            query.keywords.get("digest"),
            Some(&Keyword::Exact("b".to_string()))
        );
        assert_eq!(query.sort.map(|s| s.order), Some(SortOrder::Desc));
    }
}
