use std::fmt::{Display, Formatter, Result as FmtResult};

use super::{CategoryKey, QueryKey};

/// The unit of replacement and observation for listing records: a category,
/// plus the query when the category is [`CategoryKey::Search`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub category: CategoryKey,
    pub query: Option<QueryKey>,
}
impl Scope {
    pub fn category(category: CategoryKey) -> Self {
        Self { category, query: None }
    }

    pub fn search(query: QueryKey) -> Self {
        Self {
            category: CategoryKey::Search,
            query: Some(query),
        }
    }

    /// Remote path for a page of this scope, or `None` if there is no such
    /// page (unpaginated listing, or a search scope without a query).
    ///
    /// ```rust
    /// use dytt_extract::models::{QueryKey, Scope};
    /// let scope = Scope::search(QueryKey::new("魅影缝匠").unwrap());
    /// assert_eq!(
    ///     scope.path(2).unwrap(),
    ///     "http://s.ygdy8.com/plus/so.php?kwtype=0&searchtype=title&keyword=%F7%C8%D3%B0%B7%EC%BD%B3&PageNo=2",
    /// );
    /// ```
    pub fn path(&self, page: u32) -> Option<String> {
        match (&self.category, &self.query) {
            (CategoryKey::Search, Some(query)) if page >= self.category.default_page() => {
                let mut path = format!("{}&keyword={}", self.category.default_path(), query.encoded());
                if page > self.category.default_page() {
                    path.push_str(&format!("&PageNo={page}"));
                }
                Some(path)
            },
            (CategoryKey::Search, _) => None,
            (category, _) => category.page_path(page),
        }
    }

    /// Persisted form of the query part of the scope.
    pub fn query_text(&self) -> &str {
        self.query.as_ref().map(QueryKey::text).unwrap_or_default()
    }
}
impl From<CategoryKey> for Scope {
    fn from(category: CategoryKey) -> Self {
        Self::category(category)
    }
}
impl From<QueryKey> for Scope {
    fn from(query: QueryKey) -> Self {
        Self::search(query)
    }
}
impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.query {
            Some(query) => write!(f, "{}:{}", self.category, query),
            None => write!(f, "{}", self.category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_first_page() {
        let scope = Scope::search(QueryKey::new("魅影缝匠").unwrap());
        assert_eq!(
            scope.path(1).unwrap(),
            "http://s.ygdy8.com/plus/so.php?kwtype=0&searchtype=title&keyword=%F7%C8%D3%B0%B7%EC%BD%B3"
        );
    }

    #[test]
    fn test_search_without_query_has_no_path() {
        assert_eq!(Scope::category(CategoryKey::Search).path(1), None);
    }

    #[test]
    fn test_category_scope_defers_to_category() {
        assert_eq!(Scope::category(CategoryKey::NewMovie).path(1).as_deref(), Some("/html/gndy/new_movie"));
    }
}
