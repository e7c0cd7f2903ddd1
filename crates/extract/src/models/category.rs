use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::sanitize;
use crate::error::{Error, ErrorKind};

/// Which structural extractor understands a category's pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkupShape {
    /// The "latest movies" block on the site home page.
    Home,
    /// A `/html/gndy/...` category listing.
    Category,
    /// The search results page.
    Search,
}
impl MarkupShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkupShape::Home => "home",
            MarkupShape::Category => "category",
            MarkupShape::Search => "search",
        }
    }
}
impl Display for MarkupShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A logical remote listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CategoryKey {
    /// Latest releases, as featured on the home page.
    HomeLatest,
    /// New releases (最新影片).
    NewMovie,
    /// Domestic releases (国内电影).
    China,
    /// European and American releases (欧美电影).
    Oumei,
    /// Japanese and Korean releases (日韩电影).
    Rihan,
    /// Free-text search results.
    Search,
}
impl CategoryKey {
    pub const ALL: [CategoryKey; 6] = [
        CategoryKey::HomeLatest,
        CategoryKey::NewMovie,
        CategoryKey::China,
        CategoryKey::Oumei,
        CategoryKey::Rihan,
        CategoryKey::Search,
    ];

    /// Stable identifier, used as the persisted value of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKey::HomeLatest => "home-latest",
            CategoryKey::NewMovie => "new-movie",
            CategoryKey::China => "china",
            CategoryKey::Oumei => "oumei",
            CategoryKey::Rihan => "rihan",
            CategoryKey::Search => "search",
        }
    }

    /// Remote path of the first page.
    ///
    /// Relative paths are resolved against the configured site; the search
    /// endpoint lives on its own host and is absolute.
    pub fn default_path(&self) -> &'static str {
        match self {
            CategoryKey::HomeLatest => "/",
            CategoryKey::NewMovie => "/html/gndy/new_movie",
            CategoryKey::China => "/html/gndy/china",
            CategoryKey::Oumei => "/html/gndy/oumei",
            CategoryKey::Rihan => "/html/gndy/rihan",
            CategoryKey::Search => "http://s.ygdy8.com/plus/so.php?kwtype=0&searchtype=title",
        }
    }

    /// Page number of the first page of a listing.
    pub fn default_page(&self) -> u32 {
        1
    }

    /// Site-internal list number used in the file name of pages after the first.
    pub fn list_id(&self) -> Option<u32> {
        match self {
            CategoryKey::NewMovie => Some(23),
            CategoryKey::China => Some(4),
            CategoryKey::Oumei => Some(7),
            CategoryKey::Rihan => Some(6),
            CategoryKey::HomeLatest | CategoryKey::Search => None,
        }
    }

    pub fn shape(&self) -> MarkupShape {
        match self {
            CategoryKey::HomeLatest => MarkupShape::Home,
            CategoryKey::Search => MarkupShape::Search,
            _ => MarkupShape::Category,
        }
    }

    /// The home page is a single page; everything else can be paged through.
    pub fn is_paginated(&self) -> bool {
        !matches!(self, CategoryKey::HomeLatest)
    }

    /// Remote path for a page of a non-search listing, or `None` if the
    /// listing has no such page.
    pub fn page_path(&self, page: u32) -> Option<String> {
        if page < self.default_page() || matches!(self, CategoryKey::Search) {
            return None;
        }
        if page == self.default_page() {
            return Some(self.default_path().to_string());
        }
        let list_id = self.list_id()?;
        Some(format!("{}/list_{}_{}.html", self.default_path(), list_id, page))
    }
}
impl FromStr for CategoryKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "home" | "homelatest" | "latest" => Self::HomeLatest,
            "new" | "newmovie" | "dyzz" => Self::NewMovie,
            "china" => Self::China,
            "oumei" => Self::Oumei,
            "rihan" => Self::Rihan,
            "search" => Self::Search,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "category",
                value: s.to_string(),
            }),
        })
    }
}
impl Display for CategoryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
