use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Ephemeral search / sort / page state of one controller instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub search_term: String,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    pub page_index: usize,
    page_size: usize,
}

impl ViewState {
    pub const DEFAULT_PAGE_SIZE: usize = 5;

    pub fn new(sort_key: impl Into<String>, sort_direction: SortDirection) -> Self {
        Self {
            search_term: String::new(),
            sort_key: sort_key.into(),
            sort_direction,
            page_index: 0,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Stored verbatim; case folding happens at filter time. Does not reset the page.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Same key flips direction; a new key starts ascending
    pub fn set_sort(&mut self, key: &str) {
        if self.sort_key == key {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_key = key.to_string();
            self.sort_direction = SortDirection::Asc;
        }
    }

    /// Any index is accepted; out-of-range pages render empty
    pub fn set_page(&mut self, index: usize) {
        self.page_index = index;
    }

    /// Sizes below 1 are clamped to 1; always snaps back to the first page
    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size.max(1);
        self.page_index = 0;
    }
}
