/// Free-text filtering and paging of listings
///
/// Filters run over a listing that has already been fetched; they are never
/// pushed down into SQL. A query matches a row when its trimmed, lowercased
/// text is a substring of any of the row's searchable fields.

use serde::Serialize;

/// Page size for paper and dataset listings
pub const LIBRARY_PAGE_SIZE: usize = 10;

/// Page size for member directories
pub const DIRECTORY_PAGE_SIZE: usize = 12;

/// A row that can be matched by the free-text filter
pub trait Searchable {
    /// Display fields the filter looks at
    fn search_fields(&self) -> Vec<&str>;
}

/// Whether a row matches an already-normalized query
fn hit<T: Searchable + ?Sized>(row: &T, needle: &str) -> bool {
    row.search_fields()
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Keeps the rows matching `query`; a blank query keeps everything
pub fn filter_rows<T: Searchable>(rows: Vec<T>, query: Option<&str>) -> Vec<T> {
    let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
    if needle.is_empty() {
        return rows;
    }

    rows.into_iter().filter(|row| hit(row, &needle)).collect()
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,

    /// 1-based page number
    pub page: usize,

    pub page_size: usize,

    /// Rows across all pages
    pub total: usize,

    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cuts one page out of a full listing
    ///
    /// Page numbers start at 1; page 0 is treated as page 1 and pages past
    /// the end are empty.
    pub fn paginate(rows: Vec<T>, page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total = rows.len();
        let total_pages = total.div_ceil(page_size);

        let items = rows
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Self {
            items,
            page,
            page_size,
            total,
            total_pages,
        }
    }
}
