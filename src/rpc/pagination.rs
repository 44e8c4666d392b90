use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page cursors carried in the `meta` object of list responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub prev: Option<u64>,
    #[serde(rename = "self")]
    pub current: Option<u64>,
    pub next: Option<u64>,
    pub last: Option<u64>,
}

impl Pagination {
    /// Reads `prev/self/next/last` from a `meta` object. Each entry may be a
    /// bare page number or a link carrying a `page=N` query parameter.
    pub fn from_meta(meta: &Value) -> Self {
        let cursor = |key: &str| meta.get(key).and_then(cursor_value);
        Self {
            prev: cursor("prev"),
            current: cursor("self"),
            next: cursor("next"),
            last: cursor("last"),
        }
    }
}

fn cursor_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(link) => link
            .parse::<u64>()
            .ok()
            .or_else(|| page_from_link(link)),
        _ => None,
    }
}

/// Extracts the number following the first `page=` in a link.
pub fn page_from_link(link: &str) -> Option<u64> {
    link.match_indices("page=").find_map(|(position, marker)| {
        let rest = &link[position + marker.len()..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        rest[..end].parse().ok()
    })
}

/// One page of items plus the cursors to its neighbours.
#[derive(Clone, Debug, PartialEq)]
pub struct Paginator<T> {
    items: Vec<T>,
    pagination: Pagination,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self { items, pagination }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn current_page(&self) -> Option<u64> {
        self.pagination.current
    }

    pub fn previous_page(&self) -> Option<u64> {
        self.pagination.prev
    }

    pub fn next_page(&self) -> Option<u64> {
        self.pagination.next
    }

    pub fn last_page(&self) -> Option<u64> {
        self.pagination.last
    }

    pub fn has_more_pages(&self) -> bool {
        self.pagination.next.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Rewrites every item in place; the cursors are untouched.
    pub fn transform<F>(&mut self, mut f: F)
    where
        F: FnMut(T) -> T,
    {
        self.items = std::mem::take(&mut self.items).into_iter().map(&mut f).collect();
    }

    pub fn map<U, F>(self, f: F) -> Paginator<U>
    where
        F: FnMut(T) -> U,
    {
        Paginator {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
