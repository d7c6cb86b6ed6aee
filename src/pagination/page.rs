//! Page fetch results and count reconciliation.
//!
//! [`ReconciledPage`] is where the expensive count query gets avoided: the
//! fetch already over-requested one row, and that single extra bit of
//! evidence (`has_next`), together with the offset, settles the total for
//! most pages. Only the genuinely ambiguous cases invoke the count strategy
//! chain, and even then its answer only refines what the page itself proves.

use std::future::Future;

use super::count::ItemCount;
use super::request::PageRequest;

/// The product of a single `page_size + 1` fetch.
///
/// `has_next` is ground truth: it is true iff the fetch returned the extra
/// row and [`PageFetchResult::from_rows`] trimmed it. Nothing downstream
/// re-derives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetchResult<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}

impl<T> PageFetchResult<T> {
    /// Build a fetch result from rows fetched with `limit = page_size + 1`,
    /// trimming the over-fetched row.
    pub fn from_rows(mut rows: Vec<T>, page_size: u64) -> Self {
        let has_next = rows.len() as u64 > page_size;
        if has_next {
            rows.truncate(page_size as usize);
        }
        Self {
            items: rows,
            has_next,
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_next: false,
        }
    }
}

/// A page with its totals settled.
///
/// Immutable once constructed; [`ReconciledPage::map`] transforms the items
/// and carries every derived fact over unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledPage<T> {
    items: Vec<T>,
    request: PageRequest,
    has_next: bool,
    total: ItemCount,
}

impl<T> ReconciledPage<T> {
    /// Merge page-local evidence with a lazily supplied count.
    ///
    /// `supply` (typically the strategy chain) is invoked at most once, and
    /// only when the page itself cannot settle the total:
    ///
    /// 1. An empty page past offset zero proves nothing about the total, so
    ///    the supplied count is consulted; it is trusted when it names fewer
    ///    rows than the offset implies, otherwise the offset is the best
    ///    guess. Either way the total is an estimate and there is no next
    ///    page.
    /// 2. A page without a successor is provably the last one: the total is
    ///    exactly `offset + items`, and the supplier is never invoked.
    /// 3. A page with a successor proves at least `offset + page_size + 1`
    ///    rows exist; the supplied count is clamped up to that floor so an
    ///    estimate can never contradict what the fetch already proved.
    pub async fn reconcile<F, Fut>(
        request: PageRequest,
        fetch: PageFetchResult<T>,
        supply: F,
    ) -> Self
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<ItemCount>>,
    {
        let items_on_page = fetch.items.len() as u64;
        let offset = request.offset;

        let (total, has_next) = if items_on_page == 0 && offset > 0 {
            let total = match supply().await {
                Some(supplied) if supplied.count < offset => ItemCount::estimated(supplied.count),
                _ => ItemCount::estimated(offset),
            };
            (total, false)
        } else if !fetch.has_next {
            (ItemCount::exact(offset + items_on_page), false)
        } else {
            let minimum = offset + request.page_size + 1;
            let total = match supply().await {
                Some(supplied) => ItemCount::estimated(supplied.count.max(minimum)),
                None => ItemCount::estimated(minimum),
            };
            (total, true)
        };

        Self {
            items: fetch.items,
            request,
            has_next,
            total,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, keeping only the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Derived purely from the request, independent of counting.
    pub fn has_previous(&self) -> bool {
        self.request.offset > 0
    }

    pub fn total_item_count(&self) -> ItemCount {
        self.total
    }

    pub fn total_elements(&self) -> u64 {
        self.total.count
    }

    pub fn total_pages(&self) -> u64 {
        self.total.count.div_ceil(self.request.page_size)
    }

    /// Transform the items element-wise. Count, `has_next` and `has_previous`
    /// are never recomputed by a mapping.
    pub fn map<U, F>(self, f: F) -> ReconciledPage<U>
    where
        F: FnMut(T) -> U,
    {
        ReconciledPage {
            items: self.items.into_iter().map(f).collect(),
            request: self.request,
            has_next: self.has_next,
            total: self.total,
        }
    }
}
