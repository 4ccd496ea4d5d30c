//! Page-number pagination for list responses.

use serde::{Deserialize, Serialize};

/// One page of results. `next` and `previous` are page numbers, or `None` at
/// either end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
  pub count:    usize,
  pub next:     Option<u32>,
  pub previous: Option<u32>,
  pub results:  Vec<T>,
}

/// Cut page `page` (1-based) out of `items`.
///
/// Returns `None` for page 0 or a page past the end. The first page always
/// exists, even when `items` is empty.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: usize) -> Option<Page<T>> {
  let page_size = page_size.max(1);
  let count = items.len();
  let pages = count.div_ceil(page_size).max(1);
  let index = usize::try_from(page).ok()?.checked_sub(1)?;
  if index >= pages {
    return None;
  }

  let results = items
    .into_iter()
    .skip(index * page_size)
    .take(page_size)
    .collect();

  Some(Page {
    count,
    next: (index + 1 < pages).then(|| page + 1),
    previous: (index > 0).then(|| page - 1),
    results,
  })
}
