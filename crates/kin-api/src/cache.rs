//! Short-lived cache of rendered clan tree pages.
//!
//! Entries are keyed by owner, case-folded clan name and page number, and
//! expire after a fixed TTL. Writes to people do not invalidate entries, so a
//! page may be stale for up to one TTL. A zero TTL disables caching.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use kin_core::{geo::fold, page::Page, tree::TreeNode, user::Owner};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TreeKey {
  owner: Owner,
  clan:  String,
  page:  u32,
}

pub struct TreeCache {
  ttl:     Duration,
  entries: DashMap<TreeKey, (Instant, Page<TreeNode>)>,
}

impl TreeCache {
  pub fn new(ttl: Duration) -> Self { Self { ttl, entries: DashMap::new() } }

  pub fn is_enabled(&self) -> bool { !self.ttl.is_zero() }

  /// A fresh cached page, if any. Expired entries are evicted on the way.
  pub fn get(&self, owner: Owner, clan: &str, page: u32) -> Option<Page<TreeNode>> {
    if !self.is_enabled() {
      return None;
    }
    let key = TreeKey { owner, clan: fold(clan), page };
    let hit = self
      .entries
      .get(&key)
      .filter(|entry| entry.0.elapsed() < self.ttl)
      .map(|entry| entry.1.clone());
    if hit.is_none() {
      self
        .entries
        .remove_if(&key, |_, (stored, _)| stored.elapsed() >= self.ttl);
    } else {
      tracing::trace!(clan, page, "tree cache hit");
    }
    hit
  }

  /// Store a page. Every expired entry is swept out first, so the map never
  /// holds more than one TTL's worth of pages.
  pub fn insert(&self, owner: Owner, clan: &str, page: u32, value: Page<TreeNode>) {
    if !self.is_enabled() {
      return;
    }
    self.entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
    let key = TreeKey { owner, clan: fold(clan), page };
    self.entries.insert(key, (Instant::now(), value));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page() -> Page<TreeNode> {
    Page { count: 0, next: None, previous: None, results: Vec::new() }
  }

  #[test]
  fn hit_ignores_clan_casing() {
    let cache = TreeCache::new(Duration::from_secs(60));
    let owner = Owner::new(1);
    cache.insert(owner, "Moyo", 1, page());
    assert_eq!(cache.get(owner, "MOYO", 1), Some(page()));
    assert_eq!(cache.get(owner, "moyo", 2), None);
  }

  #[test]
  fn owners_do_not_share_entries() {
    let cache = TreeCache::new(Duration::from_secs(60));
    cache.insert(Owner::new(1), "Moyo", 1, page());
    assert_eq!(cache.get(Owner::new(2), "Moyo", 1), None);
  }

  #[test]
  fn zero_ttl_disables_cache() {
    let cache = TreeCache::new(Duration::ZERO);
    cache.insert(Owner::new(1), "Moyo", 1, page());
    assert_eq!(cache.get(Owner::new(1), "Moyo", 1), None);
  }

  #[test]
  fn expired_entries_are_evicted() {
    let cache = TreeCache::new(Duration::from_millis(1));
    cache.insert(Owner::new(1), "Moyo", 1, page());
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(cache.get(Owner::new(1), "Moyo", 1), None);
    assert!(cache.entries.is_empty());
  }

  #[test]
  fn insert_sweeps_expired_entries_for_other_keys() {
    let cache = TreeCache::new(Duration::from_millis(1));
    let owner = Owner::new(1);
    for n in 0..200 {
      cache.insert(owner, &format!("clan{n}"), 1, page());
    }
    std::thread::sleep(Duration::from_millis(5));
    cache.insert(owner, "Moyo", 1, page());
    assert_eq!(cache.entries.len(), 1);
  }
}
