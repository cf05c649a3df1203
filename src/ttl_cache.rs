use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{hash_map::DefaultHashBuilder, HashMap};

/// A hash map whose entries go stale a fixed number of milliseconds after insertion.
///
/// Time is passed in by the caller (`Date.now()` in the browser), so the map itself never reads a clock.
/// Stale entries are ignored by [`get`](`TtlHashMap::get`) and only physically removed by [`purge`](`TtlHashMap::purge`) or overwrite.
#[derive(Debug, Clone)]
pub struct TtlHashMap<K, V, S = DefaultHashBuilder>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	entries: HashMap<K, (f64, V), S>,
	ttl_ms: f64,
}

impl<K, V, S> TtlHashMap<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	#[must_use]
	pub fn new(ttl_ms: u32) -> Self
	where
		S: Default,
	{
		Self {
			entries: HashMap::with_hasher(S::default()),
			ttl_ms: f64::from(ttl_ms),
		}
	}

	pub fn insert(&mut self, k: K, v: V, now_ms: f64) {
		self.entries.insert(k, (now_ms, v));
	}

	/// The value for `k` if it was inserted less than the TTL before `now_ms`.
	pub fn get<Q: ?Sized>(&self, k: &Q, now_ms: f64) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.entries.get(k) {
			Some((inserted_at, v)) if now_ms - inserted_at < self.ttl_ms => Some(v),
			_ => None,
		}
	}

	/// Drops every stale entry. Returns how many were removed.
	pub fn purge(&mut self, now_ms: f64) -> usize {
		let before = self.entries.len();
		let ttl_ms = self.ttl_ms;
		self.entries.retain(|_, (inserted_at, _)| now_ms - *inserted_at < ttl_ms);
		before - self.entries.len()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	/// Physical entry count, stale ones included.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Remote check results keyed by `(permission, target id or "global")`.
pub type PermissionCache = TtlHashMap<(String, String), bool>;

/// Cache key scope used when a check has no target object.
pub const GLOBAL_SCOPE: &str = "global";
