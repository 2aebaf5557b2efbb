/// Number of keys remembered by [`RecentDetections`]
pub const RECENT_CAPACITY: usize = 30;

/// Fixed-capacity ring buffer of recently emitted composite keys.
///
/// Inserting into a full buffer overwrites the oldest key.
#[derive(Debug, Clone)]
pub struct RecentDetections {
    slots: Vec<Option<String>>,
    next: usize,
    len: usize,
}

impl Default for RecentDetections {
    fn default() -> Self {
        Self::with_capacity(RECENT_CAPACITY)
    }
}

impl RecentDetections {
    /// A window of `capacity` keys (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            next: 0,
            len: 0,
        }
    }

    /// Maximum number of keys kept
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Keys currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// No keys held
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `key` is in the window
    pub fn contains(&self, key: &str) -> bool {
        self.slots.iter().flatten().any(|k| k == key)
    }

    /// Append `key`, evicting the oldest entry when full
    pub fn push(&mut self, key: String) {
        self.slots[self.next] = Some(key);
        self.next = (self.next + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());
    }

    /// Returns `true` if `key` should be emitted (it was not in the window),
    /// recording it in that case.
    pub fn check_and_insert(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.push(key.to_string());
        true
    }

    /// Forget every key
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.next = 0;
        self.len = 0;
    }

    /// Keys from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let cap = self.slots.len();
        let start = (self.next + cap - self.len) % cap;
        (0..self.len).filter_map(move |i| self.slots[(start + i) % cap].as_deref())
    }
}
