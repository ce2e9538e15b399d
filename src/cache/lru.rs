//! LRU Order Module
//!
//! Recency ordering for cache eviction.

// == Node ==
#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Doubly linked recency list stored in a slab.
///
/// Every pushed value gets a stable slot index that stays valid until the
/// value is removed, so callers can keep a `key -> slot` map beside the list
/// and touch, remove or evict in O(1).
///
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug)]
pub struct LruList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for LruList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LruList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts a value as most recently used and returns its slot.
    pub fn push_front(&mut self, value: T) -> usize {
        let node = Node {
            value: Some(value),
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.link_front(slot);
        self.len += 1;
        slot
    }

    // == Touch ==
    /// Marks the value in `slot` as most recently used.
    pub fn move_to_front(&mut self, slot: usize) {
        if !self.is_occupied(slot) || self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    // == Remove ==
    /// Removes and returns the value in `slot`.
    pub fn remove(&mut self, slot: usize) -> Option<T> {
        if !self.is_occupied(slot) {
            return None;
        }
        self.unlink(slot);
        self.free.push(slot);
        self.len -= 1;
        self.nodes[slot].value.take()
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used value.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(tail)
    }

    /// Least recently used value without removing it.
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|slot| self.get(slot))
    }

    // == Get ==
    /// Value stored in `slot`, if occupied.
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.nodes.get(slot).and_then(|node| node.value.as_ref())
    }

    /// Mutable access to the value stored in `slot`.
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.nodes.get_mut(slot).and_then(|node| node.value.as_mut())
    }

    // == Length ==
    /// Number of values in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks if the list holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Clear ==
    /// Drops every value and releases the slab.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn is_occupied(&self, slot: usize) -> bool {
        self.nodes
            .get(slot)
            .map_or(false, |node| node.value.is_some())
    }

    fn link_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;
        match self.head {
            Some(head) => self.nodes[head].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let prev = self.nodes[slot].prev.take();
        let next = self.nodes[slot].next.take();
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
    }
}

// == Iterator ==
pub struct Iter<'a, T> {
    list: &'a LruList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = &self.list.nodes[slot];
        self.cursor = node.next;
        node.value.as_ref()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn order(list: &LruList<&'static str>) -> Vec<&'static str> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_lru_new() {
        let list: LruList<&str> = LruList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_push_front_orders_most_recent_first() {
        let mut list = LruList::new();
        list.push_front("a");
        list.push_front("b");
        list.push_front("c");

        assert_eq!(list.len(), 3);
        assert_eq!(order(&list), vec!["c", "b", "a"]);
        assert_eq!(list.back(), Some(&"a"));
    }

    #[test]
    fn test_move_to_front() {
        let mut list = LruList::new();
        let a = list.push_front("a");
        list.push_front("b");
        list.push_front("c");

        list.move_to_front(a);

        assert_eq!(order(&list), vec!["a", "c", "b"]);
        assert_eq!(list.back(), Some(&"b"));
    }

    #[test]
    fn test_move_tail_and_middle() {
        let mut list = LruList::new();
        let a = list.push_front("a");
        let b = list.push_front("b");
        list.push_front("c");

        list.move_to_front(b);
        assert_eq!(order(&list), vec!["b", "c", "a"]);

        list.move_to_front(a);
        assert_eq!(order(&list), vec!["a", "b", "c"]);
        assert_eq!(list.back(), Some(&"c"));
    }

    #[test]
    fn test_pop_back_evicts_oldest() {
        let mut list = LruList::new();
        list.push_front("a");
        list.push_front("b");
        list.push_front("c");

        assert_eq!(list.pop_back(), Some("a"));
        assert_eq!(list.pop_back(), Some("b"));
        assert_eq!(list.len(), 1);
        assert_eq!(list.pop_back(), Some("c"));
        assert_eq!(list.pop_back(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_middle() {
        let mut list = LruList::new();
        list.push_front("a");
        let b = list.push_front("b");
        list.push_front("c");

        assert_eq!(list.remove(b), Some("b"));
        assert_eq!(list.remove(b), None);
        assert_eq!(order(&list), vec!["c", "a"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = LruList::new();
        let a = list.push_front("a");
        list.push_front("b");
        list.remove(a);

        let c = list.push_front("c");
        assert_eq!(c, a);
        assert_eq!(list.get(c), Some(&"c"));
        assert_eq!(order(&list), vec!["c", "b"]);
    }

    #[test]
    fn test_stale_slot_is_ignored() {
        let mut list = LruList::new();
        let a = list.push_front("a");
        list.push_front("b");
        list.remove(a);

        // Touching a freed slot must not corrupt the links
        list.move_to_front(a);
        list.move_to_front(99);
        assert_eq!(order(&list), vec!["b"]);
    }

    #[test]
    fn test_clear() {
        let mut list = LruList::new();
        list.push_front("a");
        list.push_front("b");
        list.clear();

        assert!(list.is_empty());
        assert_eq!(list.pop_back(), None);
        list.push_front("c");
        assert_eq!(order(&list), vec!["c"]);
    }

    #[test]
    fn test_get_mut() {
        let mut list = LruList::new();
        let slot = list.push_front(String::from("a"));
        if let Some(value) = list.get_mut(slot) {
            value.push('!');
        }
        assert_eq!(list.get(slot).map(String::as_str), Some("a!"));
    }
}
