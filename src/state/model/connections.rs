use std::collections::HashMap;

use crate::state::{ItemConnId, ItemId};

/// Sparse "runs into" links, indexed from both ends.
///
/// Each item has at most one outgoing (`next`) and one incoming (`prev`)
/// connection; every connection is stored under both of its ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ConnectionGraph {
    prev: HashMap<ItemId, ItemConnId>,
    next: HashMap<ItemId, ItemConnId>,
}

impl ConnectionGraph {
    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn incoming(&self, id: ItemId) -> Option<ItemConnId> {
        self.prev.get(&id).copied()
    }

    pub fn outgoing(&self, id: ItemId) -> Option<ItemConnId> {
        self.next.get(&id).copied()
    }

    pub fn touches(&self, id: ItemId) -> bool {
        self.prev.contains_key(&id) || self.next.contains_key(&id)
    }

    /// Drop the outgoing connection of `id` from both indexes.
    pub fn remove_outgoing(&mut self, id: ItemId) -> Option<ItemConnId> {
        let conn = self.next.remove(&id)?;
        self.prev.remove(&conn.to);
        Some(conn)
    }

    /// Drop the incoming connection of `id` from both indexes.
    pub fn remove_incoming(&mut self, id: ItemId) -> Option<ItemConnId> {
        let conn = self.prev.remove(&id)?;
        self.next.remove(&conn.from);
        Some(conn)
    }

    /// Link `conn.from -> conn.to`, returning connections displaced to keep
    /// one link per direction.
    pub fn insert(&mut self, conn: ItemConnId) -> Vec<ItemConnId> {
        let mut displaced = Vec::new();
        if let Some(old) = self.remove_outgoing(conn.from) {
            displaced.push(old);
        }
        if let Some(old) = self.remove_incoming(conn.to) {
            displaced.push(old);
        }
        self.next.insert(conn.from, conn);
        self.prev.insert(conn.to, conn);
        displaced
    }

    /// Outgoing connections ordered by source id.
    pub fn iter(&self) -> impl Iterator<Item = ItemConnId> + '_ {
        let mut conns: Vec<_> = self.next.values().copied().collect();
        conns.sort_by_key(|conn| conn.from);
        conns.into_iter()
    }

    /// Incoming connections ordered by target id.
    pub fn iter_incoming(&self) -> impl Iterator<Item = ItemConnId> + '_ {
        let mut conns: Vec<_> = self.prev.values().copied().collect();
        conns.sort_by_key(|conn| conn.to);
        conns.into_iter()
    }

    pub fn clear(&mut self) {
        self.prev.clear();
        self.next.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(sequence: u64) -> ItemId {
        ItemId::new(3, 0, sequence)
    }

    #[test]
    fn test_insert_is_indexed_from_both_ends() {
        let mut graph = ConnectionGraph::default();
        let conn = ItemConnId::new(id(1), id(2));
        assert!(graph.insert(conn).is_empty());
        assert_eq!(graph.outgoing(id(1)), Some(conn));
        assert_eq!(graph.incoming(id(2)), Some(conn));
        assert_eq!(graph.incoming(id(1)), None);
        assert!(graph.touches(id(2)));
    }

    #[test]
    fn test_insert_displaces_existing_links() {
        let mut graph = ConnectionGraph::default();
        graph.insert(ItemConnId::new(id(1), id(2)));
        graph.insert(ItemConnId::new(id(3), id(4)));
        let displaced = graph.insert(ItemConnId::new(id(1), id(4)));
        assert_eq!(
            displaced,
            vec![ItemConnId::new(id(1), id(2)), ItemConnId::new(id(3), id(4))]
        );
        assert_eq!(graph.len(), 1);
        assert!(!graph.touches(id(2)));
        assert!(!graph.touches(id(3)));
    }

    #[test]
    fn test_remove_from_either_end() {
        let mut graph = ConnectionGraph::default();
        let conn = ItemConnId::new(id(1), id(2));
        graph.insert(conn);
        assert_eq!(graph.remove_incoming(id(2)), Some(conn));
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.outgoing(id(1)), None);
        assert_eq!(graph.remove_outgoing(id(1)), None);
    }
}
