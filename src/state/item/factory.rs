use super::{Item, ItemKind};
use crate::state::ItemId;

/// Build the item variant encoded in `id`, or `None` for an unknown type code.
pub fn create_item(id: ItemId) -> Option<Item> {
    let Some(kind) = ItemKind::from_type_code(id.type_code()) else {
        tracing::error!(item = %id, type_code = id.type_code(), "unknown item type");
        return None;
    };
    Some(Item::new(id, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_every_kind() {
        for kind in ItemKind::ALL {
            let id = ItemId::new(kind.type_code(), 3, 11);
            let item = create_item(id).unwrap();
            assert_eq!(item.kind(), kind);
            assert_eq!(item.row(), 3);
            assert!(item.is_enabled());
        }
    }

    #[test]
    fn test_factory_rejects_unknown_type() {
        assert!(create_item(ItemId::new(1, 0, 1)).is_none());
        assert!(create_item(ItemId::new(100, 0, 1)).is_none());
    }
}
