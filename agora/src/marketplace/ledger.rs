use crate::error::{AgoraError, AgoraResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ItemId = String;

/// An item a participant owns and may put up for auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(rename = "itemID")]
    pub item_id: ItemId,
    pub base_value: u64,
    /// Set when the item was bought in an auction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_time: Option<u64>,
}

impl InventoryItem {
    pub fn new(item_id: impl Into<ItemId>, base_value: u64) -> Self {
        Self {
            item_id: item_id.into(),
            base_value,
            acquired_time: None,
        }
    }
}

/// Money balance and inventory of one participant.
///
/// Only settlement (selling or buying an item) changes the ledger once the
/// participant is running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    money: u64,
    inventory: BTreeMap<ItemId, InventoryItem>,
}

impl Ledger {
    pub fn new(money: u64, items: impl IntoIterator<Item = InventoryItem>) -> Self {
        Self {
            money,
            inventory: items
                .into_iter()
                .map(|item| (item.item_id.clone(), item))
                .collect(),
        }
    }

    pub const fn money(&self) -> u64 {
        self.money
    }

    pub fn item(&self, item_id: &str) -> Option<&InventoryItem> {
        self.inventory.get(item_id)
    }

    pub fn items(&self) -> impl Iterator<Item = &InventoryItem> {
        self.inventory.values()
    }

    pub fn item_count(&self) -> usize {
        self.inventory.len()
    }

    pub fn has_items(&self) -> bool {
        !self.inventory.is_empty()
    }

    /// Seller side of a confirmed exchange: credit the price, hand over the item.
    pub fn complete_sale(&mut self, item_id: &str, price: u64) -> AgoraResult<InventoryItem> {
        let money = self.money.checked_add(price).ok_or_else(|| {
            AgoraError::Settlement(format!("crediting {price} would overflow the balance"))
        })?;
        let item = self
            .inventory
            .remove(item_id)
            .ok_or_else(|| AgoraError::NotFound(format!("item {item_id} not in inventory")))?;
        self.money = money;
        Ok(item)
    }

    /// Buyer side of an exchange: pay the price and take the item.
    ///
    /// The received item's base value becomes the price paid. Nothing
    /// changes when the balance cannot cover the price.
    pub fn complete_purchase(&mut self, item_id: &str, price: u64, now: u64) -> AgoraResult<()> {
        if item_id.is_empty() {
            return Err(AgoraError::InvalidArgument("empty item ID".into()));
        }
        let remaining = self.money.checked_sub(price).ok_or_else(|| {
            AgoraError::Settlement(format!(
                "price {price} exceeds available money {}",
                self.money
            ))
        })?;
        self.money = remaining;
        self.inventory.insert(
            item_id.to_string(),
            InventoryItem {
                item_id: item_id.to_string(),
                base_value: price,
                acquired_time: Some(now),
            },
        );
        Ok(())
    }
}
