//! Exchange-reported open order cache.
//!
//! [`OpenOrderSet`] is the local mirror of the orders feed: every order
//! the exchange has reported, indexed by exchange order id and, where one
//! exists, by client order id. Orders placed outside this client carry no
//! client id and are tracked in a separate secondary index so the two
//! secondary maps partition the primary one.

use std::collections::HashMap;

use crate::models::order::{OpenOrder, OrderState};

/// Mirror of all exchange-reported orders for the account.
#[derive(Debug, Clone, Default)]
pub struct OpenOrderSet {
    /// Primary index by exchange order id.
    by_ord_id: HashMap<String, OpenOrder>,
    /// Exchange order id per client order id, for orders that carry one.
    client_index: HashMap<String, String>,
    /// Exchange order ids of orders without a client order id.
    non_client_index: Vec<String>,
}

impl OpenOrderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a batch of order records, inserting or overwriting by
    /// exchange order id.
    pub fn apply(&mut self, records: impl IntoIterator<Item = OpenOrder>) {
        for record in records {
            self.insert(record);
        }
    }

    fn insert(&mut self, record: OpenOrder) {
        if record.cl_ord_id.is_empty() {
            if !self.non_client_index.contains(&record.ord_id) {
                self.non_client_index.push(record.ord_id.clone());
            }
        } else {
            self.client_index
                .insert(record.cl_ord_id.clone(), record.ord_id.clone());
        }
        self.by_ord_id.insert(record.ord_id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.by_ord_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ord_id.is_empty()
    }

    pub fn get_by_order_id(&self, ord_id: &str) -> Option<&OpenOrder> {
        self.by_ord_id.get(ord_id)
    }

    pub fn get_by_client_order_id(&self, cl_ord_id: &str) -> Option<&OpenOrder> {
        let ord_id = self.client_index.get(cl_ord_id)?;
        self.by_ord_id.get(ord_id)
    }

    /// Orders still working on the exchange (live or partially filled).
    pub fn active_orders(&self) -> Vec<&OpenOrder> {
        self.filtered(|s| matches!(s, OrderState::Live | OrderState::PartiallyFilled))
    }

    /// Orders with any fill, including terminal ones.
    pub fn filled_orders(&self) -> Vec<&OpenOrder> {
        self.filtered(|s| {
            matches!(
                s,
                OrderState::Filled | OrderState::PartiallyFilled | OrderState::Canceled
            )
        })
    }

    /// Terminal orders awaiting pruning.
    pub fn inactive_orders(&self) -> Vec<&OpenOrder> {
        self.filtered(|s| matches!(s, OrderState::Filled | OrderState::Canceled))
    }

    /// Orders placed outside this client (no client order id).
    pub fn non_client_orders(&self) -> Vec<&OpenOrder> {
        self.non_client_index
            .iter()
            .filter_map(|id| self.by_ord_id.get(id))
            .collect()
    }

    fn filtered(&self, keep: impl Fn(OrderState) -> bool) -> Vec<&OpenOrder> {
        self.by_ord_id
            .values()
            .filter(|o| keep(o.state))
            .collect()
    }

    /// Removes an order from all three indexes by exchange order id.
    /// Terminal orders are pruned this way to bound memory.
    pub fn remove(&mut self, ord_id: &str) -> Option<OpenOrder> {
        let removed = self.by_ord_id.remove(ord_id)?;
        if removed.cl_ord_id.is_empty() {
            self.non_client_index.retain(|id| id != ord_id);
        } else {
            self.client_index.remove(&removed.cl_ord_id);
        }
        Some(removed)
    }
}
