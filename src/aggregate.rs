use crate::record::SalesRecord;
use std::collections::BTreeMap;

/// Running totals for one batch, keyed by store and by product. The batch
/// driver owns exactly one of these per run and folds records in
/// single-threaded, so there is no synchronization here. `BTreeMap` keeps
/// iteration order deterministic, which the serializer relies on.
///
/// A product key always lands in all three product maps at once (one fold
/// updates all of them), but the serializer still reads the quantity and
/// revenue maps with a zero default rather than assuming that.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AggregateState {
    pub profit_by_store: BTreeMap<String, f64>,
    pub profit_by_product: BTreeMap<String, f64>,
    pub quantity_by_product: BTreeMap<String, i64>,
    pub revenue_by_product: BTreeMap<String, f64>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one accepted record into the totals. Pure accumulation, no
    /// I/O. Addition is commutative so fold order never changes the result
    /// (up to float rounding), which is what makes batches testable with
    /// fixed expectations.
    pub fn fold(&mut self, record: &SalesRecord) {
        *self
            .profit_by_store
            .entry(record.store.clone())
            .or_default() += record.total_profit();
        *self
            .profit_by_product
            .entry(record.product.clone())
            .or_default() += record.total_profit();
        *self
            .quantity_by_product
            .entry(record.product.clone())
            .or_default() += record.quantity;
        *self
            .revenue_by_product
            .entry(record.product.clone())
            .or_default() += record.total_revenue();
    }

    pub fn is_empty(&self) -> bool {
        self.profit_by_store.is_empty() && self.profit_by_product.is_empty()
    }
}
