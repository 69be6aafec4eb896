//! Proof that an order has been paid for.

use unwritten_core::manifest::BookManifest;
use unwritten_core::order::Order;
use unwritten_core::types::OrderId;

/// An order whose payment is confirmed. Only the coordinator builds one,
/// and only the render stage accepts one.
#[derive(Debug, Clone)]
pub struct PaidOrder {
    order: Order,
}

impl PaidOrder {
    /// # Panics
    ///
    /// If `order` is not `payment_confirmed` or `rendering`. Reaching this
    /// with any other status is a coordinator bug.
    pub(crate) fn new(order: Order) -> Self {
        assert!(
            order.status.is_pipeline_pending(),
            "order {} is {} and has no confirmed payment",
            order.id,
            order.status
        );
        Self { order }
    }

    pub fn id(&self) -> &OrderId {
        &self.order.id
    }

    pub fn manifest(&self) -> &BookManifest {
        &self.order.manifest
    }

    pub fn order(&self) -> &Order {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use unwritten_core::order::OrderStatus;

    use super::*;
    use crate::testing;

    #[test]
    fn accepts_paid_orders() {
        for status in [OrderStatus::PaymentConfirmed, OrderStatus::Rendering] {
            let mut order = testing::order("o1", &testing::two_weeks());
            order.status = status;
            assert_eq!(PaidOrder::new(order).id().as_str(), "o1");
        }
    }

    #[test]
    #[should_panic(expected = "has no confirmed payment")]
    fn unpaid_order_is_an_invariant_violation() {
        let order = testing::order("o1", &testing::two_weeks());
        let _ = PaidOrder::new(order);
    }
}
