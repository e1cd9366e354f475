//! Order and payment synchronisation with parcel state.

use super::{DeliveryServiceError, DeliveryServiceResult};
use crate::delivery::{
    domain::{Caller, Order, OrderId, Parcel, Payment, ShippingDetails},
    ports::{DeliveryStore, DeliveryTransaction},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Request payload for placing a shipping order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    shipping: ShippingDetails,
    amount_minor: i64,
}

impl PlaceOrderRequest {
    /// Creates a request charging `amount_minor` minor currency units.
    #[must_use]
    pub const fn new(shipping: ShippingDetails, amount_minor: i64) -> Self {
        Self {
            shipping,
            amount_minor,
        }
    }
}

/// Everything created when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    /// The pending order.
    pub order: Order,
    /// The parcel, waiting for payment.
    pub parcel: Parcel,
    /// The pending payment.
    pub payment: Payment,
}

/// Keeps orders, payments and parcels in step.
pub struct OrderPaymentService<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for OrderPaymentService<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> OrderPaymentService<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new order service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Places an order for the caller, creating its parcel and payment.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::Domain`] when the amount is not
    /// positive, or a repository error.
    pub async fn place_order(
        &self,
        caller: &Caller,
        request: PlaceOrderRequest,
    ) -> DeliveryServiceResult<PlacedOrder> {
        let parcel = Parcel::new();
        let order = Order::new(
            caller.person_id(),
            parcel.id(),
            request.shipping,
            &*self.clock,
        );
        let payment = Payment::new(order.id(), request.amount_minor)?;
        let placed = PlacedOrder {
            order,
            parcel,
            payment,
        };
        let stored = placed.clone();

        self.store
            .transact(move |tx| -> DeliveryServiceResult<()> {
                tx.save_parcel(&stored.parcel)?;
                tx.save_order(&stored.order)?;
                tx.save_payment(&stored.payment)?;
                Ok(())
            })
            .await?;

        info!(
            order_id = %placed.order.id(),
            parcel_id = %placed.parcel.id(),
            customer_id = %placed.order.customer_id(),
            "order placed"
        );
        Ok(placed)
    }

    /// Records a successful payment: the order is confirmed and its parcel
    /// joins the pickup pool.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the order, payment or parcel is
    /// missing, the order is no longer pending, or the store fails.
    pub async fn confirm_payment(&self, order_id: OrderId) -> DeliveryServiceResult<Order> {
        let order = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<Order> {
                let (mut order, mut parcel, mut payment) = load_order_bundle(tx, order_id)?;
                order.confirm()?;
                parcel.mark_paid()?;
                payment.succeed();
                tx.save_order(&order)?;
                tx.save_parcel(&parcel)?;
                tx.save_payment(&payment)?;
                Ok(order)
            })
            .await?;

        info!(order_id = %order_id, parcel_id = %order.parcel_id(), "payment confirmed");
        Ok(order)
    }

    /// Cancels an unpaid order together with its parcel and payment.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller neither placed the
    /// order nor is an administrator, the order is missing or no longer
    /// cancellable, or the store fails.
    pub async fn cancel_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> DeliveryServiceResult<Order> {
        let person_id = caller.person_id();
        let is_admin = caller.is_admin();

        let order = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<Order> {
                let (mut order, mut parcel, mut payment) = load_order_bundle(tx, order_id)?;
                if !is_admin && order.customer_id() != person_id {
                    return Err(DeliveryServiceError::NotOrderOwner {
                        order_id,
                        person_id,
                    });
                }
                order.cancel()?;
                parcel.cancel();
                payment.cancel();
                tx.save_order(&order)?;
                tx.save_parcel(&parcel)?;
                tx.save_payment(&payment)?;
                Ok(order)
            })
            .await?;

        info!(order_id = %order_id, cancelled_by = %person_id, "order cancelled");
        Ok(order)
    }

    /// Loads an order.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::OrderNotFound`] when the order does
    /// not exist, or a repository error.
    pub async fn find_order(&self, order_id: OrderId) -> DeliveryServiceResult<Order> {
        self.store
            .transact(move |tx| -> DeliveryServiceResult<Order> {
                tx.find_order(order_id)?
                    .ok_or(DeliveryServiceError::OrderNotFound(order_id))
            })
            .await
    }
}

fn load_order_bundle(
    tx: &mut dyn DeliveryTransaction,
    order_id: OrderId,
) -> DeliveryServiceResult<(Order, Parcel, Payment)> {
    let order = tx
        .find_order(order_id)?
        .ok_or(DeliveryServiceError::OrderNotFound(order_id))?;
    let parcel = tx
        .find_parcel(order.parcel_id())?
        .ok_or(DeliveryServiceError::ParcelNotFound(order.parcel_id()))?;
    let payment = tx
        .find_payment_by_order(order_id)?
        .ok_or(DeliveryServiceError::PaymentNotFound(order_id))?;
    Ok((order, parcel, payment))
}
