use tracing::{error, info, instrument, warn};

use crate::app_system::{CheckoutError, RetryPolicy};
use crate::clients::{OrderClient, PaymentClient, ProductClient, ReminderClient};
use crate::domain::{
    IdempotencyKey, Order, OrderId, Payment, PaymentCreate, PaymentMethod, PaymentType, Principal, ProductId, ReminderId,
};
use crate::order_actor::OrderError;
use crate::product_actor::ProductError;
use crate::reminder_actor::ReminderError;

/// Date and time the customer picked for a refill reminder.
#[derive(Debug, Clone)]
pub struct ReminderSlot {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub payment: Payment,
    /// True when an earlier attempt had already recorded the payment.
    pub replayed: bool,
    /// `None` when no reminder was requested.
    pub reminder: Option<Result<ReminderId, ReminderError>>,
}

/// Payment capture coordinator.
///
/// Runs pay-and-confirm as a saga: hold the order, reserve stock, record the
/// payment, then confirm the order. The hold stays in place once a payment is
/// on file, so the charged items cannot change before confirmation. A recorded payment is never repeated; if confirmation
/// keeps failing the caller gets `ConfirmationInconsistency` and calling
/// again finishes the confirmation with the payment already on file.
#[derive(Clone)]
pub struct CheckoutClient {
    order_client: OrderClient,
    product_client: ProductClient,
    payment_client: PaymentClient,
    reminder_client: ReminderClient,
    policy: RetryPolicy,
}

fn stock_lines(order: &Order) -> Vec<(ProductId, u32)> {
    order.items.iter().map(|item| (item.product_id, item.quantity)).collect()
}

impl CheckoutClient {
    pub fn new(
        order_client: OrderClient,
        product_client: ProductClient,
        payment_client: PaymentClient,
        reminder_client: ReminderClient,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            order_client,
            product_client,
            payment_client,
            reminder_client,
            policy,
        }
    }

    #[instrument(
        skip(self, principal, reminder),
        fields(role = principal.role(), key = %idempotency_key, reminder = reminder.is_some())
    )]
    pub async fn pay_and_confirm(
        &self,
        principal: &Principal,
        order_id: OrderId,
        method: PaymentMethod,
        idempotency_key: IdempotencyKey,
        reminder: Option<ReminderSlot>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        info!("Processing pay_and_confirm request");

        // Step 1: Resolve the order and the amount to charge
        let customer = principal
            .customer_id()
            .ok_or_else(|| CheckoutError::Unauthorized("sign in to pay".to_string()))?;
        let order = self.order_client.get_order(order_id).await?;
        if !order.belongs_to(customer) {
            return Err(CheckoutError::Unauthorized(format!("order {} belongs to another customer", order_id)));
        }
        if order.customization_confirmed {
            return Err(CheckoutError::Locked(format!("order {} is already confirmed", order_id)));
        }
        if order.items.is_empty() {
            return Err(CheckoutError::ValidationError("cannot pay for an empty order".to_string()));
        }

        // Recovery path: a previous attempt recorded the payment but never confirmed.
        let existing = self
            .payment_client
            .find_by_order(order_id)
            .await
            .map_err(|e| CheckoutError::ActorCommunicationError(e.to_string()))?;
        if let Some(payment) = existing {
            warn!(payment_id = %payment.id, "Payment already recorded, resuming confirmation");
            let order = self.confirm_with_retry(order_id, &payment).await?;
            return Ok(CheckoutOutcome { order, payment, replayed: true, reminder: None });
        }

        // Freeze the items that are about to be charged. The version guard rejects
        // edits that landed after the read above.
        let order = match self
            .order_client
            .hold_for_payment(order_id, idempotency_key.clone(), order.version)
            .await
        {
            Ok(held) => held,
            Err(OrderError::StaleVersion { .. }) => {
                return Err(CheckoutError::Locked(format!("order {} changed while checkout started", order_id)))
            }
            Err(e) => return Err(e.into()),
        };

        // Step 2: Optional reminder, never blocks the payment
        let reminder = match reminder {
            Some(slot) => Some(self.schedule_reminder(order_id, slot).await),
            None => None,
        };

        // Step 3: Authoritative stock decrement
        let lines = stock_lines(&order);
        if let Err(e) = self.product_client.reserve_all(&lines).await {
            error!(error = %e, "Stock reservation failed");
            self.release_hold(order_id, &idempotency_key).await;
            return Err(match e {
                ProductError::InsufficientStock { .. } | ProductError::NotFound(_) => {
                    CheckoutError::InsufficientStock(e.to_string())
                }
                other => CheckoutError::ActorCommunicationError(other.to_string()),
            });
        }

        // Step 4: Record the payment
        let params = PaymentCreate {
            order_id,
            amount: order.total,
            method,
            payment_type: PaymentType::from(order.origin),
            idempotency_key: idempotency_key.clone(),
        };
        let receipt = match self.payment_client.record_payment(params).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(error = %e, "Payment failed, releasing stock");
                self.product_client.release_all(&lines).await;
                self.release_hold(order_id, &idempotency_key).await;
                return Err(CheckoutError::Payment(e.to_string()));
            }
        };
        let replayed = receipt.is_replay();
        if replayed {
            // A concurrent attempt won the race and already holds the stock.
            self.product_client.release_all(&lines).await;
        }
        let payment = receipt.into_payment();
        info!(payment_id = %payment.id, amount = %payment.amount, "Payment recorded");

        // Step 5: Confirm the order
        let order = self.confirm_with_retry(order_id, &payment).await?;
        info!(order_id = %order_id, "Order paid and confirmed");
        Ok(CheckoutOutcome { order, payment, replayed, reminder })
    }

    async fn release_hold(&self, order_id: OrderId, key: &IdempotencyKey) {
        if let Err(e) = self.order_client.release_hold(order_id, key.clone()).await {
            warn!(error = %e, "Could not release payment hold");
        }
    }

    async fn schedule_reminder(&self, order_id: OrderId, slot: ReminderSlot) -> Result<ReminderId, ReminderError> {
        let timeout = self.policy.reminder_timeout;
        let result = tokio::time::timeout(
            timeout,
            self.reminder_client.schedule_reminder(order_id, &slot.date, &slot.time),
        )
        .await
        .unwrap_or_else(|_| Err(ReminderError::Timeout(timeout.as_millis() as u64)));

        if let Err(e) = &result {
            warn!(error = %e, "Reminder could not be scheduled, continuing with payment");
        }
        result
    }

    async fn confirm_with_retry(&self, order_id: OrderId, payment: &Payment) -> Result<Order, CheckoutError> {
        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self.order_client.confirm(order_id, payment.id).await {
                Ok(order) => return Ok(order),
                Err(OrderError::Locked(msg)) => return Err(CheckoutError::Locked(msg)),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Confirmation failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }
        error!(payment_id = %payment.id, "Payment recorded but order left unconfirmed");
        Err(CheckoutError::ConfirmationInconsistency { order_id, payment_id: payment.id })
    }
}
