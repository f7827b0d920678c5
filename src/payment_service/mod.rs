//! Payment ledger.
//!
//! Hand-written service rather than a `ResourceActor`: it keeps two indexes
//! (by order and by idempotency key) so that an order is never charged twice.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::clients::PaymentClient;
use crate::domain::{IdempotencyKey, OrderId, Payment, PaymentCreate, PaymentId, PaymentReceipt};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    #[error("Payment validation error: {0}")]
    ValidationError(String),
    #[error("Payment rejected: {0}")]
    Rejected(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

pub type ServiceResponse<T> = oneshot::Sender<Result<T, PaymentError>>;

#[derive(Debug)]
pub enum PaymentRequest {
    RecordPayment {
        params: PaymentCreate,
        respond_to: ServiceResponse<PaymentReceipt>,
    },
    FindByOrder {
        order_id: OrderId,
        respond_to: ServiceResponse<Option<Payment>>,
    },
    ListPayments {
        respond_to: ServiceResponse<Vec<Payment>>,
    },
}

pub struct PaymentService {
    receiver: mpsc::Receiver<PaymentRequest>,
    payments: HashMap<PaymentId, Payment>,
    by_order: HashMap<OrderId, PaymentId>,
    by_key: HashMap<IdempotencyKey, PaymentId>,
}

impl PaymentService {
    pub fn new(buffer_size: usize) -> (Self, PaymentClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            payments: HashMap::new(),
            by_order: HashMap::new(),
            by_key: HashMap::new(),
        };
        (service, PaymentClient::new(sender))
    }

    #[instrument(name = "payment_service", skip(self))]
    pub async fn run(mut self) {
        info!("PaymentService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                PaymentRequest::RecordPayment { params, respond_to } => {
                    let _ = respond_to.send(self.handle_record_payment(params));
                }
                PaymentRequest::FindByOrder { order_id, respond_to } => {
                    let payment = self.lookup(self.by_order.get(&order_id));
                    let _ = respond_to.send(Ok(payment));
                }
                PaymentRequest::ListPayments { respond_to } => {
                    let mut payments: Vec<Payment> = self.payments.values().cloned().collect();
                    payments.sort_by_key(|p| p.recorded_at);
                    let _ = respond_to.send(Ok(payments));
                }
            }
        }
        info!("PaymentService stopped");
    }

    fn lookup(&self, id: Option<&PaymentId>) -> Option<Payment> {
        id.and_then(|id| self.payments.get(id)).cloned()
    }

    #[instrument(
        fields(order_id = %params.order_id, amount = %params.amount, key = %params.idempotency_key),
        skip(self, params)
    )]
    fn handle_record_payment(&mut self, params: PaymentCreate) -> Result<PaymentReceipt, PaymentError> {
        debug!("Processing record_payment request");

        if let Some(existing) = self.lookup(self.by_key.get(&params.idempotency_key)) {
            if existing.order_id != params.order_id {
                warn!(existing_order = %existing.order_id, "Idempotency key reused for another order");
                return Err(PaymentError::ValidationError(format!(
                    "idempotency key {} already used for order {}",
                    params.idempotency_key, existing.order_id
                )));
            }
            info!(payment_id = %existing.id, "Replaying payment for repeated key");
            return Ok(PaymentReceipt::Replayed(existing));
        }

        if let Some(existing) = self.lookup(self.by_order.get(&params.order_id)) {
            info!(payment_id = %existing.id, "Order already paid, not charging again");
            return Ok(PaymentReceipt::Replayed(existing));
        }

        if params.amount <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(format!("amount must be positive, got {}", params.amount)));
        }

        let payment = Payment {
            id: PaymentId::new(),
            order_id: params.order_id,
            amount: params.amount,
            method: params.method,
            payment_type: params.payment_type,
            idempotency_key: params.idempotency_key,
            recorded_at: Utc::now(),
        };
        self.by_order.insert(payment.order_id, payment.id);
        self.by_key.insert(payment.idempotency_key.clone(), payment.id);
        self.payments.insert(payment.id, payment.clone());
        info!(payment_id = %payment.id, "Payment recorded");
        Ok(PaymentReceipt::Recorded(payment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentMethod, PaymentType};

    fn params(order_id: OrderId, key: &str) -> PaymentCreate {
        PaymentCreate {
            order_id,
            amount: Decimal::new(800, 0),
            method: PaymentMethod::Card,
            payment_type: PaymentType::Prescription,
            idempotency_key: IdempotencyKey::new(key),
        }
    }

    fn start() -> PaymentClient {
        let (service, client) = PaymentService::new(10);
        tokio::spawn(service.run());
        client
    }

    #[tokio::test]
    async fn records_at_most_one_payment_per_order() {
        let client = start();
        let order_id = OrderId::new();

        let first = client.record_payment(params(order_id, "attempt-1")).await.unwrap();
        assert!(!first.is_replay());

        let second = client.record_payment(params(order_id, "attempt-2")).await.unwrap();
        assert!(second.is_replay());
        assert_eq!(second.payment().id, first.payment().id);

        assert_eq!(client.list_payments().await.unwrap().len(), 1);
        assert_eq!(client.find_by_order(order_id).await.unwrap(), Some(first.into_payment()));
    }

    #[tokio::test]
    async fn rejects_reused_keys_and_non_positive_amounts() {
        let client = start();
        client.record_payment(params(OrderId::new(), "k")).await.unwrap();

        let err = client.record_payment(params(OrderId::new(), "k")).await.unwrap_err();
        assert!(matches!(err, PaymentError::ValidationError(_)));

        let mut zero = params(OrderId::new(), "z");
        zero.amount = Decimal::ZERO;
        assert!(client.record_payment(zero).await.is_err());
        assert_eq!(client.find_by_order(OrderId::new()).await.unwrap(), None);
    }
}
