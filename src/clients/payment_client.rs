use tokio::sync::mpsc;

use crate::domain::{OrderId, Payment, PaymentCreate, PaymentReceipt};
use crate::payment_service::{PaymentError, PaymentRequest};

/// Client for the payment ledger.
#[derive(Clone)]
pub struct PaymentClient {
    sender: mpsc::Sender<PaymentRequest>,
}

impl PaymentClient {
    pub fn new(sender: mpsc::Sender<PaymentRequest>) -> Self {
        Self { sender }
    }
}

crate::client_method!(PaymentClient => fn record_payment(params: PaymentCreate) -> PaymentReceipt as PaymentRequest::RecordPayment, Error = PaymentError);
crate::client_method!(PaymentClient => fn find_by_order(order_id: OrderId) -> Option<Payment> as PaymentRequest::FindByOrder, Error = PaymentError);
crate::client_method!(PaymentClient => fn list_payments() -> Vec<Payment> as PaymentRequest::ListPayments, Error = PaymentError);
