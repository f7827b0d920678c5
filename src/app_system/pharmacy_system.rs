use std::sync::Arc;

use tracing::{error, info};

use super::{CartMergePolicy, Config};
use crate::actor_framework::ResourceActor;
use crate::cart_service::{CartError, CartService};
use crate::clients::{
    AssemblyClient, CartClient, CheckoutClient, OrderClient, PaymentClient, PrescriptionClient, ProductClient,
    ReminderClient,
};
use crate::domain::{Order, OrderId, Prescription, PrescriptionId, Principal, Product, ProductId, Reminder, ReminderId};
use crate::payment_service::PaymentService;
use crate::session::{CartSession, LocalCartStore};

/// The fulfillment system: every actor started and wired together.
///
/// Responsible for starting up actors, handing out clients, and shutdown.
pub struct PharmacySystem {
    pub product_client: ProductClient,
    pub prescription_client: PrescriptionClient,
    pub order_client: OrderClient,
    pub assembly_client: AssemblyClient,
    pub payment_client: PaymentClient,
    pub reminder_client: ReminderClient,
    pub cart_client: CartClient,
    pub checkout_client: CheckoutClient,
    merge_policy: CartMergePolicy,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl PharmacySystem {
    pub fn new(config: &Config) -> Self {
        let buffer = config.actor_buffer_size;
        let settings = config.order_settings();

        // 1. Inventory
        let (product_actor, product_resource_client) = ResourceActor::<Product>::new(buffer, ProductId::new);
        let product_client = ProductClient::new(product_resource_client);
        let product_handle = tokio::spawn(product_actor.run());

        // 2. Prescriptions
        let (prescription_actor, prescription_resource_client) =
            ResourceActor::<Prescription>::new(buffer, PrescriptionId::new);
        let prescription_client =
            PrescriptionClient::new(prescription_resource_client, config.max_prescription_documents);
        let prescription_handle = tokio::spawn(prescription_actor.run());

        // 3. Orders, shared by customization and assembly
        let (order_actor, order_resource_client) = ResourceActor::<Order>::new(buffer, OrderId::new);
        let order_client = OrderClient::new(order_resource_client.clone(), product_client.clone(), settings.admin_page_size);
        let assembly_client = AssemblyClient::new(
            order_resource_client,
            prescription_client.clone(),
            product_client.clone(),
            settings,
        );
        let order_handle = tokio::spawn(order_actor.run());

        // 4. Payment ledger and reminders
        let (payment_service, payment_client) = PaymentService::new(buffer);
        let payment_handle = tokio::spawn(payment_service.run());

        let (reminder_actor, reminder_resource_client) = ResourceActor::<Reminder>::new(buffer, ReminderId::new);
        let reminder_client = ReminderClient::new(reminder_resource_client, order_client.clone());
        let reminder_handle = tokio::spawn(reminder_actor.run());

        // 5. Persisted carts
        let (cart_service, cart_client) = CartService::new(buffer);
        let cart_handle = tokio::spawn(cart_service.run());

        let checkout_client = CheckoutClient::new(
            order_client.clone(),
            product_client.clone(),
            payment_client.clone(),
            reminder_client.clone(),
            config.retry_policy(),
        );

        info!(buffer, "Pharmacy system started");
        Self {
            product_client,
            prescription_client,
            order_client,
            assembly_client,
            payment_client,
            reminder_client,
            cart_client,
            checkout_client,
            merge_policy: config.cart_merge_policy,
            handles: vec![
                product_handle,
                prescription_handle,
                order_handle,
                payment_handle,
                reminder_handle,
                cart_handle,
            ],
        }
    }

    /// Opens a cart session for `principal`; guests keep their cart in `local`.
    pub async fn cart_session(
        &self,
        principal: Principal,
        local: Arc<dyn LocalCartStore>,
    ) -> Result<CartSession, CartError> {
        CartSession::start(
            principal,
            self.product_client.clone(),
            self.cart_client.clone(),
            self.assembly_client.clone(),
            local,
            self.merge_policy,
        )
        .await
    }

    /// Drops every client (closing the channels) and waits for the actors to stop.
    ///
    /// Clients cloned out of the system keep their actor alive, so drop them first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        let handles = self.handles;
        drop(self.checkout_client);
        drop(self.reminder_client);
        drop(self.assembly_client);
        drop(self.order_client);
        drop(self.prescription_client);
        drop(self.payment_client);
        drop(self.cart_client);
        drop(self.product_client);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
