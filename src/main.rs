mod domain;
mod clients;
mod session;

mod app_system;

#[cfg(test)]
mod mock_framework;

mod actor_framework;
mod cart_service;
mod order_actor;
mod payment_service;
mod prescription_actor;
mod product_actor;
mod reminder_actor;

use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

use crate::app_system::{setup_tracing, Config, LogFormat, PharmacySystem};
use crate::clients::ReminderSlot;
use crate::domain::{
    CustomerId, Document, IdempotencyKey, IntakeFields, PaymentMethod, Principal, ProductCreate, Selection, StaffId,
};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application, before settings are validated
    setup_tracing(LogFormat::from_env());
    let config = Config::from_env();

    info!(?config, "Starting pharmacy fulfillment system");
    let system = PharmacySystem::new(&config);

    let customer = Principal::Customer(CustomerId::new("alice@example.com"));
    let pharmacist = Principal::Pharmacist(StaffId::new("pharmacist-1"));

    let product_id = system
        .product_client
        .create_product(ProductCreate::new("Amoxicillin 500mg", Decimal::new(100, 0), 5).prescription_only())
        .await
        .map_err(|e| e.to_string())?;

    // Prescription review
    let span = tracing::info_span!("prescription_review");
    let prescription_id = async {
        let intake = IntakeFields {
            duration: "7 days".to_string(),
            frequency: "three times daily".to_string(),
            payment_method: PaymentMethod::Card,
            has_allergies: false,
            allergy_details: None,
            substitution_allowed: true,
            notes: None,
        };
        let documents = vec![Document::new("prescription.jpg", "image/jpeg")];
        let id = system.prescription_client.submit(&customer, intake, documents).await?;
        let verified = system.prescription_client.verify(&pharmacist, id, 1).await?;
        system.prescription_client.approve(&pharmacist, id, verified.version).await?;
        Ok::<_, prescription_actor::PrescriptionError>(id)
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    // Assembly and customization
    let span = tracing::info_span!("order_assembly");
    let order_id = async {
        let id = system
            .assembly_client
            .assemble_order(&pharmacist, prescription_id, &[Selection::new(product_id, 3)])
            .await?;

        // Raising past the stock snapshot is a no-op.
        for _ in 0..3 {
            system.order_client.increase_quantity(&customer, id, product_id).await?;
        }
        let order = system.order_client.decrease_quantity(&customer, id, product_id).await?;
        info!(order_id = %id, subtotal = %order.subtotal, total = %order.total, "Order ready for payment");
        Ok::<_, order_actor::OrderError>(id)
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    // Payment and confirmation
    let span = tracing::info_span!("checkout");
    let result = async {
        let reminder = ReminderSlot { date: "2030-01-15".to_string(), time: "09:00".to_string() };
        system
            .checkout_client
            .pay_and_confirm(&customer, order_id, PaymentMethod::Card, IdempotencyKey::generate(), Some(reminder))
            .await
    }
    .instrument(span)
    .await;

    match result {
        Ok(outcome) => {
            info!(order_id = %order_id, payment_id = %outcome.payment.id, amount = %outcome.payment.amount, "Order paid");
            if let Err(e) = system.order_client.increase_quantity(&customer, order_id, product_id).await {
                info!(error = %e, "Confirmed order refuses further edits");
            }
        }
        Err(e) => error!(error = %e, "Checkout failed"),
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
