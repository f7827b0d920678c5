use std::collections::HashSet;

use tracing::{error, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::app_system::OrderSettings;
use crate::clients::{PrescriptionClient, ProductClient};
use crate::domain::{
    CustomerId, LineItem, Order, OrderCreate, OrderId, OrderOrigin, OrderStatus, PaymentMethod, PrescriptionId,
    Principal, Selection,
};
use crate::order_actor::OrderError;
use crate::prescription_actor::PrescriptionError;
use crate::product_actor::ProductError;

/// Turns approved prescriptions (and carts) into draft orders.
///
/// Every selection is checked against current stock before anything is
/// created, so a failing selection never leaves a partial order behind.
#[derive(Clone)]
pub struct AssemblyClient {
    orders: ResourceClient<Order>,
    prescription_client: PrescriptionClient,
    product_client: ProductClient,
    settings: OrderSettings,
}

fn from_prescription_error(e: PrescriptionError) -> OrderError {
    match e {
        PrescriptionError::NotFound(id) => OrderError::NotFound(format!("prescription {}", id)),
        PrescriptionError::ValidationError(msg) => OrderError::ValidationError(msg),
        PrescriptionError::Unauthorized(msg) => OrderError::Unauthorized(msg),
        other => OrderError::ActorCommunicationError(other.to_string()),
    }
}

impl AssemblyClient {
    pub fn new(
        orders: ResourceClient<Order>,
        prescription_client: PrescriptionClient,
        product_client: ProductClient,
        settings: OrderSettings,
    ) -> Self {
        Self {
            orders,
            prescription_client,
            product_client,
            settings,
        }
    }

    /// Builds priced line items, checking every selection against current stock.
    async fn build_lines(&self, selections: &[Selection], allow_prescription_only: bool) -> Result<Vec<LineItem>, OrderError> {
        if selections.is_empty() {
            return Err(OrderError::ValidationError("select at least one product".to_string()));
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(selections.len());
        for selection in selections {
            if !seen.insert(selection.product_id) {
                return Err(OrderError::ValidationError(format!("product {} selected twice", selection.product_id)));
            }
            if selection.quantity == 0 {
                return Err(OrderError::ValidationError("quantities must be at least 1".to_string()));
            }

            let product = self.product_client.get_product(selection.product_id).await.map_err(|e| match e {
                ProductError::NotFound(id) => OrderError::InvalidProduct(id),
                other => OrderError::ActorCommunicationError(other.to_string()),
            })?;

            if product.prescription_required && !allow_prescription_only {
                return Err(OrderError::ValidationError(format!("{} requires a prescription", product.name)));
            }
            if selection.quantity > product.stock {
                error!(product = %product.name, requested = selection.quantity, available = product.stock, "Selection exceeds stock");
                return Err(OrderError::InsufficientStock {
                    product: product.name,
                    requested: selection.quantity,
                    available: product.stock,
                });
            }
            lines.push(LineItem {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: selection.quantity,
                stock_snapshot: product.stock,
            });
        }
        Ok(lines)
    }

    /// Pharmacist converts an approved prescription into a draft order.
    #[instrument(skip(self, selections), fields(role = principal.role(), selections = selections.len()))]
    pub async fn assemble_order(
        &self,
        principal: &Principal,
        prescription_id: PrescriptionId,
        selections: &[Selection],
    ) -> Result<OrderId, OrderError> {
        if !principal.is_pharmacist() {
            return Err(OrderError::Unauthorized(format!("{} cannot assemble orders", principal.role())));
        }

        let prescription = self
            .prescription_client
            .get_approved(prescription_id)
            .await
            .map_err(from_prescription_error)?;

        let live = self
            .orders
            .list(Some(Box::new(move |o: &Order| {
                o.prescription_id == Some(prescription_id) && o.status != OrderStatus::Cancelled
            })))
            .await?;
        if let Some(existing) = live.first() {
            return Err(OrderError::ValidationError(format!(
                "prescription {} already has order {}",
                prescription_id, existing.id
            )));
        }

        let items = self.build_lines(selections, true).await?;
        let params = OrderCreate {
            customer_id: prescription.customer_id,
            prescription_id: Some(prescription_id),
            origin: OrderOrigin::Prescription,
            items,
            shipping: self.settings.shipping_fee,
            tax_rate: self.settings.tax_rate,
            payment_method: prescription.intake.payment_method,
        };
        let order_id = self.orders.create(params).await?;
        info!(order_id = %order_id, prescription_id = %prescription_id, "Draft order assembled");
        Ok(order_id)
    }

    /// Direct checkout of non-prescription products by the customer.
    #[instrument(skip(self, selections), fields(role = principal.role(), selections = selections.len()))]
    pub async fn create_online_order(
        &self,
        principal: &Principal,
        selections: &[Selection],
        payment_method: PaymentMethod,
    ) -> Result<OrderId, OrderError> {
        let customer = principal
            .customer_id()
            .cloned()
            .ok_or_else(|| OrderError::Unauthorized("sign in to check out".to_string()))?;
        self.create_direct(customer, OrderOrigin::Online, selections, payment_method).await
    }

    /// Counter sale rung up by a pharmacist on behalf of a customer.
    #[instrument(skip(self, selections), fields(role = principal.role(), selections = selections.len()))]
    pub async fn create_pos_order(
        &self,
        principal: &Principal,
        customer: CustomerId,
        selections: &[Selection],
        payment_method: PaymentMethod,
    ) -> Result<OrderId, OrderError> {
        if !principal.is_pharmacist() {
            return Err(OrderError::Unauthorized(format!("{} cannot ring up sales", principal.role())));
        }
        self.create_direct(customer, OrderOrigin::Pos, selections, payment_method).await
    }

    async fn create_direct(
        &self,
        customer_id: CustomerId,
        origin: OrderOrigin,
        selections: &[Selection],
        payment_method: PaymentMethod,
    ) -> Result<OrderId, OrderError> {
        let items = self.build_lines(selections, false).await?;
        let params = OrderCreate {
            customer_id,
            prescription_id: None,
            origin,
            items,
            shipping: self.settings.shipping_fee,
            tax_rate: self.settings.tax_rate,
            payment_method,
        };
        let order_id = self.orders.create(params).await?;
        info!(order_id = %order_id, origin = ?origin, "Draft order created");
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_system::{Config, PharmacySystem};
    use crate::domain::{Document, IntakeFields, ProductCreate, ProductId, StaffId};
    use rust_decimal::Decimal;

    fn customer() -> Principal {
        Principal::Customer(CustomerId::new("carol@example.com"))
    }

    fn pharmacist() -> Principal {
        Principal::Pharmacist(StaffId::new("ph-1"))
    }

    fn intake() -> IntakeFields {
        IntakeFields {
            duration: "30 days".into(),
            frequency: "twice daily".into(),
            payment_method: PaymentMethod::Wallet,
            has_allergies: false,
            allergy_details: None,
            substitution_allowed: true,
            notes: None,
        }
    }

    async fn approved_prescription(system: &PharmacySystem) -> PrescriptionId {
        let prescriptions = &system.prescription_client;
        let id = prescriptions
            .submit(&customer(), intake(), vec![Document::new("rx.pdf", "application/pdf")])
            .await
            .unwrap();
        let p = prescriptions.verify(&pharmacist(), id, 1).await.unwrap();
        prescriptions.approve(&pharmacist(), id, p.version).await.unwrap();
        id
    }

    async fn product(system: &PharmacySystem, name: &str, price: i64, stock: u32) -> ProductId {
        system
            .product_client
            .create_product(ProductCreate::new(name, Decimal::new(price, 0), stock).prescription_only())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn assembles_a_priced_draft_for_the_prescription_owner() {
        let system = PharmacySystem::new(&Config::default());
        let rx = approved_prescription(&system).await;
        let p = product(&system, "Amoxicillin", 100, 5).await;

        let order_id = system.assembly_client.assemble_order(&pharmacist(), rx, &[Selection::new(p, 3)]).await.unwrap();

        let order = system.order_client.get_order(order_id).await.unwrap();
        assert_eq!(order.customer_id, CustomerId::new("carol@example.com"));
        assert_eq!(order.prescription_id, Some(rx));
        assert_eq!(order.origin, OrderOrigin::Prescription);
        assert_eq!(order.payment_method, PaymentMethod::Wallet);
        assert_eq!(order.subtotal, Decimal::new(300, 0));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.customization_confirmed);
        assert_eq!(order.items[0].stock_snapshot, 5);

        let again = system.assembly_client.assemble_order(&pharmacist(), rx, &[Selection::new(p, 1)]).await;
        assert!(matches!(again, Err(OrderError::ValidationError(_))));
    }

    #[tokio::test]
    async fn any_selection_over_stock_creates_nothing() {
        let system = PharmacySystem::new(&Config::default());
        let rx = approved_prescription(&system).await;
        let a = product(&system, "A", 10, 5).await;
        let b = product(&system, "B", 10, 1).await;

        let err = system
            .assembly_client
            .assemble_order(&pharmacist(), rx, &[Selection::new(a, 2), Selection::new(b, 2)])
            .await
            .unwrap_err();
        assert_eq!(err, OrderError::InsufficientStock { product: "B".into(), requested: 2, available: 1 });
        assert!(system.order_client.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn requires_a_pharmacist_and_an_approved_prescription() {
        let system = PharmacySystem::new(&Config::default());
        let p = product(&system, "A", 10, 5).await;
        let pending = system
            .prescription_client
            .submit(&customer(), intake(), vec![Document::new("rx.png", "image/png")])
            .await
            .unwrap();

        let err = system.assembly_client.assemble_order(&customer(), pending, &[Selection::new(p, 1)]).await.unwrap_err();
        assert!(matches!(err, OrderError::Unauthorized(_)));

        let err = system.assembly_client.assemble_order(&pharmacist(), pending, &[Selection::new(p, 1)]).await.unwrap_err();
        assert!(matches!(err, OrderError::ValidationError(_)));

        let err = system.assembly_client.assemble_order(&pharmacist(), pending, &[]).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn direct_orders_refuse_prescription_products() {
        let system = PharmacySystem::new(&Config::default());
        let gated = product(&system, "Morphine", 10, 5).await;
        let otc = system
            .product_client
            .create_product(ProductCreate::new("Plasters", Decimal::new(3, 0), 9))
            .await
            .unwrap();

        let err = system
            .assembly_client
            .create_online_order(&customer(), &[Selection::new(gated, 1)], PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ValidationError(_)));

        let err = system
            .assembly_client
            .create_pos_order(&customer(), CustomerId::new("dave@example.com"), &[Selection::new(otc, 1)], PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Unauthorized(_)));

        let order_id = system
            .assembly_client
            .create_pos_order(&pharmacist(), CustomerId::new("dave@example.com"), &[Selection::new(otc, 2)], PaymentMethod::CashOnDelivery)
            .await
            .unwrap();
        let order = system.order_client.get_order(order_id).await.unwrap();
        assert_eq!(order.origin, OrderOrigin::Pos);
        assert_eq!(order.prescription_id, None);
    }

    #[tokio::test]
    async fn order_store_failures_reach_the_caller() {
        use crate::mock_framework::{create_mock_client, expect_create};

        let system = PharmacySystem::new(&Config::default());
        let otc = system
            .product_client
            .create_product(ProductCreate::new("Gauze", Decimal::new(4, 0), 6))
            .await
            .unwrap();
        let (orders, mut order_rx) = create_mock_client::<Order>(4);
        let assembly = AssemblyClient::new(
            orders,
            system.prescription_client.clone(),
            system.product_client.clone(),
            Config::default().order_settings(),
        );

        let task = tokio::spawn(async move {
            assembly.create_online_order(&customer(), &[Selection::new(otc, 2)], PaymentMethod::Card).await
        });

        let (params, responder) = expect_create(&mut order_rx).await.expect("Expected Order Create");
        assert_eq!(params.origin, OrderOrigin::Online);
        assert_eq!(params.customer_id, CustomerId::new("carol@example.com"));
        assert_eq!(params.items.len(), 1);
        assert_eq!(params.items[0].quantity, 2);
        assert_eq!(params.items[0].stock_snapshot, 6);
        assert_eq!(params.shipping, Decimal::new(500, 0));
        responder.send(Err(OrderError::ActorCommunicationError("order store unavailable".into()))).unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, OrderError::ActorCommunicationError(_)));
        assert_eq!(system.product_client.check_stock(otc).await.unwrap(), 6);
    }
}
