//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_get`] or [`expect_action`] to answer each
//! request by hand, injecting failures where a test needs them.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, Filter, ResourceClient, ResourceRequest};

/// Creates a mock client and a receiver for asserting requests.
///
/// Orchestration code (checkout, assembly) talks to several actors. Swapping
/// one of them for a mock lets a test decide what that actor answers and in
/// which order, without spinning up a `ResourceActor`.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

pub type Responder<R, T> = oneshot::Sender<Result<R, <T as Entity>::Error>>;

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Responder<T::Id, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(receiver: &mut mpsc::Receiver<ResourceRequest<T>>) -> Option<(T::Id, Responder<Option<T>, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(Option<Filter<T>>, Responder<Vec<T>, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List { filter, respond_to }) => Some((filter, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Option<u64>, Responder<T::ActionResult, T>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, expected_version, respond_to }) => {
            Some((id, action, expected_version, respond_to))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{OrderClient, ProductClient};
    use crate::domain::{Order, OrderId, Product};
    use crate::order_actor::OrderError;

    #[tokio::test]
    async fn missing_orders_surface_as_not_found() {
        let (inner, mut receiver) = create_mock_client::<Order>(10);
        let (products, _product_rx) = create_mock_client::<Product>(10);
        let client = OrderClient::new(inner, ProductClient::new(products), 10);

        let wanted = OrderId::new();
        let task = tokio::spawn(async move { client.get_order(wanted).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, wanted);
        responder.send(Ok(None)).unwrap();

        assert_eq!(task.await.unwrap(), Err(OrderError::NotFound(wanted.to_string())));
    }

    #[tokio::test]
    async fn list_filters_travel_with_the_request() {
        let (inner, mut receiver) = create_mock_client::<Product>(10);
        let client = ProductClient::new(inner);
        let task = tokio::spawn(async move { client.list_products().await });

        let (filter, responder) = expect_list(&mut receiver).await.expect("Expected List request");
        assert!(filter.is_none());
        responder.send(Ok(Vec::new())).unwrap();
        assert!(task.await.unwrap().unwrap().is_empty());
    }
}
