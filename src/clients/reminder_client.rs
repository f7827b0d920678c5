use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{OrderId, Reminder, ReminderId, ReminderRequest};
use crate::reminder_actor::ReminderError;

use super::OrderClient;

/// Client for the reminder scheduler.
#[derive(Clone)]
pub struct ReminderClient {
    inner: ResourceClient<Reminder>,
    orders: OrderClient,
}

crate::impl_client_methods!(ReminderClient, Reminder, ReminderId, ReminderError, reminder);

impl ReminderClient {
    pub fn new(inner: ResourceClient<Reminder>, orders: OrderClient) -> Self {
        Self { inner, orders }
    }

    #[instrument(skip(self))]
    pub async fn schedule_reminder(&self, order_id: OrderId, date: &str, time: &str) -> Result<ReminderId, ReminderError> {
        self.orders
            .get_order(order_id)
            .await
            .map_err(|e| ReminderError::NotFound(e.to_string()))?;

        let request = ReminderRequest {
            order_id,
            date: date.to_string(),
            time: time.to_string(),
        };
        let id = self.inner.create(request).await?;
        info!(reminder_id = %id, "Reminder scheduled");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn list_for_order(&self, order_id: OrderId) -> Result<Vec<Reminder>, ReminderError> {
        debug!("Sending request");
        let mut reminders = self
            .inner
            .list(Some(Box::new(move |r: &Reminder| r.order_id == order_id)))
            .await?;
        reminders.sort_by_key(|r| (r.date, r.time));
        Ok(reminders)
    }
}
