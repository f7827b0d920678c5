use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, ReminderId};

/// A refill reminder the customer asked for while paying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    pub order_id: OrderId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

/// Raw form values; parsed when the reminder is created.
#[derive(Debug, Clone)]
pub struct ReminderRequest {
    pub order_id: OrderId,
    pub date: String,
    pub time: String,
}
