//! Refill reminders scheduled alongside payment.

use chrono::{NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::actor_framework::{Entity, FrameworkError};
use crate::domain::{Reminder, ReminderId, ReminderRequest};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReminderError {
    #[error("Reminder not found: {0}")]
    NotFound(String),
    #[error("Reminder validation error: {0}")]
    ValidationError(String),
    #[error("Reminder timed out after {0} ms")]
    Timeout(u64),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for ReminderError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => ReminderError::NotFound(id),
            other => ReminderError::ActorCommunicationError(other.to_string()),
        }
    }
}

impl Entity for Reminder {
    type Id = ReminderId;
    type CreateParams = ReminderRequest;
    type Patch = ();
    type Action = ();
    type ActionResult = ();
    type Error = ReminderError;

    fn id(&self) -> &ReminderId { &self.id }
    fn version(&self) -> u64 { self.version }
    fn set_version(&mut self, version: u64) { self.version = version; }

    fn from_create_params(id: ReminderId, params: ReminderRequest) -> Result<Self, ReminderError> {
        let date = NaiveDate::parse_from_str(params.date.trim(), "%Y-%m-%d")
            .map_err(|e| ReminderError::ValidationError(format!("invalid date {:?}: {}", params.date, e)))?;
        let time = NaiveTime::parse_from_str(params.time.trim(), "%H:%M")
            .map_err(|e| ReminderError::ValidationError(format!("invalid time {:?}: {}", params.time, e)))?;
        Ok(Self {
            id,
            order_id: params.order_id,
            date,
            time,
            created_at: Utc::now(),
            version: 0,
        })
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), ReminderError> {
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), ReminderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderId;

    fn request(date: &str, time: &str) -> ReminderRequest {
        ReminderRequest { order_id: OrderId::new(), date: date.to_string(), time: time.to_string() }
    }

    #[test]
    fn parses_date_and_time() {
        let reminder = Reminder::from_create_params(ReminderId::new(), request("2026-11-01", "08:30")).unwrap();
        assert_eq!(reminder.date, NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
        assert_eq!(reminder.time, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(Reminder::from_create_params(ReminderId::new(), request("2026-13-01", "08:30")).is_err());
        assert!(Reminder::from_create_params(ReminderId::new(), request("2026-11-01", "25:00")).is_err());
    }
}
