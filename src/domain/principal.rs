use super::{CustomerId, StaffId};

/// Who is calling. Every workflow operation checks the caller's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Guest,
    Customer(CustomerId),
    Pharmacist(StaffId),
    Admin(StaffId),
}

impl Principal {
    pub fn customer_id(&self) -> Option<&CustomerId> {
        match self {
            Principal::Customer(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_pharmacist(&self) -> bool {
        matches!(self, Principal::Pharmacist(_))
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Admin(_))
    }

    /// Short role label for log fields.
    pub fn role(&self) -> &'static str {
        match self {
            Principal::Guest => "guest",
            Principal::Customer(_) => "customer",
            Principal::Pharmacist(_) => "pharmacist",
            Principal::Admin(_) => "admin",
        }
    }
}
