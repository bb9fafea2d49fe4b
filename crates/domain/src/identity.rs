use std::fmt;

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Roles a caller can act under, as resolved by the identity layer.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Pharmacist,
    Admin,
}

/// Roles allowed to perform back-office operations.
pub const STAFF: &[Role] = &[Role::Pharmacist, Role::Admin];

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Customer => "customer",
            Self::Pharmacist => "pharmacist",
            Self::Admin => "admin",
        };
        f.write_str(label)
    }
}

/// A resolved caller. Workflow operations take this instead of reading
/// authorization state from the transport layer.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, new)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    /// Rejects the caller unless their role is in the allowed set.
    pub fn require_role(&self, allowed: &[Role], action: &str) -> Result<(), Error> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                role: self.role.to_string(),
                action: action.to_string(),
            })
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Pharmacist | Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles_pass_the_staff_check() {
        let pharmacist = Identity::new("pharm-1".to_string(), Role::Pharmacist);
        assert!(pharmacist.require_role(STAFF, "approve prescriptions").is_ok());
        assert!(pharmacist.is_staff());
    }

    #[test]
    fn customer_is_rejected_from_staff_actions() {
        let customer = Identity::new("cust-1".to_string(), Role::Customer);
        let err = customer
            .require_role(STAFF, "approve prescriptions")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "role customer is not permitted to approve prescriptions"
        );
        assert!(!customer.is_staff());
    }

    #[test]
    fn admin_alone_can_pass_admin_checks() {
        let admin = Identity::new("admin-1".to_string(), Role::Admin);
        let pharmacist = Identity::new("pharm-1".to_string(), Role::Pharmacist);
        assert!(admin.require_role(&[Role::Admin], "create products").is_ok());
        assert!(pharmacist
            .require_role(&[Role::Admin], "create products")
            .is_err());
    }
}
