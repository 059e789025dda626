pub mod extract;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod verifier;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Role, User};

pub use extract::{CurrentUser, MaybeUser};
pub use jwt::{TokenError, TokenService};
pub use policy::{can_perform, Action, Decision};
pub use verifier::CredentialVerifier;

/// The authenticated caller, passed explicitly into every core operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }
}
