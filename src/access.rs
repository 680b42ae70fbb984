// =============================================================================
// CLAIM LEDGER — access.rs
// =============================================================================
//
// Role and ownership preconditions, checked before any store mutation.
// Operations compose the checks they need, e.g. approving a claim is
// require_registered + require_role(Insurance) + require_policy_owner.
// =============================================================================

use crate::error::{LedgerError, LedgerResult};
use crate::model::{Policy, Principal, Role, User};
use crate::store::EntityStore;

pub struct AccessControl<'a> {
    store: &'a EntityStore,
}

impl<'a> AccessControl<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        AccessControl { store }
    }

    pub fn require_registered(&self, caller: &Principal) -> LedgerResult<&'a User> {
        self.store
            .get_user(caller)
            .map_err(|_| LedgerError::unauthorized(format!("{} is not a registered user", caller)))
    }

    pub fn require_role(&self, caller: &Principal, role: Role) -> LedgerResult<&'a User> {
        let user = self.require_registered(caller)?;
        if user.role != role {
            return Err(LedgerError::unauthorized(format!(
                "{} has role {}, {} required",
                caller, user.role, role
            )));
        }
        Ok(user)
    }

    pub fn require_any_role(&self, caller: &Principal, roles: &[Role]) -> LedgerResult<&'a User> {
        let user = self.require_registered(caller)?;
        if !roles.contains(&user.role) {
            return Err(LedgerError::unauthorized(format!(
                "{} has role {}, which may not perform this operation",
                caller, user.role
            )));
        }
        Ok(user)
    }

    pub fn require_policy_owner(&self, caller: &Principal, policy: &Policy) -> LedgerResult<()> {
        if &policy.created_by != caller {
            return Err(LedgerError::not_policy_owner(policy.id));
        }
        Ok(())
    }

    /// Self-registration: caller must not be registered yet.
    pub fn require_unregistered(&self, caller: &Principal) -> LedgerResult<()> {
        if self.store.get_user(caller).is_ok() {
            return Err(LedgerError::duplicate_owner(caller));
        }
        Ok(())
    }
}
