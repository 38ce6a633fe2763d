//! Namespace access control.
//!
//! [`AuthorizationGate`] is the only access-control boundary in Koderstore. Every operation that
//! resolves a namespace goes through [`AuthorizationGate::resolve_target_namespace`] (or
//! [`AuthorizationGate::require_admin`] for the cross-namespace overview) before any remote call.
//!
//! Rules:
//! - no session principal: `Unauthenticated`
//! - no requested principal, or the caller's own id: self access, always allowed
//! - a different principal: allowed only for an admin request by a member of the administrator
//!   set, otherwise `Forbidden`
//!
//! Cross-principal access is read-only; write paths never accept a requested principal.

use crate::{AdminSet, Principal, PrincipalId, StorageError, StorageResult};

/// Decides which namespace a request may touch.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationGate {
    admins: AdminSet,
}

impl AuthorizationGate {
    pub fn new(admins: AdminSet) -> Self {
        Self { admins }
    }

    /// Resolves the namespace a request targets.
    ///
    /// # Arguments
    ///
    /// * `acting` - The session principal, if the request carried a valid session.
    /// * `requested` - The namespace the caller asked for, if any.
    /// * `is_admin_request` - Whether the caller explicitly asked for administrator access.
    ///
    /// # Errors
    ///
    /// - `StorageError::Unauthenticated` if `acting` is `None`.
    /// - `StorageError::Forbidden` if `requested` names another principal and the caller is not
    ///   an administrator making an admin request.
    pub fn resolve_target_namespace(
        &self,
        acting: Option<&Principal>,
        requested: Option<&PrincipalId>,
        is_admin_request: bool,
    ) -> StorageResult<PrincipalId> {
        let acting = acting.ok_or(StorageError::Unauthenticated)?;

        match requested {
            None => Ok(acting.id.clone()),
            Some(target) if *target == acting.id => Ok(acting.id.clone()),
            Some(target) => {
                if is_admin_request && self.is_admin(&acting.id) {
                    tracing::info!(
                        admin = %acting.id,
                        target = %target,
                        "administrator accessing another namespace"
                    );
                    Ok(target.clone())
                } else {
                    tracing::warn!(
                        acting = %acting.id,
                        target = %target,
                        is_admin_request,
                        "cross-namespace access refused"
                    );
                    Err(StorageError::Forbidden(target.to_string()))
                }
            }
        }
    }

    /// Requires the caller to be an administrator.
    ///
    /// # Errors
    ///
    /// `StorageError::Unauthenticated` without a session, `StorageError::Forbidden` for
    /// non-administrators.
    pub fn require_admin<'a>(&self, acting: Option<&'a Principal>) -> StorageResult<&'a Principal> {
        let acting = acting.ok_or(StorageError::Unauthenticated)?;
        if self.is_admin(&acting.id) {
            Ok(acting)
        } else {
            Err(StorageError::Forbidden(acting.id.to_string()))
        }
    }

    pub fn is_admin(&self, id: &PrincipalId) -> bool {
        self.admins.contains(id)
    }
}
