//! Access resolution for estates.

use crate::{Capabilities, Error, Result, Role, capabilities_for};
use serde::Serialize;
use std::sync::Arc;
use storage::{EstateAccess, EstateId, EstateStore, UserId};
use tracing::{debug, warn};

/// What a caller may do on one estate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Access {
    pub estate_id: EstateId,
    pub role: Role,
    pub can_edit: bool,
    pub can_view_sensitive: bool,
}

impl Access {
    fn granted(estate_id: &EstateId, role: Role) -> Self {
        let Capabilities {
            can_edit,
            can_view_sensitive,
        } = capabilities_for(role);
        Self {
            estate_id: estate_id.clone(),
            role,
            can_edit,
            can_view_sensitive,
        }
    }

    /// Fail with [`Error::Forbidden`] unless this access allows edits.
    pub fn require_edit(&self) -> Result<()> {
        if self.can_edit { Ok(()) } else { Err(Error::Forbidden) }
    }
}

/// Decides a caller's effective role on an estate.
///
/// Every call reads the current projection from the store; nothing is cached.
#[derive(Clone)]
pub struct AccessResolver {
    store: Arc<dyn EstateStore>,
}

impl AccessResolver {
    pub fn new(store: Arc<dyn EstateStore>) -> Self {
        Self { store }
    }

    /// Resolve the caller's access, or `None` when there is none.
    ///
    /// A missing estate and an estate the caller has no grant on both
    /// resolve to `None`.
    pub fn resolve(&self, estate_id: &EstateId, caller_id: &UserId) -> Result<Option<Access>> {
        let Some(projection) = self.store.fetch_access_projection(estate_id)? else {
            debug!(%estate_id, %caller_id, "estate not found");
            return Ok(None);
        };

        let role = effective_role(&projection, caller_id);
        match role {
            Some(role) => debug!(%estate_id, %caller_id, %role, "access resolved"),
            None => debug!(%estate_id, %caller_id, "no access"),
        }
        Ok(role.map(|role| Access::granted(estate_id, role)))
    }

    /// Like [`resolve`](Self::resolve), but no access is an error.
    pub fn require_access(&self, estate_id: &EstateId, caller_id: &UserId) -> Result<Access> {
        match self.resolve(estate_id, caller_id)? {
            Some(access) => Ok(access),
            None => {
                warn!(%estate_id, %caller_id, "access denied");
                Err(Error::Forbidden)
            }
        }
    }
}

fn effective_role(projection: &EstateAccess, caller_id: &UserId) -> Option<Role> {
    // Ownership always wins over any collaborator row.
    if &projection.owner_id == caller_id {
        return Some(Role::Owner);
    }

    let entry = projection
        .collaborators
        .iter()
        .find(|c| &c.user_id == caller_id)?;

    match Role::parse(&entry.role) {
        // Only the estate's owner_id confers ownership.
        Some(Role::Owner) => Some(Role::Editor),
        Some(role) => Some(role),
        None => {
            warn!(
                caller_id = %caller_id,
                role = %entry.role,
                "unrecognized collaborator role, denying"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{MemoryEstateStore, SqliteStore};

    fn resolver_with(estates: &[(&str, EstateAccess)]) -> AccessResolver {
        let store = MemoryEstateStore::new();
        for (id, access) in estates {
            store.put(*id, access.clone()).unwrap();
        }
        AccessResolver::new(Arc::new(store))
    }

    fn e1() -> EstateAccess {
        EstateAccess::owned_by("u1").with_collaborator("u2", "EDITOR")
    }

    #[test]
    fn test_editor_collaborator_scenario() {
        let resolver = resolver_with(&[("E1", e1())]);
        let estate = EstateId::from("E1");

        let access = resolver.resolve(&estate, &"u2".into()).unwrap().unwrap();
        assert_eq!(
            access,
            Access {
                estate_id: estate.clone(),
                role: Role::Editor,
                can_edit: true,
                can_view_sensitive: true,
            }
        );

        assert!(resolver.resolve(&estate, &"u3".into()).unwrap().is_none());
    }

    #[test]
    fn test_owner_dominates_collaborator_rows() {
        let projection = EstateAccess::owned_by("u1")
            .with_collaborator("u1", "VIEWER")
            .with_collaborator("u9", "OWNER");
        let resolver = resolver_with(&[("E1", projection)]);

        let access = resolver.resolve(&"E1".into(), &"u1".into()).unwrap().unwrap();
        assert_eq!(access.role, Role::Owner);
        assert!(access.can_edit);
        assert!(access.can_view_sensitive);
    }

    #[test]
    fn test_forged_owner_row_is_not_ownership() {
        let projection = EstateAccess::owned_by("u1").with_collaborator("u9", "OWNER");
        let resolver = resolver_with(&[("E1", projection)]);

        let access = resolver.resolve(&"E1".into(), &"u9".into()).unwrap().unwrap();
        assert_eq!(access.role, Role::Editor);
        assert!(access.can_edit);
        assert!(access.can_view_sensitive);
    }

    #[test]
    fn test_unrecognized_role_yields_no_access() {
        let projection = EstateAccess::owned_by("u1")
            .with_collaborator("u2", "ADMIN")
            .with_collaborator("u3", "viewer")
            .with_collaborator("u4", "");
        let resolver = resolver_with(&[("E1", projection)]);

        for user in ["u2", "u3", "u4"] {
            assert!(
                resolver.resolve(&"E1".into(), &user.into()).unwrap().is_none(),
                "{user} should have no access"
            );
        }
    }

    #[test]
    fn test_first_matching_collaborator_wins() {
        let projection = EstateAccess::owned_by("u1")
            .with_collaborator("u2", "VIEWER")
            .with_collaborator("u2", "EDITOR");
        let resolver = resolver_with(&[("E1", projection)]);

        let access = resolver.resolve(&"E1".into(), &"u2".into()).unwrap().unwrap();
        assert_eq!(access.role, Role::Viewer);
        assert!(!access.can_edit);
        assert!(!access.can_view_sensitive);
        assert!(matches!(access.require_edit(), Err(Error::Forbidden)));
    }

    #[test]
    fn test_first_match_with_corrupt_role_does_not_fall_through() {
        let projection = EstateAccess::owned_by("u1")
            .with_collaborator("u2", "SUPERUSER")
            .with_collaborator("u2", "EDITOR");
        let resolver = resolver_with(&[("E1", projection)]);

        assert!(resolver.resolve(&"E1".into(), &"u2".into()).unwrap().is_none());
    }

    #[test]
    fn test_missing_estate_is_no_access() {
        let resolver = resolver_with(&[]);
        assert!(resolver.resolve(&"E404".into(), &"u1".into()).unwrap().is_none());
        assert!(matches!(
            resolver.require_access(&"E404".into(), &"u1".into()),
            Err(Error::Forbidden)
        ));
    }

    #[test]
    fn test_require_access_matches_resolve() {
        let projection = EstateAccess::owned_by("u1")
            .with_collaborator("u2", "EDITOR")
            .with_collaborator("u3", "VIEWER")
            .with_collaborator("u4", "bogus");
        let resolver = resolver_with(&[("E1", projection)]);
        let estate = EstateId::from("E1");

        for user in ["u1", "u2", "u3", "u4", "u5"] {
            let caller = UserId::from(user);
            let resolved = resolver.resolve(&estate, &caller).unwrap();
            match (resolved, resolver.require_access(&estate, &caller)) {
                (Some(expected), Ok(actual)) => assert_eq!(expected, actual),
                (None, Err(Error::Forbidden)) => {}
                (resolved, required) => {
                    panic!("{user}: resolve={resolved:?} require_access={required:?}")
                }
            }
        }
    }

    #[test]
    fn test_forbidden_has_fixed_message() {
        assert_eq!(Error::Forbidden.to_string(), "access denied");
    }

    #[test]
    fn test_reflects_latest_collaborator_state() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let resolver = AccessResolver::new(store.clone());
        let estate = EstateId::from("E1");
        store.create_estate(&estate, &"u1".into()).unwrap();

        assert!(resolver.resolve(&estate, &"u2".into()).unwrap().is_none());

        store.put_collaborator(&estate, &"u2".into(), "VIEWER").unwrap();
        let access = resolver.resolve(&estate, &"u2".into()).unwrap().unwrap();
        assert_eq!(access.role, Role::Viewer);

        store.remove_collaborator(&estate, &"u2".into()).unwrap();
        assert!(resolver.resolve(&estate, &"u2".into()).unwrap().is_none());
    }

    #[test]
    fn test_store_failure_is_not_a_grant() {
        struct Down;
        impl EstateStore for Down {
            fn fetch_access_projection(
                &self,
                _: &EstateId,
            ) -> storage::Result<Option<EstateAccess>> {
                Err(storage::Error::Unavailable("timeout".to_string()))
            }
        }

        let resolver = AccessResolver::new(Arc::new(Down));
        assert!(matches!(
            resolver.resolve(&"E1".into(), &"u1".into()),
            Err(Error::StoreUnavailable(_))
        ));
        assert!(matches!(
            resolver.require_access(&"E1".into(), &"u1".into()),
            Err(Error::StoreUnavailable(_))
        ));
    }
}
