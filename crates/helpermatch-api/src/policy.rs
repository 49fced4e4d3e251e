//! Who may see the helper and job collections.
//!
//! Evaluation is a pure function of [`Viewer`]. The viewer is always rebuilt
//! from the user record, never from token claims, so admin edits and payment
//! grants take effect on the next request. Nothing here returns an error for
//! an unknown or unreadable viewer: it degrades to the anonymous outcome.
//!
//! The two directions are intentionally not mirror images. A helper may see
//! jobs through either the capability flag or an approved profile of their
//! own; an employer may see helpers only through the capability flag.

use tracing::{debug, warn};
use uuid::Uuid;

use helpermatch_db::{Database, ListingFilter};
use helpermatch_types::api::{AccessDecision, AccessReason, AccessSummary, ListQuery};
use helpermatch_types::models::{Collection, ModerationStatus, Role};

use crate::error::{ApiError, ApiResult};

/// Policy inputs for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: Uuid,
    pub role: Role,
    pub can_view_helpers: bool,
    pub can_view_jobs: bool,
    /// Owns at least one approved helper profile. Only computed for helpers.
    pub has_approved_profile: bool,
}

impl Viewer {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn decision(allowed: bool, reason: AccessReason) -> AccessDecision {
    AccessDecision { allowed, reason }
}

pub fn evaluate(viewer: Option<&Viewer>, collection: Collection) -> AccessDecision {
    let Some(viewer) = viewer else {
        return decision(false, AccessReason::Unauthenticated);
    };

    match (viewer.role, collection) {
        (Role::Admin, _) => decision(true, AccessReason::Admin),
        (Role::Helper, Collection::Helpers) | (Role::Employer, Collection::Jobs) => {
            decision(true, AccessReason::OwnCategory)
        }
        (Role::Employer, Collection::Helpers) => {
            if viewer.can_view_helpers {
                decision(true, AccessReason::CapabilityFlag)
            } else {
                decision(false, AccessReason::MissingCapability)
            }
        }
        (Role::Helper, Collection::Jobs) => {
            if viewer.can_view_jobs {
                decision(true, AccessReason::CapabilityFlag)
            } else if viewer.has_approved_profile {
                decision(true, AccessReason::ApprovedProfile)
            } else {
                decision(false, AccessReason::NoApprovedProfile)
            }
        }
    }
}

pub fn can_view_helpers(viewer: Option<&Viewer>) -> bool {
    evaluate(viewer, Collection::Helpers).allowed
}

pub fn can_view_jobs(viewer: Option<&Viewer>) -> bool {
    evaluate(viewer, Collection::Jobs).allowed
}

pub fn summary(viewer: Option<&Viewer>) -> AccessSummary {
    AccessSummary {
        helpers: evaluate(viewer, Collection::Helpers),
        jobs: evaluate(viewer, Collection::Jobs),
    }
}

/// Row selection for a listing request, or `None` when the viewer is denied
/// and the listing must come back empty.
///
/// `all` only widens the result for admins. Asking for one's own records
/// skips the gate and includes every moderation status.
pub fn listing_filter(
    viewer: Option<&Viewer>,
    collection: Collection,
    query: &ListQuery,
) -> Option<ListingFilter> {
    let own = matches!((viewer, query.owner), (Some(v), Some(owner)) if v.id == owner);

    if viewer.is_some_and(Viewer::is_admin) {
        return Some(ListingFilter {
            owner: query.owner,
            approved_only: !(query.all || own),
        });
    }

    if own {
        return Some(ListingFilter {
            owner: query.owner,
            approved_only: false,
        });
    }

    let decision = evaluate(viewer, collection);
    if !decision.allowed {
        debug!(
            "Listing {:?} denied for {:?}: {:?}",
            collection,
            viewer.map(|v| v.id),
            decision.reason
        );
        return None;
    }

    Some(ListingFilter {
        owner: query.owner,
        approved_only: true,
    })
}

/// Whether a single record may be shown: to its owner and admins always,
/// to everyone else only once approved and only past the collection gate.
pub fn can_see_record(
    viewer: Option<&Viewer>,
    collection: Collection,
    owner: Option<Uuid>,
    status: ModerationStatus,
) -> bool {
    if let Some(v) = viewer {
        if may_manage(v, owner) {
            return true;
        }
    }
    status == ModerationStatus::Approved && evaluate(viewer, collection).allowed
}

/// Owners and admins may edit or delete a record.
pub fn may_manage(viewer: &Viewer, owner: Option<Uuid>) -> bool {
    viewer.is_admin() || owner == Some(viewer.id)
}

/// Loads policy inputs for `user_id`. Unknown ids and read failures yield
/// `None`, which evaluates like an anonymous request.
pub fn resolve_viewer(db: &Database, user_id: Option<Uuid>) -> Option<Viewer> {
    let id = user_id?;
    let user = match db.get_user_by_id(id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Token subject {} has no user record", id);
            return None;
        }
        Err(e) => {
            warn!("Failed to load viewer {}: {:#}", id, e);
            return None;
        }
    };

    let has_approved_profile = user.role == Role::Helper
        && db.has_approved_helper_profile(id).unwrap_or_else(|e| {
            warn!("Failed to check helper profiles for {}: {:#}", id, e);
            false
        });

    Some(Viewer {
        id,
        role: user.role,
        can_view_helpers: user.can_view_helpers,
        can_view_jobs: user.can_view_jobs,
        has_approved_profile,
    })
}

/// A signed-in viewer whose user record still exists.
pub fn require_viewer(db: &Database, user_id: Uuid) -> ApiResult<Viewer> {
    resolve_viewer(db, Some(user_id)).ok_or(ApiError::Unauthorized)
}

pub fn require_admin(db: &Database, user_id: Uuid) -> ApiResult<Viewer> {
    let viewer = require_viewer(db, user_id)?;
    if !viewer.is_admin() {
        return Err(ApiError::AccessDenied);
    }
    Ok(viewer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOLS: [bool; 2] = [false, true];

    fn viewer(role: Role, can_view_helpers: bool, can_view_jobs: bool, has_approved_profile: bool) -> Viewer {
        Viewer {
            id: Uuid::new_v4(),
            role,
            can_view_helpers,
            can_view_jobs,
            has_approved_profile,
        }
    }

    /// Every combination of flags for a role.
    fn all_viewers(role: Role) -> Vec<Viewer> {
        let mut out = Vec::new();
        for h in BOOLS {
            for j in BOOLS {
                for p in BOOLS {
                    out.push(viewer(role, h, j, p));
                }
            }
        }
        out
    }

    #[test]
    fn admin_sees_everything_regardless_of_flags() {
        for v in all_viewers(Role::Admin) {
            assert!(can_view_helpers(Some(&v)));
            assert!(can_view_jobs(Some(&v)));
            assert_eq!(evaluate(Some(&v), Collection::Jobs).reason, AccessReason::Admin);
        }
    }

    #[test]
    fn helpers_always_see_helpers() {
        for v in all_viewers(Role::Helper) {
            assert!(can_view_helpers(Some(&v)));
        }
    }

    #[test]
    fn helpers_see_jobs_with_flag_or_approved_profile() {
        for v in all_viewers(Role::Helper) {
            assert_eq!(
                can_view_jobs(Some(&v)),
                v.can_view_jobs || v.has_approved_profile,
                "{:?}",
                v
            );
        }
        let denied = viewer(Role::Helper, true, false, false);
        assert_eq!(
            evaluate(Some(&denied), Collection::Jobs).reason,
            AccessReason::NoApprovedProfile
        );
    }

    #[test]
    fn employers_always_see_jobs() {
        for v in all_viewers(Role::Employer) {
            assert!(can_view_jobs(Some(&v)));
        }
    }

    #[test]
    fn employers_see_helpers_only_with_flag() {
        for v in all_viewers(Role::Employer) {
            assert_eq!(can_view_helpers(Some(&v)), v.can_view_helpers, "{:?}", v);
        }
        // An approved posting of their own does not open the helper list.
        let with_posting = viewer(Role::Employer, false, true, true);
        assert_eq!(
            evaluate(Some(&with_posting), Collection::Helpers),
            AccessDecision {
                allowed: false,
                reason: AccessReason::MissingCapability
            }
        );
    }

    #[test]
    fn anonymous_is_denied_both() {
        assert!(!can_view_helpers(None));
        assert!(!can_view_jobs(None));
        assert_eq!(summary(None).helpers.reason, AccessReason::Unauthenticated);
    }

    #[test]
    fn denied_listing_yields_no_filter() {
        let employer = viewer(Role::Employer, false, false, false);
        assert_eq!(
            listing_filter(Some(&employer), Collection::Helpers, &ListQuery::default()),
            None
        );
        assert_eq!(listing_filter(None, Collection::Jobs, &ListQuery::default()), None);
    }

    #[test]
    fn allowed_listing_is_approved_only_even_with_all() {
        let employer = viewer(Role::Employer, true, false, false);
        let query = ListQuery { owner: None, all: true };
        assert_eq!(
            listing_filter(Some(&employer), Collection::Helpers, &query),
            Some(ListingFilter { owner: None, approved_only: true })
        );
    }

    #[test]
    fn own_listing_skips_gate_and_status() {
        let helper = viewer(Role::Helper, false, false, false);
        let query = ListQuery { owner: Some(helper.id), all: false };
        assert_eq!(
            listing_filter(Some(&helper), Collection::Jobs, &query),
            Some(ListingFilter { owner: Some(helper.id), approved_only: false })
        );
    }

    #[test]
    fn admin_listing_respects_all() {
        let admin = viewer(Role::Admin, false, false, false);
        let plain = listing_filter(Some(&admin), Collection::Helpers, &ListQuery::default());
        assert_eq!(plain, Some(ListingFilter { owner: None, approved_only: true }));

        let all = ListQuery { owner: None, all: true };
        assert_eq!(
            listing_filter(Some(&admin), Collection::Helpers, &all),
            Some(ListingFilter { owner: None, approved_only: false })
        );
    }

    #[test]
    fn record_visibility() {
        let owner = viewer(Role::Employer, false, false, false);
        let other = viewer(Role::Helper, false, false, false);
        let helper_with_profile = viewer(Role::Helper, false, false, true);

        assert!(can_see_record(Some(&owner), Collection::Jobs, Some(owner.id), ModerationStatus::Pending));
        assert!(!can_see_record(Some(&other), Collection::Jobs, Some(owner.id), ModerationStatus::Approved));
        assert!(can_see_record(
            Some(&helper_with_profile),
            Collection::Jobs,
            Some(owner.id),
            ModerationStatus::Approved
        ));
        assert!(!can_see_record(
            Some(&helper_with_profile),
            Collection::Jobs,
            Some(owner.id),
            ModerationStatus::Rejected
        ));
    }

    #[test]
    fn unknown_viewer_resolves_to_anonymous() {
        let db = Database::open_in_memory().unwrap();
        let viewer = resolve_viewer(&db, Some(Uuid::new_v4()));
        assert!(viewer.is_none());
        assert!(!can_view_jobs(viewer.as_ref()));
        assert!(matches!(require_viewer(&db, Uuid::new_v4()), Err(ApiError::Unauthorized)));
    }
}
