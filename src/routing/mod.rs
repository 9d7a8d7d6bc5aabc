//! Route-level authorization: parsing destinations, planning redirects,
//! remembering denied targets and deciding each navigation.

pub mod destination;
pub mod evaluator;
pub mod recorder;
pub mod redirect;
pub mod restriction;

pub use destination::Destination;
pub use evaluator::{Decision, DenialReason, PermissionEvaluator};
pub use recorder::TransitionRecorder;
pub use redirect::{build_redirect, RedirectPlanner};
pub use restriction::{authenticated_only, not_for_authenticated, Restriction, RouteDescriptor};
