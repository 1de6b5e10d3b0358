pub mod roster;
pub mod cost;
pub mod lifecycle;
pub mod changes;
pub mod draft;
pub mod analytics;
pub mod advice;
pub mod service;

pub use roster::{JoinOutcome, LeaveOutcome, RemoveOutcome, RosterError, RosterList, RosterManager};
pub use cost::CostBreakdown;
pub use lifecycle::{ActivityWindow, SessionView};
pub use changes::{ChangeHandler, CostEdit, DetailsEdit, EditError};
pub use draft::{DraftError, SessionDraft};
pub use analytics::{AnalyticsAggregator, AnalyticsReport, Period};
pub use service::{ServiceError, ServiceRules, SessionService, SyncStatus};
