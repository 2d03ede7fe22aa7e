pub mod build_report;
pub mod change_quota;
pub mod detect_inconsistencies;
pub mod discover_and_reconcile;

pub use build_report::ReportBuilder;
pub use change_quota::{ChangeQuotaOutcome, ChangeQuotaRequest, ChangeQuotaUseCase};
pub use detect_inconsistencies::{InconsistencyDetector, InconsistencyReport};
pub use discover_and_reconcile::{DiscoveryFilter, DiscoveryUseCase, InitialConstraint, ReconcileOutcome};
