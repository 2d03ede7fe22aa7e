pub mod quota_dto;
pub mod report_dto;

pub use quota_dto::{QuotaChangeRequest, QuotaChangeResponse, ResourceOutcome, ResourceQuotaRequest, ServiceQuotaRequest};
pub use report_dto::{ClusterReport, DomainReport, ProjectReport, ReportFilter, ResourceReport, ServiceReport};
