use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Crate-wide error type. One variant per failure class named in the
/// error handling design; the audit payload's `rejectReason` and the
/// HTTP status mapping below both key off these variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("constraint syntax error: {0}")]
    ConstraintSyntax(String),

    #[error("constraint clause inconsistent: minimum {min} exceeds maximum {max}")]
    ConstraintClauseInconsistent { min: u64, max: u64 },

    #[error("domain overcommitted: project minimums sum to {sum} but domain minimum is {domain_min}")]
    ConstraintDomainOvercommitted { sum: u64, domain_min: u64 },

    #[error("unit {src} is not compatible with {dst}")]
    UnitIncompatible { src: String, dst: String },

    #[error("value does not convert evenly from {src} to {dst}")]
    UnitFractional { src: String, dst: String },

    #[error("unknown service type: {0}")]
    ServiceUnknown(String),

    #[error("unknown resource: {service}/{resource}")]
    ResourceUnknown { service: String, resource: String },

    #[error("quota {requested} is below the configured minimum {minimum} ({unit})")]
    QuotaBelowMinimum {
        requested: u64,
        minimum: u64,
        unit: String,
    },

    #[error("quota {requested} is above the configured maximum {maximum} ({unit})")]
    QuotaAboveMaximum {
        requested: u64,
        maximum: u64,
        unit: String,
    },

    #[error("quota {requested} violates the bursting ceiling of {ceiling} ({unit})")]
    QuotaViolatesBursting {
        requested: u64,
        ceiling: u64,
        unit: String,
    },

    #[error(
        "project quotas would sum to {projects_sum} (including this change), exceeding domain quota {domain_quota}"
    )]
    QuotaExceedsDomainSum { projects_sum: u64, domain_quota: u64 },

    #[error("backend rejected the change: {0}")]
    BackendRejected(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("audit publish failed: {0}")]
    AuditPublishFailed(String),

    #[error("persist failed, change rolled back: {0}")]
    PersistFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) | Error::ServiceUnknown(_) | Error::ResourceUnknown { .. } => {
                StatusCode::NOT_FOUND
            }
            Error::ConstraintSyntax(_)
            | Error::ConstraintClauseInconsistent { .. }
            | Error::ConstraintDomainOvercommitted { .. } => StatusCode::BAD_REQUEST,
            Error::UnitIncompatible { .. } | Error::UnitFractional { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::QuotaBelowMinimum { .. }
            | Error::QuotaAboveMaximum { .. }
            | Error::QuotaViolatesBursting { .. }
            | Error::QuotaExceedsDomainSum { .. }
            | Error::BackendRejected(_) => StatusCode::CONFLICT,
            Error::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::ConfigInvalid(_)
            | Error::AuditPublishFailed(_)
            | Error::PersistFailed(_)
            | Error::Io(_)
            | Error::Yaml(_)
            | Error::Json(_)
            | Error::Database(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_above_maximum_maps_to_conflict() {
        let err = Error::QuotaAboveMaximum {
            requested: 16,
            maximum: 12,
            unit: "none".into(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unit_fractional_maps_to_unprocessable_entity() {
        let err = Error::UnitFractional {
            src: "B".into(),
            dst: "MiB".into(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
