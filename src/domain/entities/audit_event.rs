use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::domain::entities::quota_change::{ChangeScope, QuotaChange};
use crate::domain::ports::TokenContext;

/// Resolves the `EventTarget` interface-typed-optional-field polymorphism
/// from the source into a single tagged variant (§9 redesign notes),
/// each carrying exactly the fields it needs and a `render` that
/// produces the CADF `target` shape.
#[derive(Debug, Clone)]
pub enum EventTarget {
    Quota {
        service_type: String,
        resource_name: String,
        domain_id: Uuid,
        project_id: Option<Uuid>,
    },
    Bursting {
        domain_id: Uuid,
        project_id: Option<Uuid>,
    },
}

impl EventTarget {
    fn type_uri(&self) -> String {
        match self {
            EventTarget::Quota { service_type, resource_name, .. } => {
                format!("service/{service_type}/{resource_name}/quota")
            }
            EventTarget::Bursting { .. } => "service/resources/bursting".to_string(),
        }
    }

    fn domain_id(&self) -> Uuid {
        match self {
            EventTarget::Quota { domain_id, .. } => *domain_id,
            EventTarget::Bursting { domain_id, .. } => *domain_id,
        }
    }

    fn project_id(&self) -> Option<Uuid> {
        match self {
            EventTarget::Quota { project_id, .. } => *project_id,
            EventTarget::Bursting { project_id, .. } => *project_id,
        }
    }

    fn render(&self, id: Uuid, payload: &AuditPayload) -> CadfTarget {
        CadfTarget {
            type_uri: self.type_uri(),
            id,
            domain_id: self.domain_id(),
            project_id: self.project_id(),
            attachments: vec![Attachment::new(payload)],
        }
    }
}

/// The nested string payload (§6). All-empty fields are omitted before
/// it is embedded as a JSON *string* inside the attachment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_quota: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_quota: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

/// The duck-typed-JSON-payload redesign (§9): serialize `content` to
/// bytes first, then embed the result as a JSON string, via one custom
/// serializer rather than re-marshalling the whole event.
#[derive(Debug, Clone)]
struct Attachment {
    name: &'static str,
    type_uri: &'static str,
    content: String,
}

impl Attachment {
    fn new(payload: &AuditPayload) -> Self {
        let content = serde_json::to_string(payload).unwrap_or_default();
        Self { name: "payload", type_uri: "mime:application/json", content }
    }
}

impl Serialize for Attachment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Attachment", 3)?;
        s.serialize_field("name", self.name)?;
        s.serialize_field("typeURI", self.type_uri)?;
        s.serialize_field("content", &self.content)?;
        s.end()
    }
}

#[derive(Debug, Clone, Serialize)]
struct CadfTarget {
    #[serde(rename = "typeURI")]
    type_uri: String,
    id: Uuid,
    #[serde(rename = "domainId")]
    domain_id: Uuid,
    #[serde(rename = "projectId", skip_serializing_if = "Option::is_none")]
    project_id: Option<Uuid>,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
struct CadfReason {
    #[serde(rename = "reasonType")]
    reason_type: &'static str,
    #[serde(rename = "reasonCode")]
    reason_code: String,
}

#[derive(Debug, Clone, Serialize)]
struct CadfHost {
    address: String,
    agent: String,
}

#[derive(Debug, Clone, Serialize)]
struct CadfInitiator {
    #[serde(rename = "typeURI")]
    type_uri: &'static str,
    id: String,
    name: String,
    domain: String,
    #[serde(rename = "domainId")]
    domain_id: String,
    #[serde(rename = "projectId", skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    host: CadfHost,
}

#[derive(Debug, Clone, Serialize)]
struct CadfObserver {
    #[serde(rename = "typeURI")]
    type_uri: &'static str,
    name: &'static str,
    id: Uuid,
}

/// The CADF-shaped audit event (§6). One constructor
/// ([`AuditEvent::new`]) taking an [`EventTarget`] plus
/// `{token, request, reasonCode, time}` supersedes older positional
/// `NewEvent` variants (§9 redesign notes).
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    #[serde(rename = "typeURI")]
    type_uri: &'static str,
    id: Uuid,
    #[serde(rename = "eventTime")]
    event_time: String,
    #[serde(rename = "eventType")]
    event_type: &'static str,
    action: &'static str,
    outcome: &'static str,
    reason: CadfReason,
    initiator: CadfInitiator,
    target: CadfTarget,
    observer: CadfObserver,
    #[serde(rename = "requestPath")]
    request_path: String,
}

impl AuditEvent {
    /// Builds the event for a single quota change outcome. `observer_id`
    /// is the process-wide uuid stamped once at startup.
    pub fn new(
        token: &TokenContext,
        request_path: impl Into<String>,
        remote_address: impl Into<String>,
        user_agent: impl Into<String>,
        reason_code: u16,
        target: EventTarget,
        payload: AuditPayload,
        observer_id: Uuid,
        time: DateTime<Utc>,
    ) -> Self {
        let outcome = if (200..300).contains(&reason_code) { "success" } else { "failure" };
        let event_id = Uuid::new_v4();
        AuditEvent {
            type_uri: "http://schemas.dmtf.org/cloud/audit/1.0/event",
            id: event_id,
            event_time: time.to_rfc3339_opts(SecondsFormat::Micros, true),
            event_type: "activity",
            action: "update",
            outcome,
            reason: CadfReason { reason_type: "HTTP", reason_code: reason_code.to_string() },
            initiator: CadfInitiator {
                type_uri: "service/security/account/user",
                id: token.user_id.clone(),
                name: token.user_name.clone(),
                domain: token.domain_name.clone(),
                domain_id: token.domain_id.clone(),
                project_id: token.project_id.clone(),
                host: CadfHost { address: remote_address.into(), agent: user_agent.into() },
            },
            target: target.render(event_id, &payload),
            observer: CadfObserver {
                type_uri: "service/resources",
                name: "limes",
                id: observer_id,
            },
            request_path: request_path.into(),
        }
    }

    /// Builds the event straight from a completed [`QuotaChange`],
    /// folding in the standard HTTP-equivalent status codes used by the
    /// quota-change pipeline.
    pub fn from_quota_change(
        change: &QuotaChange,
        token: &TokenContext,
        request_path: impl Into<String>,
        remote_address: impl Into<String>,
        user_agent: impl Into<String>,
        observer_id: Uuid,
    ) -> Self {
        let reason_code = if change.is_success() { 200 } else { 409 };
        let (domain_id, project_id) = match change.scope {
            ChangeScope::Domain(d) => (d, None),
            ChangeScope::Project { domain_uuid, project_uuid } => (domain_uuid, Some(project_uuid)),
        };
        let target = EventTarget::Quota {
            service_type: change.service_type.clone(),
            resource_name: change.resource_name.clone(),
            domain_id,
            project_id,
        };
        let payload = AuditPayload {
            old_quota: Some(change.old_quota),
            new_quota: Some(change.new_quota),
            unit: Some(change.unit.to_string()),
            new_status: None,
            reject_reason: change.reject_reason.clone(),
        };
        Self::new(
            token,
            request_path,
            remote_address,
            user_agent,
            reason_code,
            target,
            payload,
            observer_id,
            change.when,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn outcome(&self) -> &'static str {
        self.outcome
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ClusterId, Unit};

    fn token() -> TokenContext {
        TokenContext {
            user_id: "u-1".into(),
            user_name: "alice".into(),
            domain_id: "d-1".into(),
            domain_name: "engineering".into(),
            project_id: Some("p-1".into()),
            is_privileged: false,
        }
    }

    #[test]
    fn success_change_yields_success_outcome_and_200() {
        let change = QuotaChange {
            who: token(),
            when: Utc::now(),
            cluster: ClusterId::new("eu-west-1").unwrap(),
            scope: ChangeScope::Project { domain_uuid: Uuid::nil(), project_uuid: Uuid::nil() },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            old_quota: 8,
            new_quota: 16,
            unit: Unit::None,
            reject_reason: None,
        };
        let event = AuditEvent::from_quota_change(&change, &token(), "/v1/x", "127.0.0.1", "curl", Uuid::nil());
        assert_eq!(event.outcome(), "success");
    }

    #[test]
    fn rejected_change_yields_failure_outcome_and_nonempty_reason() {
        let change = QuotaChange {
            who: token(),
            when: Utc::now(),
            cluster: ClusterId::new("eu-west-1").unwrap(),
            scope: ChangeScope::Project { domain_uuid: Uuid::nil(), project_uuid: Uuid::nil() },
            service_type: "compute".into(),
            resource_name: "cores".into(),
            old_quota: 8,
            new_quota: 16,
            unit: Unit::None,
            reject_reason: Some("quota above maximum".into()),
        };
        let event = AuditEvent::from_quota_change(&change, &token(), "/v1/x", "127.0.0.1", "curl", Uuid::nil());
        assert_eq!(event.outcome(), "failure");
        let json = serde_json::to_value(&event).unwrap();
        let content = json["target"]["attachments"][0]["content"].as_str().unwrap();
        assert!(content.contains("quota above maximum"));
    }

    #[test]
    fn attachment_content_is_a_json_string_not_a_nested_object() {
        let change = QuotaChange {
            who: token(),
            when: Utc::now(),
            cluster: ClusterId::new("eu-west-1").unwrap(),
            scope: ChangeScope::Domain(Uuid::nil()),
            service_type: "compute".into(),
            resource_name: "cores".into(),
            old_quota: 0,
            new_quota: 10,
            unit: Unit::None,
            reject_reason: None,
        };
        let event = AuditEvent::from_quota_change(&change, &token(), "/v1/x", "127.0.0.1", "curl", Uuid::nil());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["target"]["attachments"][0]["content"].is_string());
    }
}
