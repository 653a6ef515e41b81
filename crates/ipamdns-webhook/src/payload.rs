//! NetBox webhook payloads
//!
//! Only the fields needed to build an [`AddressChangeEvent`] are modelled;
//! everything else in the notification is ignored.

use chrono::{DateTime, Utc};
use ipamdns_core::{AddressChangeEvent, DomainName};
use serde::Deserialize;

use crate::WebhookError;

/// Model name NetBox uses for IP address objects
pub const IPADDRESS_MODEL: &str = "ipaddress";

/// One webhook notification
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    /// `created`, `updated` or `deleted`
    #[serde(default)]
    pub event: Option<String>,
    pub model: String,
    /// Raw timestamp; NetBox writes RFC 3339 with a space or a `T`
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    pub snapshots: Snapshots,
}

/// Object state before and after the change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshots {
    #[serde(default)]
    pub prechange: Option<AddressSnapshot>,
    #[serde(default)]
    pub postchange: Option<AddressSnapshot>,
}

/// The parts of an IP address object that matter for DNS
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressSnapshot {
    /// Address with prefix length, e.g. `10.0.0.5/24`
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub dns_name: Option<String>,
}

impl Notification {
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::BadRequest(format!("Invalid JSON: {}", e)))
    }

    /// When the change happened, if the timestamp parses
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?.trim().replacen(' ', "T", 1);
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Turn the notification into the event to reconcile
    ///
    /// The post-change snapshot wins. When it is absent the object was
    /// deleted: the pre-change address is reconciled with no name, which
    /// clears its PTR and the forward record pointing back. See
    /// [`Notification::former_name`] for the forward record of a deleted
    /// address whose PTR is already gone.
    pub fn to_event(&self) -> Result<AddressChangeEvent, WebhookError> {
        if self.model != IPADDRESS_MODEL {
            return Err(WebhookError::WrongModel);
        }

        let (address, dns_name) = match (&self.snapshots.postchange, &self.snapshots.prechange) {
            (Some(post), _) => (post.address.as_deref(), post.dns_name.as_deref()),
            (None, Some(pre)) => (pre.address.as_deref(), None),
            (None, None) => {
                return Err(WebhookError::BadRequest(
                    "Notification carries no snapshot".to_string(),
                ));
            }
        };

        AddressChangeEvent::parse(address.unwrap_or_default(), dns_name.unwrap_or_default())
            .map_err(WebhookError::InvalidEvent)
    }

    /// Name a deleted address carried before the deletion
    ///
    /// `None` unless the post-change snapshot is absent and the pre-change
    /// name is a usable domain name.
    pub fn former_name(&self) -> Option<DomainName> {
        if self.snapshots.postchange.is_some() {
            return None;
        }
        let raw = self.snapshots.prechange.as_ref()?.dns_name.as_deref()?;
        if raw.trim().is_empty() {
            return None;
        }
        DomainName::parse(raw).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(json: &str) -> Notification {
        Notification::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn update_uses_postchange() {
        let n = notification(
            r#"{"event": "updated", "model": "ipaddress", "timestamp": "2024-03-01T12:00:00.123456+00:00",
                "snapshots": {"prechange": {"address": "10.0.0.9/24", "dns_name": "old.example.com"},
                              "postchange": {"address": "10.0.0.5/24", "dns_name": "host.example.com"}}}"#,
        );
        assert_eq!(n.timestamp().unwrap().timestamp(), 1709294400);

        let event = n.to_event().unwrap();
        assert_eq!(event.address.to_string(), "10.0.0.5");
        assert_eq!(event.dns_name.unwrap().as_str(), "host.example.com");
    }

    #[test]
    fn space_separated_timestamp_parses() {
        let n = notification(
            r#"{"model": "ipaddress", "timestamp": "2024-03-01 12:00:00.5+00:00",
                "snapshots": {"postchange": {"address": "10.0.0.5/24"}}}"#,
        );
        assert!(n.timestamp().is_some());

        let n = notification(
            r#"{"model": "ipaddress", "timestamp": "yesterday",
                "snapshots": {"postchange": {"address": "10.0.0.5/24"}}}"#,
        );
        assert!(n.timestamp().is_none());
    }

    #[test]
    fn deletion_clears_the_prechange_address() {
        let n = notification(
            r#"{"event": "deleted", "model": "ipaddress",
                "snapshots": {"prechange": {"address": "2001:db8::7/64", "dns_name": "gone.example.com"},
                              "postchange": null}}"#,
        );

        let event = n.to_event().unwrap();
        assert_eq!(event.address.to_string(), "2001:db8::7");
        assert!(event.dns_name.is_none());
        assert_eq!(n.former_name().unwrap().as_str(), "gone.example.com");
    }

    #[test]
    fn former_name_only_for_deletions() {
        let n = notification(
            r#"{"model": "ipaddress",
                "snapshots": {"prechange": {"address": "10.0.0.9/24", "dns_name": "old.example.com"},
                              "postchange": {"address": "10.0.0.5/24", "dns_name": "host.example.com"}}}"#,
        );
        assert!(n.former_name().is_none());

        let n = notification(
            r#"{"model": "ipaddress",
                "snapshots": {"prechange": {"address": "10.0.0.9/24", "dns_name": ""}, "postchange": null}}"#,
        );
        assert!(n.former_name().is_none());
    }

    #[test]
    fn null_or_missing_dns_name_means_no_name() {
        let n = notification(
            r#"{"model": "ipaddress", "snapshots": {"postchange": {"address": "10.0.0.5/32", "dns_name": null}}}"#,
        );
        assert!(n.to_event().unwrap().dns_name.is_none());

        let n = notification(
            r#"{"model": "ipaddress", "snapshots": {"postchange": {"address": "10.0.0.5/32"}}}"#,
        );
        assert!(n.to_event().unwrap().dns_name.is_none());
    }

    #[test]
    fn other_models_are_refused() {
        let n = notification(r#"{"model": "prefix", "snapshots": {"postchange": {"address": "10.0.0.0/24"}}}"#);
        assert!(matches!(n.to_event(), Err(WebhookError::WrongModel)));
    }

    #[test]
    fn missing_address_is_an_invalid_event() {
        let n = notification(r#"{"model": "ipaddress", "snapshots": {"postchange": {"dns_name": "host.example.com"}}}"#);
        assert!(matches!(n.to_event(), Err(WebhookError::InvalidEvent(_))));

        let n = notification(r#"{"model": "ipaddress", "snapshots": {"prechange": null, "postchange": null}}"#);
        assert!(matches!(n.to_event(), Err(WebhookError::BadRequest(_))));
    }
}
