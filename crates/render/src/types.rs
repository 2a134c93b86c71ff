//! API types for Render.

use serde::{Deserialize, Serialize};

/// A Render service (subset of fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub service_details: ServiceDetails,
}

impl Service {
    /// Public URL, if Render has assigned one.
    pub fn url(&self) -> Option<&str> {
        self.service_details
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
    }
}

/// Type-specific service details. Only the public URL is read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub publish_path: Option<String>,
}

/// Body of `POST /services` for a static site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaticSite {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub owner_id: String,
    pub repo: String,
    pub branch: String,
    /// Render encodes booleans here as `"yes"` / `"no"`.
    pub auto_deploy: &'static str,
    pub service_details: StaticSiteDetails,
}

impl NewStaticSite {
    pub fn new(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        details: StaticSiteDetails,
    ) -> Self {
        Self {
            kind: "static_site",
            name: name.into(),
            owner_id: owner_id.into(),
            repo: repo.into(),
            branch: branch.into(),
            auto_deploy: "yes",
            service_details: details,
        }
    }
}

/// Build settings of a static site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticSiteDetails {
    pub build_command: String,
    pub publish_path: String,
    pub pull_request_previews_enabled: &'static str,
}

/// A deploy of a service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

/// Element of the `GET /services` listing (internal).
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceListItem {
    pub service: Service,
    #[serde(default)]
    #[allow(dead_code)]
    pub cursor: Option<String>,
}

/// `POST /services` answers either with the service or with a
/// `{ "service": ..., "deployId": ... }` wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreatedService {
    Wrapped { service: Service },
    Bare(Service),
}

impl CreatedService {
    pub fn into_service(self) -> Service {
        match self {
            CreatedService::Wrapped { service } | CreatedService::Bare(service) => service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_reads_url_from_details() {
        let json = r#"{
            "id": "srv-1",
            "name": "app-42-my-shop",
            "type": "static_site",
            "ownerId": "own-1",
            "branch": "app-janedoe-my-shop-20-42",
            "serviceDetails": {"url": "https://app-42-my-shop.onrender.com", "publishPath": "dist"}
        }"#;
        let svc: Service = serde_json::from_str(json).unwrap();
        assert_eq!(svc.kind, "static_site");
        assert_eq!(svc.url(), Some("https://app-42-my-shop.onrender.com"));
        assert_eq!(svc.service_details.publish_path.as_deref(), Some("dist"));
    }

    #[test]
    fn service_without_details_has_no_url() {
        let svc: Service = serde_json::from_str(r#"{"id":"srv-1","name":"n"}"#).unwrap();
        assert_eq!(svc.url(), None);

        let svc: Service =
            serde_json::from_str(r#"{"id":"srv-1","name":"n","serviceDetails":{"url":""}}"#)
                .unwrap();
        assert_eq!(svc.url(), None);
    }

    #[test]
    fn new_static_site_wire_format() {
        let site = NewStaticSite::new(
            "app-42-my-shop",
            "own-1",
            "https://github.com/acme/apps",
            "app-jane-my-shop-42",
            StaticSiteDetails {
                build_command: "npm install && npm run build".into(),
                publish_path: "dist".into(),
                pull_request_previews_enabled: "no",
            },
        );
        let json = serde_json::to_value(&site).unwrap();
        assert_eq!(json["type"], "static_site");
        assert_eq!(json["ownerId"], "own-1");
        assert_eq!(json["autoDeploy"], "yes");
        assert_eq!(json["serviceDetails"]["publishPath"], "dist");
        assert_eq!(json["serviceDetails"]["pullRequestPreviewsEnabled"], "no");
    }

    #[test]
    fn created_service_accepts_both_shapes() {
        let wrapped = r#"{"service":{"id":"srv-1","name":"a"},"deployId":"dep-1"}"#;
        let bare = r#"{"id":"srv-2","name":"b"}"#;

        let svc = serde_json::from_str::<CreatedService>(wrapped)
            .unwrap()
            .into_service();
        assert_eq!(svc.id, "srv-1");

        let svc = serde_json::from_str::<CreatedService>(bare)
            .unwrap()
            .into_service();
        assert_eq!(svc.id, "srv-2");
    }
}
