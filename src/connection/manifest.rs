//! App manifest: what the app says it needs before we connect.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use super::error::ManifestError;
use super::permissions::Permissions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub repository_url: Option<String>,
    pub permissions: Vec<String>,
    pub optional_permissions: Vec<String>,
}

impl Manifest {
    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Used when the manifest cannot be fetched or parsed.
    pub fn fallback() -> Self {
        Self {
            permissions: vec!["user-tracking".into(), "user-interaction".into()],
            ..Self::default()
        }
    }

    /// Declared permissions plus `EXECUTION`.
    pub fn required_permissions(&self) -> Permissions {
        Permissions::from_names(&self.permissions) | Permissions::EXECUTION
    }

    /// Declared optional permissions not already required.
    pub fn optional_permissions(&self) -> Permissions {
        Permissions::from_names(&self.optional_permissions) - self.required_permissions()
    }
}

/// `ws://host/app` → `http://host/app/manifest.json`.
pub fn manifest_url(app_url: &Url) -> Result<Url, ManifestError> {
    let invalid = |reason| ManifestError::Url {
        url: app_url.to_string(),
        reason,
    };
    let scheme = match app_url.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        _ => return Err(invalid("unsupported scheme")),
    };

    let mut base = app_url.clone();
    base.set_scheme(scheme)
        .map_err(|()| invalid("scheme cannot be changed"))?;
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("manifest.json")
        .map_err(|_| invalid("cannot join manifest.json"))
}

/// Scheme, authority and path of the app URL. Permission decisions are keyed
/// on this.
pub fn permission_origin(app_url: &Url) -> String {
    app_url[..Position::AfterPath].to_string()
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Fetches the raw manifest text.
pub trait ManifestLoader: Send + Sync {
    fn load(&self, url: Url) -> BoxFuture<'static, Result<String, ManifestError>>;
}

/// Serves a fixed manifest, or fails every request.
#[derive(Debug, Clone, Default)]
pub struct StaticManifestLoader {
    body: Option<String>,
}

impl StaticManifestLoader {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ManifestError> {
        Ok(Self::new(serde_json::to_string(manifest)?))
    }

    pub fn failing() -> Self {
        Self { body: None }
    }
}

impl ManifestLoader for StaticManifestLoader {
    fn load(&self, url: Url) -> BoxFuture<'static, Result<String, ManifestError>> {
        let body = self.body.clone();
        Box::pin(async move { body.ok_or_else(|| ManifestError::Fetch(format!("{url} unavailable"))) })
    }
}

#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpManifestLoader {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpManifestLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
impl ManifestLoader for HttpManifestLoader {
    fn load(&self, url: Url) -> BoxFuture<'static, Result<String, ManifestError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| ManifestError::Fetch(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ManifestError::Status(status.as_u16()));
            }
            response
                .text()
                .await
                .map_err(|e| ManifestError::Fetch(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("url")
    }

    #[test]
    fn manifest_url_maps_scheme_and_path() {
        assert_eq!(
            manifest_url(&url("ws://host/app")).expect("ok").as_str(),
            "http://host/app/manifest.json"
        );
        assert_eq!(
            manifest_url(&url("wss://host:8443/a/b/?x=1#f")).expect("ok").as_str(),
            "https://host:8443/a/b/manifest.json"
        );
        assert!(manifest_url(&url("ftp://host/app")).is_err());
    }

    #[test]
    fn origin_drops_query_and_fragment() {
        assert_eq!(
            permission_origin(&url("ws://host:3901/app?session=1#x")),
            "ws://host:3901/app"
        );
    }

    #[test]
    fn manifest_permissions() {
        let m = Manifest::parse(
            r#"{"name":"demo","permissions":["user-interaction"],"optionalPermissions":["user-tracking","user-interaction"]}"#,
        )
        .expect("parse");
        assert_eq!(m.name.as_deref(), Some("demo"));
        assert_eq!(
            m.required_permissions(),
            Permissions::EXECUTION | Permissions::USER_INTERACTION
        );
        assert_eq!(m.optional_permissions(), Permissions::USER_TRACKING);
    }

    #[test]
    fn fallback_requires_tracking_and_interaction() {
        assert_eq!(Manifest::fallback().required_permissions(), Permissions::all());
    }

    #[test]
    fn static_loader() {
        let ok = StaticManifestLoader::new("{}");
        let body = tokio_test::block_on(ok.load(url("http://h/manifest.json"))).expect("body");
        assert_eq!(body, "{}");
        let failing = StaticManifestLoader::failing();
        assert!(tokio_test::block_on(failing.load(url("http://h/manifest.json"))).is_err());
    }
}
