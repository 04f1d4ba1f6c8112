//! Typed builders for settings derived from other settings.

use crate::{Namespace, OverlayError, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity service port used by keystone endpoints.
pub const KEYSTONE_PORT: u16 = 5000;
/// Identity API version path.
pub const KEYSTONE_PATH: &str = "/v3";

/// Build a service endpoint URL from explicit parts.
pub fn endpoint_url(scheme: &str, host: &str, port: u16, path: &str) -> String {
    format!("{scheme}://{host}:{port}{path}")
}

/// Keystone v3 endpoint for a controller host.
pub fn keystone_url(host: &str) -> String {
    endpoint_url("http", host, KEYSTONE_PORT, KEYSTONE_PATH)
}

/// Parts of a SQLAlchemy-style database connection string.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseUrl<'a> {
    pub driver: &'a str,
    pub user: &'a str,
    pub password: &'a str,
    pub host: &'a str,
    pub database: &'a str,
}

/// Build a database connection string. The result carries the password.
pub fn database_url(parts: &DatabaseUrl<'_>) -> String {
    format!(
        "{}://{}:{}@{}/{}",
        parts.driver, parts.user, parts.password, parts.host, parts.database
    )
}

/// Join path segments onto a base and normalize the result lexically.
///
/// An absolute segment restarts the path. `.` components are dropped and
/// `..` pops the previous component; `..` never climbs above the root of an
/// absolute path. The filesystem is not consulted.
pub fn join_path<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
    let mut joined = base.to_string();
    for segment in segments {
        let segment = segment.as_ref();
        if segment.starts_with('/') || joined.is_empty() {
            joined = segment.to_string();
        } else {
            if !joined.ends_with('/') {
                joined.push('/');
            }
            joined.push_str(segment);
        }
    }
    normalize(&joined)
}

fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            component => parts.push(component),
        }
    }
    let body = parts.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

/// A derived setting, resolved against settings applied earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// Service URL built from a host setting.
    Endpoint {
        #[serde(default = "default_scheme")]
        scheme: String,
        host_key: String,
        port: u16,
        #[serde(default)]
        path: String,
    },
    /// Database connection string built from host and password settings.
    Database {
        driver: String,
        user: String,
        password_key: String,
        host_key: String,
        database: String,
    },
    /// Single path joined onto a base path setting.
    Path {
        base_key: String,
        segments: Vec<String>,
    },
    /// List of paths joined onto a base path setting.
    PathList {
        base_key: String,
        entries: Vec<Vec<String>>,
    },
}

fn default_scheme() -> String {
    "http".to_string()
}

impl Derivation {
    /// Keystone endpoint derived from the given host setting.
    pub fn keystone(host_key: impl Into<String>) -> Self {
        Self::Endpoint {
            scheme: default_scheme(),
            host_key: host_key.into(),
            port: KEYSTONE_PORT,
            path: KEYSTONE_PATH.to_string(),
        }
    }

    /// Settings that must be resolved before this derivation runs.
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Self::Endpoint { host_key, .. } => vec![host_key.as_str()],
            Self::Database {
                password_key,
                host_key,
                ..
            } => vec![host_key.as_str(), password_key.as_str()],
            Self::Path { base_key, .. } | Self::PathList { base_key, .. } => {
                vec![base_key.as_str()]
            }
        }
    }

    /// Whether the derived value carries credentials.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Database { .. })
    }

    /// Compute the derived value from the current namespace.
    ///
    /// `required_by` names the operation in `MissingKey` errors.
    pub(crate) fn resolve(
        &self,
        namespace: &Namespace,
        required_by: &str,
    ) -> Result<Value, OverlayError> {
        let value = match self {
            Self::Endpoint {
                scheme,
                host_key,
                port,
                path,
            } => {
                let host = lookup_str(namespace, host_key, required_by)?;
                Value::String(endpoint_url(scheme, host, *port, path))
            }
            Self::Database {
                driver,
                user,
                password_key,
                host_key,
                database,
            } => {
                let host = lookup_str(namespace, host_key, required_by)?;
                let password = lookup_str(namespace, password_key, required_by)?;
                Value::String(database_url(&DatabaseUrl {
                    driver,
                    user,
                    password,
                    host,
                    database,
                }))
            }
            Self::Path { base_key, segments } => {
                let base = lookup_str(namespace, base_key, required_by)?;
                Value::String(join_path(base, segments.as_slice()))
            }
            Self::PathList { base_key, entries } => {
                let base = lookup_str(namespace, base_key, required_by)?;
                Value::Array(
                    entries
                        .iter()
                        .map(|segments| Value::String(join_path(base, segments.as_slice())))
                        .collect(),
                )
            }
        };
        Ok(value)
    }
}

fn lookup_str<'a>(
    namespace: &'a Namespace,
    key: &str,
    required_by: &str,
) -> Result<&'a str, OverlayError> {
    let value = namespace
        .get(key)
        .ok_or_else(|| OverlayError::missing(key, required_by))?;
    value
        .as_str()
        .ok_or_else(|| OverlayError::type_kind(key, ValueKind::String, ValueKind::of(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn keystone_url_for_host() {
        assert_eq!(keystone_url("10.0.0.1"), "http://10.0.0.1:5000/v3");
    }

    #[test]
    fn database_url_formats_parts() {
        let url = database_url(&DatabaseUrl {
            driver: "mysql+pymysql",
            user: "root",
            password: "pw",
            host: "172.16.0.5",
            database: "animbus",
        });
        assert_eq!(url, "mysql+pymysql://root:pw@172.16.0.5/animbus");
    }

    #[test]
    fn join_path_normalizes_parent_components() {
        let base = "/srv/horizon/openstack_dashboard";
        assert_eq!(
            join_path(base, &["..", "horizon/locale"]),
            "/srv/horizon/horizon/locale"
        );
        assert_eq!(join_path(base, &["locale"]), "/srv/horizon/openstack_dashboard/locale");
        assert_eq!(
            join_path(base, &["./themes/", "contrib"]),
            "/srv/horizon/openstack_dashboard/themes/contrib"
        );
        assert_eq!(join_path("/", &["..", ".."]), "/");
        assert_eq!(join_path(base, &["/etc", "horizon"]), "/etc/horizon");
        assert_eq!(join_path("a", &["..", ".."]), "..");
    }

    #[test]
    fn derivation_reads_earlier_settings() {
        let mut namespace = Namespace::new();
        namespace.insert("OPENSTACK_HOST", json!("10.0.0.1"));

        let value = Derivation::keystone("OPENSTACK_HOST")
            .resolve(&namespace, "OPENSTACK_KEYSTONE_URL")
            .expect("derive");

        assert_eq!(value, json!("http://10.0.0.1:5000/v3"));
    }

    #[test]
    fn derivation_reports_missing_dependency() {
        let namespace = Namespace::new();
        let err = Derivation::keystone("OPENSTACK_HOST")
            .resolve(&namespace, "OPENSTACK_KEYSTONE_URL")
            .unwrap_err();
        assert!(matches!(
            err,
            OverlayError::MissingKey { ref key, ref required_by }
                if key == "OPENSTACK_HOST" && required_by == "OPENSTACK_KEYSTONE_URL"
        ));
    }

    #[test]
    fn derivation_rejects_non_string_dependency() {
        let mut namespace = Namespace::new();
        namespace.insert("ROOT_PATH", json!(["not", "a", "path"]));
        let err = Derivation::Path {
            base_key: "ROOT_PATH".to_string(),
            segments: vec!["locale".to_string()],
        }
        .resolve(&namespace, "LOCALE_PATH")
        .unwrap_err();
        assert!(matches!(
            err,
            OverlayError::TypeKind {
                expected: ValueKind::String,
                found: ValueKind::Sequence,
                ..
            }
        ));
    }

    #[test]
    fn derivation_decodes_from_tagged_json() {
        let derivation: Derivation = serde_json::from_value(json!({
            "kind": "endpoint",
            "host_key": "OPENSTACK_HOST",
            "port": 5000,
            "path": "/v3",
        }))
        .expect("decode");
        assert_eq!(derivation, Derivation::keystone("OPENSTACK_HOST"));
        assert_eq!(derivation.dependencies(), vec!["OPENSTACK_HOST"]);
    }
}
