//! The contrib dashboard overlay: branding, locale, feature flags, and the
//! contrib middleware/backend/app registrations for the Animbus console.

use crate::{Derivation, Overlay};
use serde_json::json;
use std::fmt;

/// Middleware appended to `MIDDLEWARE_CLASSES`.
pub const CONTRIB_MIDDLEWARE: &str =
    "openstack_dashboard.contrib.custom.middleware.ContribMiddleware";
/// Authentication backend that records admin login statistics.
pub const CONTRIB_AUTH_BACKEND: &str =
    "openstack_dashboard.contrib.custom.animbus_backend.AnimbusKeystoneBackend";
/// Django app registered in `INSTALLED_APPS`.
pub const CONTRIB_APP: &str = "openstack_dashboard.contrib.custom";

/// Setting holding the controller host that endpoints are derived from.
pub const HOST_KEY: &str = "OPENSTACK_HOST";
/// Setting holding the dashboard database password.
pub const DB_PASSWORD_KEY: &str = "CONTRIB_DB_PASSWORD";

/// Deployment-specific inputs to the contrib overlay.
#[derive(Clone)]
pub struct ContribSettings {
    /// Controller address hosting keystone and the dashboard database.
    pub controller_host: String,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    /// Keystone admin token.
    pub admin_token: String,
    /// Password of the `horizon` service user.
    pub service_user_password: String,
}

impl ContribSettings {
    /// Settings with the stock database user and name.
    pub fn new(
        controller_host: impl Into<String>,
        db_password: impl Into<String>,
        admin_token: impl Into<String>,
        service_user_password: impl Into<String>,
    ) -> Self {
        Self {
            controller_host: controller_host.into(),
            db_user: "root".to_string(),
            db_password: db_password.into(),
            db_name: "animbus".to_string(),
            admin_token: admin_token.into(),
            service_user_password: service_user_password.into(),
        }
    }
}

impl fmt::Debug for ContribSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContribSettings")
            .field("controller_host", &self.controller_host)
            .field("db_user", &self.db_user)
            .field("db_name", &self.db_name)
            .finish_non_exhaustive()
    }
}

/// Build the contrib overlay for a deployment.
///
/// Expects the base namespace to provide `ROOT_PATH`, `MIDDLEWARE_CLASSES`,
/// `INSTALLED_APPS`, `REST_API_REQUIRED_SETTINGS`, `POLICY_FILES`, and
/// `OPENSTACK_HYPERVISOR_FEATURES`.
pub fn contrib_overlay(settings: &ContribSettings) -> Overlay {
    Overlay::new()
        .chain(presentation())
        .chain(identity(settings))
        .chain(framework())
        .chain(storage(settings))
        .chain(access_control(settings))
}

/// Branding, themes, locale, and panel feature flags.
fn presentation() -> Overlay {
    Overlay::new()
        .set(
            "ANGULAR_FEATURES",
            json!({
                "images_panel": true,
                "flavors_panel": true,
                "users_panel": true,
            }),
        )
        .set("SITE_BRANDING", "Animbus Cloud Management Platform")
        .set(
            "AVAILABLE_THEMES",
            json!([
                ["default", "Default", "themes/default"],
                ["material", "Material", "themes/material"],
                ["contrib", "Contrib", "themes/contrib"],
            ]),
        )
        .set("DEFAULT_THEME", "contrib")
        .set(
            "LANGUAGES",
            json!([["en", "English"], ["zh-cn", "Simplified Chinese"]]),
        )
        .set("LANGUAGE_CODE", "zh-cn")
        .set("TIME_ZONE", "Asia/Shanghai")
        .set("SESSION_TIMEOUT", 86400)
        .set(
            "OPENSTACK_IMAGE_BACKEND",
            json!({
                "image_formats": [
                    ["", "Select Image Format"],
                    ["raw", "Raw"],
                    ["qcow2", "QCOW2 - QEMU Emulator"],
                    ["iso", "ISO - Optical Disk Image"],
                    ["aki", "AKI - Amazon Kernel Image"],
                    ["ari", "ARI - Amazon Ramdisk Image"],
                ]
            }),
        )
}

/// Keystone v3 endpoint and identity behavior.
fn identity(settings: &ContribSettings) -> Overlay {
    Overlay::new()
        .set("OPENSTACK_API_VERSIONS", json!({ "identity": 3 }))
        .set(HOST_KEY, settings.controller_host.as_str())
        .derive("OPENSTACK_KEYSTONE_URL", Derivation::keystone(HOST_KEY))
        .set("OPENSTACK_ENDPOINT_TYPE", "internalURL")
        .set_entry("OPENSTACK_HYPERVISOR_FEATURES", "can_set_password", true)
        .set_entry("POLICY_FILES", "identity", "policy.v3cloudsample.json")
        .set("OPENSTACK_KEYSTONE_MULTIDOMAIN_SUPPORT", true)
}

/// Middleware, authentication backend, app registration, and locale paths.
fn framework() -> Overlay {
    Overlay::new()
        .extend("MIDDLEWARE_CLASSES", [CONTRIB_MIDDLEWARE])
        .set("AUTHENTICATION_BACKENDS", json!([CONTRIB_AUTH_BACKEND]))
        .append("INSTALLED_APPS", CONTRIB_APP)
        .derive(
            "LOCALE_PATHS",
            Derivation::PathList {
                base_key: "ROOT_PATH".to_string(),
                entries: vec![
                    vec!["..".to_string(), "horizon/locale".to_string()],
                    vec!["locale".to_string()],
                ],
            },
        )
}

/// Database connection, mail, and release metadata.
fn storage(settings: &ContribSettings) -> Overlay {
    Overlay::new()
        .set_secret(DB_PASSWORD_KEY, settings.db_password.as_str())
        .derive(
            "CONNECTION",
            Derivation::Database {
                driver: "mysql+pymysql".to_string(),
                user: settings.db_user.clone(),
                password_key: DB_PASSWORD_KEY.to_string(),
                host_key: HOST_KEY.to_string(),
                database: settings.db_name.clone(),
            },
        )
        .set("OPENSTACK_HEAT_STACK", json!({ "enable_user_pass": false }))
        .set("EMAIL_BACKEND", "django.core.mail.backends.smtp.EmailBackend")
        .set("EMAIL_USE_TLS", true)
        .derive(
            "EMAIL_DIR",
            Derivation::Path {
                base_key: "ROOT_PATH".to_string(),
                segments: vec!["themes/contrib/templates/email".to_string()],
            },
        )
        .set("DOMAIN_NAME", json!(null))
        .set(
            "RELEASE_VERSION",
            json!({ "version": "animbus-5.6.0", "os_version": "Ocata" }),
        )
        .set("DEFAULT_PANKO_API_RETURN_LIMIT", 1000)
        .set("VOLUME_SIZE_LIMIT", 1000)
}

/// Security-group rules, REST API exposure, and system accounts.
fn access_control(settings: &ContribSettings) -> Overlay {
    Overlay::new()
        .set_secret("ADMIN_TOKEN", settings.admin_token.as_str())
        .remove("SECURITY_GROUP_RULES", "all_tcp")
        .remove("SECURITY_GROUP_RULES", "all_udp")
        .remove("SECURITY_GROUP_RULES", "all_icmp")
        .extend(
            "REST_API_REQUIRED_SETTINGS",
            [
                "HYPERVISOR_VERSION",
                "HYPERVISOR",
                "NEED_WORKFLOW_ROLE",
                "OPENSTACK_CINDER_FEATURES",
                "OPENSTACK_KEYSTONE_DEFAULT_ROLE",
                "OPENSTACK_KEYSTONE_BACKEND",
                "OPENSTACK_KEYSTONE_MULTIDOMAIN_SUPPORT",
                "OPENSTACK_NEUTRON_NETWORK",
                "RELEASE_VERSION",
                "OPENSTACK_IMAGE_OS",
                "SECURITY_GROUP_RULES",
                "VOLUME_SIZE_LIMIT",
                "SYSTEM_ROLES",
            ],
        )
        .set("NEED_WORKFLOW_ROLE", "workflow")
        .set("SYSTEM_PROJECTS", json!(["service", "services"]))
        .set(
            "SYSTEM_USERS",
            json!([
                "heat_domain_admin",
                "horizon",
                "zabbix",
                "ceph_rgw",
                "ceilometer",
                "magnum_trustee_domain_admin",
            ]),
        )
        .set(
            "SYSTEM_ROLES",
            json!([
                "_member_",
                "admin",
                "domain_admin",
                "member",
                "heat_stack_owner",
                "heat_stack_user",
                "workflow",
            ]),
        )
        .set(
            "OPENSTACK_IMAGE_OS",
            json!([
                "centos", "ubuntu", "fedora", "windows", "debian", "coreos", "arch", "freebsd",
                "others",
            ]),
        )
        .set("ANIMBUS_PROJECT_NAME", "service")
        .set("ANIMBUS_USER_NAME", "horizon")
        .set_secret("ANIMBUS_USER_PASSWORD", settings.service_user_password.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_credentials() {
        let settings = ContribSettings::new("10.0.0.1", "db-pw", "token-value", "svc-pw");
        let rendered = format!("{settings:?}");
        assert!(rendered.contains("10.0.0.1"));
        assert!(!rendered.contains("db-pw"));
        assert!(!rendered.contains("token-value"));
        assert!(!rendered.contains("svc-pw"));
    }

    #[test]
    fn host_is_set_before_endpoints_are_derived() {
        let overlay = contrib_overlay(&ContribSettings::new("10.0.0.1", "pw", "tok", "svc"));
        let position = |key: &str| {
            overlay
                .operations()
                .iter()
                .position(|op| op.key() == key)
                .expect("operation present")
        };
        assert!(position(HOST_KEY) < position("OPENSTACK_KEYSTONE_URL"));
        assert!(position(HOST_KEY) < position("CONNECTION"));
        assert!(position(DB_PASSWORD_KEY) < position("CONNECTION"));
    }
}
