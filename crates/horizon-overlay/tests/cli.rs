//! End-to-end tests for the command-line merge.

use clap::Parser;
use horizon_overlay::cli::{ADMIN_TOKEN_ENV, Cli, DB_PASSWORD_ENV, SERVICE_PASSWORD_ENV, run};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const BASE: &str = r#"{
    ROOT_PATH: "/srv/horizon/openstack_dashboard",
    MIDDLEWARE_CLASSES: ["horizon.middleware.HorizonMiddleware"],
    INSTALLED_APPS: ["openstack_dashboard", "horizon"],
    REST_API_REQUIRED_SETTINGS: [],
    POLICY_FILES: { identity: "keystone_policy.json" },
    OPENSTACK_HYPERVISOR_FEATURES: { can_set_password: false },
    SECURITY_GROUP_RULES: { all_tcp: {}, ssh: {} },
}"#;

fn credentials(name: &str) -> Option<String> {
    match name {
        DB_PASSWORD_ENV => Some("db-secret".to_string()),
        ADMIN_TOKEN_ENV => Some("admin-token".to_string()),
        SERVICE_PASSWORD_ENV => Some("svc-secret".to_string()),
        _ => None,
    }
}

fn run_to_string(args: &[&str], cwd: &Path) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    let mut out = Vec::new();
    run(cli, cwd, &mut out, credentials)?;
    Ok(String::from_utf8(out)?)
}

/// Rendering applies contrib and explicit overlays and hides secrets.
#[test]
fn render_outputs_redacted_settings() {
    let temp = tempdir().expect("tempdir");
    let base = temp.path().join("base.json5");
    fs::write(&base, BASE).expect("base");
    let overlay = temp.path().join("site.json5");
    fs::write(
        &overlay,
        r#"{ operations: [{ op: "set", key: "SITE_BRANDING", value: "Site Cloud" }] }"#,
    )
    .expect("overlay");

    let output = run_to_string(
        &[
            "horizon-overlay",
            "render",
            "--base",
            base.to_str().expect("utf8"),
            "--overlay",
            overlay.to_str().expect("utf8"),
            "--contrib-host",
            "10.0.0.1",
            "--no-layers",
        ],
        temp.path(),
    )
    .expect("render");

    let rendered: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(rendered["SITE_BRANDING"], "Site Cloud");
    assert_eq!(rendered["OPENSTACK_KEYSTONE_URL"], "http://10.0.0.1:5000/v3");
    assert_eq!(rendered["CONNECTION"], "[REDACTED]");
    assert_eq!(rendered["ADMIN_TOKEN"], "[REDACTED]");
    assert!(!output.contains("db-secret"));
    assert!(!output.contains("svc-secret"));
}

/// Derived endpoints follow a host locked by the requirements file.
#[test]
fn locked_host_feeds_contrib_derivations() {
    let temp = tempdir().expect("tempdir");
    let base = temp.path().join("base.json5");
    fs::write(&base, BASE).expect("base");
    let requirements = temp.path().join("requirements.json5");
    fs::write(
        &requirements,
        r#"{ OPENSTACK_HOST: "10.9.9.9", ROOT_PATH: "/opt/horizon/openstack_dashboard" }"#,
    )
    .expect("requirements");

    let output = run_to_string(
        &[
            "horizon-overlay",
            "render",
            "--base",
            base.to_str().expect("utf8"),
            "--requirements",
            requirements.to_str().expect("utf8"),
            "--contrib-host",
            "10.0.0.1",
            "--no-layers",
        ],
        temp.path(),
    )
    .expect("render");

    let rendered: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(rendered["OPENSTACK_HOST"], "10.9.9.9");
    assert_eq!(rendered["OPENSTACK_KEYSTONE_URL"], "http://10.9.9.9:5000/v3");
    assert!(
        rendered["LOCALE_PATHS"]
            .as_array()
            .expect("locale paths")
            .iter()
            .all(|path| path.as_str().is_some_and(|path| path.starts_with("/opt/horizon/")))
    );
    assert!(!output.contains("10.0.0.1"));
}

/// Check prints a summary line.
#[test]
fn check_reports_counts() {
    let temp = tempdir().expect("tempdir");
    let base = temp.path().join("base.json5");
    fs::write(&base, BASE).expect("base");
    let requirements = temp.path().join("requirements.json5");
    fs::write(&requirements, r#"{ TIME_ZONE: "UTC" }"#).expect("requirements");
    let overlay = temp.path().join("site.json5");
    fs::write(
        &overlay,
        r#"{ operations: [
            { op: "set", key: "TIME_ZONE", value: "Europe/Berlin" },
            { op: "append", key: "INSTALLED_APPS", value: "site_app" },
        ] }"#,
    )
    .expect("overlay");

    let output = run_to_string(
        &[
            "horizon-overlay",
            "check",
            "--base",
            base.to_str().expect("utf8"),
            "--requirements",
            requirements.to_str().expect("utf8"),
            "--overlay",
            overlay.to_str().expect("utf8"),
            "--no-layers",
        ],
        temp.path(),
    )
    .expect("check");

    assert_eq!(
        output.trim(),
        "ok: 8 settings, 2 layers, 1 operations applied, 1 skipped"
    );
}

/// The contrib overlay refuses to run without credentials.
#[test]
fn contrib_requires_credentials() {
    let temp = tempdir().expect("tempdir");
    let base = temp.path().join("base.json5");
    fs::write(&base, BASE).expect("base");
    let cli = Cli::try_parse_from([
        "horizon-overlay",
        "check",
        "--base",
        base.to_str().expect("utf8"),
        "--contrib-host",
        "10.0.0.1",
        "--no-layers",
    ])
    .expect("parse");

    let mut out = Vec::new();
    let err = run(cli, temp.path(), &mut out, |_| None).unwrap_err();
    assert!(err.to_string().contains(DB_PASSWORD_ENV));
}

/// A missing base file surfaces with context.
#[test]
fn missing_base_fails_with_context() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("missing.json5");
    let err = run_to_string(
        &[
            "horizon-overlay",
            "render",
            "--base",
            missing.to_str().expect("utf8"),
            "--no-layers",
        ],
        temp.path(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("failed to load base namespace"));
}
