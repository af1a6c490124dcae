//! Fresh-install bootstrap: one process, empty working directory.
//!
//! Runs as a single test in its own binary because it repoints the process
//! working directory.

use armature_app::{AppContext, AppIdentity, BootOptions};
use serde_json::json;

#[test]
fn fresh_install_boots_and_serves_secrets() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    // SAFETY: single test in this binary; no concurrent env readers.
    unsafe { std::env::set_var("DEV_MODE", "1") };

    let identity = AppIdentity::new("testapp", "Test Application", "0.1.0", "Bootstrap test");
    let ctx = AppContext::initialise(identity, BootOptions::default()).unwrap();

    // All four directories were created (dev or container layout, both
    // rooted in the temp cwd).
    let paths = ctx.paths_record();
    assert!(paths.logging.exists());
    assert!(paths.app_data.exists());
    assert!(paths.usr_data.exists());
    assert!(paths.tmp.exists());
    assert!(paths.logging.starts_with(dir.path()));

    // The resolver exported its decisions.
    assert_eq!(
        std::env::var("dt_USR_DATA").unwrap(),
        paths.usr_data.to_string_lossy()
    );

    // Secrets round-trip and land in the index.
    ctx.set_secret("api", "k1").unwrap();
    assert_eq!(ctx.get_secret("api", None).as_deref(), Some("k1"));
    let report = ctx.secrets().local_stores_index();
    assert_eq!(report["User_Local_Store"].index, vec!["api".to_string()]);

    // The keystore file exists under the user-data root.
    assert!(paths.usr_data.join("testapp.v3keystore").exists());

    // Settings: nothing configured, defaults apply; persistent settings
    // shadow the (absent) files.
    assert_eq!(ctx.get_setting_or("app.timeout", json!(30)), json!(30));
    ctx.settings().set("app.timeout", &json!("45")).unwrap();
    assert_eq!(ctx.get_setting("app.timeout"), Some(json!("45")));

    // The running flag starts set.
    assert!(ctx.running().is_set());
}
