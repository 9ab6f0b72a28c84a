// tests/rules_config.rs
use feed_sla_monitor::config::{load_rules_default, load_rules_from};
use feed_sla_monitor::sla::CadenceKind;
use feed_sla_monitor::SlaError;
use std::{env, fs};

const RULES_TOML: &str = r#"
[sources.inventory]
cadence = "daily"
anchor_hour = 6
anchor_minute = 30
late_threshold_minutes = 30
critical_threshold_minutes = 180

[sources.clicks]
cadence = "hourly"
expected_within_minutes = 10
late_threshold_minutes = 20
critical_threshold_minutes = 90
required = false
"#;

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("sla_rules.toml");
    fs::write(&p_toml, RULES_TOML).unwrap();
    let reg = load_rules_from(&p_toml).unwrap();
    let names: Vec<_> = reg.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["clicks", "inventory"]);
    assert_eq!(
        reg.get("clicks").unwrap().rule.cadence().kind(),
        CadenceKind::Hourly
    );
    assert!(!reg.get("clicks").unwrap().rule.required());

    let p_json = dir.path().join("sla_rules.json");
    fs::write(
        &p_json,
        r#"{"sources":{"refunds":{"cadence":"weekly","anchor_weekday":4,"anchor_hour":17,
            "late_threshold_minutes":120,"critical_threshold_minutes":720}}}"#,
    )
    .unwrap();
    let reg = load_rules_from(&p_json).unwrap();
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.get("refunds").unwrap().prefix, "staging/refunds/");
}

#[test]
fn invariant_violations_are_configuration_errors() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bad.toml");
    fs::write(
        &p,
        r#"
[sources.orders]
cadence = "daily"
anchor_hour = 9
late_threshold_minutes = 240
critical_threshold_minutes = 60
"#,
    )
    .unwrap();
    let err = load_rules_from(&p).unwrap_err();
    assert!(matches!(err, SlaError::ConfigurationInvalid(_)));
    assert!(err.to_string().contains("orders"), "{err}");

    fs::write(
        &p,
        r#"
[sources.products]
cadence = "weekly"
anchor_weekday = 7
anchor_hour = 10
late_threshold_minutes = 1
critical_threshold_minutes = 2
"#,
    )
    .unwrap();
    assert!(load_rules_from(&p).is_err());

    fs::write(&p, r#"[sources.x]
cadence = "monthly"
late_threshold_minutes = 1
critical_threshold_minutes = 2
"#)
    .unwrap();
    assert!(load_rules_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var("SLA_RULES_PATH");

    // 1) Nothing on disk → built-in registry
    let v = load_rules_default().unwrap();
    assert_eq!(v.len(), 3);
    assert!(v.get("orders").is_some());

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("sla_rules.toml"), RULES_TOML).unwrap();
    let vt = load_rules_default().unwrap();
    assert!(vt.get("inventory").is_some());
    assert!(vt.get("orders").is_none());

    // 3) ENV wins
    let p_env = tmp.path().join("other.json");
    fs::write(
        &p_env,
        r#"{"sources":{"x":{"cadence":"hourly","expected_within_minutes":0,
            "late_threshold_minutes":5,"critical_threshold_minutes":10}}}"#,
    )
    .unwrap();
    env::set_var("SLA_RULES_PATH", p_env.display().to_string());
    let ve = load_rules_default().unwrap();
    assert_eq!(ve.len(), 1);
    assert!(ve.get("x").is_some());

    // 4) ENV pointing nowhere is fatal, not a silent fallback
    env::set_var("SLA_RULES_PATH", tmp.path().join("nope.toml").display().to_string());
    assert!(matches!(
        load_rules_default(),
        Err(SlaError::ConfigurationInvalid(_))
    ));
    env::remove_var("SLA_RULES_PATH");

    env::set_current_dir(&old).unwrap();
}
