use prometheus::Registry;

use super::*;

#[test]
fn test_register_custom_metrics_exposes_all_counters() {
    let registry = Registry::new();
    register_custom_metrics(&registry).expect("collectors can be registered");

    WATCH_REMOVALS.with_label_values(&["local", "ok"]).inc();

    let names: Vec<String> = registry.gather().iter().map(|mf| mf.get_name().to_string()).collect();
    assert!(names.contains(&"watch_removals_total".to_string()));
}

#[test]
fn test_register_custom_metrics_twice_fails() {
    let registry = Registry::new();
    register_custom_metrics(&registry).unwrap();
    assert!(register_custom_metrics(&registry).is_err());
}
