//! Demo Scenario Tests
//!
//! Runs the scenarios behind `quadrpc demo` with tokio's paused clock, so
//! the one-second pacing and the two-second deadline cost no wall time.

use std::time::Duration;

use quadrpc_cli::demo::{run_scenarios, DemoConfig, NAMES};

#[tokio::test(start_paused = true)]
async fn test_all_scenarios_pass() {
    let reports = run_scenarios(DemoConfig::default()).await;
    assert_eq!(reports.len(), 5);
    for report in &reports {
        assert!(report.passed, "{}: {}", report.name, report.observed);
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_scenario_cuts_the_exchange_short() {
    let reports = run_scenarios(DemoConfig::default()).await;
    let bidi = reports.last().unwrap();
    assert!(bidi.observed.starts_with("2 of 5 replies"), "{}", bidi.observed);
    assert!(bidi.observed.contains("DEADLINE_EXCEEDED"), "{}", bidi.observed);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_scenario_fails_when_deadline_is_generous() {
    let config = DemoConfig {
        pacing: Duration::from_millis(10),
        deadline: Duration::from_secs(60),
    };
    let reports = run_scenarios(config).await;
    let bidi = reports.last().unwrap();
    assert!(!bidi.passed);
    assert!(bidi
        .observed
        .starts_with(&format!("{} of {} replies", NAMES.len(), NAMES.len())));
}
