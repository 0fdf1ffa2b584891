//! Unit tests for agent launch configuration.
//!
//! These tests mutate the process-global `TC` variable and must run serially.

use tc_warden::agent::spawner::{LaunchConfig, AGENT_ENV_VAR, DEFAULT_AGENT, DEFAULT_LAUNCHER};

#[test]
#[serial_test::serial]
fn agent_defaults_when_env_unset() {
    std::env::remove_var(AGENT_ENV_VAR);

    let config = LaunchConfig::from_env();

    assert_eq!(config.launcher, DEFAULT_LAUNCHER);
    assert_eq!(config.agent, DEFAULT_AGENT);
    assert_eq!(config.agent, "eltrafico-tc");
}

#[test]
#[serial_test::serial]
fn agent_taken_from_env() {
    std::env::set_var(AGENT_ENV_VAR, "/opt/tc/agent");

    let config = LaunchConfig::from_env();

    assert_eq!(config.launcher, "pkexec");
    assert_eq!(config.agent, "/opt/tc/agent");

    std::env::remove_var(AGENT_ENV_VAR);
}

#[test]
#[serial_test::serial]
fn blank_env_value_falls_back_to_default() {
    std::env::set_var(AGENT_ENV_VAR, "   ");

    assert_eq!(LaunchConfig::default().agent, DEFAULT_AGENT);

    std::env::remove_var(AGENT_ENV_VAR);
}
