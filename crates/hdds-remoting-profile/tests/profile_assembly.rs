// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Remoting profile integration tests
//!
//! Boots the subsystem from configuration files and exercises profile
//! assembly through the public API.

use hdds_remoting_profile::{
    profile_service_name, step, AddState, OptionNamespace, OptionValue, PassMode,
    ProfileAssembler, ProfileConfig, ProfileError, RemotingSubsystem, ServiceRegistry,
    ServiceState, Stage, StaticUrlConfig, SubsystemConfig, Transaction, TransportDependency,
};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const SAMPLE: &str = r#"
[local-transport]
default-pass-by-value = false

[profiles.cluster]
local-receiver-pass-by-value = true

[[profiles.cluster.discovery.static-urls]]
abstract-type = "ejb"
abstract-type-authority = "node1"
attributes = { uri = "remote+http://node1:8080", weight = "10" }

[[profiles.cluster.discovery.static-urls]]
abstract-type = "ejb"
abstract-type-authority = "node2"
attributes = { uri = "remote+http://node2:8080" }

[[profiles.cluster.channel-options]]
name = "MAX_OUTBOUND_MESSAGES"
category = "remoting"
value = "1234"

[[profiles.cluster.connections]]
name = "primary"
outbound-connection-ref = "node1-connection"
connect-timeout = 3000

[[profiles.cluster.connections.channel-options]]
name = "KEEP_ALIVE"
category = "xnio"
value = "true"

[[profiles.cluster.connections]]
name = "secondary"
outbound-connection-ref = "node2-connection"

[profiles.isolated]
exclude-local-receiver = true
local-receiver-pass-by-value = true

[profiles.plain]
"#;

fn boot_sample() -> RemotingSubsystem {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(SAMPLE.as_bytes()).expect("write config");
    let config = SubsystemConfig::from_file(file.path()).expect("load config");
    RemotingSubsystem::boot(&config).expect("boot")
}

#[test]
fn test_boot_from_file() {
    init_tracing();
    let subsystem = boot_sample();

    assert_eq!(
        subsystem.assembler().profile_names(),
        vec!["cluster", "isolated", "plain"]
    );

    let cluster = subsystem.profile("cluster").expect("cluster");
    let endpoints = cluster.endpoints();
    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints[0].abstract_type_authority(), "node1");
    assert_eq!(endpoints[0].uri_str(), "remote+http://node1:8080");
    assert_eq!(endpoints[0].uri().scheme(), "remote+http");
    assert_eq!(endpoints[0].uri().host_str(), Some("node1"));
    assert_eq!(endpoints[0].uri().port(), Some(8080));
    assert_eq!(endpoints[0].attribute("weight"), Some("10"));
    assert_eq!(endpoints[0].attribute("uri"), None);
    assert_eq!(endpoints[1].abstract_type_authority(), "node2");

    assert_eq!(
        cluster
            .channel_options()
            .get(OptionNamespace::Remoting, "MAX_OUTBOUND_MESSAGES"),
        Some(&OptionValue::Int(1234))
    );

    let connections = cluster.connections();
    assert_eq!(connections.len(), 2);
    assert_eq!(connections[0].name(), "primary");
    assert_eq!(connections[0].connect_timeout(), Duration::from_millis(3000));
    assert_eq!(
        connections[0]
            .channel_options()
            .get(OptionNamespace::Xnio, "KEEP_ALIVE"),
        Some(&OptionValue::Bool(true))
    );
    assert_eq!(connections[1].name(), "secondary");
    assert_eq!(connections[1].connect_timeout(), Duration::from_millis(5000));
    assert!(connections[1].channel_options().is_empty());
}

#[test]
fn test_local_transport_policy() {
    init_tracing();
    let subsystem = boot_sample();

    let cluster = subsystem.profile("cluster").expect("cluster");
    assert_eq!(cluster.transport(), TransportDependency::ByValueProvider);
    assert_eq!(
        cluster.local_transport().map(|p| p.mode()),
        Some(PassMode::ByValue)
    );

    // Exclusion wins over an explicit pass-by-value flag
    let isolated = subsystem.profile("isolated").expect("isolated");
    assert_eq!(isolated.transport(), TransportDependency::Excluded);
    assert!(isolated.local_transport().is_none());
    let handle = subsystem
        .registry()
        .lookup(&profile_service_name("isolated"))
        .expect("handle");
    assert!(handle.dependencies().is_empty());

    // Unset flag follows the subsystem default (by reference here)
    let plain = subsystem.profile("plain").expect("plain");
    assert_eq!(plain.transport(), TransportDependency::DefaultProvider);
    assert_eq!(
        plain.local_transport().map(|p| p.mode()),
        Some(PassMode::ByReference)
    );
}

#[test]
fn test_runtime_add_after_boot() {
    init_tracing();
    let subsystem = boot_sample();
    let assembler = subsystem.assembler();

    let mut tx = Transaction::new(Arc::clone(subsystem.registry()));
    let op = assembler
        .add_profile(
            &mut tx,
            "late",
            &ProfileConfig::new()
                .pass_by_value(false)
                .static_url(StaticUrlConfig::new("http://late:9000", "ejb", "late")),
        )
        .expect("add");
    assert_eq!(op.state(), AddState::AwaitingChildSteps);
    tx.commit().expect("commit");

    assert_eq!(op.state(), AddState::Installed);
    let late = subsystem.profile("late").expect("late");
    assert_eq!(
        late.local_transport().map(|p| p.mode()),
        Some(PassMode::ByReference)
    );
    assert_eq!(
        subsystem
            .registry()
            .lookup(&profile_service_name("late"))
            .expect("handle")
            .state(),
        &ServiceState::Up
    );
}

#[test]
fn test_duplicate_name_rejected() {
    init_tracing();
    let subsystem = boot_sample();
    let before = subsystem.registry().len();

    let mut tx = Transaction::new(Arc::clone(subsystem.registry()));
    let err = subsystem
        .assembler()
        .add_profile(&mut tx, "cluster", &ProfileConfig::new())
        .expect_err("duplicate");
    assert!(matches!(err, ProfileError::DuplicateProfile(name) if name == "cluster"));
    tx.commit().expect("empty commit");

    assert_eq!(subsystem.registry().len(), before);
    assert_eq!(
        subsystem.profile("cluster").expect("cluster").endpoints().len(),
        2
    );
}

#[test]
fn test_invalid_configs_are_rejected() {
    init_tracing();
    let registry = Arc::new(ServiceRegistry::new());
    let assembler = ProfileAssembler::new(Arc::clone(&registry));

    let reject = |config: ProfileConfig| {
        let mut tx = Transaction::new(Arc::clone(&registry));
        let err = assembler
            .add_profile(&mut tx, "p", &config)
            .expect_err("invalid config");
        assert_eq!(tx.pending(), 0);
        err
    };

    let err = reject(ProfileConfig::new().static_url(StaticUrlConfig::new("not a uri", "ejb", "n")));
    assert!(matches!(err, ProfileError::MalformedEndpoint { .. }));

    let err = reject(ProfileConfig::new().channel_option("KEEP_ALIVE", "transport", "true"));
    assert!(matches!(err, ProfileError::UnknownOptionCategory(c) if c == "transport"));

    let err = reject(ProfileConfig::new().channel_option("KEEP_ALIVE", "remoting", "true"));
    assert!(matches!(err, ProfileError::UnknownOption { .. }));

    let err = reject(ProfileConfig::new().channel_option("KEEP_ALIVE", "xnio", "maybe"));
    assert!(matches!(err, ProfileError::InvalidOptionValue { .. }));

    let mut missing_type = StaticUrlConfig::new("http://a:1", "ejb", "n");
    missing_type.abstract_type = None;
    let err = reject(ProfileConfig::new().static_url(missing_type));
    assert!(matches!(
        err,
        ProfileError::MissingField { field: "abstract-type", .. }
    ));

    assert!(registry.is_empty());
}

#[test]
fn test_child_steps_never_see_parent() {
    init_tracing();
    let registry = Arc::new(ServiceRegistry::new());
    let assembler = ProfileAssembler::new(Arc::clone(&registry));
    let mut tx = Transaction::new(Arc::clone(&registry));

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    tx.add_step(
        Stage::Runtime,
        step("observe before", move |ctx| {
            sink.lock()
                .push(ctx.registry().contains(&profile_service_name("p")));
            Ok(())
        }),
    )
    .expect("add step");

    assembler
        .add_profile(&mut tx, "p", &ProfileConfig::new().exclude_local_receiver(true))
        .expect("add");

    let sink = Arc::clone(&observed);
    tx.add_step(
        Stage::Runtime,
        step("observe after", move |ctx| {
            sink.lock()
                .push(ctx.registry().contains(&profile_service_name("p")));
            Ok(())
        }),
    )
    .expect("add step");

    tx.commit().expect("commit");
    assert_eq!(*observed.lock(), vec![false, false]);
    assert!(registry.contains(&profile_service_name("p")));
}

#[test]
fn test_later_failure_rolls_back_installed_profile() {
    init_tracing();
    let registry = Arc::new(ServiceRegistry::new());
    let assembler = ProfileAssembler::new(Arc::clone(&registry));
    let mut tx = Transaction::new(Arc::clone(&registry));

    let op = assembler
        .add_profile(&mut tx, "p", &ProfileConfig::new().exclude_local_receiver(true))
        .expect("add");
    tx.add_step(
        Stage::Install,
        step("fail", |_ctx| Err(ProfileError::TransactionClosed)),
    )
    .expect("add step");

    assert!(tx.commit().is_err());
    assert_eq!(op.state(), AddState::Installed);
    assert!(!registry.contains(&profile_service_name("p")));
}

#[test]
fn test_concurrent_adds_same_name() {
    init_tracing();
    let registry = Arc::new(ServiceRegistry::new());
    let assembler = ProfileAssembler::new(Arc::clone(&registry));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let assembler = assembler.clone();
            std::thread::spawn(move || {
                let mut tx = Transaction::new(Arc::clone(assembler.registry()));
                let config = ProfileConfig::new()
                    .exclude_local_receiver(true)
                    .static_url(StaticUrlConfig::new(
                        format!("http://host{}:8080", i),
                        "ejb",
                        "n",
                    ));
                assembler
                    .add_profile(&mut tx, "shared", &config)
                    .and_then(|_| tx.commit())
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ProfileError::DuplicateProfile(_))));
    assert_eq!(registry.len(), 1);
    assert_eq!(
        assembler.lookup("shared").expect("shared").endpoints().len(),
        1
    );
}

#[test]
fn test_json_config() {
    init_tracing();
    let json = r#"{
        "profiles": {
            "json": {
                "discovery": {
                    "entries": [
                        {
                            "abstract-type": "ejb",
                            "abstract-type-authority": "a",
                            "attributes": { "uri": "http://json:1" }
                        }
                    ]
                }
            }
        }
    }"#;
    let config = SubsystemConfig::from_json_str(json).expect("parse");
    let subsystem = RemotingSubsystem::boot(&config).expect("boot");
    let profile = subsystem.profile("json").expect("json");
    assert_eq!(profile.endpoints()[0].uri().host_str(), Some("json"));
    assert_eq!(
        profile.local_transport().map(|p| p.mode()),
        Some(PassMode::ByValue)
    );
}
