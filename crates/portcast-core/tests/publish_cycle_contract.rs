//! Engine contract: publish-on-change
//!
//! One publish per detected change, no DNS traffic while the mapping is
//! stable, cleanup strictly before creation. Intervals are zero, so the
//! engine runs through many poll cycles inside each wait window and the
//! exactly-once assertions carry real weight.

mod common;

use common::*;
use portcast_core::{EngineEvent, PortcastEngine};

#[tokio::test]
async fn changed_mapping_is_published_exactly_once() {
    let (source, source_probe) = ScriptedTunnelSource::new(
        vec![LoginScript::Succeed],
        vec![PollScript::Tunnels(sample_tunnels())],
    );
    let (publisher, publisher_probe) = MockDnsPublisher::new();

    let (mut engine, _events) =
        PortcastEngine::new(Box::new(source), Box::new(publisher), fast_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    // Many polls of the same listing, but exactly one publish cycle.
    assert!(source_probe.poll_calls() > 1, "engine should keep polling");
    assert_eq!(publisher_probe.clean_up_calls(), 1);
    assert_eq!(publisher_probe.present_calls(), 1);
    assert_eq!(publisher_probe.published(), vec![r#"{"8080":"14783"}"#]);
}

#[tokio::test]
async fn clean_up_completes_before_present() {
    let (source, _source_probe) = ScriptedTunnelSource::new(
        vec![LoginScript::Succeed],
        vec![PollScript::Tunnels(sample_tunnels())],
    );
    let (publisher, publisher_probe) = MockDnsPublisher::new();

    let (mut engine, _events) =
        PortcastEngine::new(Box::new(source), Box::new(publisher), fast_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(publisher_probe.call_log(), vec!["clean_up", "present"]);
}

#[tokio::test]
async fn empty_listing_never_publishes() {
    // A fresh detector holds an empty mapping, so an empty listing is not a
    // change and no DNS call may be issued.
    let (source, source_probe) = ScriptedTunnelSource::new(
        vec![LoginScript::Succeed],
        vec![PollScript::Tunnels(Vec::new())],
    );
    let (publisher, publisher_probe) = MockDnsPublisher::new();

    let (mut engine, _events) =
        PortcastEngine::new(Box::new(source), Box::new(publisher), fast_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(source_probe.poll_calls() > 1);
    assert_eq!(publisher_probe.clean_up_calls(), 0);
    assert_eq!(publisher_probe.present_calls(), 0);
}

#[tokio::test]
async fn mapping_change_triggers_republish() {
    let changed = vec![portcast_core::Tunnel::new(
        "web",
        "tcp",
        "0.0.0.0:8080",
        "tcp://x.com:20001",
    )];

    let (source, _source_probe) = ScriptedTunnelSource::new(
        vec![LoginScript::Succeed],
        vec![
            PollScript::Tunnels(sample_tunnels()),
            PollScript::Tunnels(changed),
        ],
    );
    let (publisher, publisher_probe) = MockDnsPublisher::new();

    let (mut engine, _events) =
        PortcastEngine::new(Box::new(source), Box::new(publisher), fast_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(publisher_probe.present_calls(), 2);
    assert_eq!(
        publisher_probe.published(),
        vec![r#"{"8080":"14783"}"#, r#"{"8080":"20001"}"#]
    );
}

#[tokio::test]
async fn publish_cycle_emits_events() {
    let (source, _source_probe) = ScriptedTunnelSource::new(
        vec![LoginScript::Succeed],
        vec![PollScript::Tunnels(sample_tunnels())],
    );
    let (publisher, _publisher_probe) = MockDnsPublisher::new();

    let (mut engine, mut events) =
        PortcastEngine::new(Box::new(source), Box::new(publisher), fast_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert!(seen.contains(&EngineEvent::Started));
    assert!(
        seen.iter()
            .any(|e| matches!(e, EngineEvent::MappingChanged { .. }))
    );
    assert!(seen.iter().any(|e| matches!(
        e,
        EngineEvent::Published { domain, record, value }
            if domain == "example.com"
                && record == "tunnels"
                && value == r#"{"8080":"14783"}"#
    )));
}
