mod common;

use std::collections::HashSet;

use common::setup_temp_dir;
use skylink::transfer::OfferRegistry;

const EPHEMERAL_RANGE: std::ops::RangeInclusive<u16> = 49152..=65535;

#[test]
fn allocate_returns_fresh_port_with_resolvable_token() {
    let registry = OfferRegistry::new();
    let temp_dir = setup_temp_dir();
    let staged = temp_dir.path().join("staged.txt");
    std::fs::write(&staged, b"payload").expect("write staged file");

    let port = registry.allocate(staged.clone(), "10.0.0.7".to_string());

    assert!(EPHEMERAL_RANGE.contains(&port));
    assert!(registry.is_occupied(port));

    let token = registry.token_of(port).expect("token for fresh offer");
    assert_eq!(token.len(), 6);
    assert!(token.chars().all(|c| c.is_ascii_digit()));

    assert_eq!(registry.resolve_token(&token), Some(port));
    assert!(registry.validate_token(port, &token));
    assert_eq!(registry.host_of(port).as_deref(), Some("10.0.0.7"));
    assert_eq!(registry.path_of(port), Some(staged));
}

#[test]
fn live_ports_are_never_reissued() {
    let registry = OfferRegistry::new();
    let mut seen = HashSet::new();

    for i in 0..200 {
        let port = registry.allocate(
            std::path::PathBuf::from(format!("/tmp/none-{i}")),
            "127.0.0.1".to_string(),
        );
        assert!(seen.insert(port), "port {port} was issued twice");
    }
}

#[test]
fn concurrent_allocations_claim_distinct_ports() {
    let registry = OfferRegistry::new();

    let ports: Vec<u16> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = &registry;
                scope.spawn(move || {
                    (0..50)
                        .map(|i| {
                            registry.allocate(
                                std::path::PathBuf::from(format!("/tmp/w{worker}-{i}")),
                                "127.0.0.1".to_string(),
                            )
                        })
                        .collect::<Vec<u16>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().expect("allocation thread panicked"))
            .collect()
    });

    let distinct: HashSet<u16> = ports.iter().copied().collect();
    assert_eq!(distinct.len(), ports.len(), "duplicate port issued under concurrency");
}

#[test]
fn cleanup_removes_offer_token_and_backing_file() {
    let registry = OfferRegistry::new();
    let temp_dir = setup_temp_dir();
    let staged = temp_dir.path().join("served.bin");
    std::fs::write(&staged, b"bytes").expect("write staged file");

    let port = registry.allocate(staged.clone(), "127.0.0.1".to_string());
    let token = registry.token_of(port).expect("token");

    registry.cleanup(port);

    assert!(!staged.exists(), "backing file should be deleted");
    assert!(!registry.is_occupied(port));
    assert_eq!(registry.token_of(port), None);
    assert_eq!(registry.resolve_token(&token), None);
    assert!(!registry.validate_token(port, &token));
}

#[test]
fn cleanup_is_idempotent() {
    let registry = OfferRegistry::new();
    let temp_dir = setup_temp_dir();
    let staged = temp_dir.path().join("once.txt");
    std::fs::write(&staged, b"x").expect("write staged file");

    let port = registry.allocate(staged, "127.0.0.1".to_string());

    registry.cleanup(port);
    // Second call must be a no-op, not an error.
    registry.cleanup(port);

    assert!(!registry.is_occupied(port));
}

#[test]
fn cleanup_of_unknown_port_is_a_noop() {
    let registry = OfferRegistry::new();
    registry.cleanup(50123);
    assert!(!registry.is_occupied(50123));
}

#[test]
fn cleanup_survives_already_deleted_backing_file() {
    let registry = OfferRegistry::new();
    let temp_dir = setup_temp_dir();
    let staged = temp_dir.path().join("gone.txt");
    std::fs::write(&staged, b"x").expect("write staged file");

    let port = registry.allocate(staged.clone(), "127.0.0.1".to_string());
    std::fs::remove_file(&staged).expect("delete out from under the registry");

    registry.cleanup(port);
    assert!(!registry.is_occupied(port));
}

#[test]
fn never_issued_tokens_fail_lookup() {
    let registry = OfferRegistry::new();
    assert_eq!(registry.resolve_token("123456"), None);
    assert!(!registry.validate_token(50000, "123456"));
    assert_eq!(registry.host_of(50000), None);
    assert_eq!(registry.path_of(50000), None);
}

#[test]
fn validate_token_requires_exact_match_on_the_right_port() {
    let registry = OfferRegistry::new();
    let port = registry.allocate(
        std::path::PathBuf::from("/tmp/none"),
        "127.0.0.1".to_string(),
    );
    let token = registry.token_of(port).expect("token");

    assert!(registry.validate_token(port, &token));
    assert!(!registry.validate_token(port, "000000"));
    assert!(!registry.validate_token(port.wrapping_add(1), &token));
}
