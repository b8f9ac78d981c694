use meshnode_core::{NodeIdentity, RelayDirectory};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn key(prefix: u8, n: u8) -> NodeIdentity {
    let mut bytes = [0u8; 32];
    bytes[0] = prefix;
    bytes[31] = n;
    NodeIdentity::from_bytes(bytes)
}

#[test]
fn test_readers_never_see_a_partial_set() {
    let directory = Arc::new(RelayDirectory::new());
    let target = key(0xaa, 0);

    let set_a: HashSet<NodeIdentity> = (0..32).map(|n| key(1, n)).collect();
    let set_b: HashSet<NodeIdentity> = (0..48).map(|n| key(2, n)).collect();
    directory.set_relays(target, set_a.iter().copied());

    let writer = {
        let directory = directory.clone();
        let (a, b) = (set_a.clone(), set_b.clone());
        thread::spawn(move || {
            for i in 0..500 {
                let next = if i % 2 == 0 { &b } else { &a };
                directory.set_relays(target, next.iter().copied());
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let directory = directory.clone();
            let (a, b) = (set_a.clone(), set_b.clone());
            thread::spawn(move || {
                for _ in 0..500 {
                    let seen: HashSet<NodeIdentity> = directory.get(&target).into_iter().collect();
                    assert!(seen == a || seen == b, "observed a mixed relay set");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_concurrent_writers_on_distinct_targets() {
    let directory = Arc::new(RelayDirectory::new());

    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let directory = directory.clone();
            thread::spawn(move || {
                let target = key(t, 0xff);
                for round in 0..100u8 {
                    directory.set_relays(target, [key(t, round), key(t, round.wrapping_add(1))]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(directory.len(), 8);
    for t in 0..8u8 {
        let relays: HashSet<_> = directory.get(&key(t, 0xff)).into_iter().collect();
        assert_eq!(relays, HashSet::from([key(t, 99), key(t, 100)]));
    }
}

#[test]
fn test_node_relay_calls_from_many_threads() {
    let storage = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let node = Arc::new(meshnode_core::MeshNode::new(
        meshnode_core::NodeConfig::ephemeral(),
    ));
    node.start(storage.path(), cache.path()).unwrap();

    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let node = node.clone();
            thread::spawn(move || {
                let target = key(t, 0).to_hex();
                let relay = key(t, 1).to_hex();
                node.set_relay_servers(&target, &format!("{relay},bogus,"));
                assert_eq!(node.get_relay_servers(&target), relay);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(node.relay_directory().unwrap().len(), 8);
}
