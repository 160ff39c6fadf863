//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check TTL, overwrite, isolation and persistence behaviour.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::cache::{ManualClock, NamespacedCache, Ttl};

// == Test Configuration ==
const START_MS: i64 = 1_700_000_000_000;

fn new_cache(dir: &TempDir, clock: &Arc<ManualClock>) -> NamespacedCache {
    NamespacedCache::builder(dir.path().join("cache.txt"))
        .clock(clock.clone())
        .create_if_missing(true)
        .open()
        .unwrap()
}

// == Strategies ==
/// Generates namespace names (never contain '&' or line breaks)
fn namespace_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}"
}

/// Generates cache keys, domain-like
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9.]{1,32}"
}

/// Generates JSON values, including text with delimiter characters
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<String>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        ("[a-z&\\n ]{0,24}", any::<u32>()).prop_map(|(text, n)| json!({"text": text, "n": n})),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // An entry written with ttl T is a hit at exactly T and a miss just after.
    #[test]
    fn prop_ttl_boundary(ttl in 0u64..100_000, value in value_strategy()) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = new_cache(&dir, &clock);
        cache.add_namespace("icp");
        cache.set("icp", "baidu.com", value.clone(), Ttl::Seconds(ttl)).unwrap();

        clock.advance_secs(ttl);
        prop_assert_eq!(cache.get("icp", "baidu.com"), Some(value));

        clock.advance(Duration::from_millis(1));
        prop_assert_eq!(cache.get("icp", "baidu.com"), None);
    }

    // Entries without a TTL survive any elapsed time.
    #[test]
    fn prop_no_expiry(elapsed_secs in 0u64..(1u64 << 40), value in value_strategy()) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = new_cache(&dir, &clock);
        cache.add_namespace("icp");
        cache.set("icp", "k", value.clone(), Ttl::from_secs(-1)).unwrap();

        clock.advance_secs(elapsed_secs);
        prop_assert_eq!(cache.get("icp", "k"), Some(value));
    }

    // The last write to a key is the only one visible.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = new_cache(&dir, &clock);
        cache.add_namespace("icp");

        cache.set("icp", &key, value1, Ttl::Never).unwrap();
        cache.add_key("icp", &key, value2.clone(), Ttl::Never).unwrap();

        prop_assert_eq!(cache.get("icp", &key), Some(value2));
        prop_assert_eq!(cache.len("icp"), Some(1));
    }

    // The same key in two namespaces holds two independent values.
    #[test]
    fn prop_namespace_isolation(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = new_cache(&dir, &clock);
        cache.add_namespace("icp");
        cache.add_namespace("ip_location");

        cache.set("icp", &key, value1.clone(), Ttl::Never).unwrap();
        cache.set("ip_location", &key, value2.clone(), Ttl::Never).unwrap();

        prop_assert_eq!(cache.get("icp", &key), Some(value1));
        prop_assert_eq!(cache.get("ip_location", &key), Some(value2));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Persisting and reopening reproduces every live pair, and expired
    // entries stay expired.
    #[test]
    fn prop_persist_round_trip(
        entries in prop::collection::vec(
            (namespace_strategy(), key_strategy(), value_strategy(), prop::option::of(0u64..10)),
            0..40
        )
    ) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = new_cache(&dir, &clock);

        let mut expected: HashMap<(String, String), (Value, Ttl)> = HashMap::new();
        for (namespace, key, value, ttl) in entries {
            let ttl = ttl.map_or(Ttl::Never, Ttl::Seconds);
            cache.add_namespace(&namespace);
            cache.set(&namespace, &key, value.clone(), ttl).unwrap();
            expected.insert((namespace, key), (value, ttl));
        }

        clock.advance_secs(5);
        cache.persist().unwrap();

        let reopened = new_cache(&dir, &clock);
        prop_assert_eq!(reopened.namespaces(), cache.namespaces());
        for ((namespace, key), (value, ttl)) in &expected {
            let live = match ttl {
                Ttl::Never => true,
                Ttl::Seconds(secs) => *secs >= 5,
            };
            prop_assert_eq!(cache.get(namespace, key).is_some(), live);
            let reloaded = reopened.get(namespace, key);
            if live {
                prop_assert_eq!(reloaded.as_ref(), Some(value));
            } else {
                prop_assert_eq!(reloaded, None);
            }
        }
    }
}
