use std::collections::{BTreeMap, BTreeSet, HashSet};

use plc_project::*;
use proptest::prelude::*;

const TYPES: [&str; 3] = ["PID", "valve", "cylindrical_tank"];

/// Up to six instances `n0..n5` with random types and gains, wired by
/// connections between instances that exist.
fn config_strategy() -> impl Strategy<Value = PlcConfig> {
    (
        prop::collection::btree_map(0usize..6, (0usize..3, 0u8..4), 0..6),
        prop::collection::vec((0usize..6, 0usize..6), 0..8),
        prop::sample::select(vec![0.1, 0.5, 1.0]),
    )
        .prop_map(|(instances, links, period)| {
            let mut config = PlcConfig::new(period);
            for (i, (ty, kp)) in &instances {
                config.add_instance(
                    &format!("n{i}"),
                    InstanceDef::new(TYPES[*ty]).with_param("kp", f64::from(*kp)),
                );
            }
            for (a, b) in links {
                if instances.contains_key(&a) && instances.contains_key(&b) {
                    config.add_connection(ConnectionDef::new(
                        format!("n{a}.out"),
                        format!("n{b}.in"),
                    ));
                }
            }
            config
        })
}

fn instance_map(config: &PlcConfig) -> BTreeMap<String, InstanceDef> {
    config
        .instances
        .iter()
        .map(|(name, def)| (name.to_string(), def.clone()))
        .collect()
}

fn connection_set(config: &PlcConfig) -> HashSet<ConnectionDef> {
    config.connections.iter().cloned().collect()
}

proptest! {
    #[test]
    fn applying_a_diff_reproduces_the_target(old in config_strategy(), new in config_strategy()) {
        let diff = ConfigDiff::between(&old, &new);
        let mut patched = old.clone();
        let summary = diff.apply(&mut patched);

        prop_assert_eq!(patched.cycle_period, new.cycle_period);
        prop_assert_eq!(instance_map(&patched), instance_map(&new));
        prop_assert_eq!(connection_set(&patched), connection_set(&new));

        let old_names: BTreeSet<&str> = old.instances.names().collect();
        let new_names: BTreeSet<&str> = new.instances.names().collect();
        let type_of = |config: &PlcConfig, name: &str| {
            config.instances.get(name).map(|d| d.type_tag.clone())
        };
        let retyped = old_names
            .intersection(&new_names)
            .any(|name| type_of(&old, name) != type_of(&new, name));
        prop_assert_eq!(summary.requires_rebuild(), old_names != new_names || retyped);
    }

    #[test]
    fn a_configuration_has_no_diff_with_itself(config in config_strategy()) {
        let diff = ConfigDiff::between(&config, &config);
        prop_assert!(diff.is_empty());
        let mut same = config.clone();
        prop_assert_eq!(diff.apply(&mut same), DiffSummary::default());
        prop_assert_eq!(same, config);
    }
}
