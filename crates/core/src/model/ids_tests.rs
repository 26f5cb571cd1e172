// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn group_id_has_prefix() {
    assert!(GroupId::new().as_str().starts_with("grp-"));
}

#[test]
fn distinct_id_types_cannot_be_confused_at_the_type_level() {
    let group = GroupId::new();
    let repair = RepairId::new();
    // Different newtypes, so this would not compile if uncommented:
    // assert_eq!(group, repair);
    assert_ne!(group.as_str(), repair.as_str());
}

#[test]
fn agent_name_equals_str() {
    let name = AgentName::new("repair-worker-1");
    assert_eq!(name.as_str(), "repair-worker-1");
    assert_eq!(name, AgentName::from("repair-worker-1"));
}

#[test]
fn agent_name_borrows_as_str_for_map_lookup() {
    use std::collections::HashMap;
    let mut map: HashMap<AgentName, u32> = HashMap::new();
    map.insert(AgentName::new("w1"), 1);
    assert_eq!(map.get("w1"), Some(&1));
}
