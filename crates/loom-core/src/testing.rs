//! Shared fixtures for unit tests.

use crate::catalog::Catalog;
use crate::definition::WorldDocument;

const SAMPLE: &str = r#"{
  "world": { "title": "The Lighthouse", "version": "1.0" },
  "start": { "location": "L0", "inventory": ["iron_key"] },
  "locations": [
    { "id": "L0", "name": "Dock", "description": "Salt-stained planks." },
    { "id": "L1", "name": "Cliff Path" },
    { "id": "L2", "name": "Keeper's Cottage" },
    { "id": "L3", "name": "Lighthouse Base" },
    { "id": "L4", "name": "Lantern Room" },
    { "id": "L5", "name": "Cellar" }
  ],
  "items": [
    { "id": "iron_key", "name": "iron key", "critical": true },
    { "id": "lamp", "name": "brass lamp", "location": "L0" },
    { "id": "letter", "name": "letter", "location": "L2" }
  ],
  "characters": [
    { "id": "jenkins", "name": "Old Jenkins", "location": "L2", "counters": { "trust": 0 } }
  ],
  "exits": [
    { "id": "dock_north", "from": "L0", "to": "L1", "direction": "north" },
    { "id": "path_south", "from": "L1", "to": "L0", "direction": "south" },
    { "id": "path_east", "from": "L1", "to": "L2", "direction": "east" },
    { "id": "cottage_west", "from": "L2", "to": "L1", "direction": "west" },
    { "id": "path_north", "from": "L1", "to": "L3", "direction": "north" },
    { "id": "base_south", "from": "L3", "to": "L1", "direction": "south" },
    { "id": "stair_up", "from": "L3", "to": "L4", "direction": "up", "locked": true },
    { "id": "stair_down", "from": "L4", "to": "L3", "direction": "down" },
    { "id": "cellar_hatch", "from": "L3", "to": "L5", "direction": "down", "hidden": true },
    { "id": "cellar_up", "from": "L5", "to": "L3", "direction": "up" }
  ],
  "interactions": [
    { "id": "survey_dock", "triggers": ["survey the dock"], "location": "L0",
      "effects": [{ "set_flag": { "flag": "explored_L0" } }] },
    { "id": "talk_jenkins", "kind": "talk", "target": "character:jenkins", "repeatable": true,
      "effects": [{ "adjust_counter": { "character": "jenkins", "counter": "trust", "delta": 1 } }] },
    { "id": "light_lamp", "kind": "use", "item": "lamp", "location": "L4",
      "effects": [{ "set_flag": { "flag": "lamp_lit" } }] }
  ],
  "beats": [
    { "id": "meet_jenkins", "trigger": { "at": "L2" },
      "effects": [{ "set_flag": { "flag": "met_jenkins" } }] },
    { "id": "gate_open", "effects": [{ "unlock_exit": "stair_up" }] }
  ],
  "spokes": [
    { "id": "spoke_explore", "act": "act1", "condition": { "flag": "explored_L0" } },
    { "id": "spoke_trust", "act": "act1",
      "condition": { "counter": { "character": "jenkins", "counter": "trust", "value": 3 } } }
  ],
  "acts": [
    { "id": "act1", "name": "The Shore", "locations": ["L0", "L1", "L2", "L3"],
      "characters": ["jenkins"], "gate_beat": "gate_open" },
    { "id": "act2", "name": "The Lantern Room", "locations": ["L4", "L5"] }
  ],
  "victory": [
    { "id": "light_restored", "condition": { "flag": "lamp_lit" } }
  ]
}"#;

/// The small lighthouse world used across unit tests.
pub(crate) fn sample_document() -> WorldDocument {
    serde_json::from_str(SAMPLE).expect("sample world parses")
}

/// [`sample_document`] built into a catalog.
pub(crate) fn sample_catalog() -> Catalog {
    Catalog::from_document(sample_document()).expect("sample world is valid")
}
