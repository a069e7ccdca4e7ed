// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Liveness epochs and sweeping

use sqlscript_engine::{Engine, MemoryKind};

#[test]
fn test_unmarked_allocations_are_dead() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = engine.create_script(&catalog, 1).unwrap();
    script.insert_text_at(0, "select 1").unwrap();
    let scanned = script.scan().unwrap();

    let epoch = engine.acquire_liveness_epoch();
    catalog.mark_alive_in_epoch(epoch).unwrap();
    script.mark_alive_in_epoch(epoch).unwrap();

    let liveness = engine.check_memory_liveness(epoch);
    assert_eq!(liveness.alive.len(), 2);
    assert_eq!(liveness.dead.len(), 1);
    assert_eq!(liveness.dead[0].kind, MemoryKind::ScannedScript);
    assert!(scanned.is_alive());
}

#[test]
fn test_sweep_turns_dead_handles_into_use_after_free() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let script = engine.create_script(&catalog, 1).unwrap();
    script.insert_text_at(0, "select 1").unwrap();
    let parsed = script.parse().unwrap();

    let epoch = engine.acquire_liveness_epoch();
    catalog.mark_alive_in_epoch(epoch).unwrap();
    parsed.mark_alive_in_epoch(epoch).unwrap();

    assert_eq!(engine.sweep(epoch), 1);
    assert!(script.to_string().unwrap_err().is_use_after_free());
    assert!(script.mark_alive_in_epoch(epoch).unwrap_err().is_use_after_free());
    assert!(parsed.read().is_ok());
    assert_eq!(engine.live_allocations(), 2);

    // Destroying a swept handle is still a no-op
    script.destroy();
}

#[test]
fn test_marks_do_not_carry_over_epochs() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();

    let first = engine.acquire_liveness_epoch();
    catalog.mark_alive_in_epoch(first).unwrap();
    let second = engine.acquire_liveness_epoch();
    assert!(second > first);

    let liveness = engine.check_memory_liveness(second);
    assert!(liveness.alive.is_empty());
    assert_eq!(liveness.dead.len(), 1);
    assert_eq!(liveness.dead[0].epoch, first);
}

#[test]
fn test_swept_slot_reuse_keeps_old_handles_dead() {
    let engine = Engine::new();
    let catalog = engine.create_catalog();
    let registry = engine.create_script_registry();

    let epoch = engine.acquire_liveness_epoch();
    catalog.mark_alive_in_epoch(epoch).unwrap();
    engine.sweep(epoch);
    assert!(registry.script_count().unwrap_err().is_use_after_free());

    // The freed slot is reused with a new generation
    let fresh = engine.create_script_registry();
    assert_eq!(fresh.script_count().unwrap(), 0);
    assert!(registry.script_count().unwrap_err().is_use_after_free());

    // Dropping the stale handle does not release the new occupant
    drop(registry);
    assert_eq!(fresh.script_count().unwrap(), 0);
}

#[test]
fn test_liveness_encodes_as_json() {
    let engine = Engine::new();
    let _catalog = engine.create_catalog();
    let epoch = engine.acquire_liveness_epoch();
    let liveness = engine.check_memory_liveness(epoch);
    let json = serde_json::to_string(&liveness).unwrap();
    assert!(json.contains("\"CATALOG\""));
}
