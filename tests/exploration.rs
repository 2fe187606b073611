//! This module is an integration test that drives a short exploration the
//! way an embedder would: with triggers, a watchdog, statistics and
//! inspection of the final states.
#![cfg(test)]

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::{context, Scripted};
use symbolic_bytecode_engine::{
    algo,
    bc::Signature,
    constant::XLOAD_N_OFFSET,
    error::execution,
    inspect::{describe_inputs, InputDescriptor, StateSnapshot},
    mem::{LocalVariableRow, State},
    stats::PathOutcome,
    tree::AlternativeKind,
    trigger::{TriggerOutcome, TriggerRule, TriggerRules},
    watchdog::FlagWatchdog,
};

mod common;

/// `static int value(Node node) { return node.value; }`
fn method() -> (Signature, Vec<u8>) {
    let signature = Signature::new("app/Main", "value", "(Lapp/Node;)I");
    let code = vec![0x2a, 0xb4, 0x00, 0x01, 0xac];
    (signature, code)
}

fn initial_state() -> anyhow::Result<State> {
    let (signature, code) = method();
    let ctx = context(Scripted::new());
    let table = vec![LocalVariableRow {
        slot:       0,
        start_pc:   0,
        length:     5,
        descriptor: "Lapp/Node;".into(),
        name:       "node".into(),
    }];
    Ok(ctx.initial_state(signature, true, code, 1, table, 2)?)
}

#[test]
fn explores_a_field_read() -> anyhow::Result<()> {
    let mut ctx = context(Scripted::new());
    let state = initial_state()?;

    let loaded = algo::load_local(&mut ctx, &state, 0, XLOAD_N_OFFSET)?;
    assert_eq!(loaded.len(), 2);

    let mut finished = Vec::new();
    for successor in &loaded {
        finished.extend(algo::get_field(&mut ctx, successor, "value")?);
    }
    assert_eq!(finished.len(), 2);
    assert!(finished[0].is_stuck());
    assert_eq!(finished[1].pc()?, 4);

    for state in &finished {
        let outcome = if state.is_stuck() {
            PathOutcome::Unsafe
        } else {
            PathOutcome::Safe
        };
        ctx.record_path(outcome);
    }
    let statistics = ctx.statistics();
    assert_eq!(statistics.decision_points, 2);
    assert_eq!(statistics.paths_total, 2);
    assert_eq!(statistics.paths_unsafe, 1);

    let snapshot = StateSnapshot::of(&finished[1]);
    assert_eq!(snapshot.identifier, ".1.2");
    assert_eq!(snapshot.frames[0].operands.len(), 1);
    assert!(snapshot.to_json()?.contains("app/Node"));

    let inputs = describe_inputs(&finished[1], &BTreeMap::new())?;
    assert_eq!(
        inputs["{ROOT}:node"],
        InputDescriptor::Object {
            class_name: "app/Node".into(),
        }
    );

    Ok(())
}

#[test]
fn triggers_may_hold_the_program_counter() -> anyhow::Result<()> {
    let triggers = TriggerRules::new().with_rule(
        TriggerRule::new(AlternativeKind::Expands, |_, _| {
            Ok(TriggerOutcome::SuppressAdvance)
        })
        .for_class("app/Node"),
    );
    let mut ctx = context(Scripted::new()).with_triggers(triggers);
    let state = initial_state()?;

    let successors = algo::load_local(&mut ctx, &state, 0, XLOAD_N_OFFSET)?;
    assert_eq!(successors[0].pc()?, 1);
    assert_eq!(successors[1].pc()?, 0);

    Ok(())
}

#[test]
fn the_watchdog_stops_the_exploration() -> anyhow::Result<()> {
    let flag = Arc::new(AtomicBool::new(true));
    let watchdog = FlagWatchdog::new(flag.clone()).polling_every(1).in_rc();
    let mut ctx = context(Scripted::new()).with_watchdog(watchdog);
    let state = initial_state()?;

    let error = algo::load_local(&mut ctx, &state, 0, XLOAD_N_OFFSET)
        .expect_err("The exploration ignored the watchdog");
    assert_eq!(error.payload, execution::Error::StoppedByWatchdog);
    assert_eq!(error.location, 0);

    flag.store(false, Ordering::Relaxed);
    assert_eq!(algo::load_local(&mut ctx, &state, 0, XLOAD_N_OFFSET)?.len(), 2);

    Ok(())
}
