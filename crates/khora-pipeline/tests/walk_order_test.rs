// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use khora_pipeline::{
    listener, EventListener, ExecuteError, ExecutionPipeline, FrameOutcome, NodeKey,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

type Journal = Arc<Mutex<Vec<&'static str>>>;

fn recorder(journal: &Journal, name: &'static str) -> EventListener {
    let journal = Arc::clone(journal);
    listener(move |_| {
        journal.lock().unwrap().push(name);
        Ok(())
    })
}

fn counter(count: &Arc<AtomicU32>) -> EventListener {
    let count = Arc::clone(count);
    listener(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn test_children_run_in_document_order_every_frame() {
    // --- 1. ARRANGE ---
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline>
             <step id="a">
               <step id="a1"/>
               <step id="a2"/>
             </step>
             <step id="b"/>
           </pipeline>"#,
    )
    .unwrap();

    let journal: Journal = Arc::default();
    let listeners = [
        (NodeKey::ROOT, recorder(&journal, "root")),
        (NodeKey::from_name("a"), recorder(&journal, "a")),
        (NodeKey::from_name("a1"), recorder(&journal, "a1")),
        (NodeKey::from_name("a2"), recorder(&journal, "a2")),
        (NodeKey::from_name("b"), recorder(&journal, "b")),
    ];
    // Registration order deliberately differs from document order.
    for (slot, listener) in listeners.iter().rev() {
        pipeline.add_event(*slot, listener).unwrap();
    }

    // --- 2. ACT ---
    for frame in 0..3 {
        assert_eq!(pipeline.tick(frame as f64 * 0.016).unwrap(), FrameOutcome::Completed);
    }

    // --- 3. ASSERT ---
    let expected: Vec<&str> = ["root", "a", "a1", "a2", "b"].repeat(3);
    assert_eq!(*journal.lock().unwrap(), expected);
    assert_eq!(pipeline.frame_count(), 3);
}

#[test]
fn test_if_equal_runs_only_on_true() {
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline>
             <if id="gate" test="enabled"><step id="body"/></if>
           </pipeline>"#,
    )
    .unwrap();
    let runs = Arc::new(AtomicU32::new(0));
    pipeline
        .add_event(NodeKey::from_name("body"), &counter(&runs))
        .unwrap();

    // Unset counts as false.
    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    pipeline.set_variable("enabled", true);
    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    pipeline.set_variable("enabled", false);
    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Not a boolean, so not true.
    pipeline.set_variable("enabled", 0);
    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_if_not_equal_inverts_every_outcome() {
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline>
             <if id="gate" test="enabled" compare="notEqual"><step id="body"/></if>
           </pipeline>"#,
    )
    .unwrap();
    let runs = Arc::new(AtomicU32::new(0));
    pipeline
        .add_event(NodeKey::from_name("body"), &counter(&runs))
        .unwrap();

    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1, "unset passes NotEqual");

    pipeline.set_variable("enabled", true);
    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    pipeline.set_variable("enabled", false);
    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    pipeline.set_variable("enabled", 0);
    pipeline.tick(0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn test_paused_flag_gates_update_when_executing_frame_slot() {
    // --- 1. ARRANGE ---
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline>
             <step id="frame">
               <if id="gated" test="pausedFlag" compare="NotEqual">
                 <step id="update"/>
               </if>
             </step>
           </pipeline>"#,
    )
    .unwrap();
    let frame = NodeKey::from_name("frame");
    let updates = Arc::new(AtomicU32::new(0));
    pipeline
        .add_event(NodeKey::from_name("update"), &counter(&updates))
        .unwrap();

    // --- 2. ACT & 3. ASSERT ---
    pipeline.set_variable("pausedFlag", true);
    pipeline.execute_slot(frame, 0.0).unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 0, "paused frame must not update");

    pipeline.set_variable("pausedFlag", false);
    pipeline.execute_slot(frame, 0.016).unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 1);
}

#[test]
fn test_execute_slot_reuses_current_frame_index() {
    // --- 1. ARRANGE ---
    let pipeline =
        ExecutionPipeline::from_xml(r#"<pipeline><step id="late_pass"/></pipeline>"#).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_listener = Arc::clone(&seen);
    let record = listener(move |frame| {
        seen_in_listener.lock().unwrap().push(frame.frame());
        Ok(())
    });
    let slot = NodeKey::from_name("late_pass");
    pipeline.add_event(slot, &record).unwrap();

    // --- 2. ACT ---
    pipeline.execute_slot(slot, 0.0).unwrap();
    pipeline.tick(0.0).unwrap();
    pipeline.execute_slot(slot, 0.0).unwrap();
    pipeline.tick(0.016).unwrap();
    pipeline.execute_slot(slot, 0.016).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(*seen.lock().unwrap(), vec![0, 0, 0, 1, 1]);
    assert_eq!(pipeline.frame_count(), 2);
}

#[test]
fn test_deferred_fires_once_per_elapsed_target() {
    // --- 1. ARRANGE ---
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline>
             <deferred id="every_second" target="1.0">
               <step id="inner"/>
             </deferred>
           </pipeline>"#,
    )
    .unwrap();
    let fired = Arc::new(AtomicU32::new(0));
    let inner = Arc::new(AtomicU32::new(0));
    pipeline
        .add_event(NodeKey::from_name("every_second"), &counter(&fired))
        .unwrap();
    pipeline
        .add_event(NodeKey::from_name("inner"), &counter(&inner))
        .unwrap();

    // --- 2. ACT ---
    let mut history = Vec::new();
    for elapsed in [100.0, 100.5, 100.99, 101.0, 104.5, 105.0, 105.5] {
        pipeline.tick(elapsed).unwrap();
        history.push(fired.load(Ordering::SeqCst));
    }

    // --- 3. ASSERT ---
    // First call fires regardless of elapsed time; crossing several thresholds
    // at 104.5 still fires only once.
    assert_eq!(history, vec![1, 1, 1, 2, 3, 3, 4]);
    assert_eq!(inner.load(Ordering::SeqCst), 4, "children follow the deferred node");
}

#[test]
fn test_deferred_reads_variable_target() {
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline><deferred id="poll" target="poll_period"/></pipeline>"#,
    )
    .unwrap();
    let fired = Arc::new(AtomicU32::new(0));
    pipeline
        .add_event(NodeKey::from_name("poll"), &counter(&fired))
        .unwrap();

    pipeline.tick(0.0).unwrap();
    pipeline.tick(10.0).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1, "unset period never re-fires");

    pipeline.set_variable("poll_period", 0.25);
    pipeline.tick(10.25).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cancellation_unwinds_rest_of_walk() {
    // --- 1. ARRANGE ---
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline>
             <step id="before"/>
             <step id="cancel_here">
               <step id="child"/>
             </step>
             <step id="after"/>
           </pipeline>"#,
    )
    .unwrap();
    let journal: Journal = Arc::default();
    pipeline
        .add_event(NodeKey::from_name("before"), &recorder(&journal, "before"))
        .unwrap();
    pipeline
        .add_event(NodeKey::from_name("child"), &recorder(&journal, "child"))
        .unwrap();
    pipeline
        .add_event(NodeKey::from_name("after"), &recorder(&journal, "after"))
        .unwrap();

    let cancel_journal = Arc::clone(&journal);
    let cancel = listener(move |frame| {
        cancel_journal.lock().unwrap().push("cancel_here");
        frame.cancellation().cancel();
        Ok(())
    });
    pipeline
        .add_event(NodeKey::from_name("cancel_here"), &cancel)
        .unwrap();

    // --- 2. ACT ---
    let outcome = pipeline.tick(0.0).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(outcome, FrameOutcome::Cancelled);
    assert_eq!(*journal.lock().unwrap(), vec!["before", "cancel_here"]);
    assert!(pipeline.is_cancelled());

    // Every later walk unwinds before running anything.
    assert_eq!(pipeline.tick(0.016).unwrap(), FrameOutcome::Cancelled);
    assert_eq!(journal.lock().unwrap().len(), 2);
}

#[test]
fn test_cancellation_skips_remaining_listeners_of_same_node() {
    // --- 1. ARRANGE ---
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline><step id="shutdown"><step id="child"/></step></pipeline>"#,
    )
    .unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let late_calls = Arc::new(AtomicU32::new(0));
    for _ in 0..8 {
        let calls = Arc::clone(&calls);
        let late_calls = Arc::clone(&late_calls);
        let stop = listener(move |frame| {
            if frame.is_cancelled() {
                late_calls.fetch_add(1, Ordering::SeqCst);
            }
            calls.fetch_add(1, Ordering::SeqCst);
            frame.cancellation().cancel();
            Ok(())
        });
        pipeline
            .add_event(NodeKey::from_name("shutdown"), &stop)
            .unwrap();
    }
    let child_runs = Arc::new(AtomicU32::new(0));
    pipeline
        .add_event(NodeKey::from_name("child"), &counter(&child_runs))
        .unwrap();

    // --- 2. ACT ---
    let outcome = pipeline.tick(0.0).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(outcome, FrameOutcome::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "only the cancelling listener ran");
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);
    assert_eq!(child_runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_error_aborts_only_the_current_frame() {
    // --- 1. ARRANGE ---
    let pipeline = ExecutionPipeline::from_xml(
        r#"<pipeline>
             <step id="fragile"/>
             <step id="after"/>
           </pipeline>"#,
    )
    .unwrap();
    let after = Arc::new(AtomicU32::new(0));
    pipeline
        .add_event(NodeKey::from_name("after"), &counter(&after))
        .unwrap();
    let fragile = listener(|frame| {
        if frame.frame() == 0 {
            anyhow::bail!("asset not ready");
        }
        Ok(())
    });
    pipeline
        .add_event(NodeKey::from_name("fragile"), &fragile)
        .unwrap();

    // --- 2. ACT ---
    let first = pipeline.tick(0.0);
    let second = pipeline.tick(0.016);

    // --- 3. ASSERT ---
    match first {
        Err(ExecuteError::Listener { node, source }) => {
            assert_eq!(node, "step#fragile");
            assert_eq!(source.to_string(), "asset not ready");
        }
        other => panic!("expected a listener error, got {other:?}"),
    }
    assert_eq!(second.unwrap(), FrameOutcome::Completed);
    assert_eq!(after.load(Ordering::SeqCst), 1, "only the second frame reaches 'after'");
}

#[test]
fn test_removed_listener_no_longer_runs() {
    let pipeline = ExecutionPipeline::from_xml(r#"<pipeline><step id="s"/></pipeline>"#).unwrap();
    let slot = NodeKey::from_name("s");
    let runs = Arc::new(AtomicU32::new(0));
    let listener = counter(&runs);

    assert!(pipeline.add_event(slot, &listener).unwrap());
    assert!(!pipeline.add_event(slot, &listener).unwrap());
    pipeline.tick(0.0).unwrap();

    assert!(pipeline.remove_event(slot, &listener).unwrap());
    pipeline.tick(0.0).unwrap();

    pipeline.add_event(slot, &listener).unwrap();
    pipeline.clear_events(slot).unwrap();
    pipeline.tick(0.0).unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.listener_count(slot).unwrap(), 0);
}
