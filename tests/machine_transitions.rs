/// Tests for authoritative state machine transitions
/// Covers scheduled transitions, nested activation diffs, zero-delay chains
/// and the instant-transition guard.
use std::{cell::RefCell, rc::Rc};

use stagewire::{
    Dispatcher, DispatcherConfig, Listener, ListenerError, MachineConfig, MachineError,
    OrderingConstraints, Scope, SimDuration, SimTime, StateGraphBuilder, StateId, StateMachine,
    UpdateState,
};

type Trace = Rc<RefCell<Vec<String>>>;

fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

fn trace_lifecycle(machine: &mut StateMachine, trace: &Trace, states: &[StateId]) {
    for &id in states {
        let name = machine.graph().name(id);
        let enter_trace = Rc::clone(trace);
        machine.on_enter(id, move |_, _| {
            enter_trace.borrow_mut().push(format!("enter:{name}"));
        });
        let leave_trace = Rc::clone(trace);
        machine.on_leave(id, move |_, _| {
            leave_trace.borrow_mut().push(format!("leave:{name}"));
        });
    }
}

#[test]
fn scheduled_transition_fires_only_once_due() {
    let mut builder = StateGraphBuilder::new();
    let s0 = builder.state("s0");
    let s1 = builder.state("s1");
    let graph = Rc::new(builder.build());

    let trace = new_trace();
    let mut machine = StateMachine::new(graph);
    trace_lifecycle(&mut machine, &trace, &[s0, s1]);

    // bootstrap into s0
    machine.transition(s0, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();
    assert_eq!(machine.current(), Some(s0));

    machine.transition(s1, SimDuration::from_secs(2.0), SimTime::from_secs(10.0));

    machine.tick(SimTime::from_secs(11.0)).unwrap();
    assert_eq!(machine.current(), Some(s0));

    machine.tick(SimTime::from_secs(12.0)).unwrap();
    assert_eq!(machine.current(), Some(s1));

    // leave strictly precedes enter
    assert_eq!(
        *trace.borrow(),
        vec!["enter:s0", "leave:s0", "enter:s1"]
    );
}

#[test]
fn nested_activation_enters_root_to_leaf_and_leaves_leaf_to_root() {
    let mut builder = StateGraphBuilder::new();
    let root_a = builder.state("root_a");
    let mid = builder.child_state("mid", root_a);
    let leaf = builder.child_state("leaf", mid);
    let root_b = builder.state("root_b");
    let other = builder.child_state("other", root_b);
    let graph = Rc::new(builder.build());

    let trace = new_trace();
    let mut machine = StateMachine::new(graph);
    trace_lifecycle(&mut machine, &trace, &[root_a, mid, leaf, root_b, other]);

    machine.transition(other, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();
    trace.borrow_mut().clear();

    machine.transition(leaf, SimDuration::ZERO, SimTime::from_secs(1.0));
    machine.tick(SimTime::from_secs(1.0)).unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![
            "leave:other",
            "leave:root_b",
            "enter:root_a",
            "enter:mid",
            "enter:leaf",
        ]
    );
    assert!(machine.is_active(root_a));
    assert!(machine.is_active(mid));
    assert!(machine.is_active(leaf));
    assert!(!machine.is_active(root_b));
    assert!(!machine.is_active(other));
}

#[test]
fn shared_ancestors_are_not_restarted() {
    let mut builder = StateGraphBuilder::new();
    let root = builder.state("root");
    let left = builder.child_state("left", root);
    let right = builder.child_state("right", root);
    let graph = Rc::new(builder.build());

    let trace = new_trace();
    let mut machine = StateMachine::new(graph);
    trace_lifecycle(&mut machine, &trace, &[root, left, right]);

    machine.transition(left, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();
    trace.borrow_mut().clear();

    machine.transition(right, SimDuration::ZERO, SimTime::from_secs(1.0));
    machine.tick(SimTime::from_secs(1.0)).unwrap();

    // root stays active throughout the sibling switch
    assert_eq!(*trace.borrow(), vec!["leave:left", "enter:right"]);
    assert!(machine.is_active(root));
}

#[test]
fn default_next_chains_complete_within_the_bound() {
    let mut builder = StateGraphBuilder::new();
    let s1 = builder.state("s1");
    let s2 = builder.state("s2");
    let s3 = builder.state("s3");
    builder.default_next(s1, s2, SimDuration::ZERO);
    builder.default_next(s2, s3, SimDuration::ZERO);
    let graph = Rc::new(builder.build());

    let trace = new_trace();
    let mut machine = StateMachine::new(graph);
    trace_lifecycle(&mut machine, &trace, &[s1, s2, s3]);

    machine.transition(s1, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();

    // the whole zero-delay chain commits within one tick
    assert_eq!(machine.current(), Some(s3));
    assert_eq!(
        *trace.borrow(),
        vec![
            "enter:s1",
            "leave:s1",
            "enter:s2",
            "leave:s2",
            "enter:s3",
        ]
    );
    assert_eq!(machine.pending(), None);
}

#[test]
fn default_next_delay_defers_the_follow_up() {
    let mut builder = StateGraphBuilder::new();
    let lobby = builder.state("lobby");
    let round = builder.state("round");
    builder.default_next(lobby, round, SimDuration::from_secs(3.0));
    let graph = Rc::new(builder.build());

    let mut machine = StateMachine::new(graph);

    machine.transition(lobby, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();
    assert_eq!(machine.current(), Some(lobby));
    assert_eq!(machine.pending(), Some((round, SimTime::from_secs(3.0))));

    machine.tick(SimTime::from_secs(2.0)).unwrap();
    assert_eq!(machine.current(), Some(lobby));

    machine.tick(SimTime::from_secs(3.0)).unwrap();
    assert_eq!(machine.current(), Some(round));
}

#[test]
fn zero_delay_cycle_raises_overflow() {
    let mut builder = StateGraphBuilder::new();
    let ping = builder.state("ping");
    let pong = builder.state("pong");
    builder.default_next(ping, pong, SimDuration::ZERO);
    builder.default_next(pong, ping, SimDuration::ZERO);
    let graph = Rc::new(builder.build());

    let mut machine = StateMachine::new(graph);
    machine.transition(ping, SimDuration::ZERO, SimTime::ZERO);

    let result = machine.tick(SimTime::ZERO);

    assert_eq!(
        result,
        Err(MachineError::InstantTransitionOverflow { limit: 16 })
    );
    // auto-transition processing halted for the tick
    assert_eq!(machine.pending(), None);
    let next_tick = machine.tick(SimTime::from_secs(1.0));
    assert!(next_tick.is_ok());
}

#[test]
fn chain_length_at_the_bound_succeeds_and_one_past_it_fails() {
    let build = |length: usize| {
        let mut builder = StateGraphBuilder::new();
        let states: Vec<StateId> = (0..length).map(|_| builder.state("link")).collect();
        for pair in states.windows(2) {
            builder.default_next(pair[0], pair[1], SimDuration::ZERO);
        }
        (Rc::new(builder.build()), states)
    };
    let config = MachineConfig {
        max_instant_transitions: 5,
    };

    // five commits: the entry transition plus four default-next hops
    let (graph, states) = build(5);
    let mut machine =
        StateMachine::with_config(graph, config, DispatcherConfig::default());
    machine.transition(states[0], SimDuration::ZERO, SimTime::ZERO);
    assert!(machine.tick(SimTime::ZERO).is_ok());
    assert_eq!(machine.current(), Some(states[4]));

    // six commits exceeds the bound
    let (graph, states) = build(6);
    let mut machine =
        StateMachine::with_config(graph, config, DispatcherConfig::default());
    machine.transition(states[0], SimDuration::ZERO, SimTime::ZERO);
    assert_eq!(
        machine.tick(SimTime::ZERO),
        Err(MachineError::InstantTransitionOverflow { limit: 5 })
    );
}

#[test]
fn pending_transition_is_last_write_wins() {
    let mut builder = StateGraphBuilder::new();
    let s0 = builder.state("s0");
    let s1 = builder.state("s1");
    let s2 = builder.state("s2");
    let graph = Rc::new(builder.build());

    let mut machine = StateMachine::new(graph);
    machine.transition(s0, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();

    machine.transition(s1, SimDuration::from_secs(5.0), SimTime::from_secs(1.0));
    machine.transition(s2, SimDuration::ZERO, SimTime::from_secs(1.0));
    machine.tick(SimTime::from_secs(1.0)).unwrap();

    // the second request replaced the first; nothing is queued behind it
    assert_eq!(machine.current(), Some(s2));
    machine.tick(SimTime::from_secs(10.0)).unwrap();
    assert_eq!(machine.current(), Some(s2));
}

#[test]
fn clear_transition_cancels_the_pending_change() {
    let mut builder = StateGraphBuilder::new();
    let s0 = builder.state("s0");
    let s1 = builder.state("s1");
    let graph = Rc::new(builder.build());

    let mut machine = StateMachine::new(graph);
    machine.transition(s0, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();

    machine.transition(s1, SimDuration::from_secs(2.0), SimTime::from_secs(1.0));
    machine.clear_transition();
    machine.tick(SimTime::from_secs(10.0)).unwrap();

    assert_eq!(machine.current(), Some(s0));
    assert_eq!(machine.pending(), None);
}

#[test]
fn update_runs_each_tick_on_the_current_state_only() {
    let mut builder = StateGraphBuilder::new();
    let root = builder.state("root");
    let leaf = builder.child_state("leaf", root);
    let graph = Rc::new(builder.build());

    let trace = new_trace();
    let mut machine = StateMachine::new(graph);
    for &id in &[root, leaf] {
        let name = machine.graph().name(id);
        let update_trace = Rc::clone(&trace);
        machine.on_update(id, move |_, _| {
            update_trace.borrow_mut().push(format!("update:{name}"));
        });
    }

    // no current state: nothing updates
    machine.tick(SimTime::ZERO).unwrap();
    assert!(trace.borrow().is_empty());

    machine.transition(leaf, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();
    machine.tick(SimTime::from_secs(1.0)).unwrap();

    // only the leaf updates, even though root is active
    assert_eq!(*trace.borrow(), vec!["update:leaf"]);
}

#[test]
fn update_listener_can_request_an_instant_transition() {
    let mut builder = StateGraphBuilder::new();
    let waiting = builder.state("waiting");
    let running = builder.state("running");
    let graph = Rc::new(builder.build());

    struct Starter {
        target: StateId,
    }
    impl Listener<UpdateState> for Starter {
        fn receive(&mut self, _: &UpdateState, cx: &Dispatcher) -> Result<(), ListenerError> {
            cx.request_transition(self.target, SimDuration::ZERO);
            Ok(())
        }
    }

    let mut machine = StateMachine::new(graph);
    machine.dispatcher_mut().register::<UpdateState, Starter>(
        Scope::Node(waiting),
        Rc::new(RefCell::new(Starter { target: running })),
        OrderingConstraints::new(),
    );

    machine.transition(waiting, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();
    assert_eq!(machine.current(), Some(waiting));

    // the listener fires during update and commits in the same tick
    machine.tick(SimTime::from_secs(1.0)).unwrap();
    assert_eq!(machine.current(), Some(running));
}

#[test]
fn update_listener_can_cancel_a_scheduled_transition() {
    let mut builder = StateGraphBuilder::new();
    let holding = builder.state("holding");
    let firing = builder.state("firing");
    let graph = Rc::new(builder.build());

    struct Aborter;
    impl Listener<UpdateState> for Aborter {
        fn receive(&mut self, _: &UpdateState, cx: &Dispatcher) -> Result<(), ListenerError> {
            cx.request_clear_transition();
            Ok(())
        }
    }

    let mut machine = StateMachine::new(graph);
    machine.dispatcher_mut().register::<UpdateState, Aborter>(
        Scope::Node(holding),
        Rc::new(RefCell::new(Aborter)),
        OrderingConstraints::new(),
    );

    machine.transition(holding, SimDuration::ZERO, SimTime::ZERO);
    machine.tick(SimTime::ZERO).unwrap();
    machine.transition(firing, SimDuration::from_secs(1.0), SimTime::ZERO);

    // the update listener cancels before the pending change becomes due
    machine.tick(SimTime::from_secs(5.0)).unwrap();
    assert_eq!(machine.current(), Some(holding));
    assert_eq!(machine.pending(), None);
}

#[test]
#[should_panic(expected = "transition delay must not be negative")]
fn a_negative_transition_delay_is_rejected() {
    let mut builder = StateGraphBuilder::new();
    let s0 = builder.state("s0");
    let graph = Rc::new(builder.build());

    let mut machine = StateMachine::new(graph);
    machine.transition(s0, SimDuration::from_secs(-1.0), SimTime::from_secs(10.0));
}

#[test]
#[should_panic(expected = "not a state in this machine's graph")]
fn transition_to_a_foreign_state_id_panics() {
    let mut big = StateGraphBuilder::new();
    big.state("a");
    big.state("b");
    let foreign = big.state("c");

    let mut builder = StateGraphBuilder::new();
    builder.state("only");
    let graph = Rc::new(builder.build());

    let mut machine = StateMachine::new(graph);
    machine.transition(foreign, SimDuration::ZERO, SimTime::ZERO);
}
