//! Tests for the state machine driver.

#![allow(clippy::indexing_slicing, clippy::unwrap_used, clippy::arithmetic_side_effects)]

use crate::{
    state::{Recipient, RecipientMessage, StateMachineStateExt, StateMachineStateOutput, StateMachineStateResult},
    StateMachine, StateMachineState,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// A three-round protocol that waits for `expected` distinct senders per
// round. Rounds must be fed in order; later-round messages get buffered.
struct Round {
    expected: usize,
    senders: HashSet<u32>,
}

impl Round {
    fn new(expected: usize) -> Self {
        Self { expected, senders: HashSet::new() }
    }
}

enum WaiterState {
    WaitingFirst(Round),
    WaitingSecond(Round),
    WaitingThird(Round),
}

use WaiterState::*;

impl std::fmt::Display for WaiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitingFirst(_) => write!(f, "WaitingFirst"),
            WaitingSecond(_) => write!(f, "WaitingSecond"),
            WaitingThird(_) => write!(f, "WaitingThird"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
enum WaiterMessage {
    First(u32),
    Second(u32),
    Third(u32),
}

impl StateMachineState for WaiterState {
    type RecipientId = u32;
    type InputMessage = WaiterMessage;
    type OutputMessage = WaiterMessage;
    type FinalResult = &'static str;

    fn is_completed(&self) -> bool {
        match self {
            WaitingFirst(round) | WaitingSecond(round) | WaitingThird(round) => round.senders.len() == round.expected,
        }
    }

    fn try_next(self) -> StateMachineStateResult<Self> {
        match self {
            WaitingFirst(round) => {
                let message = RecipientMessage::new(Recipient::Single(42), WaiterMessage::Second(0));
                Ok(StateMachineStateOutput::Messages(WaitingSecond(Round::new(round.expected)), vec![message]))
            }
            WaitingSecond(round) => {
                let message = RecipientMessage::new(Recipient::Single(42), WaiterMessage::Third(0));
                Ok(StateMachineStateOutput::Messages(WaitingThird(Round::new(round.expected)), vec![message]))
            }
            WaitingThird(_) => Ok(StateMachineStateOutput::Final("done")),
        }
    }

    fn handle_message(mut self, message: Self::InputMessage) -> StateMachineStateResult<Self> {
        use WaiterMessage::*;
        match (message, &mut self) {
            (First(sender), WaitingFirst(round))
            | (Second(sender), WaitingSecond(round))
            | (Third(sender), WaitingThird(round)) => {
                round.senders.insert(sender);
                self.advance_if_completed()
            }
            (message, _) => Ok(StateMachineStateOutput::OutOfOrder(self, message)),
        }
    }
}

#[test]
fn ordered_execution() {
    let mut machine = StateMachine::new(WaiterState::WaitingFirst(Round::new(2)));
    assert!(!machine.is_state_completed());

    machine.handle_message(WaiterMessage::First(1)).unwrap().into_empty().unwrap();
    machine.handle_message(WaiterMessage::First(2)).unwrap().into_messages().unwrap();
    machine.handle_message(WaiterMessage::Second(1)).unwrap().into_empty().unwrap();
    machine.handle_message(WaiterMessage::Second(2)).unwrap().into_messages().unwrap();
    machine.handle_message(WaiterMessage::Third(1)).unwrap().into_empty().unwrap();
    let result = machine.handle_message(WaiterMessage::Third(2)).unwrap().into_final().unwrap();
    assert_eq!(result, "done");
    assert!(machine.is_finished());
}

#[test]
fn out_of_order_messages_are_buffered() {
    let mut machine = StateMachine::new(WaiterState::WaitingFirst(Round::new(1)));

    // These belong to later rounds and must not be lost.
    machine.handle_message(WaiterMessage::Second(1)).unwrap().into_empty().unwrap();
    machine.handle_message(WaiterMessage::Third(1)).unwrap().into_empty().unwrap();

    // Completing the first round should drain the buffer and run the
    // machine all the way to the end.
    let result = machine.handle_message(WaiterMessage::First(1)).unwrap().into_final().unwrap();
    assert_eq!(result, "done");
}

#[test]
fn finished_machine_rejects_messages() {
    let mut machine = StateMachine::new(WaiterState::WaitingFirst(Round::new(1)));
    machine.handle_message(WaiterMessage::Second(1)).unwrap().into_empty().unwrap();
    machine.handle_message(WaiterMessage::Third(1)).unwrap().into_final().unwrap_err();
    // Not finished yet: third-round message was buffered, not final.
    machine.handle_message(WaiterMessage::First(1)).unwrap().into_final().unwrap();
    assert!(machine.is_finished());
    assert!(machine.handle_message(WaiterMessage::First(2)).is_err());
}
