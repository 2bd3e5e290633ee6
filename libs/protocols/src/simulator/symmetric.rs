//! Symmetric protocol simulator.
//!
//! A protocol is symmetric when every party runs the same state machine and
//! the same steps; all of the protocols in this crate qualify. The simulator
//! is a plain message router with no networking: it takes the messages each
//! party's state machine emits and feeds them to the addressed parties,
//! round after round, until every party produces a final output.

use anyhow::{anyhow, Error};
use basic_types::{PartyId, PartyMessage};
use rayon::prelude::*;
use state_machine::{
    sm::StateMachineOutput,
    state::{Recipient, StateMachineMessage},
    StateMachine, StateMachineState,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Runs a [`Protocol`] across a simulated network of parties.
#[derive(Clone)]
pub struct SymmetricProtocolSimulator {
    max_rounds: usize,
    network_size: usize,
}

impl SymmetricProtocolSimulator {
    /// Constructs a new simulator.
    ///
    /// # Arguments
    /// - `network_size` - The number of parties in the simulated network.
    /// - `max_rounds` - The number of rounds after which the protocol is
    ///   assumed to be stuck.
    pub fn new(network_size: usize, max_rounds: usize) -> Self {
        Self { max_rounds, network_size }
    }

    /// Runs the given protocol to completion and returns every party's
    /// output.
    pub fn run_protocol<P: Protocol, M>(&self, protocol: &P) -> Result<Vec<PartyOutput<P::State>>, Error>
    where
        P::State: StateMachineState<RecipientId = PartyId, InputMessage = PartyMessage<M>, OutputMessage = M>
            + Send
            + Sync,
        <P::State as StateMachineState>::InputMessage: Sync + Send,
        M: Clone + Send,
    {
        self.run_protocol_counting_rounds(protocol).map(|(outputs, _)| outputs)
    }

    /// Runs the given protocol and additionally reports how many message
    /// rounds it took, which is what round-count properties assert on.
    pub fn run_protocol_counting_rounds<P: Protocol, M>(
        &self,
        protocol: &P,
    ) -> Result<(Vec<PartyOutput<P::State>>, usize), Error>
    where
        P::State: StateMachineState<RecipientId = PartyId, InputMessage = PartyMessage<M>, OutputMessage = M>
            + Send
            + Sync,
        <P::State as StateMachineState>::InputMessage: Sync + Send,
        M: Clone + Send,
    {
        let context = self.initialize_protocol(protocol)?;
        self.run_until_completion(context)
    }

    fn run_until_completion<S, M>(&self, context: ProtocolContext<S>) -> Result<(Vec<PartyOutput<S>>, usize), Error>
    where
        S: StateMachineState<RecipientId = PartyId, InputMessage = PartyMessage<M>, OutputMessage = M> + Send + Sync,
        S::InputMessage: Sync + Send,
        M: Clone + Send,
    {
        let mut party_states = context.party_states;
        let mut next_round_messages = context.initial_messages;
        let mut round_id = 0;
        let mut outputs = Vec::new();
        let expected_outputs = party_states.party_count();
        loop {
            let round_messages = std::mem::take(&mut next_round_messages);
            if round_messages.is_empty() {
                return Err(anyhow!("started round {round_id} without any messages"));
            }
            tracing::debug!("running round {round_id} using {} messages", round_messages.len());
            for message in round_messages {
                let (sender_party_id, message) = message.into_parts();
                let (recipients, message) = message.into_parts();
                match recipients {
                    Recipient::Single(party_id) => {
                        party_states.add_party_message(party_id, PartyMessage::new(sender_party_id, message))?
                    }
                    Recipient::Multiple(party_ids) => {
                        for party_id in party_ids {
                            party_states.add_party_message(
                                party_id,
                                PartyMessage::new(sender_party_id.clone(), message.clone()),
                            )?;
                        }
                    }
                };
            }

            let round_results: Vec<_> =
                party_states.states.par_iter_mut().map(|(_, party_state)| party_state.apply_messages()).collect();
            for result in round_results {
                match result? {
                    PartyRoundOutput::Completed(output) => {
                        outputs.push(output);
                        if outputs.len() == expected_outputs {
                            return Ok((outputs, round_id + 1));
                        }
                    }
                    PartyRoundOutput::Messages(messages) => next_round_messages.extend(messages),
                };
            }

            round_id += 1;
            if round_id >= self.max_rounds {
                return Err(anyhow!("exceeded maximum number of rounds without completing protocol"));
            }
        }
    }

    fn initialize_protocol<P: Protocol>(&self, protocol: &P) -> Result<ProtocolContext<P::State>, Error> {
        let mut parties = Vec::new();
        for _ in 0..self.network_size {
            parties.push(PartyId::from(Uuid::new_v4()));
        }
        let prepare = protocol.prepare(&parties)?;

        let mut context = ProtocolContext::default();
        for party_id in &parties {
            let InitializedProtocol { state, initial_messages } = protocol
                .initialize(party_id.clone(), &prepare)
                .map_err(|e| anyhow!("failed to initialize protocol: {e}"))?;
            context.party_states.add_party(party_id.clone(), state);
            let initial_messages =
                initial_messages.into_iter().map(|message| PartyMessage::new(party_id.clone(), message));
            context.initial_messages.extend(initial_messages);
        }
        Ok(context)
    }
}

enum PartyRoundOutput<S: StateMachineState> {
    Completed(PartyOutput<S>),
    Messages(Vec<PartyMessage<StateMachineMessage<S>>>),
}

struct PartyState<S: StateMachineState> {
    party_id: PartyId,
    state_machine: StateMachine<S>,
    input_messages: Vec<S::InputMessage>,
}

impl<S: StateMachineState> PartyState<S> {
    fn new(party_id: PartyId, state: S) -> Self {
        Self { party_id, state_machine: StateMachine::new(state), input_messages: Vec::new() }
    }

    fn apply_messages(&mut self) -> Result<PartyRoundOutput<S>, Error> {
        let mut next_round_messages = Vec::new();
        for message in std::mem::take(&mut self.input_messages) {
            match self.state_machine.handle_message(message) {
                Ok(StateMachineOutput::Final(output)) => {
                    return Ok(PartyRoundOutput::Completed(PartyOutput::new(self.party_id.clone(), output)));
                }
                Ok(StateMachineOutput::Messages(messages)) => {
                    let messages =
                        messages.into_iter().map(|message| PartyMessage::new(self.party_id.clone(), message));
                    next_round_messages.extend(messages)
                }
                Ok(StateMachineOutput::Empty) => (),
                Err(e) => return Err(anyhow!("failed to handle message: {e}")),
            }
        }
        Ok(PartyRoundOutput::Messages(next_round_messages))
    }
}

struct PartyStates<S: StateMachineState> {
    states: HashMap<PartyId, PartyState<S>>,
}

impl<S: StateMachineState> PartyStates<S> {
    fn add_party(&mut self, party_id: PartyId, state: S) {
        self.states.insert(party_id.clone(), PartyState::new(party_id, state));
    }

    fn add_party_message(&mut self, party_id: PartyId, message: S::InputMessage) -> Result<(), Error> {
        let party_state =
            self.states.get_mut(&party_id).ok_or_else(|| anyhow!("state for party {party_id:?} not found"))?;
        party_state.input_messages.push(message);
        Ok(())
    }

    fn party_count(&self) -> usize {
        self.states.len()
    }
}

struct ProtocolContext<S: StateMachineState> {
    party_states: PartyStates<S>,
    initial_messages: Vec<PartyMessage<StateMachineMessage<S>>>,
}

impl<S: StateMachineState> Default for ProtocolContext<S> {
    fn default() -> Self {
        Self { party_states: PartyStates { states: HashMap::new() }, initial_messages: Vec::new() }
    }
}

/// The final output of one party's protocol instance.
pub struct PartyOutput<S: StateMachineState> {
    /// The party id.
    pub party_id: PartyId,

    /// The output itself.
    pub output: S::FinalResult,
}

impl<S: StateMachineState> PartyOutput<S> {
    /// Constructs a new party output.
    pub fn new(party_id: PartyId, output: S::FinalResult) -> Self {
        Self { party_id, output }
    }
}

/// A runnable protocol definition.
///
/// [`prepare`][Protocol::prepare] performs network-wide setup (typically
/// dealing shares of test inputs to each party) and
/// [`initialize`][Protocol::initialize] instantiates one party's state
/// machine from it.
pub trait Protocol {
    /// The protocol state to be instantiated.
    type State: StateMachineState<RecipientId = PartyId>;

    /// The output of the prepare step.
    type PrepareOutput;

    /// Prepares the execution of the protocol for the given party set.
    fn prepare(&self, parties: &[PartyId]) -> Result<Self::PrepareOutput, Error>;

    /// Initializes the protocol instance for one party.
    fn initialize(
        &self,
        local_party_id: PartyId,
        prepare_output: &Self::PrepareOutput,
    ) -> Result<InitializedProtocol<Self::State>, Error>;
}

/// An initialized protocol instance plus its initial messages.
pub struct InitializedProtocol<S: StateMachineState> {
    /// The protocol's state.
    pub state: S,

    /// The initial messages the protocol generated.
    pub initial_messages: Vec<StateMachineMessage<S>>,
}

impl<S: StateMachineState> InitializedProtocol<S> {
    /// Constructs a new initialized protocol.
    pub fn new(state: S, initial_messages: Vec<StateMachineMessage<S>>) -> Self {
        Self { state, initial_messages }
    }
}
