//! Simulator-driven input protocol tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use super::state::InputState;
use crate::simulator::{InitializedProtocol, Protocol, SymmetricProtocolSimulator};
use anyhow::{anyhow, Error};
use basic_types::PartyId;
use math_lib::modular::{M61Prime, ModularNumber};
use shamir_sharing::secret_sharer::{PartyShares, SecretSharer, ShamirSecretSharer};
use std::sync::Arc;

type Prime = M61Prime;

struct InputProtocol {
    polynomial_degree: u64,
    values_per_party: u32,
}

struct PrepareOutput {
    parties: Vec<PartyId>,
}

impl InputProtocol {
    // The values party `index` contributes, derived from its position so
    // the test can predict them.
    fn party_values(&self, index: usize) -> Vec<ModularNumber<Prime>> {
        (0..self.values_per_party).map(|v| ModularNumber::from_u64((index as u64 + 1) * 100 + u64::from(v))).collect()
    }
}

impl Protocol for InputProtocol {
    type State = InputState<Prime>;
    type PrepareOutput = PrepareOutput;

    fn prepare(&self, parties: &[PartyId]) -> Result<Self::PrepareOutput, Error> {
        let mut parties = parties.to_vec();
        parties.sort();
        Ok(PrepareOutput { parties })
    }

    fn initialize(
        &self,
        party_id: PartyId,
        prepare_output: &Self::PrepareOutput,
    ) -> Result<InitializedProtocol<Self::State>, Error> {
        let index =
            prepare_output.parties.iter().position(|party| party == &party_id).ok_or_else(|| anyhow!("party"))?;
        let sharer = ShamirSecretSharer::new(party_id, self.polynomial_degree, prepare_output.parties.clone())?;
        let (state, messages) = InputState::new(self.party_values(index), Arc::new(sharer))?;
        Ok(InitializedProtocol::new(state, messages))
    }
}

#[test]
fn everyone_holds_shares_of_every_contribution() {
    let protocol = InputProtocol { polynomial_degree: 1, values_per_party: 2 };
    let simulator = SymmetricProtocolSimulator::new(3, 10);
    let (outputs, rounds) = simulator.run_protocol_counting_rounds(&protocol).unwrap();
    assert_eq!(outputs.len(), 3);
    // The whole exchange is a single all-to-all round.
    assert_eq!(rounds, 1);

    // Rebuild a sharer from one party's point of view to recover secrets.
    let mut parties: Vec<_> = outputs.iter().map(|output| output.party_id.clone()).collect();
    parties.sort();
    let sharer = ShamirSecretSharer::<Prime>::new(parties[0].clone(), 1, parties.clone()).unwrap();

    for (contributor_index, contributor) in parties.iter().enumerate() {
        let expected = protocol.party_values(contributor_index);
        for value_index in 0..expected.len() {
            let mut shares: PartyShares<ModularNumber<Prime>> = PartyShares::default();
            for output in &outputs {
                let contribution =
                    output.output.iter().find(|(party, _)| party == contributor).map(|(_, v)| v).unwrap();
                shares.insert(output.party_id.clone(), contribution[value_index]);
            }
            assert_eq!(sharer.recover(shares).unwrap(), expected[value_index]);
        }
    }
}

#[test]
fn zero_threshold_replicates() {
    let protocol = InputProtocol { polynomial_degree: 0, values_per_party: 1 };
    let simulator = SymmetricProtocolSimulator::new(3, 10);
    let outputs = simulator.run_protocol(&protocol).unwrap();

    let mut parties: Vec<_> = outputs.iter().map(|output| output.party_id.clone()).collect();
    parties.sort();

    // With degree zero every "share" is the value itself.
    for output in &outputs {
        for (contributor_index, contributor) in parties.iter().enumerate() {
            let expected = protocol.party_values(contributor_index);
            let contribution = output.output.iter().find(|(party, _)| party == contributor).map(|(_, v)| v).unwrap();
            assert_eq!(contribution, &expected);
        }
    }
}
