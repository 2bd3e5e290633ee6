//! Simulator-driven double sharing tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use super::state::DoubleSharingState;
use crate::simulator::{InitializedProtocol, Protocol, SymmetricProtocolSimulator};
use anyhow::Error;
use basic_types::PartyId;
use math_lib::modular::{M61Prime, ModularNumber};
use shamir_sharing::secret_sharer::{PartyShares, SecretSharer, ShamirSecretSharer};
use std::{collections::HashMap, sync::Arc};

type Prime = M61Prime;

struct DoubleSharingProtocol {
    polynomial_degree: u64,
    element_count: usize,
}

struct PrepareOutput {
    parties: Vec<PartyId>,
}

impl Protocol for DoubleSharingProtocol {
    type State = DoubleSharingState<Prime>;
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
        let sharer = ShamirSecretSharer::new(party_id, self.polynomial_degree, prepare_output.parties.clone())?;
        let (state, messages) = DoubleSharingState::new(self.element_count, Arc::new(sharer))?;
        Ok(InitializedProtocol::new(state, messages))
    }
}

#[test]
fn both_degrees_share_one_value() {
    // n = 5, t = 2: the degree-2t parts need all 2t+1 = 5 shares to
    // reconstruct, the degree-t parts only t+1 = 3.
    let protocol = DoubleSharingProtocol { polynomial_degree: 2, element_count: 4 };
    let simulator = SymmetricProtocolSimulator::new(5, 10);
    let outputs = simulator.run_protocol(&protocol).unwrap();
    assert_eq!(outputs.len(), 5);

    let mut parties: Vec<_> = outputs.iter().map(|output| output.party_id.clone()).collect();
    parties.sort();
    let sharer = ShamirSecretSharer::<Prime>::new(parties[0].clone(), 2, parties.clone()).unwrap();

    let by_party: HashMap<_, _> = outputs.into_iter().map(|output| (output.party_id, output.output)).collect();

    for index in 0..protocol.element_count {
        let mut degree_t_shares: PartyShares<ModularNumber<Prime>> = PartyShares::default();
        let mut degree_2t_shares: PartyShares<ModularNumber<Prime>> = PartyShares::default();
        for party in &parties {
            let sharing = by_party[party][index];
            degree_t_shares.insert(party.clone(), sharing.degree_t);
            degree_2t_shares.insert(party.clone(), sharing.degree_2t);
        }
        let from_t = sharer.recover(degree_t_shares).unwrap();
        let from_2t = sharer.recover(degree_2t_shares).unwrap();
        assert_eq!(from_t, from_2t, "double sharing {index} is split across two values");
    }
}

#[test]
fn requested_count_produced() {
    for element_count in [1, 3, 6] {
        let protocol = DoubleSharingProtocol { polynomial_degree: 1, element_count };
        let simulator = SymmetricProtocolSimulator::new(3, 10);
        let outputs = simulator.run_protocol(&protocol).unwrap();
        for output in outputs {
            assert_eq!(output.output.len(), element_count);
        }
    }
}
