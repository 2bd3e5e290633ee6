//! Simulator-driven RAN protocol tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use super::state::RandomSharesState;
use crate::simulator::{InitializedProtocol, Protocol, SymmetricProtocolSimulator};
use anyhow::Error;
use basic_types::PartyId;
use math_lib::modular::{M61Prime, ModularNumber};
use shamir_sharing::secret_sharer::{SecretSharer, ShamirSecretSharer};
use std::{collections::HashMap, sync::Arc};

type Prime = M61Prime;

struct RandomSharesProtocol {
    polynomial_degree: u64,
    element_count: usize,
}

struct PrepareOutput {
    parties: Vec<PartyId>,
}

impl Protocol for RandomSharesProtocol {
    type State = RandomSharesState<Prime>;
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
        let (state, messages) = RandomSharesState::new(self.element_count, Arc::new(sharer))?;
        Ok(InitializedProtocol::new(state, messages))
    }
}

#[test]
fn outputs_are_consistent_sharings() {
    let protocol = RandomSharesProtocol { polynomial_degree: 1, element_count: 5 };
    let simulator = SymmetricProtocolSimulator::new(4, 10);
    let outputs = simulator.run_protocol(&protocol).unwrap();
    assert_eq!(outputs.len(), 4);

    let mut parties: Vec<_> = outputs.iter().map(|output| output.party_id.clone()).collect();
    parties.sort();
    let sharer = ShamirSecretSharer::<Prime>::new(parties[0].clone(), 1, parties.clone()).unwrap();

    let shares_by_party: HashMap<_, _> =
        outputs.into_iter().map(|output| (output.party_id, output.output)).collect();

    for index in 0..protocol.element_count {
        // Every t+1 subset must agree on the underlying secret: that's what
        // it means for the output to be a consistent degree-t sharing.
        let first_pair = vec![
            (parties[0].clone(), shares_by_party[&parties[0]][index]),
            (parties[1].clone(), shares_by_party[&parties[1]][index]),
        ];
        let second_pair = vec![
            (parties[2].clone(), shares_by_party[&parties[2]][index]),
            (parties[3].clone(), shares_by_party[&parties[3]][index]),
        ];
        let first: ModularNumber<Prime> = sharer.recover(first_pair).unwrap();
        let second = sharer.recover(second_pair).unwrap();
        assert_eq!(first, second, "output {index} is not a consistent sharing");
    }
}

#[test]
fn requested_count_produced() {
    for element_count in [1, 2, 3, 7] {
        let protocol = RandomSharesProtocol { polynomial_degree: 1, element_count };
        let simulator = SymmetricProtocolSimulator::new(3, 10);
        let outputs = simulator.run_protocol(&protocol).unwrap();
        for output in outputs {
            assert_eq!(output.output.len(), element_count);
        }
    }
}
