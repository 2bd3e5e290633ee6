//! Simulator-driven ATLAS multiplication tests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use super::state::AtlasMultState;
use crate::{
    multiplication::mult_shares::OperandShares,
    random::double_sharing::DoubleSharing,
    session::{Session, SessionConfig, TransportSecurity},
    simulator::{InitializedProtocol, Protocol, SymmetricProtocolSimulator},
};
use anyhow::{anyhow, Error};
use basic_types::PartyId;
use math_lib::modular::{M61Prime, ModularNumber};
use rstest::rstest;
use shamir_sharing::{
    protocol::PolyDegree,
    secret_sharer::{PartyShares, SecretSharer, ShamirSecretSharer},
};
use std::{collections::HashMap, sync::Arc};

type Prime = M61Prime;

struct AtlasProtocol {
    polynomial_degree: u64,
    king_base: usize,
    pairs: Vec<(ModularNumber<Prime>, ModularNumber<Prime>)>,
}

struct PrepareOutput {
    parties: Vec<PartyId>,
    party_operands: HashMap<PartyId, Vec<OperandShares<Prime>>>,
    party_doubles: HashMap<PartyId, Vec<DoubleSharing<Prime>>>,
}

impl AtlasProtocol {
    fn new(
        polynomial_degree: u64,
        king_base: usize,
        pairs: Vec<(ModularNumber<Prime>, ModularNumber<Prime>)>,
    ) -> Self {
        Self { polynomial_degree, king_base, pairs }
    }

    // Deals operand shares and consistent double sharings for every party.
    fn deal(&self, parties: &[PartyId]) -> Result<PrepareOutput, Error> {
        let mut parties = parties.to_vec();
        parties.sort();
        let sharer = ShamirSecretSharer::<Prime>::new(parties[0].clone(), self.polynomial_degree, parties.clone())?;

        let mut party_operands: HashMap<PartyId, Vec<OperandShares<Prime>>> = HashMap::new();
        let mut party_doubles: HashMap<PartyId, Vec<DoubleSharing<Prime>>> = HashMap::new();
        for (left, right) in &self.pairs {
            let left_shares: PartyShares<ModularNumber<Prime>> = sharer.generate_shares(left, PolyDegree::T)?;
            let right_shares: PartyShares<ModularNumber<Prime>> = sharer.generate_shares(right, PolyDegree::T)?;
            let random = ModularNumber::gen_random();
            let degree_t: PartyShares<ModularNumber<Prime>> = sharer.generate_shares(&random, PolyDegree::T)?;
            let degree_2t: PartyShares<ModularNumber<Prime>> = sharer.generate_shares(&random, PolyDegree::TwoT)?;
            for party in &parties {
                party_operands
                    .entry(party.clone())
                    .or_default()
                    .push(OperandShares::single(left_shares[party], right_shares[party]));
                party_doubles
                    .entry(party.clone())
                    .or_default()
                    .push(DoubleSharing { degree_t: degree_t[party], degree_2t: degree_2t[party] });
            }
        }
        Ok(PrepareOutput { parties, party_operands, party_doubles })
    }
}

impl Protocol for AtlasProtocol {
    type State = AtlasMultState<Prime>;
    type PrepareOutput = PrepareOutput;

    fn prepare(&self, parties: &[PartyId]) -> Result<Self::PrepareOutput, Error> {
        self.deal(parties)
    }

    fn initialize(
        &self,
        party_id: PartyId,
        prepare_output: &Self::PrepareOutput,
    ) -> Result<InitializedProtocol<Self::State>, Error> {
        let operands =
            prepare_output.party_operands.get(&party_id).ok_or_else(|| anyhow!("operands not found"))?.clone();
        let doubles =
            prepare_output.party_doubles.get(&party_id).ok_or_else(|| anyhow!("doubles not found"))?.clone();
        let sharer = ShamirSecretSharer::new(party_id, self.polynomial_degree, prepare_output.parties.clone())?;
        let (state, messages) = AtlasMultState::new(operands, doubles, self.king_base, Arc::new(sharer))?;
        Ok(InitializedProtocol::new(state, messages))
    }
}

fn recover_products(
    outputs: Vec<crate::simulator::PartyOutput<AtlasMultState<Prime>>>,
    polynomial_degree: u64,
) -> Vec<ModularNumber<Prime>> {
    let mut parties: Vec<_> = outputs.iter().map(|output| output.party_id.clone()).collect();
    parties.sort();
    let sharer = ShamirSecretSharer::<Prime>::new(parties[0].clone(), polynomial_degree, parties).unwrap();
    let shares: PartyShares<Vec<ModularNumber<Prime>>> =
        outputs.into_iter().map(|output| (output.party_id, output.output)).collect();
    sharer.recover(shares).unwrap()
}

#[rstest]
#[case::single(1)]
#[case::batch(5)]
fn two_rounds_regardless_of_batch_size(#[case] batch_size: usize) {
    let pairs: Vec<_> =
        (0..batch_size).map(|_| (ModularNumber::gen_random(), ModularNumber::gen_random())).collect();
    let expected: Vec<_> = pairs.iter().map(|(left, right)| *left * right).collect();

    let protocol = AtlasProtocol::new(1, 0, pairs);
    let simulator = SymmetricProtocolSimulator::new(3, 10);
    let (outputs, rounds) = simulator.run_protocol_counting_rounds(&protocol).unwrap();
    // Mask-to-king plus king-reshare: the round count is fixed at two.
    assert_eq!(rounds, 2);
    assert_eq!(recover_products(outputs, 1), expected);
}

#[rstest]
#[case::base_zero(0)]
#[case::base_one(1)]
#[case::base_wraps(7)]
fn king_rotation_offsets(#[case] king_base: usize) {
    let pairs: Vec<_> = (0..4).map(|_| (ModularNumber::gen_random(), ModularNumber::gen_random())).collect();
    let expected: Vec<_> = pairs.iter().map(|(left, right)| *left * right).collect();

    let protocol = AtlasProtocol::new(1, king_base, pairs);
    let simulator = SymmetricProtocolSimulator::new(3, 10);
    let outputs = simulator.run_protocol(&protocol).unwrap();
    assert_eq!(recover_products(outputs, 1), expected);
}

#[test]
fn five_parties_threshold_two() {
    let pairs: Vec<_> = (0..3).map(|_| (ModularNumber::gen_random(), ModularNumber::gen_random())).collect();
    let expected: Vec<_> = pairs.iter().map(|(left, right)| *left * right).collect();

    let protocol = AtlasProtocol::new(2, 0, pairs);
    let simulator = SymmetricProtocolSimulator::new(5, 10);
    let (outputs, rounds) = simulator.run_protocol_counting_rounds(&protocol).unwrap();
    assert_eq!(rounds, 2);
    assert_eq!(recover_products(outputs, 2), expected);
}

// Runs the batch through a session so the pool bookkeeping and the king
// cursor are exercised too.
struct SessionAtlasProtocol {
    inner: AtlasProtocol,
}

impl Protocol for SessionAtlasProtocol {
    type State = AtlasMultState<Prime>;
    type PrepareOutput = PrepareOutput;

    fn prepare(&self, parties: &[PartyId]) -> Result<Self::PrepareOutput, Error> {
        self.inner.deal(parties)
    }

    fn initialize(
        &self,
        party_id: PartyId,
        prepare_output: &Self::PrepareOutput,
    ) -> Result<InitializedProtocol<Self::State>, Error> {
        let operands =
            prepare_output.party_operands.get(&party_id).ok_or_else(|| anyhow!("operands not found"))?.clone();
        let doubles =
            prepare_output.party_doubles.get(&party_id).ok_or_else(|| anyhow!("doubles not found"))?.clone();
        let config = SessionConfig::new(
            prepare_output.parties.clone(),
            party_id,
            self.inner.polynomial_degree,
            TransportSecurity::EncryptedAuthenticated,
        );
        let mut session = Session::<Prime>::new(config)?;
        session.double_sharings_mut().extend(doubles);
        let (state, messages) = session.atlas_mult(operands)?;
        Ok(InitializedProtocol::new(state, messages))
    }
}

#[test]
fn session_drives_a_batch() {
    let pairs: Vec<_> = (0..2).map(|_| (ModularNumber::gen_random(), ModularNumber::gen_random())).collect();
    let expected: Vec<_> = pairs.iter().map(|(left, right)| *left * right).collect();

    let protocol = SessionAtlasProtocol { inner: AtlasProtocol::new(1, 0, pairs) };
    let simulator = SymmetricProtocolSimulator::new(3, 10);
    let outputs = simulator.run_protocol(&protocol).unwrap();
    assert_eq!(recover_products(outputs, 1), expected);
}

#[test]
fn pool_exhaustion_is_loud() {
    let parties: Vec<_> = (1..=3usize).map(PartyId::from).collect();
    let config =
        SessionConfig::new(parties.clone(), parties[0].clone(), 1, TransportSecurity::EncryptedAuthenticated);
    let mut session = Session::<Prime>::new(config).unwrap();
    let operands = vec![OperandShares::single(ModularNumber::ONE, ModularNumber::ONE)];
    assert!(session.atlas_mult(operands).is_err());
}
