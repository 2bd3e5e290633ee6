//! Definitions for fields.

use crate::{
    errors::DivByZero,
    modular::{DecodeError, EncodedModularNumber, ModularNumber, Prime},
    polynomial::Polynomial,
    serde::Serde,
};
use rand::{CryptoRng, Rng};
use std::{
    fmt::Debug,
    hash::Hash,
    marker::PhantomData,
    ops::{Add, Div, Mul, Neg, Sub},
};

/// Multiplicative inverse of a field element.
pub trait Inv {
    /// The inversion output.
    type Output;

    /// Computes the multiplicative inverse.
    fn inv(self) -> Self::Output;
}

/// A finite field: element arithmetic, abscissa mapping and wire encoding.
pub trait Field: Clone + Debug + Serde {
    /// The type used to represent an element of this field.
    type Element: Clone
        + Copy
        + PartialEq
        + Debug
        + for<'a> Add<&'a Self::Element, Output = Self::Element>
        + for<'a> Mul<&'a Self::Element, Output = Self::Element>
        + for<'a> Sub<&'a Self::Element, Output = Self::Element>
        + for<'a> Div<&'a Self::Element, Output = Result<Self::Element, DivByZero>>
        + Inv<Output = Result<Self::Element, DivByZero>>
        + Neg<Output = Self::Element>
        + Ord
        + Send
        + for<'a> TryFrom<&'a Self::EncodedElement, Error = Self::DecodeError>
        + 'static;

    /// The transport form of `Self::Element`.
    type EncodedElement: Clone + Debug + Serde + Send + for<'a> From<&'a Self::Element> + 'static;

    /// The plain representation of an abscissa in this field.
    type Inner: Eq + Hash + Clone + Ord + Copy + Debug;

    /// The error produced when decoding an element fails.
    type DecodeError: std::error::Error + Send + Sync + 'static;

    /// The multiplicative identity.
    const ONE: Self::Element;

    /// The additive identity.
    const ZERO: Self::Element;

    /// Lifts an abscissa into a field element.
    fn as_element(inner: Self::Inner) -> Self::Element;

    /// Extracts the plain representation of an element.
    fn as_inner(element: Self::Element) -> Self::Inner;

    /// The first `total` abscissas of this field, starting at zero.
    fn inner_elements(total: u32) -> Result<Vec<Self::Inner>, TooManyElements>;

    /// Builds a polynomial over this field.
    fn polynomial(coefficients: Vec<Self::Element>) -> Polynomial<Self> {
        Polynomial::new(coefficients)
    }

    /// Samples a random element.
    fn gen_random_element<R: Rng + CryptoRng>(rng: &mut R) -> Self::Element;

    /// Encodes elements for transport.
    fn encode<'a, I>(elements: I) -> Vec<Self::EncodedElement>
    where
        I: IntoIterator<Item = &'a Self::Element>,
    {
        elements.into_iter().map(Self::EncodedElement::from).collect()
    }

    /// Attempts to decode elements.
    fn try_decode<'a, I>(elements: I) -> Result<Vec<Self::Element>, Self::DecodeError>
    where
        I: IntoIterator<Item = &'a Self::EncodedElement>,
    {
        elements.into_iter().map(Self::Element::try_from).collect()
    }
}

/// The field of integers modulo a prime.
#[derive(Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimeField<T>(PhantomData<T>);

impl<T: Prime> Debug for PrimeField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrimeField<{}>", T::MODULO)
    }
}

impl<T> Default for PrimeField<T> {
    fn default() -> Self {
        Self(Default::default())
    }
}

impl<T: Prime> Field for PrimeField<T> {
    type Element = ModularNumber<T>;
    type EncodedElement = EncodedModularNumber;
    type Inner = u64;
    type DecodeError = DecodeError;

    const ZERO: Self::Element = ModularNumber::ZERO;
    const ONE: Self::Element = ModularNumber::ONE;

    fn as_element(inner: Self::Inner) -> Self::Element {
        ModularNumber::new(inner)
    }

    fn as_inner(element: Self::Element) -> Self::Inner {
        element.into_value()
    }

    fn inner_elements(total: u32) -> Result<Vec<Self::Inner>, TooManyElements> {
        if u64::from(total) > T::MODULO {
            return Err(TooManyElements);
        }
        Ok((0..u64::from(total)).collect())
    }

    fn gen_random_element<R: Rng + CryptoRng>(rng: &mut R) -> Self::Element {
        ModularNumber::gen_random_with_rng(rng)
    }
}

/// Too many elements were requested from a field.
#[derive(Debug, thiserror::Error)]
#[error("too many elements")]
pub struct TooManyElements;
