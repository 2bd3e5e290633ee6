//! Serde abstractions.

/// A trait that stands in for serde bounds when the `serde` feature is on.
#[cfg(feature = "serde")]
pub trait Serde: serde::Serialize + serde::de::DeserializeOwned {}

#[cfg(feature = "serde")]
impl<T: serde::Serialize + serde::de::DeserializeOwned> Serde for T {}

/// A trait that stands in for serde bounds when the `serde` feature is on.
#[cfg(not(feature = "serde"))]
pub trait Serde {}

#[cfg(not(feature = "serde"))]
impl<T> Serde for T {}
