//! Modular number operations.

use super::{ModularNumber, Prime};
use crate::{errors::DivByZero, fields::Inv};
use std::ops::{Add, Div, Mul, Neg, Sub};

fn add_mod<T: Prime>(left: u64, right: u64) -> u64 {
    let sum = u128::from(left) + u128::from(right);
    (sum % u128::from(T::MODULO)) as u64
}

fn sub_mod<T: Prime>(left: u64, right: u64) -> u64 {
    let diff = u128::from(left) + u128::from(T::MODULO) - u128::from(right);
    (diff % u128::from(T::MODULO)) as u64
}

fn mul_mod<T: Prime>(left: u64, right: u64) -> u64 {
    let product = u128::from(left) * u128::from(right);
    (product % u128::from(T::MODULO)) as u64
}

impl<T: Prime> Add<&ModularNumber<T>> for ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn add(self, other: &ModularNumber<T>) -> ModularNumber<T> {
        (&self).add(other)
    }
}

impl<T: Prime> Add for &ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn add(self, other: &ModularNumber<T>) -> ModularNumber<T> {
        ModularNumber::new(add_mod::<T>(self.value, other.value))
    }
}

impl<T: Prime> Sub<&ModularNumber<T>> for ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn sub(self, other: &ModularNumber<T>) -> ModularNumber<T> {
        (&self).sub(other)
    }
}

impl<T: Prime> Sub for &ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn sub(self, other: &ModularNumber<T>) -> ModularNumber<T> {
        ModularNumber::new(sub_mod::<T>(self.value, other.value))
    }
}

impl<T: Prime> Mul<&ModularNumber<T>> for ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn mul(self, other: &ModularNumber<T>) -> ModularNumber<T> {
        (&self).mul(other)
    }
}

impl<T: Prime> Mul for &ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn mul(self, other: &ModularNumber<T>) -> ModularNumber<T> {
        ModularNumber::new(mul_mod::<T>(self.value, other.value))
    }
}

impl<T: Prime> Div<&ModularNumber<T>> for ModularNumber<T> {
    type Output = Result<ModularNumber<T>, DivByZero>;

    fn div(self, other: &ModularNumber<T>) -> Self::Output {
        (&self).div(other)
    }
}

impl<T: Prime> Div for &ModularNumber<T> {
    type Output = Result<ModularNumber<T>, DivByZero>;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, other: &ModularNumber<T>) -> Self::Output {
        let inverse = (*other).inv()?;
        Ok(self * &inverse)
    }
}

impl<T: Prime> Neg for ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn neg(self) -> Self::Output {
        (&self).neg()
    }
}

impl<T: Prime> Neg for &ModularNumber<T> {
    type Output = ModularNumber<T>;

    fn neg(self) -> Self::Output {
        ModularNumber::new(sub_mod::<T>(0, self.value))
    }
}

impl<T: Prime> Inv for ModularNumber<T> {
    type Output = Result<ModularNumber<T>, DivByZero>;

    fn inv(self) -> Self::Output {
        if self.is_zero() {
            return Err(DivByZero);
        }
        Ok(self.inverse())
    }
}
