//! Strongly typed physical and monetary quantities used by the cost calculations.
//!
//! Each quantity wraps an `f64` in the unit noted on its type. Only the products and quotients
//! declared at the bottom of this module are allowed, so mixing up (say) $/MW and $/MWh is a type
//! error.
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};
use std::ops::{Div, Mul};

macro_rules! quantity {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// The raw value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the raw value is neither infinite nor NaN
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<F64Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

/// Scaling and ratio operations shared by every dimensioned quantity
macro_rules! scalable {
    ($($name:ident),+) => {$(
        impl Mul<Dimensionless> for $name {
            type Output = Self;
            fn mul(self, factor: Dimensionless) -> Self {
                Self(self.0 * factor.0)
            }
        }

        impl Div<Dimensionless> for $name {
            type Output = Self;
            fn div(self, divisor: Dimensionless) -> Self {
                Self(self.0 / divisor.0)
            }
        }

        impl Div for $name {
            type Output = Dimensionless;
            fn div(self, other: Self) -> Dimensionless {
                Dimensionless(self.0 / other.0)
            }
        }
    )+};
}

/// Declare that `$a * $b` gives `$c`, which also lets `$c` be divided by either factor
macro_rules! product {
    ($a:ident * $b:ident = $c:ident) => {
        impl Mul<$b> for $a {
            type Output = $c;
            fn mul(self, other: $b) -> $c {
                $c(self.0 * other.0)
            }
        }

        impl Mul<$a> for $b {
            type Output = $c;
            fn mul(self, other: $a) -> $c {
                $c(self.0 * other.0)
            }
        }

        impl Div<$a> for $c {
            type Output = $b;
            fn div(self, other: $a) -> $b {
                $b(self.0 / other.0)
            }
        }

        impl Div<$b> for $c {
            type Output = $a;
            fn div(self, other: $b) -> $a {
                $a(self.0 / other.0)
            }
        }
    };
}

quantity!(
    /// A pure number, such as a capacity factor
    Dimensionless
);

impl Mul for Dimensionless {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Self(self.0 * other.0)
    }
}

quantity!(
    /// US dollars
    Money
);
quantity!(
    /// Hours of operation
    Hours
);
quantity!(
    /// Electrical energy in MWh
    Energy
);
quantity!(
    /// Generating capacity in MW
    Capacity
);
quantity!(
    /// Tonnes of CO2
    Emissions
);
quantity!(
    /// Overnight capital cost in $/MW
    MoneyPerCapacity
);
quantity!(
    /// Cost of generation in $/MWh
    MoneyPerEnergy
);
quantity!(
    /// Carbon intensity in tonnes of CO2 per MWh
    EmissionsPerEnergy
);

scalable!(
    Money,
    Hours,
    Energy,
    Capacity,
    Emissions,
    MoneyPerCapacity,
    MoneyPerEnergy,
    EmissionsPerEnergy
);

product!(Capacity * Hours = Energy);
product!(MoneyPerCapacity * Capacity = Money);
product!(MoneyPerEnergy * Energy = Money);
product!(EmissionsPerEnergy * Energy = Emissions);

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_capacity_times_hours() {
        let energy = Capacity(2.0) * Hours(3.0);
        assert_eq!(energy, Energy(6.0));
        assert_eq!(energy / Capacity(2.0), Hours(3.0));
        assert_eq!(energy / Hours(3.0), Capacity(2.0));
    }

    #[test]
    fn test_price_of_energy() {
        let price = Money(100.0) / Energy(8.0);
        assert_approx_eq!(MoneyPerEnergy, price, MoneyPerEnergy(12.5));
        assert_approx_eq!(Money, Energy(8.0) * price, Money(100.0));
    }

    #[test]
    fn test_scaling() {
        assert_eq!(Money(3.0) / Money(4.0), Dimensionless(0.75));
        assert_eq!(Capacity(10.0) * Dimensionless(0.5), Capacity(5.0));
        assert_eq!(Money(9.0) / Dimensionless(3.0), Money(3.0));
    }
}
