//! Forwards arithmetic operator traits to the single field of a newtype. One invocation covers all
//! the operators a type wants:
//!
//! ```ignore
//! op!(Money {
//!     binary Add => add,
//!     inplace AddAssign => add_assign,
//!     unary Neg => neg,
//! });
//! ```
#[macro_export]
macro_rules! op {
    ($t:ident { $($kind:ident $op_trait:ident => $op_fn:ident),+ $(,)? }) => {
        $($crate::op!(@ $kind $t, $op_trait, $op_fn);)+
    };

    (@ binary $t:ident, $op_trait:ident, $op_fn:ident) => {
        impl $op_trait for $t {
            type Output = Self;

            fn $op_fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$op_fn(rhs.0))
            }
        }
    };

    (@ inplace $t:ident, $op_trait:ident, $op_fn:ident) => {
        impl $op_trait for $t {
            fn $op_fn(&mut self, rhs: Self) {
                self.0.$op_fn(rhs.0)
            }
        }
    };

    (@ unary $t:ident, $op_trait:ident, $op_fn:ident) => {
        impl $op_trait for $t {
            type Output = Self;

            fn $op_fn(self) -> Self::Output {
                Self(self.0.$op_fn())
            }
        }
    };
}
