//! `josh-value` — the tagged value algebra shared by attribute storage and
//! handler expression evaluation.
//!
//! | Module         | Contents                                             |
//! |----------------|--------------------------------------------------------|
//! | [`value`]      | `Value`, `TypeTag`, the widening lattice, arithmetic    |
//! | [`decimal`]    | `DecimalValue`, `DecimalMode` (float vs. big-decimal)   |
//! | [`distribution`] | `RealizedDistribution`                               |
//! | [`cache`]      | `OperandCache`, the memoized operand-pair widening cache |
//! | [`error`]      | `ValueError`, `ValueResult`                            |

pub mod cache;
pub mod decimal;
pub mod distribution;
pub mod error;
pub mod value;


pub use cache::OperandCache;
pub use decimal::{DecimalMode, DecimalValue};
pub use distribution::RealizedDistribution;
pub use error::{ValueError, ValueResult};
pub use value::{TypeTag, Value};
