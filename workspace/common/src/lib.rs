//! Shared primitives used by the API binary and the compute services.
//!
//! Nothing in here touches the database: these are the small value types and
//! validation rules that both sides of the application agree on.

pub mod cpf;
pub mod money;
pub mod period;

pub use cpf::is_valid_cpf;
pub use money::{percentage, round_money};
pub use period::{DateRange, Month, PeriodError};
