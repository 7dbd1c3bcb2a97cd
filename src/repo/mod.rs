//! Per-entity query surfaces. Every repository borrows any sea-orm
//! connection, so the same calls run against the pool or inside an open
//! transaction.

mod affiliates;
mod merchants;
mod orders;
mod users;

pub use affiliates::Affiliates;
pub use merchants::Merchants;
pub use orders::{NewOrder, Orders};
pub use users::Users;
