pub mod affiliate;
pub mod gateway;
pub mod merchant;
pub mod notify;
pub mod order;
pub mod payout;
pub mod queue;
#[cfg(test)]
pub mod test_utils;

pub use affiliate::Affiliates;
pub use merchant::Merchants;
pub use order::Orders;
pub use payout::Payouts;

/// Services bound to one borrow of the application state.
pub struct Services<'a> {
  pub affiliate: Affiliates<'a>,
  pub merchant: Merchants<'a>,
  pub order: Orders<'a>,
  pub payout: Payouts<'a>,
}
