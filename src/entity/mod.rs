pub mod affiliate;
pub mod merchant;
pub mod order;
pub mod user;

pub use order::PayoutStatus;
pub use user::UserType;
