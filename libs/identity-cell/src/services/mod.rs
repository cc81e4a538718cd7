pub mod account;
pub mod password;
pub mod validation;

pub use account::AccountService;
