// ============================================================================
// Account Domain
// ============================================================================

pub mod aggregate;
pub mod commands;
pub mod errors;
pub mod events;
pub mod value_objects;
pub mod view;

pub use aggregate::BankAccount;
pub use commands::AccountCommand;
pub use errors::AccountError;
pub use events::{
    AccountEvent, AccountOpened, CustomerDepositedMoney, CustomerWithdrewCash, CustomerWroteCheck,
};
pub use value_objects::{AccountStatus, Money, MoneyParseError};
pub use view::{BankAccountView, LedgerEntry};
