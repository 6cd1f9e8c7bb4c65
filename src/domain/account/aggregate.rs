use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::event_sourcing::core::Aggregate;
use super::{
    AccountCommand, AccountError, AccountEvent, AccountOpened, AccountStatus,
    CustomerDepositedMoney, CustomerWithdrewCash, CustomerWroteCheck, Money,
};

// ============================================================================
// BankAccount Aggregate - Business Rules and State
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub account_id: Option<Uuid>,
    pub balance: Money,
    pub check_numbers: BTreeSet<String>,
}

impl BankAccount {
    pub fn status(&self) -> AccountStatus {
        match self.account_id {
            Some(_) => AccountStatus::Open,
            None => AccountStatus::NotOpened,
        }
    }

    fn ensure_open(&self) -> Result<(), AccountError> {
        match self.status() {
            AccountStatus::Open => Ok(()),
            AccountStatus::NotOpened => Err(AccountError::NotOpened),
        }
    }

    fn validate_amount(amount: Money) -> Result<(), AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::InvalidAmount(amount));
        }
        Ok(())
    }

    /// Balance left after taking `amount` out, rejecting overdrafts
    fn balance_after_debit(&self, amount: Money) -> Result<Money, AccountError> {
        let balance = self
            .balance
            .checked_sub(amount)
            .ok_or(AccountError::BalanceOverflow)?;
        if balance.is_negative() {
            return Err(AccountError::FundsNotAvailable);
        }
        Ok(balance)
    }
}

impl Aggregate for BankAccount {
    type Event = AccountEvent;
    type Command = AccountCommand;
    type Error = AccountError;

    fn aggregate_type() -> &'static str {
        "account"
    }

    fn handle(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::OpenAccount { account_id } => {
                if self.status() == AccountStatus::Open {
                    return Err(AccountError::AlreadyOpened);
                }
                Ok(vec![AccountEvent::Opened(AccountOpened { account_id })])
            }

            AccountCommand::DepositMoney { amount } => {
                self.ensure_open()?;
                Self::validate_amount(amount)?;

                let balance = self
                    .balance
                    .checked_add(amount)
                    .ok_or(AccountError::BalanceOverflow)?;
                Ok(vec![AccountEvent::Deposited(CustomerDepositedMoney { amount, balance })])
            }

            AccountCommand::WithdrawMoney { amount } => {
                self.ensure_open()?;
                Self::validate_amount(amount)?;

                let balance = self.balance_after_debit(amount)?;
                Ok(vec![AccountEvent::Withdrew(CustomerWithdrewCash { amount, balance })])
            }

            AccountCommand::WriteCheck { check_number, amount } => {
                self.ensure_open()?;
                Self::validate_amount(amount)?;

                let check_number = check_number.trim().to_string();
                if check_number.is_empty() {
                    return Err(AccountError::EmptyCheckNumber);
                }
                if self.check_numbers.contains(&check_number) {
                    return Err(AccountError::DuplicateCheck(check_number));
                }

                let balance = self.balance_after_debit(amount)?;
                Ok(vec![AccountEvent::CheckWritten(CustomerWroteCheck {
                    check_number,
                    amount,
                    balance,
                })])
            }
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::Opened(e) => {
                self.account_id = Some(e.account_id);
            }
            AccountEvent::Deposited(e) => {
                self.balance = e.balance;
            }
            AccountEvent::Withdrew(e) => {
                self.balance = e.balance;
            }
            AccountEvent::CheckWritten(e) => {
                self.balance = e.balance;
                self.check_numbers.insert(e.check_number.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::testing::TestFramework;

    type AccountTestFramework = TestFramework<BankAccount>;

    fn account_id() -> Uuid {
        Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000001").unwrap()
    }

    fn cents(value: i64) -> Money {
        Money::from_cents(value)
    }

    fn opened() -> AccountEvent {
        AccountEvent::Opened(AccountOpened { account_id: account_id() })
    }

    fn deposited(amount: i64, balance: i64) -> AccountEvent {
        AccountEvent::Deposited(CustomerDepositedMoney {
            amount: cents(amount),
            balance: cents(balance),
        })
    }

    #[test]
    fn test_open_account() {
        AccountTestFramework::default()
            .given_no_previous_events()
            .when(AccountCommand::OpenAccount { account_id: account_id() })
            .then_expect_events(vec![opened()]);
    }

    #[test]
    fn test_open_account_twice() {
        AccountTestFramework::default()
            .given(vec![opened()])
            .when(AccountCommand::OpenAccount { account_id: account_id() })
            .then_expect_error_message("account is already open");
    }

    #[test]
    fn test_deposit_money() {
        AccountTestFramework::default()
            .given(vec![opened()])
            .when(AccountCommand::DepositMoney { amount: cents(20000) })
            .then_expect_events(vec![deposited(20000, 20000)]);
    }

    #[test]
    fn test_deposit_money_with_balance() {
        AccountTestFramework::default()
            .given(vec![opened(), deposited(20000, 20000)])
            .when(AccountCommand::DepositMoney { amount: cents(20000) })
            .then_expect_events(vec![deposited(20000, 40000)]);
    }

    #[test]
    fn test_deposit_requires_open_account() {
        AccountTestFramework::default()
            .given_no_previous_events()
            .when(AccountCommand::DepositMoney { amount: cents(100) })
            .then_expect_error_message("account is not open");
    }

    #[test]
    fn test_deposit_rejects_non_positive_amount() {
        let result = AccountTestFramework::default()
            .given(vec![opened()])
            .when(AccountCommand::DepositMoney { amount: cents(0) })
            .inspect_result();

        assert_eq!(result, Err(AccountError::InvalidAmount(cents(0))));
    }

    #[test]
    fn test_withdraw_money() {
        AccountTestFramework::default()
            .given(vec![opened(), deposited(20000, 20000)])
            .when(AccountCommand::WithdrawMoney { amount: cents(10000) })
            .then_expect_events(vec![AccountEvent::Withdrew(CustomerWithdrewCash {
                amount: cents(10000),
                balance: cents(10000),
            })]);
    }

    #[test]
    fn test_withdraw_money_funds_not_available() {
        AccountTestFramework::default()
            .given(vec![opened()])
            .when(AccountCommand::WithdrawMoney { amount: cents(20000) })
            .then_expect_error_message("funds not available");
    }

    #[test]
    fn test_withdraw_entire_balance() {
        AccountTestFramework::default()
            .given(vec![opened(), deposited(500, 500)])
            .when(AccountCommand::WithdrawMoney { amount: cents(500) })
            .then_expect_events(vec![AccountEvent::Withdrew(CustomerWithdrewCash {
                amount: cents(500),
                balance: Money::ZERO,
            })]);
    }

    #[test]
    fn test_wrote_check() {
        AccountTestFramework::default()
            .given(vec![opened(), deposited(20000, 20000)])
            .when(AccountCommand::WriteCheck {
                check_number: "1170".to_string(),
                amount: cents(10000),
            })
            .then_expect_events(vec![AccountEvent::CheckWritten(CustomerWroteCheck {
                check_number: "1170".to_string(),
                amount: cents(10000),
                balance: cents(10000),
            })]);
    }

    #[test]
    fn test_wrote_check_funds_not_available() {
        AccountTestFramework::default()
            .given(vec![opened()])
            .when(AccountCommand::WriteCheck {
                check_number: "1170".to_string(),
                amount: cents(10000),
            })
            .then_expect_error_message("funds not available");
    }

    #[test]
    fn test_duplicate_check_number() {
        let check = AccountEvent::CheckWritten(CustomerWroteCheck {
            check_number: "1170".to_string(),
            amount: cents(100),
            balance: cents(900),
        });

        AccountTestFramework::default()
            .given(vec![opened(), deposited(1000, 1000), check])
            .when(AccountCommand::WriteCheck {
                check_number: " 1170 ".to_string(),
                amount: cents(100),
            })
            .then_expect_error_message("check 1170 has already been written");
    }

    #[test]
    fn test_empty_check_number() {
        AccountTestFramework::default()
            .given(vec![opened(), deposited(1000, 1000)])
            .when(AccountCommand::WriteCheck {
                check_number: "   ".to_string(),
                amount: cents(100),
            })
            .then_expect_error_message("check number cannot be empty");
    }

    #[test]
    fn test_apply_tracks_state() {
        let mut account = BankAccount::default();
        assert_eq!(account.status(), AccountStatus::NotOpened);

        account.apply(&opened());
        account.apply(&deposited(700, 700));
        account.apply(&AccountEvent::CheckWritten(CustomerWroteCheck {
            check_number: "7".to_string(),
            amount: cents(200),
            balance: cents(500),
        }));

        assert_eq!(account.status(), AccountStatus::Open);
        assert_eq!(account.account_id, Some(account_id()));
        assert_eq!(account.balance, cents(500));
        assert!(account.check_numbers.contains("7"));
    }
}
