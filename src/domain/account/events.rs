use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::core::DomainEvent;
use super::value_objects::Money;

// ============================================================================
// Account Events - Domain Events for the BankAccount Aggregate
// ============================================================================

/// Union type for all account events. The serialized tag matches `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AccountEvent {
    #[serde(rename = "AccountOpened")]
    Opened(AccountOpened),
    #[serde(rename = "CustomerDepositedMoney")]
    Deposited(CustomerDepositedMoney),
    #[serde(rename = "CustomerWithdrewCash")]
    Withdrew(CustomerWithdrewCash),
    #[serde(rename = "CustomerWroteCheck")]
    CheckWritten(CustomerWroteCheck),
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Opened(_) => "AccountOpened",
            AccountEvent::Deposited(_) => "CustomerDepositedMoney",
            AccountEvent::Withdrew(_) => "CustomerWithdrewCash",
            AccountEvent::CheckWritten(_) => "CustomerWroteCheck",
        }
    }
}

/// Account Opened - first event of every account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOpened {
    pub account_id: Uuid,
}

/// Money paid in; `balance` is the balance after the deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDepositedMoney {
    pub amount: Money,
    pub balance: Money,
}

/// Cash taken out; `balance` is the balance after the withdrawal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerWithdrewCash {
    pub amount: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerWroteCheck {
    pub check_number: String,
    pub amount: Money,
    pub balance: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let opened = AccountEvent::Opened(AccountOpened { account_id: Uuid::nil() });
        let check = AccountEvent::CheckWritten(CustomerWroteCheck {
            check_number: "1170".to_string(),
            amount: Money::from_cents(100),
            balance: Money::ZERO,
        });

        assert_eq!(opened.event_type(), "AccountOpened");
        assert_eq!(check.event_type(), "CustomerWroteCheck");
        assert_eq!(check.event_version(), 1);
    }

    #[test]
    fn test_wire_format_is_tagged() {
        let event = AccountEvent::Deposited(CustomerDepositedMoney {
            amount: Money::from_cents(20000),
            balance: Money::from_cents(20000),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "CustomerDepositedMoney",
                "data": {"amount": 20000, "balance": 20000}
            })
        );
    }

    #[test]
    fn test_wire_tag_matches_event_type() {
        let events = [
            AccountEvent::Opened(AccountOpened { account_id: Uuid::nil() }),
            AccountEvent::Deposited(CustomerDepositedMoney {
                amount: Money::from_cents(1),
                balance: Money::from_cents(1),
            }),
            AccountEvent::Withdrew(CustomerWithdrewCash {
                amount: Money::from_cents(1),
                balance: Money::from_cents(0),
            }),
            AccountEvent::CheckWritten(CustomerWroteCheck {
                check_number: "1".to_string(),
                amount: Money::from_cents(1),
                balance: Money::from_cents(0),
            }),
        ];

        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
            assert_eq!(serde_json::from_value::<AccountEvent>(json).unwrap(), event);
        }
    }
}
