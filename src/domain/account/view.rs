use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::core::EventEnvelope;
use crate::event_sourcing::query::View;
use super::{AccountEvent, BankAccount, Money};

// ============================================================================
// BankAccountView - Read model served by GET /accounts/{id}
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankAccountView {
    pub account_id: Option<Uuid>,
    pub balance: Money,
    pub written_checks: Vec<String>,
    pub ledger: Vec<LedgerEntry>,
}

/// One balance movement; `amount` is negative for debits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence: i64,
    pub description: String,
    pub amount: Money,
    pub balance: Money,
    pub recorded_at: DateTime<Utc>,
}

impl BankAccountView {
    fn record(
        &mut self,
        envelope: &EventEnvelope<AccountEvent>,
        description: String,
        amount: Money,
        balance: Money,
    ) {
        self.balance = balance;
        self.ledger.push(LedgerEntry {
            sequence: envelope.sequence_number,
            description,
            amount,
            balance,
            recorded_at: envelope.timestamp,
        });
    }
}

impl View<BankAccount> for BankAccountView {
    fn update(&mut self, envelope: &EventEnvelope<AccountEvent>) {
        match &envelope.event_data {
            AccountEvent::Opened(e) => {
                self.account_id = Some(e.account_id);
            }
            AccountEvent::Deposited(e) => {
                self.record(envelope, "deposit".to_string(), e.amount, e.balance);
            }
            AccountEvent::Withdrew(e) => {
                let debit = Money::from_cents(-e.amount.cents());
                self.record(envelope, "withdrawal".to_string(), debit, e.balance);
            }
            AccountEvent::CheckWritten(e) => {
                let debit = Money::from_cents(-e.amount.cents());
                self.written_checks.push(e.check_number.clone());
                self.record(envelope, format!("check {}", e.check_number), debit, e.balance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountOpened, CustomerDepositedMoney, CustomerWroteCheck};
    use crate::event_sourcing::core::Aggregate;

    fn envelope(id: Uuid, sequence: i64, event: AccountEvent) -> EventEnvelope<AccountEvent> {
        EventEnvelope::new(id, BankAccount::aggregate_type(), sequence, event, Uuid::new_v4())
    }

    #[test]
    fn test_view_folds_account_history() {
        let id = Uuid::new_v4();
        let mut view = BankAccountView::default();

        view.update(&envelope(id, 1, AccountEvent::Opened(AccountOpened { account_id: id })));
        view.update(&envelope(
            id,
            2,
            AccountEvent::Deposited(CustomerDepositedMoney {
                amount: Money::from_cents(1000),
                balance: Money::from_cents(1000),
            }),
        ));
        view.update(&envelope(
            id,
            3,
            AccountEvent::CheckWritten(CustomerWroteCheck {
                check_number: "42".to_string(),
                amount: Money::from_cents(250),
                balance: Money::from_cents(750),
            }),
        ));

        assert_eq!(view.account_id, Some(id));
        assert_eq!(view.balance, Money::from_cents(750));
        assert_eq!(view.written_checks, vec!["42".to_string()]);
        assert_eq!(view.ledger.len(), 2);
        assert_eq!(view.ledger[1].amount, Money::from_cents(-250));
        assert_eq!(view.ledger[1].description, "check 42");
        assert_eq!(view.ledger[1].sequence, 3);
    }
}
