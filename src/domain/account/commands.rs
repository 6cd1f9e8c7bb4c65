use uuid::Uuid;
use super::value_objects::Money;

// ============================================================================
// Account Commands - Represent customer intent
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AccountCommand {
    OpenAccount {
        account_id: Uuid,
    },
    DepositMoney {
        amount: Money,
    },
    WithdrawMoney {
        amount: Money,
    },
    WriteCheck {
        check_number: String,
        amount: Money,
    },
}

impl AccountCommand {
    pub fn name(&self) -> &'static str {
        match self {
            AccountCommand::OpenAccount { .. } => "OpenAccount",
            AccountCommand::DepositMoney { .. } => "DepositMoney",
            AccountCommand::WithdrawMoney { .. } => "WithdrawMoney",
            AccountCommand::WriteCheck { .. } => "WriteCheck",
        }
    }
}
