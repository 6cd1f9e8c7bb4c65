use super::value_objects::Money;

// ============================================================================
// Account Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccountError {
    #[error("account is already open")]
    AlreadyOpened,

    #[error("account is not open")]
    NotOpened,

    #[error("amount must be positive, got {0}")]
    InvalidAmount(Money),

    #[error("funds not available")]
    FundsNotAvailable,

    #[error("check number cannot be empty")]
    EmptyCheckNumber,

    #[error("check {0} has already been written")]
    DuplicateCheck(String),

    #[error("balance overflow")]
    BalanceOverflow,
}

impl AccountError {
    /// Errors caused by malformed input rather than account state
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AccountError::InvalidAmount(_) | AccountError::EmptyCheckNumber
        )
    }
}
