use uuid::Uuid;

use crate::app::AppState;
use crate::domain::account::{AccountCommand, BankAccountView, Money};
use crate::event_sourcing::CommandError;

// ============================================================================
// Demo - one account through its whole lifecycle
// ============================================================================

pub async fn run_demo(state: &AppState) -> anyhow::Result<BankAccountView> {
    let account_id = Uuid::now_v7();
    tracing::info!("📝 Demonstrating account lifecycle for {}", account_id);

    state
        .cqrs
        .execute(account_id, AccountCommand::OpenAccount { account_id })
        .await?;
    tracing::info!("✅ Account opened");

    state
        .cqrs
        .execute(account_id, AccountCommand::DepositMoney { amount: "1000.00".parse()? })
        .await?;
    tracing::info!("✅ Deposited 1000.00");

    state
        .cqrs
        .execute(account_id, AccountCommand::WithdrawMoney { amount: "200.50".parse()? })
        .await?;
    tracing::info!("✅ Withdrew 200.50");

    state
        .cqrs
        .execute(
            account_id,
            AccountCommand::WriteCheck {
                check_number: "1170".to_string(),
                amount: "100.00".parse()?,
            },
        )
        .await?;
    tracing::info!("✅ Wrote check 1170 for 100.00");

    // Overdraft must be refused without touching the stream
    let overdraft = AccountCommand::WithdrawMoney { amount: Money::from_cents(1_000_000) };
    match state.cqrs.execute(account_id, overdraft).await {
        Err(CommandError::Domain(e)) => tracing::info!("✅ Overdraft rejected: {}", e),
        Err(e) => return Err(e.into()),
        Ok(version) => anyhow::bail!("overdraft was accepted at version {}", version),
    }

    let view = state
        .account_query
        .load(account_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("view for {} was not written", account_id))?;

    tracing::info!(balance = %view.balance, entries = view.ledger.len(), "🎉 Demo complete!");
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_demo_on_memory_backend() {
        let state = AppState::in_memory(Arc::new(Metrics::new().unwrap()));
        let view = run_demo(&state).await.unwrap();

        assert_eq!(view.balance, Money::from_cents(69950));
        assert_eq!(view.written_checks, vec!["1170".to_string()]);
        assert_eq!(view.ledger.len(), 3);
    }
}
