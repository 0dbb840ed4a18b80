use super::*;

use colored::Colorize;

pub fn log_info<S: AccountStore>(
    context: &Arc<NodeContext<S>>,
    stats: &NodeStats,
) -> Result<(), NodeError> {
    let mut inf = Vec::new();
    inf.extend([
        ("Active sessions", stats.active_sessions().to_string()),
        ("Accounts", context.store.client_count()?.to_string()),
        ("Bank total", context.store.total_balance()?.to_string()),
    ]);

    inf.push(("Commands", stats.executed_commands().to_string()));
    inf.push(("Rejected", stats.rejected_sessions().to_string()));

    log::info!(
        "{}",
        inf.into_iter()
            .map(|(k, v)| format!("{}: {}", k.bright_blue(), v))
            .collect::<Vec<String>>()
            .join(" ")
    );

    Ok(())
}
