use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{Contract, ContractStatus, Stored};
use crate::storage::{ContractRepository, PointRepository, Store};

/// Status label counted into the "inactive" columns of the summary.
///
/// No contract is ever saved with this label (the vocabulary is
/// Активен/Закрыт/Просрочен), so those columns stay at zero.
pub const INACTIVE_STATUS_LABEL: &str = "Неактивен";

/// One line of the per-point summary report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryRow {
    pub name: String,
    pub total_count: u64,
    pub active_count: u64,
    pub active_sum: Decimal,
    pub inactive_count: u64,
    pub inactive_sum: Decimal,
}

fn sum_amounts(contracts: &[Stored<Contract>]) -> Decimal {
    contracts
        .iter()
        .map(|contract| contract.amount)
        .fold(Decimal::ZERO, |acc, amount| acc + amount)
}

/// Builds one row per point, in point listing order.
///
/// Any store failure aborts the whole report.
pub async fn build_summary_report(store: &dyn Store) -> Result<Vec<SummaryRow>, StoreError> {
    let points = store.all_points().await?;
    let mut rows = Vec::with_capacity(points.len());

    for point in points {
        let all = store.contracts_by_point(point.id).await?;
        let active = store
            .contracts_by_point_and_status(point.id, ContractStatus::Active.label())
            .await?;
        let inactive = store
            .contracts_by_point_and_status(point.id, INACTIVE_STATUS_LABEL)
            .await?;

        rows.push(SummaryRow {
            name: point.record.name,
            total_count: all.len() as u64,
            active_count: active.len() as u64,
            active_sum: sum_amounts(&active),
            inactive_count: inactive.len() as u64,
            inactive_sum: sum_amounts(&inactive),
        });
    }

    Ok(rows)
}
