//! Distribution templates - Saved income splits that can be re-applied.
//!
//! A template stores each row either as a percentage of the total or as a fixed
//! amount. Applying a template to a new total produces plain allocation inputs
//! for [`crate::core::distribution::distribute`]; the distribution
//! itself never reads templates.

use crate::{
    core::distribution::{AllocationInput, allocation_sum},
    entities::{
        DistributionTemplate, TemplateAllocation, distribution_template,
        distribution_template_allocation,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Decimal places used for percentages captured from a distribution.
const PERCENTAGE_SCALE: u32 = 4;
/// Decimal places used for amounts computed from a percentage.
const AMOUNT_SCALE: u32 = 2;

/// How much of the total a template row receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateShare {
    /// Share of the total in percent (0-100)
    Percentage(Decimal),
    /// Fixed amount, independent of the total
    FixedAmount(Decimal),
}

/// One row of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateAllocationInput {
    /// Wallet that receives the share
    pub wallet_id: i64,
    /// The share itself
    pub share: TemplateShare,
}

impl distribution_template_allocation::Model {
    /// The row's share, or `None` if the row carries neither column.
    #[must_use]
    pub fn share(&self) -> Option<TemplateShare> {
        match (self.percentage, self.fixed_amount) {
            (Some(pct), _) => Some(TemplateShare::Percentage(pct)),
            (None, Some(amount)) => Some(TemplateShare::FixedAmount(amount)),
            (None, None) => None,
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidTemplate {
        message: message.into(),
    }
}

fn validate_rows(name: &str, rows: &[TemplateAllocationInput]) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if rows.is_empty() {
        return Err(invalid("template needs at least one allocation"));
    }

    let mut percentage_sum = Decimal::ZERO;
    for row in rows {
        match row.share {
            TemplateShare::Percentage(pct) => {
                if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                    return Err(invalid(format!(
                        "percentage {pct} for wallet {} is outside 0-100",
                        row.wallet_id
                    )));
                }
                percentage_sum += pct;
            }
            TemplateShare::FixedAmount(amount) => {
                if amount < Decimal::ZERO {
                    return Err(invalid(format!(
                        "fixed amount {amount} for wallet {} is negative",
                        row.wallet_id
                    )));
                }
            }
        }
    }

    if percentage_sum > Decimal::ONE_HUNDRED {
        return Err(invalid(format!(
            "percentages add up to {percentage_sum}, more than 100"
        )));
    }

    Ok(())
}

/// Saves a template with its rows in the given order.
#[instrument(skip(db, rows))]
pub async fn save_template(
    db: &DatabaseConnection,
    owner_id: &str,
    name: &str,
    rows: &[TemplateAllocationInput],
) -> Result<distribution_template::Model> {
    validate_rows(name, rows)?;

    let txn = db.begin().await?;

    let template = distribution_template::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(name.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (position, row) in rows.iter().enumerate() {
        let (percentage, fixed_amount) = match row.share {
            TemplateShare::Percentage(pct) => (Some(pct), None),
            TemplateShare::FixedAmount(amount) => (None, Some(amount)),
        };
        let position = i32::try_from(position)
            .map_err(|_| invalid("template has too many allocations"))?;

        distribution_template_allocation::ActiveModel {
            template_id: Set(template.id),
            position: Set(position),
            wallet_id: Set(row.wallet_id),
            percentage: Set(percentage),
            fixed_amount: Set(fixed_amount),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(template_id = template.id, rows = rows.len(), "Saved distribution template");
    Ok(template)
}

/// Captures a distribution as a percentage template.
///
/// Each row's percentage is `amount / Σ amounts * 100`, rounded to four
/// places. The largest row absorbs the rounding so the percentages add up to
/// exactly 100, even when the split was within tolerance of its total rather
/// than equal to it.
pub async fn save_template_from_allocations(
    db: &DatabaseConnection,
    owner_id: &str,
    name: &str,
    allocations: &[AllocationInput],
) -> Result<distribution_template::Model> {
    let rows = percentage_rows(allocations)?;
    save_template(db, owner_id, name, &rows).await
}

fn percentage_rows(allocations: &[AllocationInput]) -> Result<Vec<TemplateAllocationInput>> {
    let allocated = allocation_sum(allocations)?;
    if allocated <= Decimal::ZERO {
        return Err(Error::EmptyDistribution);
    }

    let mut percentages: Vec<Decimal> = allocations
        .iter()
        .map(|a| {
            (a.amount / allocated * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(PERCENTAGE_SCALE, RoundingStrategy::MidpointNearestEven)
        })
        .collect();

    let drift = Decimal::ONE_HUNDRED - percentages.iter().copied().sum::<Decimal>();
    let largest = allocations
        .iter()
        .enumerate()
        .max_by(|(i, x), (j, y)| x.amount.cmp(&y.amount).then(j.cmp(i)))
        .map(|(i, _)| i);
    if let Some(index) = largest {
        percentages[index] += drift;
    }

    Ok(allocations
        .iter()
        .zip(percentages)
        .map(|(a, pct)| TemplateAllocationInput {
            wallet_id: a.wallet_id,
            share: TemplateShare::Percentage(pct),
        })
        .collect())
}

/// Lists an owner's templates by name.
pub async fn list_templates(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<distribution_template::Model>> {
    DistributionTemplate::find()
        .filter(distribution_template::Column::OwnerId.eq(owner_id))
        .order_by_asc(distribution_template::Column::Name)
        .order_by_asc(distribution_template::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a template and its rows in entry order.
pub async fn get_template(
    db: &DatabaseConnection,
    owner_id: &str,
    template_id: i64,
) -> Result<(
    distribution_template::Model,
    Vec<distribution_template_allocation::Model>,
)> {
    let template = DistributionTemplate::find_by_id(template_id)
        .filter(distribution_template::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(Error::TemplateNotFound { id: template_id })?;

    let rows = TemplateAllocation::find()
        .filter(distribution_template_allocation::Column::TemplateId.eq(template.id))
        .order_by_asc(distribution_template_allocation::Column::Position)
        .all(db)
        .await?;

    Ok((template, rows))
}

/// Deletes a template and its rows.
#[instrument(skip(db))]
pub async fn delete_template(db: &DatabaseConnection, owner_id: &str, template_id: i64) -> Result<()> {
    let (template, _) = get_template(db, owner_id, template_id).await?;

    let txn = db.begin().await?;
    TemplateAllocation::delete_many()
        .filter(distribution_template_allocation::Column::TemplateId.eq(template.id))
        .exec(&txn)
        .await?;
    DistributionTemplate::delete_by_id(template.id)
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(template_id, "Deleted distribution template");
    Ok(())
}

/// Turns a template into concrete allocations for `total`.
///
/// Percentage rows receive `total * pct / 100` rounded to cents; fixed rows
/// are copied as-is. When every row is a percentage and they add up to 100,
/// the rounding remainder goes to the last row so the allocations sum to
/// exactly `total`.
pub async fn apply_template(
    db: &DatabaseConnection,
    owner_id: &str,
    template_id: i64,
    total: Decimal,
) -> Result<Vec<AllocationInput>> {
    if total <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount: total });
    }

    let (_, rows) = get_template(db, owner_id, template_id).await?;
    allocations_for_total(&rows, total)
}

fn allocations_for_total(
    rows: &[distribution_template_allocation::Model],
    total: Decimal,
) -> Result<Vec<AllocationInput>> {
    let mut allocations = Vec::with_capacity(rows.len());
    let mut percentage_sum = Decimal::ZERO;
    let mut all_percentages = true;

    for row in rows {
        let amount = match row.share() {
            Some(TemplateShare::Percentage(pct)) => {
                percentage_sum += pct;
                let scaled = total
                    .checked_mul(pct)
                    .ok_or(Error::InvalidAmount { amount: total })?;
                (scaled / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
            }
            Some(TemplateShare::FixedAmount(amount)) => {
                all_percentages = false;
                amount
            }
            None => {
                return Err(invalid(format!(
                    "row {} has neither a percentage nor a fixed amount",
                    row.position
                )));
            }
        };
        allocations.push(AllocationInput {
            wallet_id: row.wallet_id,
            amount,
        });
    }

    let full_split = (percentage_sum - Decimal::ONE_HUNDRED).abs() <= Decimal::new(1, 2);
    if all_percentages && full_split {
        let allocated = allocation_sum(&allocations)?;
        if let Some(last) = allocations.last_mut() {
            last.amount += total - allocated;
        }
    }

    Ok(allocations)
}
