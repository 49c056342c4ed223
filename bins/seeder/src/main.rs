//! Seeds a demo temple for local development.
//!
//! Creates the current and next accounting years (April to March), a small
//! chart of accounts with opening balances, and approved budgets for the main
//! expense heads. Running it again leaves an already seeded temple untouched.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use devalaya_core::budget::{BudgetAction, CreateBudgetInput};
use devalaya_core::chart::{AccountNature, Ledger, LedgerType};
use devalaya_core::fiscal::AccountingYear;
use devalaya_db::LedgerStore;
use devalaya_db::repositories::{CreateGroupInput, CreateLedgerInput};
use devalaya_shared::types::{AccountingYearId, ActorId, GroupId, TempleId};
use devalaya_shared::{AppConfig, telemetry};

/// Demo temple ID (stable across runs).
const DEMO_TEMPLE_ID: u128 = 1;
/// Actor recorded as the creator of seeded budgets.
const SEED_ACTOR_ID: u128 = 2;

/// Group code, name, nature, and its ledgers: code, name, type, opening.
type GroupSeed = (&'static str, &'static str, AccountNature, &'static [LedgerSeed]);
type LedgerSeed = (&'static str, &'static str, LedgerType, i64);

const CHART: &[GroupSeed] = &[
    (
        "1000",
        "Current Assets",
        AccountNature::Asset,
        &[
            ("1100", "Cash in Hand", LedgerType::Cash, 25_000),
            ("1200", "State Bank Current Account", LedgerType::Bank, 450_000),
            ("1300", "Pooja Store Stock", LedgerType::Inventory, 0),
        ],
    ),
    (
        "2000",
        "Current Liabilities",
        AccountNature::Liability,
        &[("2100", "Suppliers", LedgerType::Payable, 0)],
    ),
    (
        "3000",
        "Temple Funds",
        AccountNature::Equity,
        &[("3100", "General Fund", LedgerType::Normal, 475_000)],
    ),
    (
        "4000",
        "Income",
        AccountNature::Income,
        &[
            ("4100", "Hundi Collections", LedgerType::Income, 0),
            ("4200", "Seva and Archana Tickets", LedgerType::Income, 0),
            ("4300", "Donations", LedgerType::Income, 0),
        ],
    ),
    (
        "5000",
        "Expenses",
        AccountNature::Expense,
        &[
            ("5100", "Priest Honorarium", LedgerType::Expense, 0),
            ("5200", "Electricity", LedgerType::Expense, 0),
            ("5300", "Annadanam", LedgerType::Expense, 0),
            ("5400", "Bank Charges", LedgerType::Expense, 0),
        ],
    ),
];

/// Ledger code and allocation of each approved budget.
const BUDGETS: &[(&str, i64)] = &[("5100", 300_000), ("5200", 120_000), ("5300", 200_000)];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    telemetry::init_tracing(&config.logging)?;

    let db = devalaya_db::connect_with(&config.database).await?;
    info!("Connected to database");

    let store = LedgerStore::new(db, &config.ledger);
    let temple = TempleId::from_uuid(Uuid::from_u128(DEMO_TEMPLE_ID));

    if !store.fiscal.list(temple).await?.is_empty() {
        info!(temple_id = %temple, "Demo temple already seeded, skipping");
        return Ok(());
    }

    let (current, next) = seed_years(&store, temple).await?;
    let ledgers = seed_chart(&store, temple, current.id).await?;
    seed_budgets(&store, temple, current.id, &ledgers).await?;

    info!(
        temple_id = %temple,
        year = %current.name,
        next_year = %next.name,
        ledgers = ledgers.len(),
        "Seeding complete"
    );
    Ok(())
}

/// Creates the accounting year containing today and the one after it, and
/// activates the first.
async fn seed_years(store: &LedgerStore, temple: TempleId) -> anyhow::Result<(AccountingYear, AccountingYear)> {
    let today = Utc::now().date_naive();
    let start_year = if today.month() >= 4 { today.year() } else { today.year() - 1 };

    let mut years = Vec::with_capacity(2);
    for offset in 0..2 {
        let from = start_year + offset;
        let start = NaiveDate::from_ymd_opt(from, 4, 1).context("invalid year start")?;
        let end = NaiveDate::from_ymd_opt(from + 1, 3, 31).context("invalid year end")?;
        let name = format!("FY {from}-{:02}", (from + 1) % 100);
        let year = store.fiscal.create(temple, name, start, end).await?;
        info!(year_id = %year.id, name = %year.name, "Accounting year created");
        years.push(year);
    }

    let next = years.pop().context("next year missing")?;
    let current = years.pop().context("current year missing")?;
    let current = store.fiscal.set_active(temple, current.id).await?;
    Ok((current, next))
}

async fn seed_chart(store: &LedgerStore, temple: TempleId, year_id: AccountingYearId) -> anyhow::Result<Vec<Ledger>> {
    let mut ledgers = Vec::new();
    for (code, name, nature, group_ledgers) in CHART {
        let group = store
            .chart
            .create_group(
                temple,
                CreateGroupInput {
                    code: (*code).to_string(),
                    name: (*name).to_string(),
                    parent_id: None,
                    nature: *nature,
                },
            )
            .await?;
        for seed in *group_ledgers {
            ledgers.push(seed_ledger(store, temple, group.id, year_id, seed).await?);
        }
    }
    Ok(ledgers)
}

async fn seed_ledger(
    store: &LedgerStore,
    temple: TempleId,
    group_id: GroupId,
    year_id: AccountingYearId,
    (code, name, ledger_type, opening): &LedgerSeed,
) -> anyhow::Result<Ledger> {
    let opening = Decimal::from(*opening);
    let ledger = store
        .chart
        .create_ledger(
            temple,
            CreateLedgerInput {
                code: (*code).to_string(),
                name: (*name).to_string(),
                group_id,
                ledger_type: *ledger_type,
                opening_balance: opening,
                opening_year_id: (!opening.is_zero()).then_some(year_id),
            },
        )
        .await?;
    Ok(ledger)
}

async fn seed_budgets(
    store: &LedgerStore,
    temple: TempleId,
    year_id: AccountingYearId,
    ledgers: &[Ledger],
) -> anyhow::Result<()> {
    let actor = ActorId::from_uuid(Uuid::from_u128(SEED_ACTOR_ID));
    for (code, allocated) in BUDGETS {
        let ledger = ledgers
            .iter()
            .find(|l| l.code == *code)
            .with_context(|| format!("ledger {code} not seeded"))?;
        let budget = store
            .budgets
            .create(
                temple,
                actor,
                CreateBudgetInput {
                    ledger_id: ledger.id,
                    year_id,
                    allocated: Decimal::from(*allocated),
                    notes: Some("Seeded allocation".to_string()),
                },
            )
            .await?;
        store.budgets.transition(temple, budget.id, BudgetAction::Submit).await?;
        store.budgets.transition(temple, budget.id, BudgetAction::Approve).await?;
        info!(ledger = %ledger.code, allocated = %budget.allocated, "Budget approved");
    }
    Ok(())
}
