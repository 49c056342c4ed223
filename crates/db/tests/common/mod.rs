//! Shared fixtures for the database integration tests.
//!
//! Tests run against the PostgreSQL database in `DATABASE_URL` and return
//! early when it is not set. Every fixture creates its own temple, so tests
//! never see each other's rows.

#![allow(dead_code)]

use std::env;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::sync::OnceCell;

use devalaya_core::actor::Actor;
use devalaya_core::chart::{AccountNature, Ledger, LedgerType};
use devalaya_core::fiscal::AccountingYear;
use devalaya_core::ledger::{EntryKind, EntryLineInput, PostEntryInput};
use devalaya_core::reconciliation::{ItemStatus, ItemUpdate, ReconciliationSession, StartSessionInput};
use devalaya_db::migration::Migrator;
use devalaya_db::repositories::{CreateGroupInput, CreateLedgerInput};
use devalaya_db::LedgerStore;
use devalaya_shared::types::{ActorId, GroupId, TempleId};
use devalaya_shared::{BudgetPolicy, LedgerConfig};

static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Connects and migrates, or returns `None` when no database is configured.
pub async fn connect() -> Option<DatabaseConnection> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };
    let db = devalaya_db::connect(&url).await.expect("Failed to connect to database");
    MIGRATED
        .get_or_init(|| async {
            Migrator::up(&db, None).await.expect("Failed to run migrations");
        })
        .await;
    Some(db)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// A temple with a small chart, the current and next accounting years, and
/// a clerk and an accountant.
pub struct Fixture {
    pub store: LedgerStore,
    pub temple: TempleId,
    pub year: AccountingYear,
    pub next_year: AccountingYear,
    pub cash: Ledger,
    pub bank: Ledger,
    pub donations: Ledger,
    pub electricity: Ledger,
    pub general_fund: Ledger,
    pub clerk: Actor,
    pub accountant: Actor,
}

impl Fixture {
    pub async fn new(policy: BudgetPolicy) -> Option<Self> {
        let db = connect().await?;
        let config = LedgerConfig {
            budget_policy: policy,
            closing_chunk_size: 2,
            ..LedgerConfig::default()
        };
        let store = LedgerStore::new(db, &config);
        let temple = TempleId::new();

        let year = store
            .fiscal
            .create(temple, "FY 2026-27".to_string(), date(2026, 4, 1), date(2027, 3, 31))
            .await
            .expect("create year");
        store.fiscal.set_active(temple, year.id).await.expect("activate year");
        let next_year = store
            .fiscal
            .create(temple, "FY 2027-28".to_string(), date(2027, 4, 1), date(2028, 3, 31))
            .await
            .expect("create next year");

        let assets = group(&store, temple, "1000", "Assets", AccountNature::Asset).await;
        let income = group(&store, temple, "4000", "Income", AccountNature::Income).await;
        let expenses = group(&store, temple, "5000", "Expenses", AccountNature::Expense).await;
        let funds = group(&store, temple, "3000", "Funds", AccountNature::Equity).await;

        let cash = ledger(&store, temple, "1100", "Cash in Hand", assets, LedgerType::Cash).await;
        let bank = ledger(&store, temple, "1200", "Temple Bank Account", assets, LedgerType::Bank).await;
        let donations = ledger(&store, temple, "4100", "Hundi Donations", income, LedgerType::Income).await;
        let electricity = ledger(&store, temple, "5100", "Electricity", expenses, LedgerType::Expense).await;
        let general_fund = ledger(&store, temple, "3100", "General Fund", funds, LedgerType::Normal).await;

        Some(Self {
            store,
            temple,
            year,
            next_year,
            cash,
            bank,
            donations,
            electricity,
            general_fund,
            clerk: Actor::clerk(ActorId::new()),
            accountant: Actor::accountant(ActorId::new()),
        })
    }

    /// A receipt of `amount` into `into` from donations.
    pub fn receipt(&self, into: &Ledger, amount: Decimal, on: NaiveDate) -> PostEntryInput {
        PostEntryInput {
            kind: EntryKind::Receipt,
            year_id: self.year.id,
            entry_date: on,
            narration: Some("Hundi collection".to_string()),
            original_reference: None,
            lines: vec![
                EntryLineInput::debit(into.id, amount),
                EntryLineInput::credit(self.donations.id, amount),
            ],
        }
    }

    /// A payment of `amount` from the bank for electricity.
    pub fn electricity_payment(&self, amount: Decimal, on: NaiveDate) -> PostEntryInput {
        PostEntryInput {
            kind: EntryKind::Payment,
            year_id: self.year.id,
            entry_date: on,
            narration: Some("Electricity bill".to_string()),
            original_reference: None,
            lines: vec![
                EntryLineInput::debit(self.electricity.id, amount),
                EntryLineInput::credit(self.bank.id, amount),
            ],
        }
    }

    /// Posts a receipt and approves it.
    pub async fn approved_receipt(&self, into: &Ledger, amount: Decimal, on: NaiveDate) {
        let posted = self
            .store
            .entries
            .post(self.temple, &self.clerk, self.receipt(into, amount, on))
            .await
            .expect("post receipt");
        self.store
            .workflow
            .approve(self.temple, posted.entry_id, &self.accountant, None)
            .await
            .expect("approve receipt");
    }

    /// Reconciles `ledger` for the whole year against a statement that agrees
    /// with the books, matching every item and finalizing the session.
    pub async fn reconcile_year(&self, ledger: &Ledger) -> ReconciliationSession {
        let recon = &self.store.reconciliation;
        let session = recon
            .start(
                self.temple,
                &self.accountant,
                StartSessionInput {
                    ledger_id: ledger.id,
                    year_id: self.year.id,
                    period_from: self.year.start_date,
                    period_to: self.year.end_date,
                    statement_balance: self.closing(ledger).await,
                },
            )
            .await
            .expect("start session");
        let items = recon.process(self.temple, session.id).await.expect("process session");
        let updates: Vec<ItemUpdate> = items
            .iter()
            .map(|item| ItemUpdate {
                item_id: item.id,
                status: ItemStatus::Matched,
                statement_date: Some(item.entry_date),
                statement_reference: None,
            })
            .collect();
        recon
            .update_items(self.temple, session.id, &updates)
            .await
            .expect("match items");
        recon.finalize(self.temple, session.id).await.expect("finalize session")
    }

    /// Reconciles `ledger` for the whole year and locks the session.
    pub async fn lock_year(&self, ledger: &Ledger) -> ReconciliationSession {
        let session = self.reconcile_year(ledger).await;
        self.store
            .reconciliation
            .lock(self.temple, session.id, &self.accountant)
            .await
            .expect("lock session")
    }

    /// Full-year closing balance of a ledger.
    pub async fn closing(&self, ledger: &Ledger) -> Decimal {
        self.store
            .balances
            .balance(self.temple, ledger.id, self.year.id, None)
            .await
            .expect("balance")
            .closing
    }
}

async fn group(store: &LedgerStore, temple: TempleId, code: &str, name: &str, nature: AccountNature) -> GroupId {
    store
        .chart
        .create_group(
            temple,
            CreateGroupInput {
                code: code.to_string(),
                name: name.to_string(),
                parent_id: None,
                nature,
            },
        )
        .await
        .expect("create group")
        .id
}

async fn ledger(
    store: &LedgerStore,
    temple: TempleId,
    code: &str,
    name: &str,
    group_id: GroupId,
    ledger_type: LedgerType,
) -> Ledger {
    store
        .chart
        .create_ledger(
            temple,
            CreateLedgerInput {
                code: code.to_string(),
                name: name.to_string(),
                group_id,
                ledger_type,
                opening_balance: Decimal::ZERO,
                opening_year_id: None,
            },
        )
        .await
        .expect("create ledger")
}
