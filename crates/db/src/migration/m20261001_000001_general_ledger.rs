//! General ledger schema.
//!
//! Creates the enums, tables, constraints, and triggers backing the chart of
//! accounts, accounting years, entries, budgets, reconciliation, and year-end
//! closing. Every table carries `temple_id`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS & ACCOUNTING YEARS
        // ============================================================
        db.execute_unprepared(ACCOUNT_GROUPS_SQL).await?;
        db.execute_unprepared(ACCOUNTING_YEARS_SQL).await?;
        db.execute_unprepared(LEDGERS_SQL).await?;
        db.execute_unprepared(OPENING_BALANCES_SQL).await?;

        // ============================================================
        // PART 3: ENTRIES
        // ============================================================
        db.execute_unprepared(ENTRIES_SQL).await?;
        db.execute_unprepared(ENTRY_LINES_SQL).await?;

        // ============================================================
        // PART 4: BUDGETS
        // ============================================================
        db.execute_unprepared(BUDGETS_SQL).await?;

        // ============================================================
        // PART 5: RECONCILIATION
        // ============================================================
        db.execute_unprepared(RECONCILIATION_SQL).await?;

        // ============================================================
        // PART 6: YEAR-END CLOSING
        // ============================================================
        db.execute_unprepared(LEDGER_CLOSINGS_SQL).await?;

        // ============================================================
        // PART 7: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_nature AS ENUM ('ASSET', 'LIABILITY', 'EQUITY', 'INCOME', 'EXPENSE');

CREATE TYPE ledger_type AS ENUM (
    'NORMAL', 'BANK', 'CASH', 'INVENTORY', 'RECEIVABLE', 'PAYABLE', 'EXPENSE', 'INCOME', 'TAX'
);

CREATE TYPE year_status AS ENUM ('OPEN', 'CLOSING', 'CLOSED');

CREATE TYPE entry_kind AS ENUM (
    'RECEIPT', 'PAYMENT', 'JOURNAL', 'CONTRA', 'CREDIT_NOTE', 'DEBIT_NOTE', 'INVENTORY_JOURNAL'
);

CREATE TYPE entry_status AS ENUM ('PENDING', 'APPROVED', 'REJECTED', 'CANCELLED');

CREATE TYPE budget_status AS ENUM ('DRAFT', 'SUBMITTED', 'APPROVED', 'CLOSED');

CREATE TYPE reconciliation_status AS ENUM ('IN_PROGRESS', 'FINALIZED', 'LOCKED');

CREATE TYPE reconciliation_item_status AS ENUM ('MATCHED', 'UNMATCHED');

CREATE TYPE opening_balance_source AS ENUM ('CARRIED_FORWARD');
";

const ACCOUNT_GROUPS_SQL: &str = r"
CREATE TABLE account_groups (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    parent_id UUID REFERENCES account_groups(id),
    nature account_nature NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_group_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id),
    UNIQUE (temple_id, code)
);

CREATE INDEX idx_account_groups_parent ON account_groups(temple_id, parent_id);
";

const ACCOUNTING_YEARS_SQL: &str = r"
CREATE EXTENSION IF NOT EXISTS btree_gist;

CREATE TABLE accounting_years (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    name VARCHAR(50) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    status year_status NOT NULL DEFAULT 'OPEN',
    is_active BOOLEAN NOT NULL DEFAULT false,
    closed_by UUID,
    closed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_accounting_year_dates CHECK (end_date > start_date),
    UNIQUE (temple_id, name),
    CONSTRAINT excl_accounting_year_overlap EXCLUDE USING gist (
        temple_id WITH =,
        daterange(start_date, end_date, '[]') WITH &&
    )
);

-- Exactly one active year per temple
CREATE UNIQUE INDEX idx_accounting_years_one_active
    ON accounting_years(temple_id) WHERE is_active;
";

const LEDGERS_SQL: &str = r"
CREATE TABLE ledgers (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    group_id UUID NOT NULL REFERENCES account_groups(id),
    ledger_type ledger_type NOT NULL DEFAULT 'NORMAL',
    nature account_nature NOT NULL,
    opening_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    opening_year_id UUID REFERENCES accounting_years(id),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (temple_id, code)
);

CREATE INDEX idx_ledgers_group ON ledgers(temple_id, group_id);
CREATE INDEX idx_ledgers_type ON ledgers(temple_id, ledger_type) WHERE is_active;
";

const OPENING_BALANCES_SQL: &str = r"
CREATE TABLE opening_balances (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    ledger_id UUID NOT NULL REFERENCES ledgers(id),
    year_id UUID NOT NULL REFERENCES accounting_years(id),
    amount NUMERIC(19, 4) NOT NULL,
    source opening_balance_source NOT NULL DEFAULT 'CARRIED_FORWARD',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (ledger_id, year_id)
);
";

const ENTRIES_SQL: &str = r"
CREATE TABLE entries (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    year_id UUID NOT NULL REFERENCES accounting_years(id),
    kind entry_kind NOT NULL,
    entry_date DATE NOT NULL,
    status entry_status NOT NULL DEFAULT 'PENDING',
    narration TEXT,
    original_reference VARCHAR(100),
    created_by UUID NOT NULL,
    approved_by UUID,
    decision_note TEXT,
    decided_at TIMESTAMPTZ,
    cancelled_by UUID,
    cancelled_at TIMESTAMPTZ,
    cancel_reason TEXT,
    replaces UUID REFERENCES entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_cancel_reason CHECK (status <> 'CANCELLED' OR cancel_reason IS NOT NULL)
);

CREATE INDEX idx_entries_year_status ON entries(temple_id, year_id, status);
CREATE INDEX idx_entries_date ON entries(temple_id, entry_date);
";

const ENTRY_LINES_SQL: &str = r"
CREATE TABLE entry_lines (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    ledger_id UUID NOT NULL REFERENCES ledgers(id),
    line_no INTEGER NOT NULL,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    narration TEXT,
    cost_center VARCHAR(50),
    reference_number VARCHAR(100),
    -- Exactly one side is positive
    CONSTRAINT chk_line_one_side CHECK (
        (debit > 0 AND credit = 0) OR (credit > 0 AND debit = 0)
    ),
    UNIQUE (entry_id, line_no)
);

CREATE INDEX idx_entry_lines_ledger ON entry_lines(ledger_id);
";

const BUDGETS_SQL: &str = r"
CREATE TABLE budgets (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    ledger_id UUID NOT NULL REFERENCES ledgers(id),
    year_id UUID NOT NULL REFERENCES accounting_years(id),
    allocated NUMERIC(19, 4) NOT NULL,
    status budget_status NOT NULL DEFAULT 'DRAFT',
    notes TEXT,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_budget_allocated CHECK (allocated >= 0)
);

-- At most one approved budget per (ledger, year)
CREATE UNIQUE INDEX idx_budgets_one_approved
    ON budgets(ledger_id, year_id) WHERE status = 'APPROVED';
CREATE INDEX idx_budgets_year ON budgets(temple_id, year_id);
";

const RECONCILIATION_SQL: &str = r"
CREATE TABLE reconciliation_sessions (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    ledger_id UUID NOT NULL REFERENCES ledgers(id),
    year_id UUID NOT NULL REFERENCES accounting_years(id),
    period_from DATE NOT NULL,
    period_to DATE NOT NULL,
    statement_balance NUMERIC(19, 4) NOT NULL,
    status reconciliation_status NOT NULL DEFAULT 'IN_PROGRESS',
    created_by UUID NOT NULL,
    finalized_at TIMESTAMPTZ,
    locked_by UUID,
    locked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_reconciliation_period CHECK (period_to >= period_from)
);

CREATE INDEX idx_reconciliation_sessions_ledger
    ON reconciliation_sessions(temple_id, ledger_id, period_from);

CREATE TABLE reconciliation_items (
    id UUID PRIMARY KEY,
    session_id UUID NOT NULL REFERENCES reconciliation_sessions(id) ON DELETE CASCADE,
    entry_id UUID NOT NULL REFERENCES entries(id),
    line_id UUID NOT NULL REFERENCES entry_lines(id),
    entry_date DATE NOT NULL,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status reconciliation_item_status NOT NULL DEFAULT 'UNMATCHED',
    statement_date DATE,
    statement_reference VARCHAR(100),
    note TEXT,
    is_adjustment BOOLEAN NOT NULL DEFAULT false,
    UNIQUE (session_id, line_id)
);
";

const LEDGER_CLOSINGS_SQL: &str = r"
CREATE TABLE ledger_closings (
    id UUID PRIMARY KEY,
    temple_id UUID NOT NULL,
    year_id UUID NOT NULL REFERENCES accounting_years(id),
    ledger_id UUID NOT NULL REFERENCES ledgers(id),
    closing_balance NUMERIC(19, 4) NOT NULL,
    carried_forward NUMERIC(19, 4) NOT NULL,
    next_year_id UUID NOT NULL REFERENCES accounting_years(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (year_id, ledger_id)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_entry_balance
-- Rejects any committed entry whose lines do not balance
-- ============================================================
CREATE OR REPLACE FUNCTION check_entry_balance()
RETURNS TRIGGER AS $$
DECLARE
    total_debit NUMERIC(19, 4);
    total_credit NUMERIC(19, 4);
BEGIN
    SELECT
        COALESCE(SUM(debit), 0),
        COALESCE(SUM(credit), 0)
    INTO total_debit, total_credit
    FROM entry_lines
    WHERE entry_id = NEW.entry_id;

    IF total_debit <> total_credit THEN
        RAISE EXCEPTION 'Entry % is not balanced. Debit: %, Credit: %',
            NEW.entry_id, total_debit, total_credit;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_entry_balance
AFTER INSERT OR UPDATE ON entry_lines
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_entry_balance();

-- ============================================================
-- FUNCTION: prevent_closed_year_posting
-- Last line of defence behind the repository's own check
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_closed_year_posting()
RETURNS TRIGGER AS $$
DECLARE
    current_status year_status;
BEGIN
    SELECT status INTO current_status
    FROM accounting_years
    WHERE id = NEW.year_id;

    IF current_status <> 'OPEN' THEN
        RAISE EXCEPTION 'Accounting year % is %, no posting allowed',
            NEW.year_id, current_status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_closed_year_posting
BEFORE INSERT ON entries
FOR EACH ROW
EXECUTE FUNCTION prevent_closed_year_posting();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS ledger_closings CASCADE;
DROP TABLE IF EXISTS reconciliation_items CASCADE;
DROP TABLE IF EXISTS reconciliation_sessions CASCADE;
DROP TABLE IF EXISTS budgets CASCADE;
DROP TABLE IF EXISTS entry_lines CASCADE;
DROP TABLE IF EXISTS entries CASCADE;
DROP TABLE IF EXISTS opening_balances CASCADE;
DROP TABLE IF EXISTS ledgers CASCADE;
DROP TABLE IF EXISTS accounting_years CASCADE;
DROP TABLE IF EXISTS account_groups CASCADE;

DROP FUNCTION IF EXISTS check_entry_balance() CASCADE;
DROP FUNCTION IF EXISTS prevent_closed_year_posting() CASCADE;

DROP TYPE IF EXISTS opening_balance_source;
DROP TYPE IF EXISTS reconciliation_item_status;
DROP TYPE IF EXISTS reconciliation_status;
DROP TYPE IF EXISTS budget_status;
DROP TYPE IF EXISTS entry_status;
DROP TYPE IF EXISTS entry_kind;
DROP TYPE IF EXISTS year_status;
DROP TYPE IF EXISTS ledger_type;
DROP TYPE IF EXISTS account_nature;
";
