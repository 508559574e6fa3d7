//! SQLite store
//!
//! Persists the ledger in three tables plus an append-only payment log.
//! Decimals are stored as TEXT to keep exact precision, breakdowns as JSON.
//! Both commit methods run inside a database transaction; an error anywhere
//! rolls the whole unit of work back.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use domain_ledger::{Apartment, ChargeRecord, LedgerStore, PaymentRecord, StoreError, Tariff};
use ledger_kernel::{BillingPeriod, FlatNumber, PaymentId, ServiceCode};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::pool::{create_pool, StoreConfig, StorePool};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS apartments (
    flat_number  INTEGER PRIMARY KEY,
    area         TEXT NOT NULL,
    owner        TEXT NOT NULL,
    balance      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tariffs (
    service_code TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    unit         TEXT NOT NULL CHECK (unit IN ('per_area', 'per_unit')),
    rate         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS charges (
    flat_number      INTEGER NOT NULL REFERENCES apartments (flat_number),
    month            INTEGER NOT NULL,
    year             INTEGER NOT NULL,
    breakdown        TEXT NOT NULL,
    total_charge     TEXT NOT NULL,
    previous_balance TEXT NOT NULL,
    amount_due       TEXT NOT NULL,
    paid_amount      TEXT NOT NULL,
    date_paid        TEXT,
    PRIMARY KEY (flat_number, month, year)
);

CREATE INDEX IF NOT EXISTS idx_charges_flat_year ON charges (flat_number, year);

CREATE TABLE IF NOT EXISTS payments (
    id          TEXT PRIMARY KEY,
    flat_number INTEGER NOT NULL,
    month       INTEGER NOT NULL,
    year        INTEGER NOT NULL,
    amount      TEXT NOT NULL,
    date_paid   TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);
"#;

/// A `LedgerStore` on SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: StorePool,
}

impl SqliteStore {
    /// Wraps an existing pool. Call [`SqliteStore::migrate`] before use.
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Opens the database described by `config` and bootstraps the schema.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let store = Self::new(create_pool(config).await?);
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the tables and indexes when absent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        info!("ledger schema ready");
        Ok(())
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut => {
            StoreError::ConnectionFailed("connection pool exhausted".to_string())
        }
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_check_violation() => {
            StoreError::ConstraintViolation(db.message().to_string())
        }
        other => StoreError::QueryFailed(other.to_string()),
    }
}

fn parse_decimal(text: &str, column: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(text)
        .map_err(|e| StoreError::Serialization(format!("column {column}: {e}")))
}

fn get_text(row: &SqliteRow, column: &str) -> Result<String, StoreError> {
    row.try_get::<String, _>(column).map_err(map_sqlx)
}

fn get_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, StoreError> {
    parse_decimal(&get_text(row, column)?, column)
}

fn get_flat(row: &SqliteRow) -> Result<FlatNumber, StoreError> {
    let raw: i64 = row.try_get("flat_number").map_err(map_sqlx)?;
    u32::try_from(raw)
        .ok()
        .and_then(|n| FlatNumber::new(n).ok())
        .ok_or_else(|| StoreError::Serialization(format!("invalid flat number {raw}")))
}

fn get_period(row: &SqliteRow) -> Result<BillingPeriod, StoreError> {
    let month: i64 = row.try_get("month").map_err(map_sqlx)?;
    let year: i64 = row.try_get("year").map_err(map_sqlx)?;
    BillingPeriod::new(month as u32, year as i32)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn apartment_from_row(row: &SqliteRow) -> Result<Apartment, StoreError> {
    Ok(Apartment {
        flat: get_flat(row)?,
        area: get_decimal(row, "area")?,
        owner: get_text(row, "owner")?,
        balance: get_decimal(row, "balance")?,
    })
}

fn tariff_from_row(row: &SqliteRow) -> Result<Tariff, StoreError> {
    let code = ServiceCode::new(get_text(row, "service_code")?)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let unit = serde_json::from_value(serde_json::Value::String(get_text(row, "unit")?))
        .map_err(|e| StoreError::Serialization(format!("column unit: {e}")))?;
    Ok(Tariff {
        service_code: code,
        name: get_text(row, "name")?,
        unit,
        rate: get_decimal(row, "rate")?,
    })
}

fn charge_from_row(row: &SqliteRow) -> Result<ChargeRecord, StoreError> {
    let breakdown = serde_json::from_str(&get_text(row, "breakdown")?)
        .map_err(|e| StoreError::Serialization(format!("column breakdown: {e}")))?;
    let date_paid = row
        .try_get::<Option<String>, _>("date_paid")
        .map_err(map_sqlx)?
        .map(|d| {
            NaiveDate::from_str(&d)
                .map_err(|e| StoreError::Serialization(format!("column date_paid: {e}")))
        })
        .transpose()?;

    Ok(ChargeRecord {
        flat: get_flat(row)?,
        period: get_period(row)?,
        breakdown,
        total_charge: get_decimal(row, "total_charge")?,
        previous_balance: get_decimal(row, "previous_balance")?,
        amount_due: get_decimal(row, "amount_due")?,
        paid_amount: get_decimal(row, "paid_amount")?,
        date_paid,
    })
}

fn payment_from_row(row: &SqliteRow) -> Result<PaymentRecord, StoreError> {
    let id = Uuid::from_str(&get_text(row, "id")?)
        .map_err(|e| StoreError::Serialization(format!("column id: {e}")))?;
    let date_paid = NaiveDate::from_str(&get_text(row, "date_paid")?)
        .map_err(|e| StoreError::Serialization(format!("column date_paid: {e}")))?;
    let recorded_at = DateTime::parse_from_rfc3339(&get_text(row, "recorded_at")?)
        .map_err(|e| StoreError::Serialization(format!("column recorded_at: {e}")))?
        .with_timezone(&Utc);

    Ok(PaymentRecord {
        id: PaymentId::from_uuid(id),
        flat: get_flat(row)?,
        period: get_period(row)?,
        amount: get_decimal(row, "amount")?,
        date_paid,
        recorded_at,
    })
}

/// Upserts a charge by its natural key inside an open transaction.
async fn upsert_charge(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    charge: &ChargeRecord,
) -> Result<(), StoreError> {
    let breakdown = serde_json::to_string(&charge.breakdown)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO charges (
            flat_number, month, year, breakdown, total_charge,
            previous_balance, amount_due, paid_amount, date_paid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT (flat_number, month, year) DO UPDATE SET
            breakdown = excluded.breakdown,
            total_charge = excluded.total_charge,
            previous_balance = excluded.previous_balance,
            amount_due = excluded.amount_due,
            paid_amount = excluded.paid_amount,
            date_paid = excluded.date_paid
        "#,
    )
    .bind(charge.flat.as_u32())
    .bind(charge.period.month())
    .bind(charge.period.year())
    .bind(breakdown)
    .bind(charge.total_charge.to_string())
    .bind(charge.previous_balance.to_string())
    .bind(charge.amount_due.to_string())
    .bind(charge.paid_amount.to_string())
    .bind(charge.date_paid.map(|d| d.to_string()))
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

/// Writes the apartment's balance inside an open transaction, failing when
/// the flat is not registered so the transaction rolls back.
async fn write_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    flat: FlatNumber,
    new_balance: Decimal,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE apartments SET balance = ?1 WHERE flat_number = ?2")
        .bind(new_balance.to_string())
        .bind(flat.as_u32())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?;

    if result.rows_affected() != 1 {
        return Err(StoreError::ConstraintViolation(format!(
            "apartment {flat} not registered"
        )));
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn list_tariffs(&self) -> Result<Vec<Tariff>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tariffs ORDER BY service_code")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(tariff_from_row).collect()
    }

    async fn insert_tariff(&self, tariff: &Tariff) -> Result<(), StoreError> {
        let unit = serde_json::to_value(tariff.unit)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| StoreError::Serialization("tariff unit".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO tariffs (service_code, name, unit, rate)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (service_code) DO UPDATE SET
                name = excluded.name,
                unit = excluded.unit,
                rate = excluded.rate
            "#,
        )
        .bind(tariff.service_code.as_str())
        .bind(&tariff.name)
        .bind(unit)
        .bind(tariff.rate.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn list_apartments(&self) -> Result<Vec<Apartment>, StoreError> {
        let rows = sqlx::query("SELECT * FROM apartments ORDER BY flat_number")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(apartment_from_row).collect()
    }

    async fn insert_apartment(&self, apartment: &Apartment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO apartments (flat_number, area, owner, balance) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(apartment.flat.as_u32())
        .bind(apartment.area.to_string())
        .bind(&apartment.owner)
        .bind(apartment.balance.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn get_apartment(&self, flat: FlatNumber) -> Result<Option<Apartment>, StoreError> {
        let row = sqlx::query("SELECT * FROM apartments WHERE flat_number = ?1")
            .bind(flat.as_u32())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(apartment_from_row).transpose()
    }

    async fn get_charge(
        &self,
        flat: FlatNumber,
        period: BillingPeriod,
    ) -> Result<Option<ChargeRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM charges WHERE flat_number = ?1 AND month = ?2 AND year = ?3",
        )
        .bind(flat.as_u32())
        .bind(period.month())
        .bind(period.year())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.as_ref().map(charge_from_row).transpose()
    }

    async fn charges_for_year(
        &self,
        flat: FlatNumber,
        year: i32,
    ) -> Result<Vec<ChargeRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM charges WHERE flat_number = ?1 AND year = ?2 ORDER BY month",
        )
        .bind(flat.as_u32())
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.iter().map(charge_from_row).collect()
    }

    async fn payments_for_flat(
        &self,
        flat: FlatNumber,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM payments WHERE flat_number = ?1 ORDER BY id")
            .bind(flat.as_u32())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn commit_generation(
        &self,
        charge: &ChargeRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        upsert_charge(&mut tx, charge).await?;
        write_balance(&mut tx, charge.flat, new_balance).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))
    }

    async fn commit_payment(
        &self,
        charge: &ChargeRecord,
        payment: &PaymentRecord,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        upsert_charge(&mut tx, charge).await?;
        sqlx::query(
            r#"
            INSERT INTO payments (id, flat_number, month, year, amount, date_paid, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(payment.id.as_uuid().to_string())
        .bind(payment.flat.as_u32())
        .bind(payment.period.month())
        .bind(payment.period.year())
        .bind(payment.amount.to_string())
        .bind(payment.date_paid.to_string())
        .bind(payment.recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        write_balance(&mut tx, charge.flat, new_balance).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))
    }
}
