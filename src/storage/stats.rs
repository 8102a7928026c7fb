use super::CoopStore;
use crate::models::{repayment_rate, DashboardStats};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    conn.query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("Stats query failed: {}", sql))
}

fn sum(conn: &Connection, sql: &str) -> Result<f64> {
    conn.query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("Stats query failed: {}", sql))
}

impl CoopStore {
    /// Aggregate dashboard figures. "This month" is the UTC calendar month of `now`.
    ///
    /// Reads the `users` table as well, so the user store must share this database.
    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let conn = self.connect()?;
        let month_prefix = format!("{}%", now.format("%Y-%m-"));

        let total_members = count(&conn, "SELECT COUNT(*) FROM members")?;
        let active_members = count(&conn, "SELECT COUNT(*) FROM members WHERE status = 'active'")?;
        let pending_members =
            count(&conn, "SELECT COUNT(*) FROM members WHERE status = 'pending'")?;
        let total_users = count(&conn, "SELECT COUNT(*) FROM users")?;

        let total_loans = count(&conn, "SELECT COUNT(*) FROM loans")?;
        let active_loans_amount = sum(
            &conn,
            "SELECT COALESCE(SUM(principal_amount), 0.0) FROM loans WHERE status = 'active'",
        )?;
        let pending_loans = count(&conn, "SELECT COUNT(*) FROM loans WHERE status = 'pending'")?;
        let approved_loans = count(&conn, "SELECT COUNT(*) FROM loans WHERE status = 'approved'")?;

        let (total_loan_amount, total_amount_paid): (f64, f64) = conn
            .query_row(
                "SELECT COALESCE(SUM(total_amount), 0.0), COALESCE(SUM(amount_paid), 0.0)
                 FROM loans WHERE status IN ('active', 'completed')",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to sum repayments")?;

        let members_this_month: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM members WHERE created_at LIKE ?1",
                params![month_prefix],
                |row| row.get(0),
            )
            .context("Failed to count new members")?;
        let loans_this_month: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM loans WHERE created_at LIKE ?1",
                params![month_prefix],
                |row| row.get(0),
            )
            .context("Failed to count new loans")?;

        Ok(DashboardStats {
            total_members,
            active_members,
            pending_members,
            total_users,
            total_loans,
            active_loans_amount,
            pending_loans,
            approved_loans,
            total_loan_amount,
            total_amount_paid,
            repayment_rate: repayment_rate(total_loan_amount, total_amount_paid),
            members_this_month,
            loans_this_month,
        })
    }
}
