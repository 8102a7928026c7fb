use super::{timestamp, CoopStore};
use crate::models::{Loan, LoanFilter, LoanStatus, NewLoan};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, OptionalExtension, Row};
use tracing::info;

const LOAN_SELECT: &str = "SELECT l.loan_id, l.member_id, m.full_name, m.member_number,
        l.principal_amount, l.total_amount, l.amount_paid, l.status, l.created_at
     FROM loans l
     LEFT JOIN members m ON l.member_id = m.member_id";

impl CoopStore {
    /// Record a loan. `Ok(None)` when the member does not exist.
    pub fn create_loan(&self, new_loan: &NewLoan) -> Result<Option<Loan>> {
        let conn = self.connect()?;

        let member_exists = conn
            .query_row(
                "SELECT 1 FROM members WHERE member_id = ?1",
                params![new_loan.member_id],
                |_| Ok(()),
            )
            .optional()
            .context("Failed to look up member")?
            .is_some();
        if !member_exists {
            return Ok(None);
        }

        let total_amount = new_loan.total_amount.unwrap_or(new_loan.principal_amount);
        conn.execute(
            "INSERT INTO loans (member_id, principal_amount, total_amount, amount_paid, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new_loan.member_id,
                new_loan.principal_amount,
                total_amount,
                new_loan.amount_paid,
                new_loan.status.as_str(),
                timestamp(Utc::now()),
            ],
        )
        .context("Failed to insert loan")?;
        let loan_id = conn.last_insert_rowid();

        info!(
            "💰 Recorded loan {} for member {} ({:.2})",
            loan_id, new_loan.member_id, new_loan.principal_amount
        );

        let sql = format!("{} WHERE l.loan_id = ?1", LOAN_SELECT);
        conn.query_row(&sql, params![loan_id], row_to_loan)
            .optional()
            .context("Failed to reload loan")
    }

    /// Page through loans, newest first. Returns the page and the matching total.
    pub fn list_loans(
        &self,
        filter: LoanFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Loan>, i64)> {
        let conn = self.connect()?;

        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(status) = filter.status {
            clauses.push("l.status = ?");
            args.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(member_id) = filter.member_id {
            clauses.push("l.member_id = ?");
            args.push(Value::Integer(member_id));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM loans l{}", where_sql),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .context("Failed to count loans")?;

        let sql = format!(
            "{}{} ORDER BY l.created_at DESC, l.loan_id DESC LIMIT ? OFFSET ?",
            LOAN_SELECT, where_sql
        );
        args.push(Value::Integer(limit));
        args.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&sql)?;
        let loans = stmt
            .query_map(params_from_iter(args.iter()), row_to_loan)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list loans")?;

        Ok((loans, total))
    }
}

fn row_to_loan(row: &Row<'_>) -> rusqlite::Result<Loan> {
    let status: String = row.get(7)?;
    Ok(Loan {
        loan_id: row.get(0)?,
        member_id: row.get(1)?,
        member_name: row.get(2)?,
        member_number: row.get(3)?,
        principal_amount: row.get(4)?,
        total_amount: row.get(5)?,
        amount_paid: row.get(6)?,
        status: LoanStatus::from_str(&status).unwrap_or(LoanStatus::Pending),
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberStatus, NewMember};
    use tempfile::NamedTempFile;

    fn create_test_store() -> (CoopStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = CoopStore::new(temp_file.path().to_str().unwrap()).unwrap();
        (store, temp_file)
    }

    fn add_member(store: &CoopStore, number: &str) -> i64 {
        store
            .create_member(&NewMember {
                member_number: number.to_string(),
                full_name: format!("Member {}", number),
                email: None,
                phone: None,
                status: MemberStatus::Active,
            })
            .unwrap()
            .member_id
    }

    fn new_loan(member_id: i64, principal: f64, status: LoanStatus) -> NewLoan {
        NewLoan {
            member_id,
            principal_amount: principal,
            total_amount: None,
            amount_paid: 0.0,
            status,
        }
    }

    #[test]
    fn test_create_loan_joins_member() {
        let (store, _temp) = create_test_store();
        let member_id = add_member(&store, "M-7");

        let loan = store
            .create_loan(&new_loan(member_id, 2500.0, LoanStatus::Pending))
            .unwrap()
            .unwrap();
        assert_eq!(loan.member_number.as_deref(), Some("M-7"));
        assert_eq!(loan.member_name.as_deref(), Some("Member M-7"));
        assert_eq!(loan.total_amount, 2500.0);
        assert_eq!(loan.status, LoanStatus::Pending);
    }

    #[test]
    fn test_create_loan_for_unknown_member() {
        let (store, _temp) = create_test_store();
        let result = store
            .create_loan(&new_loan(404, 100.0, LoanStatus::Pending))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_list_loans_filters() {
        let (store, _temp) = create_test_store();
        let a = add_member(&store, "M-A");
        let b = add_member(&store, "M-B");

        store
            .create_loan(&new_loan(a, 100.0, LoanStatus::Active))
            .unwrap();
        store
            .create_loan(&new_loan(a, 200.0, LoanStatus::Pending))
            .unwrap();
        store
            .create_loan(&new_loan(b, 300.0, LoanStatus::Active))
            .unwrap();

        let (all, total) = store.list_loans(LoanFilter::default(), 100, 0).unwrap();
        assert_eq!(total, 3);
        assert_eq!(all[0].principal_amount, 300.0);

        let active = LoanFilter {
            status: Some(LoanStatus::Active),
            member_id: None,
        };
        let (loans, total) = store.list_loans(active, 100, 0).unwrap();
        assert_eq!(total, 2);
        assert!(loans.iter().all(|l| l.status == LoanStatus::Active));

        let for_a = LoanFilter {
            status: Some(LoanStatus::Active),
            member_id: Some(a),
        };
        let (loans, total) = store.list_loans(for_a, 100, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(loans[0].principal_amount, 100.0);

        let (page, total) = store.list_loans(LoanFilter::default(), 1, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].principal_amount, 100.0);
    }
}
