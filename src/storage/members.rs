use super::{timestamp, CoopStore};
use crate::models::{Member, MemberStatus, NewMember};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, OptionalExtension, Row};
use tracing::info;

const MEMBER_COLUMNS: &str =
    "member_id, member_number, full_name, email, phone, status, created_at";

impl CoopStore {
    /// Register a member
    pub fn create_member(&self, new_member: &NewMember) -> Result<Member> {
        let member_number = new_member.member_number.trim().to_string();
        let full_name = new_member.full_name.trim().to_string();
        let created_at = timestamp(Utc::now());

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO members (member_number, full_name, email, phone, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                member_number,
                full_name,
                new_member.email,
                new_member.phone,
                new_member.status.as_str(),
                created_at,
            ],
        )
        .context("Failed to insert member")?;

        let member = Member {
            member_id: conn.last_insert_rowid(),
            member_number,
            full_name,
            email: new_member.email.clone(),
            phone: new_member.phone.clone(),
            status: new_member.status,
            created_at,
        };

        info!(
            "👥 Registered member {} ({})",
            member.member_number,
            member.status.as_str()
        );
        Ok(member)
    }

    pub fn get_member(&self, member_id: i64) -> Result<Option<Member>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM members WHERE member_id = ?1", MEMBER_COLUMNS);
        conn.query_row(&sql, params![member_id], row_to_member)
            .optional()
            .context("Failed to load member")
    }

    /// Page through members, newest first. Returns the page and the matching total.
    pub fn list_members(
        &self,
        status: Option<MemberStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Member>, i64)> {
        let conn = self.connect()?;

        let mut filter = String::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(status) = status {
            filter.push_str(" WHERE status = ?");
            args.push(Value::Text(status.as_str().to_string()));
        }

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM members{}", filter),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .context("Failed to count members")?;

        let sql = format!(
            "SELECT {} FROM members{} ORDER BY created_at DESC, member_id DESC LIMIT ? OFFSET ?",
            MEMBER_COLUMNS, filter
        );
        args.push(Value::Integer(limit));
        args.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&sql)?;
        let members = stmt
            .query_map(params_from_iter(args.iter()), row_to_member)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list members")?;

        Ok((members, total))
    }
}

fn row_to_member(row: &Row<'_>) -> rusqlite::Result<Member> {
    let status: String = row.get(5)?;
    Ok(Member {
        member_id: row.get(0)?,
        member_number: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        status: MemberStatus::from_str(&status).unwrap_or(MemberStatus::Pending),
        created_at: row.get(6)?,
    })
}
