use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Case, SectionMap};

pub fn insert_case(conn: &Connection, case: &Case) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO cases (id, title, created_at) VALUES (?1, ?2, ?3)",
        params![
            case.id.to_string(),
            case.title,
            case.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_case(conn: &Connection, id: &Uuid) -> Result<Option<Case>, DatabaseError> {
    let result = conn.query_row(
        "SELECT title, created_at FROM cases WHERE id = ?1",
        params![id.to_string()],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    );

    match result {
        Ok((title, created_at)) => Ok(Some(Case {
            id: *id,
            title,
            created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%dT%H:%M:%S"))
                .unwrap_or_default(),
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert or replace one section's text. Keys are stored as given.
pub fn upsert_section(
    conn: &Connection,
    case_id: &Uuid,
    section_key: &str,
    content: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO case_sections (case_id, section_key, content) VALUES (?1, ?2, ?3)
         ON CONFLICT(case_id, section_key) DO UPDATE SET content = excluded.content",
        params![case_id.to_string(), section_key, content],
    )?;
    Ok(())
}

/// Insert a case together with its sections in one transaction.
pub fn import_case(
    conn: &Connection,
    case: &Case,
    sections: &SectionMap,
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    insert_case(&tx, case)?;
    for (key, content) in sections {
        upsert_section(&tx, &case.id, key, content)?;
    }
    tx.commit()?;
    Ok(())
}

pub fn get_case_sections(conn: &Connection, case_id: &Uuid) -> Result<SectionMap, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT section_key, content FROM case_sections WHERE case_id = ?1 ORDER BY section_key",
    )?;

    let rows = stmt.query_map(params![case_id.to_string()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
