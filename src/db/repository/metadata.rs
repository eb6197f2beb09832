use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{CaseMetadata, ScenarioVersion};

fn read_metadata(conn: &Connection, case_id: &Uuid) -> Result<CaseMetadata, DatabaseError> {
    let result = conn.query_row(
        "SELECT metadata FROM case_metadata WHERE case_id = ?1",
        params![case_id.to_string()],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(CaseMetadata::default()),
        Err(e) => Err(e.into()),
    }
}

/// Metadata for a case. A case with no stored metadata reads as empty.
pub fn get_case_metadata(conn: &Connection, case_id: &Uuid) -> Result<CaseMetadata, DatabaseError> {
    read_metadata(conn, case_id)
}

/// Read-modify-write of a case's metadata in a single transaction.
///
/// Nothing is written if `apply` or the write fails. Keys the caller does not
/// touch are written back unchanged. Unknown cases are `NotFound`.
pub fn update_case_metadata(
    conn: &Connection,
    case_id: &Uuid,
    apply: &mut dyn FnMut(&mut CaseMetadata),
) -> Result<CaseMetadata, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let exists = tx.query_row(
        "SELECT 1 FROM cases WHERE id = ?1",
        params![case_id.to_string()],
        |_| Ok(()),
    );
    match exists {
        Ok(()) => {}
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            return Err(DatabaseError::NotFound {
                entity_type: "Case".into(),
                id: case_id.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    }

    let mut metadata = read_metadata(&tx, case_id)?;
    apply(&mut metadata);
    let json = serde_json::to_string(&metadata)?;

    tx.execute(
        "INSERT INTO case_metadata (case_id, metadata, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(case_id) DO UPDATE SET metadata = excluded.metadata,
                                            updated_at = excluded.updated_at",
        params![case_id.to_string(), json],
    )?;
    tx.commit()?;

    Ok(metadata)
}

/// Stored scenario versions for a case, oldest first.
pub fn list_scenario_versions(
    conn: &Connection,
    case_id: &Uuid,
) -> Result<Vec<ScenarioVersion>, DatabaseError> {
    Ok(read_metadata(conn, case_id)?.scenario_versions)
}
