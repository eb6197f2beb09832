use rusqlite::Connection;
use uuid::Uuid;

use super::case::{get_case, get_case_sections};
use super::metadata::update_case_metadata;
use crate::db::DatabaseError;
use crate::models::{CaseMetadata, SectionMap};

/// Case storage as seen by the scenario pipeline.
pub trait CaseStore {
    /// Raw sections of a case, or `None` if the case does not exist.
    fn load_sections(&self, case_id: &Uuid) -> Result<Option<SectionMap>, DatabaseError>;

    /// Atomically read, modify and write the case metadata. On error the
    /// stored metadata is unchanged.
    fn update_metadata(
        &self,
        case_id: &Uuid,
        apply: &mut dyn FnMut(&mut CaseMetadata),
    ) -> Result<CaseMetadata, DatabaseError>;
}

/// SQLite-backed case store owning its connection.
pub struct SqliteCaseStore {
    conn: Connection,
}

impl SqliteCaseStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CaseStore for SqliteCaseStore {
    fn load_sections(&self, case_id: &Uuid) -> Result<Option<SectionMap>, DatabaseError> {
        if get_case(&self.conn, case_id)?.is_none() {
            return Ok(None);
        }
        get_case_sections(&self.conn, case_id).map(Some)
    }

    fn update_metadata(
        &self,
        case_id: &Uuid,
        apply: &mut dyn FnMut(&mut CaseMetadata),
    ) -> Result<CaseMetadata, DatabaseError> {
        update_case_metadata(&self.conn, case_id, apply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_case, upsert_section};
    use crate::db::sqlite::open_memory_database;
    use crate::models::Case;

    #[test]
    fn load_sections_for_unknown_case_is_none() {
        let store = SqliteCaseStore::new(open_memory_database().unwrap());
        assert!(store.load_sections(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn load_sections_and_update_metadata() {
        let store = SqliteCaseStore::new(open_memory_database().unwrap());
        let case = Case {
            id: Uuid::new_v4(),
            title: "Case".into(),
            created_at: chrono::Local::now().naive_local(),
        };
        insert_case(store.connection(), &case).unwrap();
        upsert_section(store.connection(), &case.id, "facts", "Engineer A signed.").unwrap();

        let sections = store.load_sections(&case.id).unwrap().unwrap();
        assert_eq!(sections["facts"], "Engineer A signed.");

        let meta = store
            .update_metadata(&case.id, &mut |meta| {
                meta.extra.insert("seen".into(), serde_json::json!(1));
            })
            .unwrap();
        assert_eq!(meta.extra["seen"], 1);
    }

    #[test]
    fn case_without_sections_loads_empty_map() {
        let store = SqliteCaseStore::new(open_memory_database().unwrap());
        let case = Case {
            id: Uuid::new_v4(),
            title: "Empty".into(),
            created_at: chrono::Local::now().naive_local(),
        };
        insert_case(store.connection(), &case).unwrap();
        assert!(store.load_sections(&case.id).unwrap().unwrap().is_empty());
    }
}
