//! Medicine database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Medicine;

impl Database {
    /// Insert a new medicine.
    pub fn insert_medicine(&self, medicine: &Medicine) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO medicines (medicine_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![medicine.medicine_id, medicine.name, medicine.created_at],
        )?;
        Ok(())
    }

    /// Get a medicine by ID.
    pub fn get_medicine(&self, medicine_id: &str) -> DbResult<Option<Medicine>> {
        self.conn
            .query_row(
                "SELECT medicine_id, name, created_at FROM medicines WHERE medicine_id = ?",
                [medicine_id],
                |row| {
                    Ok(Medicine {
                        medicine_id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all medicines by name.
    pub fn list_medicines(&self) -> DbResult<Vec<Medicine>> {
        let mut stmt = self
            .conn
            .prepare("SELECT medicine_id, name, created_at FROM medicines ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok(Medicine {
                medicine_id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

pub(crate) fn medicine_exists(conn: &Connection, medicine_id: &str) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM medicines WHERE medicine_id = ?",
            [medicine_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let medicine = Medicine::new("Amoxicillin 500mg capsule".into());
        db.insert_medicine(&medicine).unwrap();

        let retrieved = db.get_medicine(&medicine.medicine_id).unwrap().unwrap();
        assert_eq!(retrieved, medicine);
        assert!(medicine_exists(db.conn(), &medicine.medicine_id).unwrap());
        assert!(!medicine_exists(db.conn(), "missing").unwrap());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let db = Database::open_in_memory().unwrap();
        let medicine = Medicine::with_id("med-1".into(), "Paracetamol".into());
        db.insert_medicine(&medicine).unwrap();
        assert!(db.insert_medicine(&medicine).is_err());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.insert_medicine(&Medicine::new("Salbutamol".into())).unwrap();
        db.insert_medicine(&Medicine::new("Amoxicillin".into())).unwrap();

        let names: Vec<_> = db
            .list_medicines()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Amoxicillin", "Salbutamol"]);
    }
}
