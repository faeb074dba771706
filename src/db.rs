use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "chamada.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            grade TEXT NOT NULL,
            year INTEGER NOT NULL,
            teacher TEXT NOT NULL,
            description TEXT,
            school_id INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    // Rows are soft-deleted (is_active = 0), so the class reference of an
    // orphaned student still points at an existing row.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            address TEXT,
            birth_date TEXT,
            parent_name TEXT,
            parent_phone TEXT,
            class_id INTEGER NOT NULL,
            created_at TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_active ON classes(is_active)",
        [],
    )?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = dir.path().join("escola");
        {
            let conn = open_db(&workspace).expect("first open");
            conn.execute(
                "INSERT INTO classes(name, grade, year, teacher)
                 VALUES('Turma A', '6º Ano', 2024, 'Maria Silva')",
                [],
            )
            .expect("insert");
        }
        let conn = open_db(&workspace).expect("second open");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM classes", [], |r| r.get(0))
            .expect("count");
        assert_eq!(n, 1);
        assert!(workspace.join(DB_FILE).is_file());
    }
}
