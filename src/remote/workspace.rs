use super::{Remote, RemoteError};
use crate::db;
use crate::ids::DisplayIdGenerator;
use crate::model::{Class, ClassPayload, EntityId, Student, StudentPayload};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

const CLASS_SELECT: &str = "SELECT
       c.id,
       c.name,
       c.grade,
       c.year,
       c.teacher,
       c.description,
       c.school_id,
       c.created_at,
       c.is_active,
       (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id AND s.is_active = 1)
         AS student_count
     FROM classes c";

const STUDENT_SELECT: &str = "SELECT
       id,
       student_id,
       name,
       email,
       phone,
       address,
       birth_date,
       parent_name,
       parent_phone,
       class_id,
       created_at,
       is_active
     FROM students";

const CLASS_NOT_FOUND: &str = "Turma não encontrada";
const STUDENT_NOT_FOUND: &str = "Estudante não encontrado";
const DUPLICATE_STUDENT_ID: &str = "ID do estudante já existe";

/// Authoritative store kept in a local SQLite workspace.
///
/// Answers exactly like the REST backend: soft deletes, active-only lists,
/// per-class student counts, unique display ids.
pub struct WorkspaceRemote {
    path: PathBuf,
    conn: Mutex<Connection>,
    ids: DisplayIdGenerator,
}

impl WorkspaceRemote {
    pub fn open(workspace: &Path, ids: DisplayIdGenerator) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)?;
        Ok(Self {
            path: workspace.to_path_buf(),
            conn: Mutex::new(conn),
            ids,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn db_err(e: rusqlite::Error) -> RemoteError {
    RemoteError::rejected(500, e.to_string())
}

fn class_from_row(row: &Row<'_>) -> rusqlite::Result<Class> {
    let year: i64 = row.get(3)?;
    let active: i64 = row.get(8)?;
    let student_count: i64 = row.get(9)?;
    Ok(Class {
        id: EntityId(row.get(0)?),
        name: row.get(1)?,
        grade: row.get(2)?,
        year: year.to_string(),
        teacher: row.get(4)?,
        description: row.get(5)?,
        student_count: u32::try_from(student_count).ok(),
        school_id: row.get(6)?,
        created_at: row.get(7)?,
        is_active: active != 0,
    })
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let birth_date: Option<String> = row.get(6)?;
    let active: i64 = row.get(11)?;
    Ok(Student {
        id: EntityId(row.get(0)?),
        student_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        birth_date: birth_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        parent_name: row.get(7)?,
        parent_phone: row.get(8)?,
        class_id: EntityId(row.get(9)?),
        created_at: row.get(10)?,
        is_active: active != 0,
    })
}

fn active_class(conn: &Connection, id: EntityId) -> Result<Option<Class>, RemoteError> {
    conn.query_row(
        &format!("{CLASS_SELECT} WHERE c.id = ? AND c.is_active = 1"),
        [id.0],
        class_from_row,
    )
    .optional()
    .map_err(db_err)
}

fn active_student(conn: &Connection, id: EntityId) -> Result<Option<Student>, RemoteError> {
    conn.query_row(
        &format!("{STUDENT_SELECT} WHERE id = ? AND is_active = 1"),
        [id.0],
        student_from_row,
    )
    .optional()
    .map_err(db_err)
}

fn student_id_taken(conn: &Connection, student_id: &str) -> Result<bool, RemoteError> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE student_id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(db_err)?;
    Ok(hit.is_some())
}

fn parse_year(raw: &str) -> Result<i64, RemoteError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| RemoteError::rejected(400, format!("Ano inválido: {raw}")))
}

fn require(fields: &[(&'static str, &str)]) -> Result<(), RemoteError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(RemoteError::rejected(
        400,
        format!("Campos obrigatórios ausentes: {}", missing.join(", ")),
    ))
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

impl Remote for WorkspaceRemote {
    fn describe(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn list_classes(&self) -> Result<Vec<Class>, RemoteError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("{CLASS_SELECT} WHERE c.is_active = 1 ORDER BY c.id"))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], class_from_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err);
        rows
    }

    fn create_class(&self, payload: &ClassPayload) -> Result<Class, RemoteError> {
        require(&[
            ("name", payload.name.as_str()),
            ("grade", payload.grade.as_str()),
            ("teacher", payload.teacher.as_str()),
        ])?;
        let year = parse_year(&payload.year)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO classes(
                name, grade, year, teacher, description, school_id, created_at, is_active
             )
             VALUES(?, ?, ?, ?, ?, 1, strftime('%Y-%m-%dT%H:%M:%S','now'), 1)",
            (
                payload.name.trim(),
                payload.grade.trim(),
                year,
                payload.teacher.trim(),
                payload.description.as_deref(),
            ),
        )
        .map_err(db_err)?;
        let id = EntityId(conn.last_insert_rowid());
        debug!(%id, "workspace: class created");
        active_class(&conn, id)?.ok_or_else(|| RemoteError::rejected(500, CLASS_NOT_FOUND))
    }

    fn update_class(&self, id: EntityId, payload: &ClassPayload) -> Result<Class, RemoteError> {
        let conn = self.conn.lock();
        if active_class(&conn, id)?.is_none() {
            return Err(RemoteError::rejected(404, CLASS_NOT_FOUND));
        }
        require(&[
            ("name", payload.name.as_str()),
            ("grade", payload.grade.as_str()),
            ("teacher", payload.teacher.as_str()),
        ])?;
        let year = parse_year(&payload.year)?;

        conn.execute(
            "UPDATE classes
             SET name = ?, grade = ?, year = ?, teacher = ?, description = ?
             WHERE id = ?",
            (
                payload.name.trim(),
                payload.grade.trim(),
                year,
                payload.teacher.trim(),
                payload.description.as_deref(),
                id.0,
            ),
        )
        .map_err(db_err)?;
        active_class(&conn, id)?.ok_or_else(|| RemoteError::rejected(404, CLASS_NOT_FOUND))
    }

    fn delete_class(&self, id: EntityId) -> Result<(), RemoteError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE classes SET is_active = 0 WHERE id = ? AND is_active = 1",
                [id.0],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(RemoteError::rejected(404, CLASS_NOT_FOUND));
        }
        debug!(%id, "workspace: class soft-deleted");
        Ok(())
    }

    fn list_students(&self) -> Result<Vec<Student>, RemoteError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("{STUDENT_SELECT} WHERE is_active = 1 ORDER BY id"))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], student_from_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err);
        rows
    }

    fn create_student(&self, payload: &StudentPayload) -> Result<Student, RemoteError> {
        require(&[("name", payload.name.as_str()), ("email", payload.email.as_str())])?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        if active_class(&tx, payload.class_id)?.is_none() {
            return Err(RemoteError::rejected(400, CLASS_NOT_FOUND));
        }

        let student_id = match payload.student_id.as_deref().map(str::trim) {
            Some(sid) if !sid.is_empty() => {
                if student_id_taken(&tx, sid)? {
                    return Err(RemoteError::rejected(400, DUPLICATE_STUDENT_ID));
                }
                sid.to_string()
            }
            _ => {
                // Server-assigned: first free number after the row count.
                let count: i64 = tx
                    .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
                    .map_err(db_err)?;
                let mut n = u64::try_from(count).unwrap_or(0) + 1;
                loop {
                    let candidate = self.ids.format(n);
                    if !student_id_taken(&tx, &candidate)? {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };

        tx.execute(
            "INSERT INTO students(
               student_id,
               name,
               email,
               phone,
               address,
               birth_date,
               parent_name,
               parent_phone,
               class_id,
               created_at,
               is_active
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%S','now'), 1)",
            (
                &student_id,
                payload.name.trim(),
                payload.email.trim(),
                payload.phone.as_deref(),
                payload.address.as_deref(),
                date_text(payload.birth_date),
                payload.parent_name.as_deref(),
                payload.parent_phone.as_deref(),
                payload.class_id.0,
            ),
        )
        .map_err(db_err)?;
        let id = EntityId(tx.last_insert_rowid());
        let created = active_student(&tx, id)?;
        tx.commit().map_err(db_err)?;
        debug!(%id, %student_id, "workspace: student created");
        created.ok_or_else(|| RemoteError::rejected(500, STUDENT_NOT_FOUND))
    }

    fn update_student(
        &self,
        id: EntityId,
        payload: &StudentPayload,
    ) -> Result<Student, RemoteError> {
        let conn = self.conn.lock();
        if active_student(&conn, id)?.is_none() {
            return Err(RemoteError::rejected(404, STUDENT_NOT_FOUND));
        }
        require(&[("name", payload.name.as_str()), ("email", payload.email.as_str())])?;
        if active_class(&conn, payload.class_id)?.is_none() {
            return Err(RemoteError::rejected(400, CLASS_NOT_FOUND));
        }

        // The display id is immutable; an absent birth date keeps the stored one.
        conn.execute(
            "UPDATE students
             SET name = ?,
                 email = ?,
                 phone = ?,
                 address = ?,
                 parent_name = ?,
                 parent_phone = ?,
                 class_id = ?,
                 birth_date = COALESCE(?, birth_date)
             WHERE id = ?",
            (
                payload.name.trim(),
                payload.email.trim(),
                payload.phone.as_deref(),
                payload.address.as_deref(),
                payload.parent_name.as_deref(),
                payload.parent_phone.as_deref(),
                payload.class_id.0,
                date_text(payload.birth_date),
                id.0,
            ),
        )
        .map_err(db_err)?;
        active_student(&conn, id)?.ok_or_else(|| RemoteError::rejected(404, STUDENT_NOT_FOUND))
    }

    fn delete_student(&self, id: EntityId) -> Result<(), RemoteError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE students SET is_active = 0 WHERE id = ? AND is_active = 1",
                [id.0],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(RemoteError::rejected(404, STUDENT_NOT_FOUND));
        }
        debug!(%id, "workspace: student soft-deleted");
        Ok(())
    }
}
