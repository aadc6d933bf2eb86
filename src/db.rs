use crate::indicators::Indicator;
use crate::store::{
    GradeStore, SaveOutcome, SavePayload, ScoreNote, Selection, StudentRef, StudentScoreRecord,
};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("gradebook.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            grade_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(grade_id) REFERENCES grades(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_grade_sort ON students(grade_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS score_notes(
            grade_id TEXT NOT NULL,
            area_id TEXT NOT NULL,
            period INTEGER NOT NULL,
            student_id TEXT NOT NULL,
            component_id TEXT NOT NULL,
            name TEXT NOT NULL,
            value REAL,
            weight_percent REAL NOT NULL,
            sort_order INTEGER NOT NULL,
            updated_at TEXT,
            PRIMARY KEY(grade_id, area_id, period, student_id, component_id),
            FOREIGN KEY(grade_id) REFERENCES grades(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS indicators(
            id TEXT PRIMARY KEY,
            grade_id TEXT NOT NULL,
            area_id TEXT NOT NULL,
            period INTEGER NOT NULL,
            text TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(grade_id) REFERENCES grades(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_indicators_selection ON indicators(grade_id, area_id, period)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub id: String,
    pub grade_id: String,
    pub display_name: String,
    pub active: bool,
    pub sort_order: i64,
}

pub fn grade_upsert(conn: &Connection, id: Option<&str>, name: &str) -> anyhow::Result<String> {
    let id = id
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO grades(id, name) VALUES(?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        (&id, name),
    )?;
    Ok(id)
}

pub fn grade_exists(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM grades WHERE id = ?", [id], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn grades_list(conn: &Connection) -> anyhow::Result<Vec<GradeRow>> {
    let mut stmt = conn.prepare("SELECT id, name FROM grades ORDER BY name, id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(GradeRow {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn student_upsert(
    conn: &Connection,
    id: Option<&str>,
    grade_id: &str,
    display_name: &str,
    active: bool,
) -> anyhow::Result<String> {
    let id = id
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let existing_sort: Option<i64> = conn
        .query_row(
            "SELECT sort_order FROM students WHERE id = ?",
            [&id],
            |r| r.get(0),
        )
        .optional()?;
    let sort_order = match existing_sort {
        Some(v) => v,
        None => conn.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM students WHERE grade_id = ?",
            [grade_id],
            |r| r.get(0),
        )?,
    };
    conn.execute(
        "INSERT INTO students(id, grade_id, display_name, active, sort_order, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           grade_id = excluded.grade_id,
           display_name = excluded.display_name,
           active = excluded.active,
           updated_at = excluded.updated_at",
        (
            &id,
            grade_id,
            display_name,
            if active { 1 } else { 0 },
            sort_order,
            now_rfc3339(),
        ),
    )?;
    Ok(id)
}

pub fn students_list(conn: &Connection, grade_id: &str) -> anyhow::Result<Vec<StudentRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, grade_id, display_name, active, sort_order
         FROM students
         WHERE grade_id = ?
         ORDER BY sort_order, id",
    )?;
    let rows = stmt
        .query_map([grade_id], |r| {
            Ok(StudentRow {
                id: r.get(0)?,
                grade_id: r.get(1)?,
                display_name: r.get(2)?,
                active: r.get::<_, i64>(3)? != 0,
                sort_order: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Workspace database acting as the persistence collaborator.
pub struct SqliteGradeStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteGradeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl GradeStore for SqliteGradeStore<'_> {
    fn grade_name(&self, grade_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT name FROM grades WHERE id = ?", [grade_id], |r| {
                r.get(0)
            })
            .optional()?)
    }

    fn load_students(&self, grade_id: &str) -> anyhow::Result<Vec<StudentRef>> {
        Ok(students_list(self.conn, grade_id)?
            .into_iter()
            .filter(|s| s.active)
            .map(|s| StudentRef {
                id: s.id,
                display_name: s.display_name,
            })
            .collect())
    }

    fn load_scores(&self, selection: &Selection) -> anyhow::Result<Vec<StudentScoreRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT student_id, component_id, name, value, weight_percent
             FROM score_notes
             WHERE grade_id = ? AND area_id = ? AND period = ?
             ORDER BY sort_order, rowid",
        )?;
        let rows = stmt
            .query_map(
                (&selection.grade_id, &selection.area_id, selection.period),
                |r| {
                    let student_id: String = r.get(0)?;
                    Ok((
                        student_id,
                        ScoreNote {
                            component_id: r.get(1)?,
                            name: r.get(2)?,
                            value: r.get(3)?,
                            weight_percent: r.get(4)?,
                        },
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records: Vec<StudentScoreRecord> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (student_id, note) in rows {
            let idx = *index.entry(student_id.clone()).or_insert_with(|| {
                records.push(StudentScoreRecord {
                    student_id,
                    notes: Vec::new(),
                });
                records.len() - 1
            });
            records[idx].notes.push(note);
        }
        Ok(records)
    }

    fn load_indicators(&self, selection: &Selection) -> anyhow::Result<Vec<Indicator>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, period, area_id, grade_id
             FROM indicators
             WHERE grade_id = ? AND area_id = ? AND period = ?
             ORDER BY sort_order, rowid",
        )?;
        let rows = stmt
            .query_map(
                (&selection.grade_id, &selection.area_id, selection.period),
                |r| {
                    Ok(Indicator {
                        id: r.get(0)?,
                        text: r.get(1)?,
                        period: r.get(2)?,
                        area_id: r.get(3)?,
                        grade_id: r.get(4)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replaces every score note and indicator of the selection at once.
    fn save(&self, payload: &SavePayload) -> anyhow::Result<SaveOutcome> {
        if self.grade_name(&payload.grade_id)?.is_none() {
            return Ok(SaveOutcome {
                success: false,
                message: format!("grade not found: {}", payload.grade_id),
            });
        }

        let updated_at = now_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM score_notes WHERE grade_id = ? AND area_id = ? AND period = ?",
            (&payload.grade_id, &payload.area_id, payload.period),
        )?;
        tx.execute(
            "DELETE FROM indicators WHERE grade_id = ? AND area_id = ? AND period = ?",
            (&payload.grade_id, &payload.area_id, payload.period),
        )?;

        let mut note_count = 0_usize;
        {
            let mut insert = tx.prepare(
                "INSERT INTO score_notes(grade_id, area_id, period, student_id, component_id,
                                         name, value, weight_percent, sort_order, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for record in &payload.scores {
                for (i, note) in record.notes.iter().enumerate() {
                    insert.execute((
                        &payload.grade_id,
                        &payload.area_id,
                        payload.period,
                        &record.student_id,
                        &note.component_id,
                        &note.name,
                        note.value,
                        note.weight_percent,
                        i as i64,
                        &updated_at,
                    ))?;
                    note_count += 1;
                }
            }

            let mut insert = tx.prepare(
                "INSERT INTO indicators(id, grade_id, area_id, period, text, sort_order, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (i, ind) in payload.indicators.iter().enumerate() {
                insert.execute((
                    &ind.id,
                    &payload.grade_id,
                    &payload.area_id,
                    payload.period,
                    &ind.text,
                    i as i64,
                    &updated_at,
                ))?;
            }
        }
        tx.commit()?;

        Ok(SaveOutcome {
            success: true,
            message: format!(
                "saved {} scores for {} students and {} indicators",
                note_count,
                payload.scores.len(),
                payload.indicators.len()
            ),
        })
    }
}
