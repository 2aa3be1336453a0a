use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("gradecut.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            username TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            role TEXT NOT NULL,
            year_level TEXT NOT NULL,
            prev_grades TEXT NOT NULL,
            last_confirmed_round INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS system_config(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_settings(
            subject TEXT NOT NULL,
            round INTEGER NOT NULL,
            settings TEXT NOT NULL,
            PRIMARY KEY(subject, round)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions(
            username TEXT NOT NULL,
            subject TEXT NOT NULL,
            round INTEGER NOT NULL,
            total REAL,
            prev_grade INTEGER,
            marks TEXT,
            sub_vals TEXT,
            final_grade INTEGER,
            mid_score REAL,
            perf_score REAL,
            updated_at TEXT,
            PRIMARY KEY(username, subject, round)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_subject_round ON submissions(subject, round)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_user_round ON submissions(username, round)",
        [],
    )?;

    // Workspaces created before term-end mode existed lack the term input columns.
    ensure_submissions_term_columns(&conn)?;

    Ok(conn)
}

fn ensure_submissions_term_columns(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "submissions", "mid_score")? {
        conn.execute("ALTER TABLE submissions ADD COLUMN mid_score REAL", [])?;
    }
    if !table_has_column(conn, "submissions", "perf_score")? {
        conn.execute("ALTER TABLE submissions ADD COLUMN perf_score REAL", [])?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
