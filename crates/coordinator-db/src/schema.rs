use rusqlite::Connection;

use crate::error::Result;

/// Create every table, index, and FTS5 virtual table used by the
/// coordination system. Idempotent — safe on every startup.
pub fn init_schema(conn: &Connection) -> Result<()> {
    tasks(conn)?;
    subtasks(conn)?;
    task_dependencies(conn)?;
    conversations(conn)?;
    messages(conn)?;
    audit_logs(conn)?;
    team_members(conn)?;
    oauth_tokens(conn)?;
    attendance_records(conn)?;
    recurring_tasks(conn)?;
    time_entries(conn)?;
    processed_updates(conn)?;
    reminder_ledger(conn)?;
    outbox(conn)?;
    task_fts(conn)?;
    Ok(())
}

fn outbox(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS outbox (
            id               TEXT PRIMARY KEY,
            target_adapter   TEXT NOT NULL,
            payload          TEXT NOT NULL,
            idempotency_key  TEXT NOT NULL,
            attempt_count    INTEGER NOT NULL DEFAULT 0,
            max_attempts     INTEGER NOT NULL DEFAULT 5,
            next_attempt_at  TEXT NOT NULL,
            dead_letter      INTEGER NOT NULL DEFAULT 0,
            last_error       TEXT,
            created_at       TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_outbox_idempotency_live
            ON outbox(idempotency_key) WHERE NOT dead_letter;
        CREATE INDEX IF NOT EXISTS idx_outbox_due
            ON outbox(next_attempt_at) WHERE NOT dead_letter;",
    )?;
    Ok(())
}

fn tasks(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                      TEXT PRIMARY KEY,
            task_ref                TEXT NOT NULL UNIQUE,
            title                   TEXT NOT NULL,
            description             TEXT,
            assignee_name           TEXT,
            assignee_transport_id   TEXT,
            priority                TEXT NOT NULL DEFAULT 'medium',
            status                  TEXT NOT NULL DEFAULT 'pending',
            task_type               TEXT,
            deadline                TEXT,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL,
            created_by              TEXT NOT NULL,
            estimated_minutes       INTEGER,
            actual_minutes          INTEGER,
            progress                INTEGER NOT NULL DEFAULT 0,
            tags                    TEXT NOT NULL DEFAULT '[]',
            acceptance_criteria     TEXT NOT NULL DEFAULT '[]',
            external_thread_id      TEXT,
            soft_deleted            INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_status_assignee ON tasks(status, assignee_name);
        CREATE INDEX IF NOT EXISTS idx_tasks_status_deadline ON tasks(status, deadline);",
    )?;
    Ok(())
}

fn subtasks(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS subtasks (
            id          TEXT PRIMARY KEY,
            task_id     TEXT NOT NULL REFERENCES tasks(id),
            title       TEXT NOT NULL,
            completed   INTEGER NOT NULL DEFAULT 0,
            position    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id, position);",
    )?;
    Ok(())
}

fn task_dependencies(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS task_dependencies (
            task_id         TEXT NOT NULL REFERENCES tasks(id),
            blocked_by_id   TEXT NOT NULL REFERENCES tasks(id),
            created_at      TEXT NOT NULL,
            PRIMARY KEY (task_id, blocked_by_id)
        );
        CREATE INDEX IF NOT EXISTS idx_deps_blocked_by ON task_dependencies(blocked_by_id);",
    )?;
    Ok(())
}

fn conversations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id              TEXT PRIMARY KEY,
            transport       TEXT NOT NULL,
            transport_user  TEXT NOT NULL,
            user_ref        TEXT,
            state           TEXT NOT NULL DEFAULT 'idle',
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL,
            UNIQUE(transport, transport_user)
        );",
    )?;
    Ok(())
}

fn messages(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL REFERENCES conversations(id),
            role            TEXT NOT NULL,
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conv ON messages(conversation_id, created_at);",
    )?;
    Ok(())
}

fn audit_logs(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS audit_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_type TEXT NOT NULL,
            entity_id   TEXT NOT NULL,
            actor       TEXT NOT NULL,
            action      TEXT NOT NULL,
            before      TEXT,
            after       TEXT,
            timestamp   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_ts_type ON audit_logs(timestamp DESC, entity_type);
        CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_logs(entity_type, entity_id);",
    )?;
    Ok(())
}

fn team_members(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS team_members (
            name                    TEXT PRIMARY KEY,
            role                    TEXT NOT NULL DEFAULT 'other',
            transport_id            TEXT,
            secondary_channel_id    TEXT,
            email                   TEXT,
            timezone                TEXT NOT NULL DEFAULT 'UTC',
            work_start              TEXT,
            active                  INTEGER NOT NULL DEFAULT 1,
            skills                  TEXT NOT NULL DEFAULT '[]'
        );",
    )?;
    Ok(())
}

fn oauth_tokens(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS oauth_tokens (
            email           TEXT NOT NULL,
            service         TEXT NOT NULL,
            refresh_token   TEXT NOT NULL,
            access_token    TEXT NOT NULL,
            expires_at      TEXT NOT NULL,
            PRIMARY KEY (email, service)
        );",
    )?;
    Ok(())
}

fn attendance_records(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS attendance_records (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name   TEXT NOT NULL,
            date        TEXT NOT NULL,
            status      TEXT NOT NULL,
            note        TEXT,
            created_at  TEXT NOT NULL,
            UNIQUE(user_name, date)
        );
        CREATE INDEX IF NOT EXISTS idx_attendance_date_user ON attendance_records(date, user_name);",
    )?;
    Ok(())
}

fn recurring_tasks(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_tasks (
            id              TEXT PRIMARY KEY,
            title_template  TEXT NOT NULL,
            schedule_json   TEXT NOT NULL,
            assignee_name   TEXT,
            priority        TEXT NOT NULL DEFAULT 'medium',
            active          INTEGER NOT NULL DEFAULT 1,
            last_created_at TEXT,
            created_at      TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn time_entries(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS time_entries (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            task_id     TEXT NOT NULL REFERENCES tasks(id),
            started_at  TEXT NOT NULL,
            ended_at    TEXT,
            minutes     INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_time_entries_user_started ON time_entries(user_id, started_at);",
    )?;
    Ok(())
}

fn processed_updates(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS processed_updates (
            transport_update_id    TEXT PRIMARY KEY,
            first_seen_at          TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn reminder_ledger(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reminder_ledger (
            task_id         TEXT NOT NULL,
            interval_bucket TEXT NOT NULL,
            sent_at         TEXT NOT NULL,
            PRIMARY KEY (task_id, interval_bucket)
        );",
    )?;
    Ok(())
}

/// External-content FTS5 index over `tasks.title`/`tasks.description`,
/// synced manually on write (mirrors the `user_memory_fts` pattern).
fn task_fts(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS tasks_fts
            USING fts5(title, description, content='tasks', content_rowid='rowid');",
    )?;
    Ok(())
}
