//! Idempotent schema creation. No migration runner: the schema is versioned
//! with the binary, same as the teacher's session-store JSON schema was
//! versioned with its own format constant.

use rusqlite::Connection;

use fretcore_domain::Result;

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;

        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            capabilities_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            email TEXT,
            password_hash TEXT NOT NULL,
            must_change_password INTEGER NOT NULL DEFAULT 0,
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            locked_until TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_system_admin INTEGER NOT NULL DEFAULT 0,
            role_id INTEGER NOT NULL REFERENCES roles(id),
            last_login TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role_id);

        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            client_ip TEXT,
            client_hostname TEXT,
            user_agent TEXT,
            created_at TEXT NOT NULL,
            last_activity TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_active ON sessions(is_active);

        CREATE TABLE IF NOT EXISTS routes (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            origin TEXT NOT NULL,
            destination TEXT NOT NULL,
            country TEXT,
            default_start_time TEXT,
            default_end_time TEXT,
            operating_days_json TEXT NOT NULL DEFAULT '[]',
            avg_pallet_count INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1,
            color TEXT
        );

        CREATE TABLE IF NOT EXISTS drivers (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            phone TEXT,
            email TEXT,
            contract_type TEXT,
            hire_date TEXT,
            has_permit_ce INTEGER NOT NULL DEFAULT 0,
            has_adr INTEGER NOT NULL DEFAULT 0,
            has_fimo INTEGER NOT NULL DEFAULT 0,
            preferred_tractor TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS driver_unavailabilities (
            id INTEGER PRIMARY KEY,
            driver_id INTEGER NOT NULL REFERENCES drivers(id),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            reason_code TEXT NOT NULL,
            note TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_unavail_driver ON driver_unavailabilities(driver_id);

        CREATE TABLE IF NOT EXISTS subcontractors (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            contact_name TEXT,
            phone TEXT,
            address TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS subcontractor_emails (
            id INTEGER PRIMARY KEY,
            sst_id INTEGER NOT NULL REFERENCES subcontractors(id),
            address TEXT NOT NULL,
            label TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sst_emails_sst ON subcontractor_emails(sst_id);

        CREATE TABLE IF NOT EXISTS subcontractor_tariffs (
            id INTEGER PRIMARY KEY,
            sst_id INTEGER NOT NULL REFERENCES subcontractors(id),
            unit TEXT NOT NULL,
            destination TEXT NOT NULL,
            country TEXT,
            price REAL NOT NULL,
            valid_from TEXT,
            valid_to TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_tariffs_sst ON subcontractor_tariffs(sst_id);

        CREATE TABLE IF NOT EXISTS pallet_revenues (
            id INTEGER PRIMARY KEY,
            destination TEXT NOT NULL,
            country TEXT,
            revenue_per_pallet REAL NOT NULL,
            valid_from TEXT,
            valid_to TEXT
        );

        CREATE TABLE IF NOT EXISTS missions (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            start_time TEXT,
            end_time TEXT,
            route_id INTEGER REFERENCES routes(id),
            driver_id INTEGER REFERENCES drivers(id),
            sst_id INTEGER REFERENCES subcontractors(id),
            kind TEXT NOT NULL,
            origin TEXT,
            destination TEXT,
            country TEXT,
            pallet_count INTEGER NOT NULL DEFAULT 0,
            weight_kg REAL,
            tractor TEXT,
            trailer TEXT,
            status TEXT NOT NULL DEFAULT 'planned',
            note TEXT,
            cost_sst REAL,
            revenue REAL,
            created_by TEXT NOT NULL,
            updated_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_missions_date ON missions(date);
        CREATE INDEX IF NOT EXISTS idx_missions_driver ON missions(driver_id);
        CREATE INDEX IF NOT EXISTS idx_missions_route ON missions(route_id);

        CREATE TABLE IF NOT EXISTS audit_records (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL,
            session_ref TEXT,
            action TEXT NOT NULL,
            entity_kind TEXT,
            entity_id INTEGER,
            before_json TEXT,
            after_json TEXT,
            client_ip TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_username ON audit_records(username);
        CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_records(created_at);

        CREATE TABLE IF NOT EXISTS request_records (
            id INTEGER PRIMARY KEY,
            method TEXT NOT NULL,
            path TEXT NOT NULL,
            query TEXT,
            username TEXT,
            client_ip TEXT,
            status_code INTEGER NOT NULL,
            response_time_ms INTEGER NOT NULL,
            error TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_requests_created ON request_records(created_at);
        "#,
    )?;
    Ok(())
}
