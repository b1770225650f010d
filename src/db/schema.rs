//! Database schema and migrations for filecab.
//!
//! Migrations are applied in order; the `schema_version` table records
//! how many have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL,
    password    TEXT NOT NULL,           -- Argon2 PHC string
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_users_username_nocase ON users(username COLLATE NOCASE);
"#,
    // v2: folders, one namespace per user
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (user_id, name)
);

CREATE INDEX idx_folders_user_id ON folders(user_id);
"#,
    // v3: files
    //
    // original_folder_id is set only while the file sits in Trash. It has no
    // foreign key so the origin survives deletion of the folder it names.
    // Folder deletion must relocate files first (RESTRICT).
    r#"
CREATE TABLE files (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id           INTEGER NOT NULL REFERENCES folders(id) ON DELETE RESTRICT,
    original_folder_id  INTEGER,
    name                TEXT NOT NULL,
    size                INTEGER NOT NULL,
    content_type        TEXT NOT NULL DEFAULT 'application/octet-stream',
    blob_handle         TEXT NOT NULL,
    url                 TEXT NOT NULL,
    created_at          TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (original_folder_id IS NULL OR original_folder_id <> folder_id)
);

CREATE INDEX idx_files_folder_id ON files(folder_id);
"#,
    // v4: refresh tokens for the web API
    r#"
CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);
CREATE INDEX idx_refresh_tokens_expires_at ON refresh_tokens(expires_at);
"#,
];
