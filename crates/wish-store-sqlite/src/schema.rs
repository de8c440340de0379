//! SQL schema for the wish SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    uid         TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Rows of one (uid, pool) are only ever replaced together, inside a single
-- transaction. No row is updated in place.
CREATE TABLE IF NOT EXISTS pulls (
    id              TEXT PRIMARY KEY,
    uid             TEXT    NOT NULL REFERENCES accounts(uid),
    pool            INTEGER NOT NULL,   -- pity pool code (400 is stored as 301)
    ord             INTEGER NOT NULL,   -- dense 1..N within (uid, pool)
    name            TEXT    NOT NULL,
    item_type       TEXT    NOT NULL,   -- 'Character' | 'Weapon'
    rarity          INTEGER NOT NULL,
    gacha_type      INTEGER NOT NULL,   -- the pull's own banner code
    time            TEXT    NOT NULL,   -- RFC 3339 UTC
    pity            INTEGER NOT NULL,
    was_imported    INTEGER NOT NULL,
    banner_id       TEXT    NOT NULL,
    is_featured     INTEGER NOT NULL,
    won_fifty_fifty INTEGER NOT NULL,
    genshin_wish_id INTEGER,            -- NULL for imported pulls
    UNIQUE (uid, pool, ord)
);

CREATE INDEX IF NOT EXISTS pulls_wish_id_idx ON pulls(uid, pool, genshin_wish_id);
CREATE INDEX IF NOT EXISTS accounts_user_idx ON accounts(user_id);

PRAGMA user_version = 1;
";
