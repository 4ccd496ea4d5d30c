//! SQL schema for the Kin SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,        -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Geo-entities keep the casing they were first created with in `name`;
-- `name_key` is the case-folded form every lookup and uniqueness check uses.
CREATE TABLE IF NOT EXISTS chiefdoms (
    chiefdom_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    name_key    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS villages (
    village_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    name_key    TEXT NOT NULL,
    chiefdom_id INTEGER NOT NULL REFERENCES chiefdoms(chiefdom_id) ON DELETE CASCADE,
    UNIQUE (name_key, chiefdom_id)
);

CREATE TABLE IF NOT EXISTS locations (
    location_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    name_key    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS persons (
    person_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id      INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    first_name    TEXT NOT NULL DEFAULT '',
    last_name     TEXT NOT NULL DEFAULT '',
    last_name_key TEXT NOT NULL DEFAULT '',   -- case-folded last_name
    gender        TEXT,                       -- 'male' | 'female' | 'other'
    date_of_birth TEXT,                       -- YYYY-MM-DD
    date_of_death TEXT,
    history       TEXT NOT NULL DEFAULT '',
    mother_id     INTEGER REFERENCES persons(person_id)     ON DELETE SET NULL,
    father_id     INTEGER REFERENCES persons(person_id)     ON DELETE SET NULL,
    chiefdom_id   INTEGER REFERENCES chiefdoms(chiefdom_id) ON DELETE SET NULL,
    village_id    INTEGER REFERENCES villages(village_id)   ON DELETE SET NULL,
    location_id   INTEGER REFERENCES locations(location_id) ON DELETE SET NULL,
    created_at    TEXT NOT NULL,
    CHECK (mother_id IS NULL OR mother_id != person_id),
    CHECK (father_id IS NULL OR father_id != person_id)
);

-- One row per unordered pair; both people see the edge.
CREATE TABLE IF NOT EXISTS spouses (
    person_a INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    person_b INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    PRIMARY KEY (person_a, person_b),
    CHECK (person_a < person_b)
);

CREATE TABLE IF NOT EXISTS family_trees (
    tree_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS family_tree_members (
    tree_id   INTEGER NOT NULL REFERENCES family_trees(tree_id) ON DELETE CASCADE,
    person_id INTEGER NOT NULL REFERENCES persons(person_id)    ON DELETE CASCADE,
    PRIMARY KEY (tree_id, person_id)
);

CREATE INDEX IF NOT EXISTS persons_clan_idx   ON persons(owner_id, last_name_key);
CREATE INDEX IF NOT EXISTS persons_mother_idx ON persons(mother_id);
CREATE INDEX IF NOT EXISTS persons_father_idx ON persons(father_id);
CREATE INDEX IF NOT EXISTS spouses_b_idx      ON spouses(person_b);
CREATE INDEX IF NOT EXISTS villages_chiefdom_idx ON villages(chiefdom_id);

PRAGMA user_version = 1;
";
