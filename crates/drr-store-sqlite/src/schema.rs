//! SQL schema for the indicator SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS units (
    unit_id INTEGER PRIMARY KEY,
    name    TEXT NOT NULL UNIQUE,
    symbol  TEXT NOT NULL DEFAULT ''
);

-- Administrative-boundary forest. `code` is only unique below one parent.
CREATE TABLE IF NOT EXISTS geographies (
    geography_id INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    code         TEXT NOT NULL,
    geo_type     TEXT NOT NULL,   -- GeoType::as_str()
    parent_id    INTEGER REFERENCES geographies(geography_id),
    shape_json   TEXT,            -- GeoJSON MultiPolygon or NULL
    UNIQUE (code, parent_id)
);

CREATE TABLE IF NOT EXISTS indicators (
    indicator_id       INTEGER PRIMARY KEY,
    name               TEXT NOT NULL,
    slug               TEXT NOT NULL,
    long_description   TEXT,
    short_description  TEXT,
    category           TEXT,
    unit_id            INTEGER REFERENCES units(unit_id),
    geography_scope_id INTEGER REFERENCES geographies(geography_id),
    parent_id          INTEGER REFERENCES indicators(indicator_id),
    display_order      INTEGER NOT NULL DEFAULT 0,
    is_visible         INTEGER NOT NULL DEFAULT 1,
    data_source        TEXT,
    UNIQUE (slug, geography_scope_id)
);

-- The fact table. One row per (indicator, geography, period); ingestion
-- replaces rows rather than updating them.
CREATE TABLE IF NOT EXISTS observations (
    observation_id INTEGER PRIMARY KEY,
    value          REAL,
    indicator_id   INTEGER NOT NULL REFERENCES indicators(indicator_id),
    geography_id   INTEGER NOT NULL REFERENCES geographies(geography_id),
    data_period    TEXT NOT NULL,   -- YYYY_MM
    added          TEXT NOT NULL,   -- ISO 8601 UTC
    modified       TEXT NOT NULL,
    UNIQUE (indicator_id, geography_id, data_period)
);

CREATE INDEX IF NOT EXISTS geographies_parent_idx  ON geographies(parent_id);
CREATE INDEX IF NOT EXISTS geographies_type_idx    ON geographies(geo_type);
CREATE INDEX IF NOT EXISTS indicators_parent_idx   ON indicators(parent_id);
CREATE INDEX IF NOT EXISTS observations_period_idx ON observations(data_period);

PRAGMA user_version = 1;
";
