//! INSERT...SELECT transforms from staging into the star schema.
//!
//! Each statement reads only from the staging tables and is independent of
//! the others; correctness requires both staging tables to be fully loaded
//! first. Epoch-millisecond `ts` values become calendar timestamps via
//! origin + ts/1000 seconds.

use super::{Dialect, Statement};

/// Epoch-milliseconds column rendered as a timestamp expression.
fn start_time_expr(dialect: Dialect, ts_column: &str) -> String {
    match dialect {
        Dialect::Redshift => format!(
            "TIMESTAMP 'epoch' + {} / 1000 * INTERVAL '1 second'",
            ts_column
        ),
        Dialect::Sqlite => format!("datetime({} / 1000, 'unixepoch')", ts_column),
    }
}

/// One calendar component of an already-computed start_time column.
fn calendar_expr(dialect: Dialect, component: &str) -> String {
    match dialect {
        Dialect::Redshift => format!("EXTRACT({} FROM start_time)", component),
        // weekday is 0=Sunday under both Redshift EXTRACT(weekday) and
        // strftime('%w'). Week numbering differs slightly (%W is
        // Monday-based week-of-year).
        Dialect::Sqlite => {
            let fmt = match component {
                "hour" => "%H",
                "day" => "%d",
                "week" => "%W",
                "month" => "%m",
                "year" => "%Y",
                "weekday" => "%w",
                other => unreachable!("unknown calendar component: {}", other),
            };
            format!("CAST(strftime('{}', start_time) AS INTEGER)", fmt)
        }
    }
}

/// Fact table: events joined to the song catalog on exact artist-name
/// equality. Inner-join semantics - events with no catalog match are
/// silently dropped.
pub fn songplays_insert(dialect: Dialect) -> String {
    format!(
        "INSERT INTO songplays \
            (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent) \
        SELECT {start_time} AS start_time, \
            se.user_id, \
            se.level, \
            ss.song_id, \
            ss.artist_id, \
            se.session_id, \
            se.location, \
            se.user_agent \
        FROM staging_events AS se \
        JOIN staging_songs AS ss ON se.artist = ss.artist_name \
        WHERE se.page = 'NextSong'",
        start_time = start_time_expr(dialect, "se.ts"),
    )
}

/// Users dimension. One row per user; when a user appears with conflicting
/// attribute values (a `level` change across sessions), the most recent row
/// by event timestamp wins.
pub fn users_insert(_dialect: Dialect) -> String {
    "INSERT INTO users (user_id, first_name, last_name, gender, level) \
    SELECT user_id, first_name, last_name, gender, level \
    FROM ( \
        SELECT user_id, first_name, last_name, gender, level, \
            ROW_NUMBER() OVER (PARTITION BY user_id ORDER BY ts DESC) AS row_rank \
        FROM staging_events \
        WHERE page = 'NextSong' AND user_id IS NOT NULL \
    ) ranked \
    WHERE row_rank = 1"
        .to_string()
}

pub fn songs_insert(_dialect: Dialect) -> String {
    "INSERT INTO songs (song_id, title, artist_id, year, duration) \
    SELECT DISTINCT song_id, title, artist_id, year, duration \
    FROM staging_songs \
    WHERE song_id IS NOT NULL"
        .to_string()
}

pub fn artists_insert(_dialect: Dialect) -> String {
    "INSERT INTO artists (artist_id, name, location, latitude, longitude) \
    SELECT DISTINCT artist_id, artist_name, artist_location, artist_latitude, artist_longitude \
    FROM staging_songs \
    WHERE artist_id IS NOT NULL"
        .to_string()
}

/// Time dimension. The distinct start_time projection goes through a subquery
/// so the calendar expressions can reference the alias in both dialects.
pub fn time_insert(dialect: Dialect) -> String {
    format!(
        "INSERT INTO time (start_time, hour, day, week, month, year, weekday) \
        SELECT start_time, \
            {hour} AS hour, \
            {day} AS day, \
            {week} AS week, \
            {month} AS month, \
            {year} AS year, \
            {weekday} AS weekday \
        FROM ( \
            SELECT DISTINCT {start_time} AS start_time \
            FROM staging_events \
            WHERE page = 'NextSong' \
        ) event_times",
        hour = calendar_expr(dialect, "hour"),
        day = calendar_expr(dialect, "day"),
        week = calendar_expr(dialect, "week"),
        month = calendar_expr(dialect, "month"),
        year = calendar_expr(dialect, "year"),
        weekday = calendar_expr(dialect, "weekday"),
        start_time = start_time_expr(dialect, "ts"),
    )
}

/// The five transforms in execution order.
pub fn insert_table_statements(dialect: Dialect) -> Vec<Statement> {
    [
        ("insert songplays", songplays_insert(dialect)),
        ("insert users", users_insert(dialect)),
        ("insert songs", songs_insert(dialect)),
        ("insert artists", artists_insert(dialect)),
        ("insert time", time_insert(dialect)),
    ]
    .into_iter()
    .map(|(name, sql)| Statement {
        name: name.to_string(),
        sql,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::create_table_statements;
    use rusqlite::{params, Connection};

    fn warehouse() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for statement in create_table_statements(Dialect::Sqlite) {
            conn.execute(&statement.sql, []).unwrap();
        }
        conn
    }

    fn insert_event(
        conn: &Connection,
        artist: Option<&str>,
        page: &str,
        ts: i64,
        user_id: Option<i64>,
        level: &str,
        session_id: i64,
    ) {
        conn.execute(
            "INSERT INTO staging_events
                (artist, auth, first_name, gender, item_in_session, last_name, length, level,
                 location, method, page, registration, session_id, song, status, ts,
                 user_agent, user_id)
             VALUES (?1, 'Logged In', 'Kaylee', 'F', 0, 'Summers', 240.5, ?2,
                     'Phoenix, AZ', 'PUT', ?3, '1540344794796', ?4, 'Some Song', 200, ?5,
                     'Mozilla/5.0', ?6)",
            params![artist, level, page, session_id, ts, user_id],
        )
        .unwrap();
    }

    fn insert_song(conn: &Connection, song_id: &str, title: &str, artist_id: &str, artist: &str) {
        conn.execute(
            "INSERT INTO staging_songs
                (num_songs, artist_id, artist_latitude, artist_longitude, artist_location,
                 artist_name, song_id, title, duration, year)
             VALUES (1, ?1, 35.1, -90.0, 'Memphis, TN', ?2, ?3, ?4, 218.93, 2004)",
            params![artist_id, artist, song_id, title],
        )
        .unwrap();
    }

    fn run_inserts(conn: &Connection) {
        for statement in insert_table_statements(Dialect::Sqlite) {
            conn.execute(&statement.sql, []).unwrap();
        }
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_songplays_joins_on_artist_name() {
        let conn = warehouse();
        insert_song(&conn, "SOAAA01", "Setanta matins", "AR5EYTL1187B98EDA0", "Elena");
        insert_event(&conn, Some("Elena"), "NextSong", 1541903636796, Some(10), "free", 100);
        run_inserts(&conn);

        let (song_id, artist_id): (String, String) = conn
            .query_row(
                "SELECT song_id, artist_id FROM songplays",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(song_id, "SOAAA01");
        assert_eq!(artist_id, "AR5EYTL1187B98EDA0");
    }

    #[test]
    fn test_unmatched_artist_produces_no_songplay() {
        let conn = warehouse();
        insert_song(&conn, "SOAAA01", "Setanta matins", "AR5EYTL1187B98EDA0", "Elena");
        insert_event(&conn, Some("Unknown Artist"), "NextSong", 1541903636796, Some(10), "free", 100);
        run_inserts(&conn);

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM songplays"), 0);
    }

    #[test]
    fn test_non_nextsong_pages_are_filtered_out() {
        let conn = warehouse();
        insert_song(&conn, "SOAAA01", "Setanta matins", "AR5EYTL1187B98EDA0", "Elena");
        insert_event(&conn, Some("Elena"), "Home", 1541903636796, Some(10), "free", 100);
        insert_event(&conn, None, "Login", 1541903636800, None, "free", 100);
        run_inserts(&conn);

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM songplays"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM time"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM users"), 0);
    }

    #[test]
    fn test_epoch_origin_timestamp_conversion() {
        let conn = warehouse();
        insert_event(&conn, None, "NextSong", 0, Some(10), "free", 100);
        insert_event(&conn, None, "NextSong", 86_400_000, Some(10), "free", 100);
        run_inserts(&conn);

        let times: Vec<(String, i64)> = conn
            .prepare("SELECT start_time, hour FROM time ORDER BY start_time")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], ("1970-01-01 00:00:00".to_string(), 0));
        // One day in milliseconds lands exactly 24 hours later
        assert_eq!(times[1], ("1970-01-02 00:00:00".to_string(), 0));
    }

    #[test]
    fn test_time_calendar_components() {
        use chrono::{DateTime, Datelike, Timelike};

        let conn = warehouse();
        // 2018-11-15 16:33:56 UTC, a Thursday
        let ts_millis: i64 = 1_542_299_636_000;
        insert_event(&conn, None, "NextSong", ts_millis, Some(10), "free", 100);
        run_inserts(&conn);

        let row: (String, i64, i64, i64, i64, i64) = conn
            .query_row(
                "SELECT start_time, hour, day, month, year, weekday FROM time",
                [],
                |r| {
                    Ok((
                        r.get(0)?,
                        r.get(1)?,
                        r.get(2)?,
                        r.get(3)?,
                        r.get(4)?,
                        r.get(5)?,
                    ))
                },
            )
            .unwrap();

        let expected = DateTime::from_timestamp(ts_millis / 1000, 0).unwrap();
        assert_eq!(row.0, expected.format("%Y-%m-%d %H:%M:%S").to_string());
        assert_eq!(row.1, expected.hour() as i64);
        assert_eq!(row.2, expected.day() as i64);
        assert_eq!(row.3, expected.month() as i64);
        assert_eq!(row.4, expected.year() as i64);
        // 0=Sunday in both dialects; Thursday=4
        assert_eq!(row.5, expected.weekday().num_days_from_sunday() as i64);
    }

    #[test]
    fn test_duplicate_events_yield_one_time_row() {
        let conn = warehouse();
        insert_event(&conn, None, "NextSong", 1541903636796, Some(10), "free", 100);
        insert_event(&conn, None, "NextSong", 1541903636796, Some(11), "paid", 101);
        run_inserts(&conn);

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM time"), 1);
    }

    #[test]
    fn test_users_latest_level_wins() {
        let conn = warehouse();
        // Same user upgrades from free to paid in a later event
        insert_event(&conn, None, "NextSong", 1_541_000_000_000, Some(10), "free", 100);
        insert_event(&conn, None, "NextSong", 1_542_000_000_000, Some(10), "paid", 101);
        run_inserts(&conn);

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM users"), 1);
        let level: String = conn
            .query_row("SELECT level FROM users WHERE user_id = 10", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(level, "paid");
    }

    #[test]
    fn test_users_excludes_null_user_id() {
        let conn = warehouse();
        insert_event(&conn, None, "NextSong", 1541903636796, None, "free", 100);
        run_inserts(&conn);

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM users"), 0);
    }

    #[test]
    fn test_duplicated_song_rows_deduplicate() {
        let conn = warehouse();
        insert_song(&conn, "SONGXYZ", "Title", "ARTXYZ", "The Artist");
        insert_song(&conn, "SONGXYZ", "Title", "ARTXYZ", "The Artist");
        run_inserts(&conn);

        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM songs WHERE song_id = 'SONGXYZ'"),
            1
        );
        assert_eq!(
            count(
                &conn,
                "SELECT COUNT(*) FROM artists WHERE artist_id = 'ARTXYZ'"
            ),
            1
        );
    }

    #[test]
    fn test_transform_runs_on_empty_staging() {
        let conn = warehouse();
        run_inserts(&conn);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM songplays"), 0);
    }

    #[test]
    fn test_redshift_rendering_uses_epoch_interval_and_extract() {
        let songplays = songplays_insert(Dialect::Redshift);
        assert!(songplays.contains("TIMESTAMP 'epoch' + se.ts / 1000 * INTERVAL '1 second'"));

        let time = time_insert(Dialect::Redshift);
        assert!(time.contains("EXTRACT(weekday FROM start_time)"));
        assert!(time.contains("EXTRACT(week FROM start_time)"));
    }

    #[test]
    fn test_insert_statement_order() {
        let names: Vec<String> = insert_table_statements(Dialect::Sqlite)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            [
                "insert songplays",
                "insert users",
                "insert songs",
                "insert artists",
                "insert time"
            ]
        );
    }
}
