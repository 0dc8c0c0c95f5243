//! User profile repository contract and SQLite implementation.

use crate::model::user_profile::UserProfile;
use crate::model::UserId;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PROFILE_SELECT_SQL: &str = "SELECT
    id,
    name,
    birth_year,
    birth_month,
    birth_day,
    height,
    language,
    insight_language
FROM user_profiles";

/// Repository interface for user profiles.
pub trait ProfileRepository {
    /// Inserts a profile or fully replaces the one with the same id.
    fn insert_profile(&self, profile: &UserProfile) -> RepoResult<()>;
    /// All profiles ordered by id ascending.
    fn all_profiles(&self) -> RepoResult<Vec<UserProfile>>;
    fn get_profile(&self, id: UserId) -> RepoResult<Option<UserProfile>>;
    /// Returns affected row count; `0` when the id does not exist.
    fn delete_profile(&self, id: UserId) -> RepoResult<usize>;
    /// Smallest id greater than every stored id (`1` when empty).
    ///
    /// Fails with `IdSpaceExhausted` once `i64::MAX` is taken.
    fn next_profile_id(&self) -> RepoResult<UserId>;
}

/// SQLite-backed profile repository.
pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn insert_profile(&self, profile: &UserProfile) -> RepoResult<()> {
        profile.validate()?;

        self.conn.execute(
            "INSERT OR REPLACE INTO user_profiles (
                id,
                name,
                birth_year,
                birth_month,
                birth_day,
                height,
                language,
                insight_language
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                profile.id,
                profile.name.as_str(),
                profile.birth_year,
                profile.birth_month,
                profile.birth_day,
                profile.height,
                profile.language.as_str(),
                profile.insight_language.as_str(),
            ],
        )?;
        Ok(())
    }

    fn all_profiles(&self) -> RepoResult<Vec<UserProfile>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{PROFILE_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next()? {
            profiles.push(parse_profile_row(row)?);
        }
        Ok(profiles)
    }

    fn get_profile(&self, id: UserId) -> RepoResult<Option<UserProfile>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{PROFILE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_profile_row(row)?));
        }
        Ok(None)
    }

    fn delete_profile(&self, id: UserId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM user_profiles WHERE id = ?1;", [id])?;
        Ok(changed)
    }

    fn next_profile_id(&self) -> RepoResult<UserId> {
        let max_id: Option<UserId> =
            self.conn
                .query_row("SELECT MAX(id) FROM user_profiles;", [], |row| row.get(0))?;
        match max_id {
            None => Ok(1),
            Some(id) => id.checked_add(1).ok_or(RepoError::IdSpaceExhausted {
                table: "user_profiles",
            }),
        }
    }
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<UserProfile> {
    let profile = UserProfile {
        id: row.get("id")?,
        name: row.get("name")?,
        birth_year: row.get("birth_year")?,
        birth_month: row.get("birth_month")?,
        birth_day: row.get("birth_day")?,
        height: row.get("height")?,
        language: row.get("language")?,
        insight_language: row.get("insight_language")?,
    };
    profile.validate().map_err(|err| {
        RepoError::InvalidData(format!("user_profiles row {}: {err}", profile.id))
    })?;
    Ok(profile)
}
