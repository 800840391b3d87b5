//! SQLite-backed session store.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tictactoe_core::{Session, SessionError, SessionState};
use tracing::{Span, debug, info, instrument, warn};

use crate::db::{DbError, SessionChanges, SessionRow, schema};
use crate::store::{SessionStore, is_available_for};

/// Migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Session store backed by a SQLite database file.
///
/// A connection is opened per call, so the store is cheap to clone and
/// safe to share between tasks.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    db_path: String,
}

impl SqliteSessionStore {
    /// How long a connection waits for a competing writer.
    const BUSY_TIMEOUT_MS: u32 = 5_000;

    /// Creates a store for the database at the given path.
    ///
    /// The schema is not touched; call [`SqliteSessionStore::run_migrations`]
    /// before first use.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating SqliteSessionStore");
        Ok(Self { db_path })
    }

    /// Path this store connects to.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::connect(&self.db_path, e))?;
        // Blocking-pool callers can overlap, so writers wait for the lock.
        diesel::sql_query(format!("PRAGMA busy_timeout = {}", Self::BUSY_TIMEOUT_MS))
            .execute(&mut conn)?;
        Ok(conn)
    }

    /// Applies pending migrations and returns how many ran.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(DbError::migration)?;
        info!(count = applied.len(), "Migrations applied");
        Ok(applied.len())
    }

    /// Runs a diesel call on the blocking pool so the runtime keeps polling
    /// other tasks while SQLite works.
    async fn blocking<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        F: FnOnce(SqliteSessionStore) -> Result<T, SessionError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        let span = Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| op(store)))
            .await
            .map_err(|e| {
                warn!(error = %e, "Storage task did not complete");
                SessionError::storage(format!("Storage task failed: {}", e))
            })?
    }

    fn load(&self, id: &str) -> Result<Option<Session>, DbError> {
        let mut conn = self.connection()?;
        schema::sessions::table
            .filter(schema::sessions::id.eq(id))
            .select(SessionRow::as_select())
            .first::<SessionRow>(&mut conn)
            .optional()?
            .map(SessionRow::into_session)
            .transpose()
    }

    fn load_many(rows: Vec<SessionRow>) -> Result<Vec<Session>, DbError> {
        rows.into_iter().map(SessionRow::into_session).collect()
    }

    fn insert(&self, session: &Session) -> Result<Session, SessionError> {
        let mut conn = self.connection()?;
        let now = chrono::Utc::now().naive_utc();
        let row = SessionRow::from_session(session, 1, now);

        match diesel::insert_into(schema::sessions::table)
            .values(&row)
            .execute(&mut conn)
        {
            Ok(_) => {}
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                warn!(session_id = %session.id(), "Session id already stored");
                return Err(SessionError::conflict(format!(
                    "Session {} already exists",
                    session.id()
                )));
            }
            Err(e) => return Err(DbError::from(e).into()),
        }

        info!(session_id = %session.id(), "Session stored");
        Ok(row.into_session()?)
    }

    fn replace(&self, session: Session) -> Result<Session, SessionError> {
        let mut conn = self.connection()?;
        let now = chrono::Utc::now().naive_utc();
        let version = session.version() + 1;
        let changes = SessionChanges::from_session(&session, version, now);

        let changed = diesel::update(
            schema::sessions::table
                .filter(schema::sessions::id.eq(session.id()))
                .filter(schema::sessions::version.eq(*session.version())),
        )
        .set(&changes)
        .execute(&mut conn)
        .map_err(DbError::from)?;

        if changed == 0 {
            return match self.load(session.id())? {
                Some(stored) => {
                    warn!(
                        session_id = %session.id(),
                        stored = %stored.version(),
                        submitted = %session.version(),
                        "Stale session version"
                    );
                    Err(SessionError::conflict(format!(
                        "Session {} was modified concurrently",
                        session.id()
                    )))
                }
                None => Err(SessionError::not_found(format!(
                    "Session {} not found",
                    session.id()
                ))),
            };
        }

        debug!(session_id = %session.id(), version, "Session updated");
        Ok(session.with_version(version).with_updated_at(Some(now)))
    }

    fn remove(&self, id: &str) -> Result<(), SessionError> {
        let mut conn = self.connection()?;
        let deleted =
            diesel::delete(schema::sessions::table.filter(schema::sessions::id.eq(id)))
                .execute(&mut conn)
                .map_err(DbError::from)?;
        if deleted == 0 {
            return Err(SessionError::not_found(format!("Session {} not found", id)));
        }
        info!(session_id = %id, "Session deleted");
        Ok(())
    }

    fn waiting(&self) -> Result<Vec<Session>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::sessions::table
            .select(SessionRow::as_select())
            .filter(schema::sessions::state.eq(SessionState::WaitingForPlayers.to_string()))
            .order((
                schema::sessions::updated_at.desc(),
                schema::sessions::id.asc(),
            ))
            .load::<SessionRow>(&mut conn)?;
        Self::load_many(rows)
    }

    fn seating(&self, user_id: &str, finished_only: bool) -> Result<Vec<Session>, DbError> {
        let mut conn = self.connection()?;
        let mut query = schema::sessions::table
            .select(SessionRow::as_select())
            .filter(
                schema::sessions::player1_id
                    .eq(user_id)
                    .or(schema::sessions::player2_id.eq(user_id)),
            )
            .into_boxed();

        if finished_only {
            let terminal = [
                SessionState::Draw,
                SessionState::Player1Winner,
                SessionState::Player2Winner,
            ]
            .iter()
            .map(|state| state.to_string())
            .collect::<Vec<_>>();
            query = query.filter(schema::sessions::state.eq_any(terminal));
        }

        let rows = query
            .order((
                schema::sessions::updated_at.desc(),
                schema::sessions::id.asc(),
            ))
            .load::<SessionRow>(&mut conn)?;
        Self::load_many(rows)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let id = id.to_string();
        self.blocking(move |store| Ok(store.load(&id)?)).await
    }

    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    async fn add(&self, session: Session) -> Result<Session, SessionError> {
        self.blocking(move |store| store.insert(&session)).await
    }

    #[instrument(skip(self, session), fields(session_id = %session.id(), version = %session.version()))]
    async fn update(&self, session: Session) -> Result<Session, SessionError> {
        self.blocking(move |store| store.replace(session)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), SessionError> {
        let id = id.to_string();
        self.blocking(move |store| store.remove(&id)).await
    }

    #[instrument(skip(self))]
    async fn available_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        let user_id = user_id.to_string();
        self.blocking(move |store| {
            let sessions = store.waiting()?;
            Ok(sessions
                .into_iter()
                .filter(|s| is_available_for(s, &user_id))
                .collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn user_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        let user_id = user_id.to_string();
        self.blocking(move |store| Ok(store.seating(&user_id, false)?))
            .await
    }

    #[instrument(skip(self))]
    async fn finished_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        let user_id = user_id.to_string();
        self.blocking(move |store| Ok(store.seating(&user_id, true)?))
            .await
    }
}
