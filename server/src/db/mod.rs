pub mod address;
pub mod care_event;
pub mod followup_plan;
pub mod migrations;
pub mod patient;
pub mod procedure;
pub mod procedure_booking;
pub mod questionnaire;
pub mod timepoint;
pub mod user;

pub use address::AddressRepository;
pub use care_event::CareEventRepository;
pub use followup_plan::FollowupPlanRepository;
pub use patient::PatientRepository;
pub use procedure::ProcedureRepository;
pub use procedure_booking::ProcedureBookingRepository;
pub use questionnaire::QuestionnaireRepository;
pub use timepoint::TimepointRepository;
pub use user::UserRepository;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::config::AppConfig;
use crate::criteria::Criteria;
use crate::error::DbError;
use crate::pagination::Pageable;

/// Open the connection pool described by `config` and bring the schema up to date
pub async fn connect(config: &AppConfig) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.database_url.contains(":memory:") {
        // an in-memory database lives only as long as its connection
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;

    migrations::run_migrations(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory pool with migrations applied (for testing)
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let config = AppConfig::new("sqlite::memory:").with_max_connections(1);
    connect(&config).await
}

/// Count the rows matching `criteria`, then fetch one page of them.
///
/// `select` and `count` are the statements up to (not including) the WHERE
/// clause; `id_column` is the final sort tiebreaker.
pub(crate) async fn fetch_page<R, C>(
    conn: &mut SqliteConnection,
    select: &str,
    count: &str,
    id_column: &str,
    criteria: &C,
    pageable: &Pageable,
) -> Result<(Vec<R>, i64), DbError>
where
    R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    C: Criteria,
{
    let mut count_qb = QueryBuilder::<Sqlite>::new(count);
    count_qb.push(" WHERE 1=1");
    criteria.push_where(&mut count_qb);
    let total: i64 = count_qb
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await?;

    let mut qb = QueryBuilder::<Sqlite>::new(select);
    qb.push(" WHERE 1=1");
    criteria.push_where(&mut qb);
    pageable.push_order_and_limit(&mut qb, id_column);
    let rows = qb.build_query_as::<R>().fetch_all(&mut *conn).await?;

    Ok((rows, total))
}
