//! Opening the quiz database: client construction, reachability and the unique indexes the
//! store relies on for room codes, joins and submissions.

use std::time::Duration;

use mongodb::{
    Client, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{ANSWERS, PARTICIPANTS, QUESTIONS, SESSIONS},
};

const PING_ATTEMPTS: u32 = 10;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Index set of the quiz collections: `(collection, fields, keys, unique)`.
fn quiz_indexes() -> [(&'static str, &'static str, Document, bool); 5] {
    [
        (SESSIONS, "room_code", doc! {"room_code": 1}, true),
        (SESSIONS, "host_id", doc! {"host_id": 1}, false),
        (
            PARTICIPANTS,
            "session_id,identity",
            doc! {"session_id": 1, "identity": 1},
            true,
        ),
        (
            QUESTIONS,
            "session_id,question_order",
            doc! {"session_id": 1, "question_order": 1},
            true,
        ),
        (
            ANSWERS,
            "question_id,participant_id",
            doc! {"question_id": 1, "participant_id": 1},
            true,
        ),
    ]
}

/// Connect to the configured database, wait for it to answer and make sure every quiz index
/// exists.
pub async fn open_quiz_database(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    wait_until_reachable(&database).await?;
    ensure_quiz_indexes(&database).await?;
    info!(database = %config.database_name, "quiz database ready");

    Ok((client, database))
}

async fn wait_until_reachable(database: &Database) -> MongoResult<()> {
    let mut delay = FIRST_PING_DELAY;
    let mut attempt = 1;
    loop {
        let err = match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };
        if attempt == PING_ATTEMPTS {
            return Err(MongoDaoError::InitialPing {
                attempts: attempt,
                source: err,
            });
        }
        debug!(attempt, error = %err, "quiz database not reachable yet");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_PING_DELAY);
        attempt += 1;
    }
}

async fn ensure_quiz_indexes(database: &Database) -> MongoResult<()> {
    for (collection, index, keys, unique) in quiz_indexes() {
        let options = IndexOptions::builder()
            .name(Some(format!("{collection}_{}_idx", index.replace(',', "_"))))
            .unique(Some(unique))
            .build();
        let model = IndexModel::builder().keys(keys).options(options).build();
        database
            .collection::<Document>(collection)
            .create_index(model)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection,
                index,
                source,
            })?;
    }
    Ok(())
}
