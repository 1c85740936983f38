/// Database model definitions.
pub mod models;
/// Session, participant, question and answer persistence.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
