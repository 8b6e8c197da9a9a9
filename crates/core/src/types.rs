/// Identities and offers are keyed by UUIDs issued by the store.
pub type EntityId = uuid::Uuid;

/// All server-side timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Event dates and times are the couple's local wall clock; no offset is
/// attached.
pub type LocalTimestamp = chrono::NaiveDateTime;
