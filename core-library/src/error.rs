use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("No rows changed: {entity_type} with id {id}")]
    NoRowsAffected { entity_type: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LibraryError {
    pub(crate) fn no_rows(entity_type: &str, id: Option<i64>) -> Self {
        LibraryError::NoRowsAffected {
            entity_type: entity_type.to_string(),
            id: id.map_or_else(|| "<unassigned>".to_string(), |id| id.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
