use recordkit_field::ValidationError;
use serde_json::Value;
use tracing::warn;

use crate::gateway::ApiResponse;
use crate::record::Record;

/// Lifecycle hooks of an entity type.
///
/// Every method defaults to a no-op, so implementors override only what
/// they need. Hooks run synchronously around the operation they name.
pub trait EntityHooks: Send + Sync {
    /// Runs before a new record is validated and sent.
    fn before_insert(&self, record: &mut Record) {
        let _ = record;
    }

    /// Runs after a valid new record was sent (or stored locally).
    fn after_insert(&self, record: &Record) {
        let _ = record;
    }

    fn before_update(&self, record: &mut Record) {
        let _ = record;
    }

    fn after_update(&self, record: &Record) {
        let _ = record;
    }

    fn before_delete(&self, record: &Record) {
        let _ = record;
    }

    fn after_delete(&self, record: &Record) {
        let _ = record;
    }

    /// Runs when a hydrating reply arrives, before anything is stored.
    fn before_fetched(&self, route: &str, data: &Value, response: &ApiResponse) {
        let _ = (route, data, response);
    }

    /// Runs after a single-section reply was stored and the callback ran.
    fn after_fetched(&self, route: &str, data: &Value, records: &[Record], response: &ApiResponse) {
        let _ = (route, data, records, response);
    }

    /// Runs before one `$data` section is stored.
    fn before_sub_fetched(&self, entity: &str, section: &Value) {
        let _ = (entity, section);
    }

    fn after_sub_fetched(&self, entity: &str, records: &[Record]) {
        let _ = (entity, records);
    }

    /// Receives every validation failure of `Record::validate`.
    fn on_validation_error(&self, entity: &str, error: &ValidationError) {
        warn!(
            entity,
            field = %error.field,
            kind = %error.kind,
            "validation failed: {}",
            error.message
        );
    }
}

/// Hooks that do nothing beyond the default logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl EntityHooks for NoHooks {}
