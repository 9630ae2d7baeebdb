use crate::error::ConsumerError;
use engine_core::retry::RetryDisposition;

/// Every failed write is worth another attempt; only interruption ends the
/// retry loop early.
pub fn classify_consumer_error(err: &ConsumerError) -> RetryDisposition {
    match err {
        ConsumerError::Write { .. } => RetryDisposition::Retry,
        ConsumerError::RetriesExhausted { .. } => RetryDisposition::Stop,
        ConsumerError::Interrupted { .. } => RetryDisposition::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::sql::base::error::DbError;

    #[test]
    fn test_write_errors_are_retried() {
        let err = ConsumerError::Write {
            table: "orders".into(),
            batch_id: "orders-000000".into(),
            source: DbError::Write("duplicate key".into()),
        };
        assert_eq!(classify_consumer_error(&err), RetryDisposition::Retry);
    }

    #[test]
    fn test_interruption_stops() {
        let err = ConsumerError::Interrupted {
            batch_id: "orders-000001".into(),
        };
        assert_eq!(classify_consumer_error(&err), RetryDisposition::Stop);
    }
}
