use crate::types::Topic;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("subscriber {subscriber_id} on {topic} panicked: {message}")]
    SubscriberPanicked {
        topic: Topic,
        subscriber_id: u64,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::NotifyError;
    use crate::types::Topic;

    #[test]
    fn subscriber_panicked_formats_topic_and_id() {
        let err = NotifyError::SubscriberPanicked {
            topic: Topic::HealthChecks,
            subscriber_id: 7,
            message: "index out of bounds".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "subscriber 7 on health_checks panicked: index out of bounds"
        );
        assert!(matches!(
            err,
            NotifyError::SubscriberPanicked { subscriber_id: 7, .. }
        ));
    }
}
