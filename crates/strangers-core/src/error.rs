use strangers_common::UserId;

/// Internal guard failures of the queue and registry.
///
/// None of these reach users: rejections users can trigger are expressed as
/// [`OutboundMessage`](crate::OutboundMessage) notices instead. Seeing
/// anything but `Empty` escape a transition means a coordinator bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("user {0} is already waiting")]
    AlreadyQueued(UserId),

    #[error("user {0} is already paired")]
    AlreadyPaired(UserId),

    #[error("user {0} cannot be paired with themselves")]
    SelfPair(UserId),

    #[error("wait queue is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_error_display() {
        let err = MatchError::AlreadyQueued(UserId::from("7"));
        assert_eq!(err.to_string(), "user 7 is already waiting");

        let err = MatchError::AlreadyPaired(UserId::from("7"));
        assert_eq!(err.to_string(), "user 7 is already paired");

        let err = MatchError::SelfPair(UserId::from("7"));
        assert_eq!(err.to_string(), "user 7 cannot be paired with themselves");

        assert_eq!(MatchError::Empty.to_string(), "wait queue is empty");
    }
}
