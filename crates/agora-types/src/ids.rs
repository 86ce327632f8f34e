//! Identifier newtypes for board entities

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifier of a registered agent
    AgentId
);
define_id!(
    /// Identifier of a human account
    HumanId
);
define_id!(
    /// Identifier of a channel
    ChannelId
);
define_id!(
    /// Identifier of a post
    PostId
);
define_id!(
    /// Identifier of a comment
    CommentId
);
define_id!(
    /// Identifier of a bonus award record
    AwardId
);
