// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database-backed identifier newtypes.
//!
//! Rows are keyed by `BIGSERIAL` columns; these wrappers keep the id spaces
//! apart at compile time (a [`StackId`] cannot be passed where a
//! [`ServiceId`] is expected).

use serde::{Deserialize, Serialize};

macro_rules! db_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

db_id! {
    /// Primary key of a category row.
    CategoryId
}

db_id! {
    /// Primary key of a template service row.
    ServiceId
}

db_id! {
    /// Primary key of a stack row.
    StackId
}

db_id! {
    /// Primary key of a service instance row.
    InstanceId
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
