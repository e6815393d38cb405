//! String identifiers for topology entities.
//!
//! Every entity in a diagram is addressed by an opaque string id assigned by
//! the editor. Distinct newtypes keep node ids from being confused with
//! table or column ids at call sites.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a diagram node.
    NodeId
);
string_id!(
    /// Identifier of a diagram edge.
    EdgeId
);
string_id!(
    /// Identifier of a table owned by a database node.
    TableId
);
string_id!(
    /// Identifier of a column within a table.
    ColumnId
);
string_id!(
    /// Identifier of an index within a table.
    IndexId
);
string_id!(
    /// Identifier of a cache key owned by a cache node.
    KeyId
);
string_id!(
    /// Identifier of an endpoint owned by an api-server node.
    EndpointId
);
