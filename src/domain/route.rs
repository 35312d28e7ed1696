use std::fmt;

use serde::{Deserialize, Serialize};

/// Output file family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Field assignments
    A,
    /// Queue
    B,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::A, Route::B];

    /// Family selected by a record's routing code
    pub fn from_code(routing_code: &str, queue_code: &str) -> Self {
        if routing_code == queue_code {
            Route::B
        } else {
            Route::A
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::A => "a",
            Route::B => "b",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Route::A => 0,
            Route::B => 1,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
