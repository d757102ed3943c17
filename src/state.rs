//! Type-state markers for pipeline progression.
//!
//! Each marker owns exactly the data the next stage needs, so a run cannot
//! reach the invoker without passing validation and authorization first.

use std::collections::HashMap;

use serde_json::Value;

use crate::secret::Secret;
use crate::tainted::Tainted;
use crate::validate::ValidatedBody;

/// Request received; nothing checked yet.
#[derive(Debug)]
pub struct Received {
    pub(crate) body: Tainted<Value>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) request_secret: Option<Secret<String>>,
}

/// Body shape confirmed; credential not checked yet.
#[derive(Debug)]
pub struct Validated {
    pub(crate) body: ValidatedBody,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) request_secret: Option<Secret<String>>,
}

/// Cleared to run user code.
#[derive(Debug)]
pub struct Authorized {
    pub(crate) body: ValidatedBody,
}
