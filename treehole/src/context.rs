// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use treehole_core::RequestHeaders;

use crate::identity::CurrentUser;

/// State of a single request, created when the request arrives and dropped when it was answered.
///
/// Besides the request headers it remembers the caller once resolved, so the user record is only
/// loaded once per request no matter how often it is asked for.
#[derive(Debug, Default)]
pub struct RequestContext {
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    deadline: Option<Instant>,
    current_user: Option<Arc<CurrentUser>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Point in time after which storage operations of this request give up waiting.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the caller if it was already resolved for this request.
    pub fn current_user(&self) -> Option<Arc<CurrentUser>> {
        self.current_user.clone()
    }

    pub(crate) fn set_current_user(&mut self, current_user: Arc<CurrentUser>) {
        self.current_user = Some(current_user);
    }
}

impl RequestHeaders for RequestContext {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}
