//! A `plan()` result: the ordered set of requests a job will issue, decided
//! up front and replayed in order by the Job Runner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl PlannedRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchPlan {
    pub requests: Vec<PlannedRequest>,
}

impl FetchPlan {
    pub fn single(request: PlannedRequest) -> Self {
        Self { requests: vec![request] }
    }

    pub fn new(requests: Vec<PlannedRequest>) -> Self {
        Self { requests }
    }
}
