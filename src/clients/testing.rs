//! In-memory provider fakes for unit tests

use crate::aws::api::{AuxiliaryApi, MonitoringApi, TaggingApi};
use crate::aws::pagination::Page;
use crate::aws::types::{
    GetMetricDataInput, GetMetricStatisticsInput, GetMetricStatisticsOutput, GetResourcesInput,
    ListMetricsInput, ResourceTagMapping, WireMetric, WireMetricDataResult,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Serve `pages` in order, linking them with tokens `page-1`, `page-2`, ...
fn serve_page<T: Clone>(pages: &[Vec<T>], token: Option<&str>) -> Result<Page<T>> {
    let idx = match token {
        None => 0,
        Some(t) => t
            .strip_prefix("page-")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| anyhow::anyhow!("unexpected token {}", t))?,
    };
    if pages.is_empty() {
        return Ok(Page::last(Vec::new()));
    }
    let items = pages
        .get(idx)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("page {} out of range", idx))?;
    let next = (idx + 1 < pages.len()).then(|| format!("page-{}", idx + 1));
    Ok(Page::new(items, next))
}

#[derive(Default)]
pub struct FakeTagging {
    pages: Vec<Vec<ResourceTagMapping>>,
    fail_after: Option<usize>,
    pub requests: Arc<Mutex<Vec<(GetResourcesInput, Option<String>)>>>,
}

impl FakeTagging {
    pub fn with_pages(pages: Vec<Vec<ResourceTagMapping>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Serve `ok_pages` non-final empty pages, then fail
    pub fn failing_after(ok_pages: usize) -> Self {
        Self {
            pages: vec![Vec::new(); ok_pages + 1],
            fail_after: Some(ok_pages),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TaggingApi for FakeTagging {
    async fn get_resources(
        &self,
        input: &GetResourcesInput,
        pagination_token: Option<&str>,
    ) -> Result<Page<ResourceTagMapping>> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((input.clone(), pagination_token.map(String::from)));
            requests.len() - 1
        };
        if self.fail_after.is_some_and(|n| call >= n) {
            return Err(anyhow::anyhow!("ThrottlingException"));
        }
        serve_page(&self.pages, pagination_token)
    }
}

#[derive(Default)]
pub struct FakeMonitoring {
    pub metric_pages: Vec<Vec<WireMetric>>,
    pub data_pages: Vec<Vec<WireMetricDataResult>>,
    pub statistics: Option<GetMetricStatisticsOutput>,
    pub fail: bool,
    pub list_requests: Mutex<Vec<(ListMetricsInput, Option<String>)>>,
    pub data_requests: Mutex<Vec<(GetMetricDataInput, Option<String>)>>,
    pub statistics_requests: Mutex<Vec<GetMetricStatisticsInput>>,
}

#[async_trait]
impl MonitoringApi for FakeMonitoring {
    async fn list_metrics(
        &self,
        input: &ListMetricsInput,
        next_token: Option<&str>,
    ) -> Result<Page<WireMetric>> {
        self.list_requests
            .lock()
            .unwrap()
            .push((input.clone(), next_token.map(String::from)));
        if self.fail {
            return Err(anyhow::anyhow!("AccessDenied"));
        }
        serve_page(&self.metric_pages, next_token)
    }

    async fn get_metric_data(
        &self,
        input: &GetMetricDataInput,
        next_token: Option<&str>,
    ) -> Result<Page<WireMetricDataResult>> {
        self.data_requests
            .lock()
            .unwrap()
            .push((input.clone(), next_token.map(String::from)));
        if self.fail {
            return Err(anyhow::anyhow!("InternalServiceError"));
        }
        serve_page(&self.data_pages, next_token)
    }

    async fn get_metric_statistics(
        &self,
        input: &GetMetricStatisticsInput,
    ) -> Result<GetMetricStatisticsOutput> {
        self.statistics_requests.lock().unwrap().push(input.clone());
        if self.fail {
            return Err(anyhow::anyhow!("InvalidParameterCombination"));
        }
        Ok(self.statistics.clone().unwrap_or_default())
    }
}

/// Scripted auxiliary API: responses are queued per (service, action) and
/// served in order
#[derive(Default)]
pub struct FakeAuxiliary {
    responses: Mutex<HashMap<(String, String), VecDeque<Result<Value, String>>>>,
    pub calls: Mutex<Vec<(String, String, Value)>>,
}

impl FakeAuxiliary {
    pub fn respond(self, service: &str, action: &str, response: Value) -> Self {
        self.push(service, action, Ok(response))
    }

    pub fn fail(self, service: &str, action: &str, message: &str) -> Self {
        self.push(service, action, Err(message.to_string()))
    }

    fn push(self, service: &str, action: &str, response: Result<Value, String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((service.to_string(), action.to_string()))
            .or_default()
            .push_back(response);
        self
    }
}

#[async_trait]
impl AuxiliaryApi for FakeAuxiliary {
    async fn invoke(&self, service: &str, action: &str, params: &Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((service.to_string(), action.to_string(), params.clone()));
        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&(service.to_string(), action.to_string()))
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("unexpected call {}.{}", service, action)),
        }
    }
}
