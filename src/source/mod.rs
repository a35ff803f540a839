//! Cached, sequence-guarded list fetching for one entity.

/// List response parsing.
pub mod response;

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::{
    error::{FetchError, GatewayError},
    gateway::{GatewayRequest, GatewayResponse},
    schema::EntitySchema,
    types::{EntityKind, PagingMode, RequestSeq},
};

pub use response::{ListPage, parse_list};

/// Cached pages kept per entity; the least recently used is evicted first.
pub const CACHE_CAPACITY: usize = 16;

/// Query of one list request.
///
/// Client-paged entities always use the default (whole collection); server-paged
/// entities carry the page and the search/filter values sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ListParams {
    /// Page requested, in the endpoint's numbering.
    pub page_number: Option<usize>,
    /// Rows per page.
    pub size: Option<usize>,
    /// Committed search.
    pub search: Option<String>,
    /// Column filters.
    pub filters: BTreeMap<String, String>,
}

impl ListParams {
    /// Builds the request for `schema`'s list endpoint.
    pub fn to_request(&self, schema: &EntitySchema) -> GatewayRequest {
        let mut request = GatewayRequest::get(schema.list_path);
        if let Some(page_number) = self.page_number {
            request = request.with_query("pageNumber", page_number.to_string());
        }
        if let Some(size) = self.size {
            request = request.with_query("size", size.to_string());
        }
        if let Some(search) = &self.search {
            request = request.with_query("search", search.clone());
        }
        for (column, value) in &self.filters {
            request = request.with_query(column.clone(), value.clone());
        }
        request
    }
}

/// Cache key: the entity plus the exact request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Entity.
    pub kind: EntityKind,
    /// Query parameters.
    pub params: ListParams,
}

/// A fetch the runtime must send through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    /// Sequence number; answers to older numbers are dropped.
    pub seq: RequestSeq,
    /// Request to send.
    pub request: GatewayRequest,
}

/// Outcome of reading through the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Read {
    /// Served from cache; no request issued.
    Cached(ListPage),
    /// Cache miss; a request was issued under this plan.
    Fetch(FetchPlan),
}

/// Owner of the cached record sets of one entity.
///
/// Only [`DataSource::complete`] writes the cache. Entries leave it through
/// [`DataSource::invalidate`] or by eviction once [`CACHE_CAPACITY`] is
/// exceeded.
#[derive(Debug)]
pub struct DataSource {
    schema: &'static EntitySchema,
    cache: HashMap<CacheKey, ListPage>,
    // Least recently used at the front.
    recency: VecDeque<CacheKey>,
    next_seq: RequestSeq,
    in_flight: Option<(RequestSeq, CacheKey)>,
}

impl DataSource {
    /// Source with an empty cache.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            schema: kind.schema(),
            cache: HashMap::new(),
            recency: VecDeque::new(),
            next_seq: 1,
            in_flight: None,
        }
    }

    /// Schema of the entity fetched.
    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Where pagination happens.
    pub fn paging(&self) -> PagingMode {
        self.schema.paging
    }

    /// Serves `params` from cache or issues a new request.
    ///
    /// A cache hit supersedes any in-flight request, so its late answer is
    /// discarded too.
    pub fn read(&mut self, params: ListParams) -> Read {
        let key = CacheKey {
            kind: self.schema.kind,
            params,
        };
        if let Some(hit) = self.cache.get(&key).cloned() {
            debug!(kind = ?key.kind, "list served from cache");
            if let Some((seq, _)) = self.in_flight.take() {
                debug!(seq, "in-flight request superseded by cache hit");
            }
            self.touch(&key);
            return Read::Cached(hit);
        }
        Read::Fetch(self.issue(key))
    }

    /// Issues a request for `params`, bypassing the cache.
    pub fn fetch(&mut self, params: ListParams) -> FetchPlan {
        let key = CacheKey {
            kind: self.schema.kind,
            params,
        };
        self.issue(key)
    }

    fn issue(&mut self, key: CacheKey) -> FetchPlan {
        let seq = self.next_seq;
        self.next_seq += 1;
        let request = key.params.to_request(self.schema);
        debug!(kind = ?key.kind, seq, query = ?request.query, "list fetch issued");
        self.in_flight = Some((seq, key));
        FetchPlan { seq, request }
    }

    /// True while the latest issued request has not completed.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Latest issued sequence number, zero before the first request.
    pub fn latest_seq(&self) -> RequestSeq {
        self.next_seq - 1
    }

    /// Applies the gateway's answer to request `seq`.
    ///
    /// Returns `Ok(None)` when `seq` is not the latest issued request; the
    /// answer is dropped without touching cache or state.
    pub fn complete(
        &mut self,
        seq: RequestSeq,
        result: Result<GatewayResponse, GatewayError>,
    ) -> Result<Option<ListPage>, FetchError> {
        let key = match self.in_flight.take() {
            Some((latest, key)) if latest == seq => key,
            other => {
                warn!(kind = ?self.schema.kind, seq, latest = self.latest_seq(), "stale list response discarded");
                self.in_flight = other;
                return Ok(None);
            }
        };

        let page = parse_list(self.schema, result?)?;
        info!(kind = ?key.kind, seq, records = page.records.len(), total = ?page.total_elements, "list loaded");
        self.store(key, page.clone());
        Ok(Some(page))
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn store(&mut self, key: CacheKey, page: ListPage) {
        if self.cache.insert(key.clone(), page).is_some() {
            self.touch(&key);
        } else {
            self.recency.push_back(key);
        }
        while self.recency.len() > CACHE_CAPACITY {
            if let Some(oldest) = self.recency.pop_front() {
                self.cache.remove(&oldest);
                debug!(kind = ?oldest.kind, "cached page evicted");
            }
        }
    }

    /// Drops every cached result of `kind`; the next read goes to the gateway.
    pub fn invalidate(&mut self, kind: EntityKind) {
        self.cache.retain(|key, _| key.kind != kind);
        self.recency.retain(|key| key.kind != kind);
        debug!(?kind, "cache invalidated");
    }

    /// Cached pages.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
