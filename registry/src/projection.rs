//! Derives the visible page of agents from the full record set.
//!
//! The pipeline is a stable filter (text AND status) followed by a page
//! window. Nothing is re-sorted, and every input yields a page: out-of-range
//! pages and zero-sized pages are simply empty.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{RegistryError, Result};
use crate::record::AgentRecord;

pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const PAGE_SIZE_OPTIONS: [usize; 3] = [6, 10, 25];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Any,
    Active,
    Inactive,
}

impl StatusFilter {
    /// Accepts the labels the status picker emits (`Active`, `Inactive`) in
    /// any case; an empty value or `all` clears the filter.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::Any),
            "active" => Ok(StatusFilter::Active),
            "inactive" => Ok(StatusFilter::Inactive),
            _ => Err(RegistryError::InvalidStatus(raw.to_string())),
        }
    }

    pub fn admits(self, active: bool) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Active => active,
            StatusFilter::Inactive => !active,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for StatusFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StatusFilter::Any => "all",
            StatusFilter::Active => "active",
            StatusFilter::Inactive => "inactive",
        };
        f.write_str(label)
    }
}

/// Rows-per-page options offered to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSizes {
    options: Vec<usize>,
    default_size: usize,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            options: PAGE_SIZE_OPTIONS.to_vec(),
            default_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageSizes {
    pub fn with_default(mut self, size: usize) -> Result<Self> {
        if !self.options.contains(&size) {
            return Err(RegistryError::UnsupportedPageSize(size));
        }
        self.default_size = size;
        Ok(self)
    }

    pub fn default_size(&self) -> usize {
        self.default_size
    }

    pub fn options(&self) -> &[usize] {
        &self.options
    }

    /// Falls back to the default for a missing or zero size.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(size) if size > 0 => size,
            _ => self.default_size,
        }
    }
}

/// Everything the list view needs to pick a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    pub status: StatusFilter,
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::Any,
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewQuery {
    pub fn new(search: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            search: search.into(),
            status,
            ..Self::default()
        }
    }

    pub fn page(mut self, page_index: usize, page_size: usize) -> Self {
        self.page_index = page_index;
        self.page_size = page_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    pub items: Vec<&'a AgentRecord>,
    pub total_matching: usize,
    pub page_index: usize,
    pub page_size: usize,
}

impl<'a> Page<'a> {
    fn start(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based position of the first visible item, 0 for an empty page.
    pub fn from(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.start() + 1
        }
    }

    /// 1-based position of the last visible item, 0 for an empty page.
    pub fn to(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.start() + self.items.len()
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.page_size > 0 && self.start().saturating_add(self.page_size) < self.total_matching
    }

    pub fn to_owned_items(&self) -> Vec<AgentRecord> {
        self.items.iter().map(|record| (*record).clone()).collect()
    }
}

pub fn project<'a>(
    records: &'a [AgentRecord],
    query: &str,
    status: StatusFilter,
    page_index: usize,
    page_size: usize,
) -> Page<'a> {
    let needle = query.to_lowercase();
    let matching: Vec<&AgentRecord> = records
        .iter()
        .filter(|record| status.admits(record.active) && record.matches_text(&needle))
        .collect();
    let total_matching = matching.len();

    let items = match page_index.checked_mul(page_size) {
        Some(start) if page_size > 0 && start < total_matching => matching
            .into_iter()
            .skip(start)
            .take(page_size)
            .collect(),
        _ => Vec::new(),
    };

    Page {
        items,
        total_matching,
        page_index,
        page_size,
    }
}

pub fn project_view<'a>(records: &'a [AgentRecord], view: &ViewQuery) -> Page<'a> {
    project(
        records,
        &view.search,
        view.status,
        view.page_index,
        view.page_size,
    )
}
