//! Scriptable [`HttpCheck`] and [`FreeSpace`] fakes (testing only)

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::disk::FreeSpace;
use crate::http::HttpCheck;

/// Answers `200` for every URL except those given an explicit response.
#[derive(Debug, Default, Clone)]
pub struct FakeHttp {
    responses: BTreeMap<String, Result<u16, String>>,
}

impl FakeHttp {
    pub fn all_ok() -> Self {
        Self::default()
    }

    pub fn unreachable(mut self, url: &str) -> Self {
        self.responses
            .insert(url.to_string(), Err("connection refused".to_string()));
        self
    }
}

impl HttpCheck for FakeHttp {
    fn get(&self, url: &str, _timeout: Duration) -> Result<u16, String> {
        self.responses.get(url).cloned().unwrap_or(Ok(200))
    }
}

/// Reports the same free space for every path.
#[derive(Debug, Clone, Copy)]
pub struct FixedFreeSpace(pub u64);

impl FixedFreeSpace {
    pub fn gb(gb: f64) -> Self {
        Self((gb * 1024.0 * 1024.0 * 1024.0) as u64)
    }
}

impl FreeSpace for FixedFreeSpace {
    fn available_bytes(&self, _path: &Path) -> Result<u64, String> {
        Ok(self.0)
    }
}
