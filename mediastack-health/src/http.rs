//! HTTP liveness checks.

use std::time::Duration;

/// Issues a bounded `GET` against a health URL.
pub trait HttpCheck: Send + Sync {
    /// `Ok(status)` for a 2xx response, `Err(reason)` otherwise.
    fn get(&self, url: &str, timeout: Duration) -> Result<u16, String>;
}

/// [`HttpCheck`] over a blocking `ureq` agent.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqHttp;

impl HttpCheck for UreqHttp {
    fn get(&self, url: &str, timeout: Duration) -> Result<u16, String> {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        match agent.get(url).call() {
            Ok(response) if (200..300).contains(&response.status()) => Ok(response.status()),
            Ok(response) => Err(format!("HTTP {}", response.status())),
            Err(ureq::Error::Status(code, _)) => Err(format!("HTTP {code}")),
            Err(err) => Err(err.to_string()),
        }
    }
}
