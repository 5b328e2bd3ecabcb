use std::path::PathBuf;

use mediastack_core::ProbeResult;

use crate::Probe;

const M3U_HEADER: &str = "#EXTM3U";
const ENTRY_PREFIX: &str = "#EXTINF";

/// The user-supplied IPTV playlist is in place and has channels.
///
/// Every problem only warns: the deployment itself is not broken without it.
pub struct PlaylistProbe {
    path: PathBuf,
}

impl PlaylistProbe {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Number of `#EXTINF` entries, or `None` without an `#EXTM3U` header.
pub fn count_entries(contents: &str) -> Option<usize> {
    let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next()?.trim_start_matches('\u{feff}');
    if !header.starts_with(M3U_HEADER) {
        return None;
    }
    Some(lines.filter(|l| l.starts_with(ENTRY_PREFIX)).count())
}

impl Probe for PlaylistProbe {
    fn name(&self) -> String {
        "playlist".to_string()
    }

    fn run(&self) -> ProbeResult {
        if !self.path.is_file() {
            return ProbeResult::warn(self.name(), format!("missing {}", self.path.display()));
        }
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                return ProbeResult::warn(
                    self.name(),
                    format!("unreadable {}: {err}", self.path.display()),
                )
            }
        };
        match count_entries(&contents) {
            None => ProbeResult::warn(
                self.name(),
                format!("{} has no {M3U_HEADER} header", self.path.display()),
            ),
            Some(0) => ProbeResult::warn(
                self.name(),
                format!("{} has no channels", self.path.display()),
            ),
            Some(n) => ProbeResult::pass(self.name(), format!("{n} channel(s)")),
        }
    }
}
