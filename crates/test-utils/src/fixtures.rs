//! Scenario file fixtures.

use std::io::Write;
use tempfile::NamedTempFile;

/// A minimal valid scenario with a single GET step.
pub const MINIMAL_SCENARIO: &str = r#"
name: minimal
users: 2
duration_secs: 1
think_time_ms: 100
think_jitter_ms: 0
steps:
  - url: http://localhost:8080/health
"#;

/// Two chained steps: fetch an item, then post it back as JSON.
pub const CHAINED_SCENARIO: &str = r#"
name: chained
description: Fetch then forward
users: 5
duration_secs: 2
think_time_ms: 100
think_jitter_ms: 0
seed: 7
steps:
  - name: fetch
    url: http://localhost:8080/items
  - name: forward
    method: POST
    url: http://localhost:8080/echo
    body_from_previous: json
    headers:
      X-Run: chained
"#;

/// Scenario without steps; loads but fails validation.
pub const EMPTY_SCENARIO: &str = r#"
name: empty
users: 1
duration_secs: 1
steps: []
"#;

/// Write `contents` to a temporary `.yaml` file.
pub fn write_scenario(contents: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}
