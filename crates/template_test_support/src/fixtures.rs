//! Golden render fixtures stored as TOML.
//!
//! File layout:
//!
//! ```toml
//! [[fixture]]
//! name = "simple mustache"
//! template = "<div>{{title}}</div>"
//! context = { title = "hello" }
//! expected = "<div>hello</div>"
//! ```
//!
//! `options` is kept as an untyped value so the consumer can deserialize it
//! into its own options type. Exactly one of `expected` / `error` must be set.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStatus {
    #[default]
    Active,
    Skip,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RenderFixture {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub options: serde_json::Value,
    #[serde(default)]
    pub expected: Option<String>,
    /// Expected error kind, matched against the consumer's error naming.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: FixtureStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    fixture: Vec<RenderFixture>,
}

pub fn parse_fixtures(content: &str, origin: &str) -> Vec<RenderFixture> {
    let file: FixtureFile = toml::from_str(content)
        .unwrap_or_else(|err| panic!("failed to parse fixture file {origin}: {err}"));
    for fixture in &file.fixture {
        assert!(
            fixture.expected.is_some() != fixture.error.is_some(),
            "fixture '{}' in {origin} must set exactly one of `expected` / `error`",
            fixture.name
        );
        if fixture.status == FixtureStatus::Skip {
            assert!(
                fixture.reason.is_some(),
                "skipped fixture '{}' in {origin} needs a reason",
                fixture.name
            );
        }
    }
    file.fixture
}

pub fn load_fixtures(path: &Path) -> Vec<RenderFixture> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read fixture file {path:?}: {err}"));
    parse_fixtures(&content, &path.display().to_string())
}
