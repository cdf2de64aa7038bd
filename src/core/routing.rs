//! URL rules with placeholders: `/records/<pid_value>`, `/doi/<path:pid_value>`,
//! `/records/<pid_value>/export/<format>`.

use crate::domain::ports::UrlBuilder;
use crate::utils::error::{RecordsUiError, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::form_urlencoded;

pub type RouteParams = HashMap<String, String>;

/// Bytes escaped inside a `<path:...>` value; `/` stays literal.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Bytes escaped inside a single segment.
const SEGMENT: &AsciiSet = &PATH.add(b'/');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Converter {
    String,
    Path,
    Int,
}

impl Converter {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "" | "string" => Some(Converter::String),
            "path" => Some(Converter::Path),
            "int" => Some(Converter::Int),
            _ => None,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Converter::String => "[^/]+",
            Converter::Path => "[^/].*?",
            Converter::Int => r"\d+",
        }
    }

    fn escape_set(&self) -> &'static AsciiSet {
        match self {
            Converter::Path => PATH,
            Converter::String | Converter::Int => SEGMENT,
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Converter::String => !value.is_empty(),
            Converter::Path => !value.is_empty() && !value.starts_with('/'),
            Converter::Int => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param { name: String, converter: Converter },
}

#[derive(Debug, Clone)]
pub struct RoutePattern {
    rule: String,
    segments: Vec<Segment>,
    regex: Regex,
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"<(?:([a-z]+):)?([A-Za-z_][A-Za-z0-9_]*)>").expect("placeholder regex is valid")
    })
}

impl RoutePattern {
    pub fn parse(rule: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut pattern = String::from("^");
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(rule) {
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
            if whole.0 > last {
                let literal = &rule[last..whole.0];
                pattern.push_str(&regex::escape(literal));
                segments.push(Segment::Literal(literal.to_string()));
            }

            let converter_name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let converter = Converter::parse(converter_name).ok_or_else(|| {
                RecordsUiError::InvalidConfigValueError {
                    field: "route".to_string(),
                    value: rule.to_string(),
                    reason: format!("Unknown converter '{}'", converter_name),
                }
            })?;
            let name = caps[2].to_string();

            if segments
                .iter()
                .any(|s| matches!(s, Segment::Param { name: n, .. } if *n == name))
            {
                return Err(RecordsUiError::InvalidConfigValueError {
                    field: "route".to_string(),
                    value: rule.to_string(),
                    reason: format!("Placeholder '{}' appears twice", name),
                });
            }

            pattern.push_str(&format!("(?P<{}>{})", name, converter.pattern()));
            segments.push(Segment::Param { name, converter });
            last = whole.1;
        }

        if last < rule.len() {
            let literal = &rule[last..];
            pattern.push_str(&regex::escape(literal));
            segments.push(Segment::Literal(literal.to_string()));
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| RecordsUiError::InvalidConfigValueError {
            field: "route".to_string(),
            value: rule.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            rule: rule.to_string(),
            segments,
            regex,
        })
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Captured values come back percent-decoded.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let caps = self.regex.captures(path)?;
        let params = self
            .param_names()
            .filter_map(|name| {
                caps.name(name).map(|m| {
                    let value = percent_decode_str(m.as_str()).decode_utf8_lossy();
                    (name.to_string(), value.into_owned())
                })
            })
            .collect();
        Some(params)
    }

    /// Fills the placeholders; parameters the rule does not use become the query string.
    pub fn build(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut url = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => url.push_str(literal),
                Segment::Param { name, converter } => {
                    let value = params
                        .iter()
                        .find(|(k, _)| *k == name.as_str())
                        .map(|(_, v)| *v)
                        .ok_or_else(|| RecordsUiError::BuildError {
                            endpoint: endpoint.to_string(),
                            reason: format!("missing value for '{}'", name),
                        })?;
                    if !converter.accepts(value) {
                        return Err(RecordsUiError::BuildError {
                            endpoint: endpoint.to_string(),
                            reason: format!("value '{}' does not fit '{}'", value, name),
                        });
                    }
                    url.extend(utf8_percent_encode(value, converter.escape_set()));
                }
            }
        }

        let names: Vec<&str> = self.param_names().collect();
        let extra: Vec<&(&str, &str)> =
            params.iter().filter(|(k, _)| !names.contains(k)).collect();
        if !extra.is_empty() {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (k, v) in extra {
                query.append_pair(k, v);
            }
            url.push('?');
            url.push_str(&query.finish());
        }

        Ok(url)
    }
}

/// Dispatch table: records endpoints are matched in registration order,
/// host routes (login and friends) are only used to build URLs.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<(String, RoutePattern)>,
    host_routes: HashMap<String, RoutePattern>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, endpoint: &str, pattern: RoutePattern) -> Result<()> {
        if self.contains(endpoint) {
            return Err(RecordsUiError::ConfigError {
                message: format!("endpoint '{}' is registered twice", endpoint),
            });
        }
        self.routes.push((endpoint.to_string(), pattern));
        Ok(())
    }

    pub fn add_host_route(&mut self, endpoint: &str, rule: &str) -> Result<()> {
        if self.contains(endpoint) {
            return Err(RecordsUiError::ConfigError {
                message: format!("endpoint '{}' is registered twice", endpoint),
            });
        }
        self.host_routes
            .insert(endpoint.to_string(), RoutePattern::parse(rule)?);
        Ok(())
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.routes.iter().any(|(name, _)| name == endpoint)
            || self.host_routes.contains_key(endpoint)
    }

    pub fn match_path(&self, path: &str) -> Option<(&str, RouteParams)> {
        self.routes
            .iter()
            .find_map(|(name, pattern)| pattern.matches(path).map(|params| (name.as_str(), params)))
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &RoutePattern)> {
        self.routes.iter().map(|(name, pattern)| (name.as_str(), pattern))
    }
}

impl UrlBuilder for Router {
    fn build(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let pattern = self
            .routes
            .iter()
            .find(|(name, _)| name == endpoint)
            .map(|(_, pattern)| pattern)
            .or_else(|| self.host_routes.get(endpoint))
            .ok_or_else(|| RecordsUiError::BuildError {
                endpoint: endpoint.to_string(),
                reason: "no such endpoint".to_string(),
            })?;
        pattern.build(endpoint, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_simple_route() {
        let pattern = RoutePattern::parse("/records/<pid_value>").unwrap();
        let params = pattern.matches("/records/1").unwrap();
        assert_eq!(params.get("pid_value").map(String::as_str), Some("1"));
        assert!(pattern.matches("/records/1/references").is_none());
        assert!(pattern.matches("/records/").is_none());
    }

    #[test]
    fn test_path_converter_spans_slashes() {
        let pattern = RoutePattern::parse("/doi/<path:pid_value>").unwrap();
        let params = pattern.matches("/doi/10.1234/foo.bar").unwrap();
        assert_eq!(params["pid_value"], "10.1234/foo.bar");
    }

    #[test]
    fn test_extra_params() {
        let pattern = RoutePattern::parse("/records/<pid_value>/export/<format>").unwrap();
        let params = pattern.matches("/records/1/export/json").unwrap();
        assert_eq!(params["pid_value"], "1");
        assert_eq!(params["format"], "json");
    }

    #[test]
    fn test_unknown_converter_rejected() {
        assert!(RoutePattern::parse("/records/<uuid:pid_value>").is_err());
        assert!(RoutePattern::parse("/records/<pid_value>/<pid_value>").is_err());
    }

    #[test]
    fn test_build_with_query() {
        let mut router = Router::new();
        router
            .add("recid", RoutePattern::parse("/records/<pid_value>").unwrap())
            .unwrap();
        router.add_host_route("security.login", "/login").unwrap();

        assert_eq!(router.build("recid", &[("pid_value", "1")]).unwrap(), "/records/1");
        assert_eq!(
            router
                .build("security.login", &[("next", "/records/1?x=1")])
                .unwrap(),
            "/login?next=%2Frecords%2F1%3Fx%3D1"
        );
        assert!(matches!(
            router.build("doi", &[("pid_value", "1")]),
            Err(RecordsUiError::BuildError { .. })
        ));
        assert!(router.build("recid", &[]).is_err());
    }

    #[test]
    fn test_values_are_percent_encoded_and_decoded() {
        let records = RoutePattern::parse("/records/<pid_value>").unwrap();
        assert_eq!(
            records.build("recid", &[("pid_value", "a b?c")]).unwrap(),
            "/records/a%20b%3Fc"
        );
        assert_eq!(
            records.build("recid", &[("pid_value", "a/b")]).unwrap(),
            "/records/a%2Fb"
        );
        assert_eq!(records.matches("/records/a%20b%3Fc").unwrap()["pid_value"], "a b?c");
        assert_eq!(records.matches("/records/a%2Fb").unwrap()["pid_value"], "a/b");

        let doi = RoutePattern::parse("/doi/<path:pid_value>").unwrap();
        assert_eq!(
            doi.build("doi", &[("pid_value", "10.1234/foo bar")]).unwrap(),
            "/doi/10.1234/foo%20bar"
        );
        assert_eq!(
            doi.matches("/doi/10.1234/foo%20bar").unwrap()["pid_value"],
            "10.1234/foo bar"
        );
    }

    #[test]
    fn test_duplicate_endpoint_rejected() {
        let mut router = Router::new();
        router
            .add("recid", RoutePattern::parse("/records/<pid_value>").unwrap())
            .unwrap();
        assert!(router
            .add("recid", RoutePattern::parse("/r/<pid_value>").unwrap())
            .is_err());
        assert!(router.add_host_route("recid", "/x").is_err());
    }

    #[test]
    fn test_first_registered_route_wins() {
        let mut router = Router::new();
        router
            .add("records", RoutePattern::parse("/records/<pid_value>").unwrap())
            .unwrap();
        router
            .add("references", RoutePattern::parse("/records/<pid_value>/references").unwrap())
            .unwrap();
        assert_eq!(router.match_path("/records/1").unwrap().0, "records");
        assert_eq!(router.match_path("/records/1/references").unwrap().0, "references");
        assert!(router.match_path("/nowhere").is_none());
    }
}
