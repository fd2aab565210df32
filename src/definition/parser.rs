//! Top-level definition parsing.
//!
//! # Responsibilities
//! - Walk one file's lines with a shared [`LineCursor`]
//! - Interpret top-level directives (`create`, `method`, `logs`, ...)
//! - Delegate `data-source` blocks to [`ProviderBuilder`]
//!
//! # Design Decisions
//! - Pure function of the text: parsing the same lines twice yields equal
//!   definitions
//! - Unknown top-level keywords are ignored
//! - Exactly one `data-source` per file

use crate::definition::cursor::LineCursor;
use crate::definition::error::{ParseError, ParseResult};
use crate::definition::provider::ProviderBuilder;
use crate::definition::types::{
    Authentication, Definition, LogTarget, OutputRules, Provider, Severity,
};

/// Parser for endpoint definition files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionParser;

impl DefinitionParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a whole file given as text.
    pub fn parse_str(&self, text: &str) -> ParseResult<Definition> {
        let lines: Vec<&str> = text.lines().collect();
        self.parse(&lines)
    }

    /// Parse a file given as lines.
    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> ParseResult<Definition> {
        let mut cursor = LineCursor::new(lines);

        let mut route_template = None;
        let mut method = None;
        let mut authentication = Authentication::Disabled;
        let mut logs = LogTarget::Disabled;
        let mut log_threshold = None;
        let mut wrapped = false;
        let mut camel_case = false;
        let mut quest_parameters = Vec::new();
        let mut restrict_json_in_query_string = false;
        let mut provider: Option<Provider> = None;
        let mut output = OutputRules::default();

        while let Some(d) = cursor.advance() {
            match d.keyword.to_ascii_lowercase().as_str() {
                "create" => route_template = Some(d.value()?.to_string()),
                "authentication" => authentication = Authentication::from_value(d.value()?),
                "wrapped" => {
                    let value = d.value()?.to_ascii_lowercase();
                    let mut parts = value.split('|').map(str::trim);
                    wrapped = parts.next() == Some("true");
                    camel_case = parts.next() == Some("camelcase");
                }
                "logs" => {
                    let value = d.value()?;
                    let (name, level) = match value.split_once('|') {
                        Some((name, level)) => (name.trim(), Some(level.trim())),
                        None => (value, None),
                    };
                    logs = LogTarget::from_value(name);
                    if let Some(level) = level {
                        log_threshold = Some(
                            Severity::parse(level)
                                .ok_or_else(|| d.invalid(level, "unknown severity"))?,
                        );
                    }
                }
                "method" => method = Some(d.value()?.to_string()),
                "use" => {
                    let value = d.value()?;
                    let mut words = value.split_whitespace();
                    match words.next().map(str::to_ascii_lowercase).as_deref() {
                        Some("quest") => {
                            quest_parameters = words.map(str::to_string).collect();
                        }
                        Some("restrict-json-in-query-string") => {
                            restrict_json_in_query_string = true;
                        }
                        _ => {}
                    }
                }
                "data-source" => {
                    if provider.is_some() {
                        return Err(ParseError::MultipleProviders { line: d.line });
                    }
                    let built = ProviderBuilder::build(&d, &mut cursor)?;
                    if let Some(rules) = built.output {
                        output = rules;
                    }
                    provider = Some(built.provider);
                }
                _ => {}
            }
        }

        Ok(Definition {
            route_template: route_template.ok_or(ParseError::MissingDirective("create"))?,
            method: method.ok_or(ParseError::MissingDirective("method"))?,
            authentication,
            logs,
            log_threshold,
            wrapped,
            camel_case,
            quest_parameters,
            restrict_json_in_query_string,
            output,
            provider: provider.ok_or(ParseError::MissingDirective("data-source"))?,
        })
    }
}
