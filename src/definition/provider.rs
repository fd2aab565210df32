//! `data-source` block parsing.
//!
//! # Responsibilities
//! - Consume one `data-source <kind>` block through its matching `end`
//! - Build the typed provider for that kind
//! - Collect the optional `output` block (group / map / exclude)
//!
//! # Design Decisions
//! - Unknown keywords inside a block are ignored so older gateways accept
//!   newer files
//! - A keyword without its value is a hard error for the whole file
//! - `begin` lines inside list blocks carry no meaning and are skipped

use std::time::Duration;

use crate::definition::cursor::{BlockStart, Directive, LineCursor};
use crate::definition::error::{ParseError, ParseResult};
use crate::definition::types::{
    BrokerProvider, CacheProvider, CommandType, DocumentProvider, GroupLevel, OutboundProvider,
    OutputRules, Provider, RefreshTask, SqlProvider,
};

/// A provider plus the `output` rules found inside its block.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltProvider {
    pub provider: Provider,
    pub output: Option<OutputRules>,
}

/// Builds typed provider values from `data-source` blocks.
pub struct ProviderBuilder;

impl ProviderBuilder {
    /// Parse the block opened by `opener` (a `data-source <kind>` line that the
    /// cursor has already consumed).
    pub fn build<S: AsRef<str>>(
        opener: &Directive<'_>,
        cursor: &mut LineCursor<'_, S>,
    ) -> ParseResult<BuiltProvider> {
        let kind = opener.value()?;
        let block = BlockStart::of(opener);

        match kind.to_ascii_lowercase().as_str() {
            "mssql" => {
                let (sql, output) = sql_block(cursor, &block)?;
                Ok(BuiltProvider {
                    provider: Provider::Sql(sql),
                    output,
                })
            }
            "mongodb" => {
                let (document, output) = document_block(cursor, &block)?;
                Ok(BuiltProvider {
                    provider: Provider::Document(document),
                    output,
                })
            }
            "redis" => {
                let (cache, output) = cache_block(cursor, &block)?;
                Ok(BuiltProvider {
                    provider: Provider::Cache(cache),
                    output,
                })
            }
            "route" => {
                let (outbound, output) = outbound_block(cursor, &block)?;
                Ok(BuiltProvider {
                    provider: Provider::Outbound(outbound),
                    output,
                })
            }
            "broker" => Ok(BuiltProvider {
                provider: Provider::Broker(broker_block(cursor, &block)?),
                output: None,
            }),
            other => Err(ParseError::UnknownProvider {
                line: opener.line,
                kind: other.to_string(),
            }),
        }
    }
}

fn sql_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<(SqlProvider, Option<OutputRules>)> {
    let mut sql = SqlProvider::default();
    let mut output = None;

    while let Some(d) = cursor.next_in_block(block)? {
        match d.keyword.to_ascii_lowercase().as_str() {
            "connection" => sql.connection = d.value()?.to_string(),
            "command" => sql.command = d.value()?.to_string(),
            "command-type" => {
                let value = d.value()?;
                sql.command_type = CommandType::parse(value)
                    .ok_or_else(|| d.invalid(value, "expected `text` or `procedure`"))?;
            }
            "use" => {
                if d.value()?.eq_ignore_ascii_case("body") {
                    sql.use_body = true;
                }
            }
            "param" => {
                let (name, source) = split_assignment(&d)?;
                if sql.parameters.iter().any(|(n, _)| n == &name) {
                    return Err(duplicate(&d, "parameter", &name));
                }
                sql.parameters.push((name, source));
            }
            "output" => output = Some(output_block(cursor, &BlockStart::of(&d))?),
            _ => {}
        }
    }

    Ok((sql, output))
}

fn document_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<(DocumentProvider, Option<OutputRules>)> {
    let mut document = DocumentProvider::default();
    let mut output = None;

    while let Some(d) = cursor.next_in_block(block)? {
        match d.keyword.to_ascii_lowercase().as_str() {
            "connection" => document.connection = d.value()?.to_string(),
            "database" => document.database = d.value()?.to_string(),
            "collection" => document.collection = d.value()?.to_string(),
            "query" => document.query = query_block(cursor, &BlockStart::of(&d))?,
            "use" => {
                if d.value()?.eq_ignore_ascii_case("body") {
                    document.use_body = true;
                }
            }
            "output" => output = Some(output_block(cursor, &BlockStart::of(&d))?),
            _ => {}
        }
    }

    Ok((document, output))
}

fn cache_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<(CacheProvider, Option<OutputRules>)> {
    let mut cache = CacheProvider::default();
    let mut output = None;

    while let Some(d) = cursor.next_in_block(block)? {
        match d.keyword.to_ascii_lowercase().as_str() {
            "connection" => cache.connection = d.value()?.to_string(),
            "database" => {
                let value = d.value()?;
                cache.database = value
                    .parse()
                    .map_err(|_| d.invalid(value, "expected a database index"))?;
            }
            "key" => cache.key = d.value()?.to_string(),
            "task" => cache.task = Some(task_block(cursor, &BlockStart::of(&d))?),
            "use" => {
                if d.value()?.eq_ignore_ascii_case("body") {
                    cache.use_body = true;
                }
            }
            "output" => output = Some(output_block(cursor, &BlockStart::of(&d))?),
            _ => {}
        }
    }

    Ok((cache, output))
}

fn task_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<RefreshTask> {
    let mut interval = None;
    let mut source = None;

    while let Some(d) = cursor.next_in_block(block)? {
        match d.keyword.to_ascii_lowercase().as_str() {
            "data-source" => {
                let kind = d.value()?;
                if !kind.eq_ignore_ascii_case("mssql") {
                    return Err(d.invalid(kind, "refresh tasks only support `mssql`"));
                }
                let (sql, _) = sql_block(cursor, &BlockStart::of(&d))?;
                source = Some(sql);
            }
            "interval" => {
                let value = d.value()?;
                interval = Some(parse_interval(value).ok_or_else(|| {
                    d.invalid(value, "expected `[d.]hh:mm[:ss[.fff]]` or a day count")
                })?);
            }
            _ => {}
        }
    }

    let source = source.ok_or(ParseError::MissingDirective("task data-source"))?;
    let interval = interval.ok_or(ParseError::MissingDirective("task interval"))?;
    if interval.is_zero() {
        return Err(ParseError::InvalidValue {
            line: block.line,
            keyword: "interval".to_string(),
            value: "0".to_string(),
            reason: "refresh interval must be positive".to_string(),
        });
    }

    Ok(RefreshTask { interval, source })
}

fn outbound_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<(OutboundProvider, Option<OutputRules>)> {
    let mut outbound = OutboundProvider::default();
    let mut output = None;

    while let Some(d) = cursor.next_in_block(block)? {
        match d.keyword.to_ascii_lowercase().as_str() {
            "url" => outbound.url = d.value()?.to_string(),
            "method" => outbound.method = d.value()?.to_string(),
            "body" => outbound.body_template = Some(d.value()?.to_string()),
            "headers" => {
                let sub = BlockStart::of(&d);
                while let Some(entry) = cursor.next_in_block(&sub)? {
                    if entry.is("begin") {
                        continue;
                    }
                    let value = entry.value()?;
                    if outbound
                        .headers
                        .iter()
                        .any(|(k, _)| k.eq_ignore_ascii_case(entry.keyword))
                    {
                        return Err(duplicate(&entry, "header", entry.keyword));
                    }
                    outbound
                        .headers
                        .push((entry.keyword.to_string(), value.to_string()));
                }
            }
            "use" => {
                if d.value()?.eq_ignore_ascii_case("body") {
                    outbound.use_body = true;
                }
            }
            "output" => output = Some(output_block(cursor, &BlockStart::of(&d))?),
            _ => {}
        }
    }

    Ok((outbound, output))
}

fn broker_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<BrokerProvider> {
    let mut broker = BrokerProvider::default();

    while let Some(d) = cursor.next_in_block(block)? {
        match d.keyword.to_ascii_lowercase().as_str() {
            "connection" => broker.connection = d.value()?.to_string(),
            "subjects" => {
                broker.subjects = d
                    .value()?
                    .split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "protocol" => broker.protocol = d.value()?.to_string(),
            _ => {}
        }
    }

    Ok(broker)
}

/// `output` block: `group`, `map` and `exclude` sub-blocks.
fn output_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<OutputRules> {
    let mut rules = OutputRules::default();

    while let Some(d) = cursor.next_in_block(block)? {
        match d.keyword.to_ascii_lowercase().as_str() {
            "group" => rules.groups = group_block(cursor, &BlockStart::of(&d))?,
            "map" => {
                let sub = BlockStart::of(&d);
                while let Some(entry) = cursor.next_in_block(&sub)? {
                    if entry.is("begin") {
                        continue;
                    }
                    let target = entry.value()?;
                    if rules.rename.contains_key(entry.keyword) {
                        return Err(duplicate(&entry, "map source", entry.keyword));
                    }
                    rules
                        .rename
                        .insert(entry.keyword.to_string(), target.to_string());
                }
            }
            "exclude" => {
                let sub = BlockStart::of(&d);
                while let Some(entry) = cursor.next_in_block(&sub)? {
                    if entry.is("begin") {
                        continue;
                    }
                    rules.exclude.insert(entry.text.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(rules)
}

fn group_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<Vec<GroupLevel>> {
    let mut levels: Vec<GroupLevel> = Vec::new();

    while let Some(entry) = cursor.next_in_block(block)? {
        if entry.is("begin") {
            continue;
        }
        let ordinal: i64 = entry
            .keyword
            .parse()
            .map_err(|_| entry.invalid(entry.keyword, "expected a numeric group level"))?;
        let fields: Vec<String> = entry
            .value()?
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        if fields.is_empty() {
            return Err(entry.invalid(entry.text, "group level lists no fields"));
        }
        if levels.iter().any(|l| l.ordinal == ordinal) {
            return Err(duplicate(&entry, "group level", entry.keyword));
        }
        levels.push(GroupLevel { ordinal, fields });
    }

    Ok(levels)
}

/// Free-form text, trimmed lines concatenated verbatim until `end`.
fn query_block<S: AsRef<str>>(
    cursor: &mut LineCursor<'_, S>,
    block: &BlockStart,
) -> ParseResult<String> {
    let mut query = String::new();
    while let Some(d) = cursor.next_in_block(block)? {
        if d.is("begin") {
            continue;
        }
        query.push_str(d.text);
    }
    Ok(query)
}

fn split_assignment(d: &Directive<'_>) -> ParseResult<(String, String)> {
    let value = d.value()?;
    let (name, source) = value
        .split_once('=')
        .ok_or_else(|| d.invalid(value, "expected `name=value`"))?;
    let (name, source) = (name.trim(), source.trim());
    if name.is_empty() || source.is_empty() {
        return Err(d.invalid(value, "expected `name=value`"));
    }
    Ok((name.to_string(), source.to_string()))
}

fn duplicate(d: &Directive<'_>, what: &'static str, key: &str) -> ParseError {
    ParseError::Duplicate {
        line: d.line,
        what,
        key: key.to_string(),
    }
}

/// Parse `[d.]hh:mm[:ss[.fff]]`; a bare integer counts days.
pub fn parse_interval(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(days) = value.parse::<u64>() {
        return Some(Duration::from_secs(days.checked_mul(86_400)?));
    }

    let (days, clock) = match value.split_once('.') {
        Some((d, rest)) if rest.contains(':') && !d.contains(':') => (d.parse::<u64>().ok()?, rest),
        _ => (0, value),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let hours: u64 = parts[0].parse().ok()?;
    let minutes: u64 = parts[1].parse().ok()?;
    let seconds: f64 = match parts.get(2) {
        Some(s) => s.parse().ok()?,
        None => 0.0,
    };
    if hours > 23 || minutes > 59 || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let whole = days * 86_400 + hours * 3_600 + minutes * 60;
    Some(Duration::from_secs(whole) + Duration::from_secs_f64(seconds))
}
