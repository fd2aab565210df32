//! Compiled endpoint definitions.
//!
//! A [`Definition`] is immutable once built. A changed source file produces a
//! whole new value; nothing is patched in place.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

/// Authentication sentinel used in definition files.
pub const NO_AUTH: &str = "no-auth";

/// Logger sentinel used in definition files.
pub const NO_LOG: &str = "no-log";

/// One compiled endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// Route template, e.g. `api/users/{id}`.
    pub route_template: String,

    /// HTTP method as written in the file.
    pub method: String,

    pub authentication: Authentication,

    pub logs: LogTarget,

    /// Unset means every per-definition log call is suppressed.
    pub log_threshold: Option<Severity>,

    /// Wrap responses in the `Status`/`Timestamp`/`Response` envelope.
    pub wrapped: bool,

    /// Lower-camel-case the envelope keys.
    pub camel_case: bool,

    /// Query parameters allowed to carry a quest filter expression.
    pub quest_parameters: Vec<String>,

    /// Reject JSON-looking query values that are not quest parameters.
    pub restrict_json_in_query_string: bool,

    pub output: OutputRules,

    pub provider: Provider,
}

impl Definition {
    /// Whether `name` was declared with `use quest`.
    pub fn is_quest_parameter(&self, name: &str) -> bool {
        self.quest_parameters
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }
}

/// Which authentication provider guards an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Disabled,
    Provider(String),
}

impl Authentication {
    pub fn from_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case(NO_AUTH) {
            Authentication::Disabled
        } else {
            Authentication::Provider(value.to_string())
        }
    }
}

/// Which named logger receives an endpoint's log calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Disabled,
    Named(String),
}

impl LogTarget {
    pub fn from_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case(NO_LOG) {
            LogTarget::Disabled
        } else {
            LogTarget::Named(value.to_string())
        }
    }
}

/// Per-definition log severity.
///
/// Ranked so that a *higher* threshold lets *more* calls through: a call of
/// severity `S` is emitted only when `threshold >= S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Exception = 1,
    Warning = 2,
    Information = 3,
    Debug = 4,
    Verbose = 5,
}

impl Severity {
    /// Parse a severity name; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exception" | "error" => Some(Severity::Exception),
            "warning" => Some(Severity::Warning),
            "information" => Some(Severity::Information),
            "debug" => Some(Severity::Debug),
            "verbose" => Some(Severity::Verbose),
            _ => None,
        }
    }

    /// Inverted-ordering gate. An unset threshold ranks as 0.
    pub fn permits(threshold: Option<Severity>, severity: Severity) -> bool {
        threshold.map(|t| t as u8).unwrap_or(0) >= severity as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Exception => "exception",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Debug => "debug",
            Severity::Verbose => "verbose",
        };
        f.write_str(name)
    }
}

/// Result-shaping rules from an `output` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputRules {
    /// Grouping levels in file order. File order, not the ordinal, decides
    /// nesting.
    pub groups: Vec<GroupLevel>,

    /// Source field -> output field.
    pub rename: BTreeMap<String, String>,

    pub exclude: BTreeSet<String>,
}

impl OutputRules {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.rename.is_empty() && self.exclude.is_empty()
    }

    /// Key-field lists for each level, outermost first.
    pub fn group_fields(&self) -> Vec<Vec<String>> {
        self.groups.iter().map(|g| g.fields.clone()).collect()
    }
}

/// One `<ordinal> <field,field>` entry of a `group` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLevel {
    pub ordinal: i64,
    pub fields: Vec<String>,
}

/// Backend configuration. Exactly one per definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    Sql(SqlProvider),
    Document(DocumentProvider),
    Cache(CacheProvider),
    Outbound(OutboundProvider),
    Broker(BrokerProvider),
}

impl Provider {
    /// The `data-source` keyword for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Provider::Sql(_) => "mssql",
            Provider::Document(_) => "mongodb",
            Provider::Cache(_) => "redis",
            Provider::Outbound(_) => "route",
            Provider::Broker(_) => "broker",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandType {
    #[default]
    Text,
    Procedure,
}

impl CommandType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Some(CommandType::Text),
            "procedure" | "storedprocedure" | "stored-procedure" => Some(CommandType::Procedure),
            _ => None,
        }
    }
}

/// `data-source mssql`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlProvider {
    /// Connection *name*, resolved at request time.
    pub connection: String,
    pub command: String,
    pub command_type: CommandType,
    pub use_body: bool,
    /// `param name=value` pairs in file order.
    pub parameters: Vec<(String, String)>,
}

/// `data-source mongodb`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentProvider {
    pub connection: String,
    pub database: String,
    pub collection: String,
    /// Aggregation pipeline text, lines concatenated verbatim.
    pub query: String,
    pub use_body: bool,
}

/// `data-source redis`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheProvider {
    pub connection: String,
    pub database: i64,
    pub key: String,
    pub use_body: bool,
    pub task: Option<RefreshTask>,
}

/// Periodic job that repopulates a cache key from SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTask {
    pub interval: Duration,
    pub source: SqlProvider,
}

/// `data-source route`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundProvider {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body_template: Option<String>,
    pub use_body: bool,
}

/// `data-source broker`. Parsed but never bound to a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerProvider {
    pub connection: String,
    pub subjects: Vec<String>,
    pub protocol: String,
}
