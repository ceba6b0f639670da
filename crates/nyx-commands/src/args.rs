//! Argument splitting and typed conversion.
//!
//! A raw argument string is split by a [`ParamParser`] into tokens. After an
//! overload has been selected by token count, positions declared with an
//! [`ArgConverter`] are converted in the caller's context; every other
//! position is passed through as [`ArgValue::Text`].

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use nyx_types::{CommandContext, CommandError, Member, Role};

use crate::descriptor::CommandDescriptor;
use crate::platform::Platform;

/// Signature of a custom argument splitter.
pub type SplitFn = dyn Fn(&str) -> Vec<String> + Send + Sync;

/// Kind of argument splitting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamParserType {
    Spaces,
    All,
    Custom,
}

/// Strategy for turning a raw argument string into tokens.
#[derive(Clone)]
pub enum ParamParser {
    /// Split on single spaces. An empty string yields no tokens.
    Spaces,
    /// The whole string is one token. An empty string yields no tokens.
    All,
    /// A named custom splitter. Two custom parsers are the same parser when
    /// their names match.
    Custom {
        name: &'static str,
        split: Arc<SplitFn>,
    },
}

impl ParamParser {
    pub fn custom(
        name: &'static str,
        split: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom {
            name,
            split: Arc::new(split),
        }
    }

    pub fn kind(&self) -> ParamParserType {
        match self {
            Self::Spaces => ParamParserType::Spaces,
            Self::All => ParamParserType::All,
            Self::Custom { .. } => ParamParserType::Custom,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Spaces => "spaces",
            Self::All => "all",
            Self::Custom { name, .. } => *name,
        }
    }

    pub fn split(&self, raw: &str) -> Vec<String> {
        match self {
            Self::Spaces => {
                if raw.trim().is_empty() {
                    Vec::new()
                } else {
                    raw.split(' ').map(String::from).collect()
                }
            }
            Self::All => {
                if raw.is_empty() {
                    Vec::new()
                } else {
                    vec![raw.to_string()]
                }
            }
            Self::Custom { split, .. } => split(raw),
        }
    }
}

impl PartialEq for ParamParser {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.name() == other.name()
    }
}

impl fmt::Debug for ParamParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spaces => f.write_str("Spaces"),
            Self::All => f.write_str("All"),
            Self::Custom { name, .. } => write!(f, "Custom({name})"),
        }
    }
}

impl Default for ParamParser {
    fn default() -> Self {
        Self::Spaces
    }
}

/// A converted argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    Bool(bool),
    Integer(i64),
    Role(Role),
    Member(Member),
}

/// Converts one raw token into a typed value.
///
/// Conversion may consult the platform (role and member lookups are scoped to
/// the caller's guild). Returning `None` means the token is not a valid value
/// of [`ArgConverter::type_name`]; the handler is then never invoked.
#[async_trait]
pub trait ArgConverter: Send + Sync {
    /// Name of the produced type, reported in `INVALID_ARGUMENT_TYPE`.
    fn type_name(&self) -> &str;

    async fn convert(
        &self,
        raw: &str,
        ctx: &CommandContext,
        platform: &dyn Platform,
    ) -> Option<ArgValue>;
}

/// `true` / `false`, case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

#[async_trait]
impl ArgConverter for BoolConverter {
    fn type_name(&self) -> &str {
        "Bool"
    }

    async fn convert(&self, raw: &str, _: &CommandContext, _: &dyn Platform) -> Option<ArgValue> {
        match raw.to_lowercase().as_str() {
            "true" => Some(ArgValue::Bool(true)),
            "false" => Some(ArgValue::Bool(false)),
            _ => None,
        }
    }
}

/// A signed 64-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

#[async_trait]
impl ArgConverter for IntegerConverter {
    fn type_name(&self) -> &str {
        "Integer"
    }

    async fn convert(&self, raw: &str, _: &CommandContext, _: &dyn Platform) -> Option<ArgValue> {
        raw.parse().ok().map(ArgValue::Integer)
    }
}

/// A role of the caller's guild, by name, id or `<@&id>` mention.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleConverter;

#[async_trait]
impl ArgConverter for RoleConverter {
    fn type_name(&self) -> &str {
        "Role"
    }

    async fn convert(
        &self,
        raw: &str,
        ctx: &CommandContext,
        platform: &dyn Platform,
    ) -> Option<ArgValue> {
        let guild = ctx.guild.as_ref()?;
        let query = strip_mention(raw, "<@&");
        platform.find_role(guild, query).await.map(ArgValue::Role)
    }
}

/// A member of the caller's guild, by name, nickname, id or `<@id>` mention.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberConverter;

#[async_trait]
impl ArgConverter for MemberConverter {
    fn type_name(&self) -> &str {
        "Member"
    }

    async fn convert(
        &self,
        raw: &str,
        ctx: &CommandContext,
        platform: &dyn Platform,
    ) -> Option<ArgValue> {
        let guild = ctx.guild.as_ref()?;
        let query = strip_mention(strip_mention(raw, "<@!"), "<@");
        platform.find_member(guild, query).await.map(ArgValue::Member)
    }
}

fn strip_mention<'a>(raw: &'a str, open: &str) -> &'a str {
    raw.strip_prefix(open)
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(raw)
}

/// Converted arguments handed to a handler, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<ArgValue>);

impl Args {
    pub fn new(values: Vec<ArgValue>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[ArgValue] {
        &self.0
    }

    pub fn text(&self, index: usize) -> Result<&str> {
        match self.0.get(index) {
            Some(ArgValue::Text(s)) => Ok(s),
            other => bail!("argument {index} is not text: {other:?}"),
        }
    }

    pub fn bool(&self, index: usize) -> Result<bool> {
        match self.0.get(index) {
            Some(ArgValue::Bool(b)) => Ok(*b),
            other => bail!("argument {index} is not a bool: {other:?}"),
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64> {
        match self.0.get(index) {
            Some(ArgValue::Integer(n)) => Ok(*n),
            other => bail!("argument {index} is not an integer: {other:?}"),
        }
    }

    pub fn role(&self, index: usize) -> Result<&Role> {
        match self.0.get(index) {
            Some(ArgValue::Role(r)) => Ok(r),
            other => bail!("argument {index} is not a role: {other:?}"),
        }
    }

    pub fn member(&self, index: usize) -> Result<&Member> {
        match self.0.get(index) {
            Some(ArgValue::Member(m)) => Ok(m),
            other => bail!("argument {index} is not a member: {other:?}"),
        }
    }
}

/// Convert raw tokens for the selected overload.
///
/// Fails with `INVALID_ARGUMENT_TYPE` on the first token a converter rejects.
pub async fn convert_args(
    descriptor: &CommandDescriptor,
    raw: Vec<String>,
    ctx: &CommandContext,
    platform: &dyn Platform,
) -> std::result::Result<Args, CommandError> {
    let mut values = Vec::with_capacity(raw.len());

    for (index, token) in raw.into_iter().enumerate() {
        let converter = descriptor
            .params
            .get(index)
            .and_then(|p| p.converter.as_ref());

        let Some(converter) = converter else {
            values.push(ArgValue::Text(token));
            continue;
        };

        match converter.convert(&token, ctx, platform).await {
            Some(value) => values.push(value),
            None => {
                tracing::debug!(
                    command = %descriptor.command_name,
                    index,
                    value = %token,
                    expected = converter.type_name(),
                    "argument conversion failed"
                );
                return Err(CommandError::InvalidArgumentType {
                    type_name: converter.type_name().to_string(),
                    arg: descriptor.param_name(index).unwrap_or_default().to_string(),
                    value: token,
                });
            }
        }
    }

    Ok(Args(values))
}
