//! Amazon Resource Names

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// `arn:partition:service:region:account:resource`; the resource part may
/// itself contain colons.
static ARN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:([^:]*):([^:]*):([^:]*):([^:]*):(.*)$").expect("Invalid ARN regex")
});

/// A parsed ARN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource: String,
}

impl Arn {
    /// Parse an ARN string.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = ARN_REGEX
            .captures(input)
            .ok_or_else(|| Error::InvalidArn(input.to_string()))?;
        let part = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_string();
        Ok(Self {
            partition: part(1),
            service: part(2),
            region: part(3),
            account: part(4),
            resource: part(5),
        })
    }

    /// ARN of an events resource such as `event-bus/orders`.
    pub fn events(region: &str, account: &str, resource: impl Into<String>) -> Self {
        Self {
            partition: "aws".to_string(),
            service: "events".to_string(),
            region: region.to_string(),
            account: account.to_string(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}
