//! Caller identity resolution
//!
//! The platform hands every invocation an opaque, already-authenticated
//! identity descriptor derived from the caller's X.509 certificate:
//!
//! ```text
//! x509::CN=User1@org1.example.com, OU=client, O=Hyperledger::CN=ca.org1.example.com, O=org1.example.com
//!       └──────────────── subject DN ───────────────────────┘ └────────────── issuer DN ─────────────┘
//! ```
//!
//! Resolution only parses the format. The short name is the subject common
//! name up to any `@`; the qualifier is the issuer organization, falling back
//! to the issuer common name without its `ca.` label. The principal is
//! `name@qualifier`.

use crate::{Error, Result};
use regex::Regex;
use std::fmt;

/// Caller or owner identifier of the form `name@organization`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    /// Compose from a short name and an organization
    pub fn new(name: &str, organization: &str) -> Self {
        Self(format!("{}@{}", name, organization))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short name (before `@`)
    pub fn name(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(name, _)| name)
    }

    /// Organization qualifier (after `@`)
    pub fn organization(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, org)| org)
    }

    /// Wallet asset ID owned by this principal
    pub fn wallet_id(&self) -> String {
        crate::types::wallet_id(&self.0)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses caller tokens into principals
///
/// Holds compiled patterns only; resolving never mutates it.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    /// `x509::<subject>::<issuer>`
    token_regex: Regex,
    /// `CN=` attribute within a DN
    cn_regex: Regex,
    /// `O=` attribute within a DN
    org_regex: Regex,
}

impl IdentityResolver {
    /// Create new resolver
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::Config(format!("Invalid identity pattern: {}", e)))
        };

        Ok(Self {
            token_regex: compile(r"^x509::(?P<subject>.+?)::(?P<issuer>.+)$")?,
            cn_regex: compile(r"(?:^|,)\s*CN=(?P<value>[^,]+)")?,
            org_regex: compile(r"(?:^|,)\s*O=(?P<value>[^,]+)")?,
        })
    }

    /// Resolve a caller token into a principal
    pub fn resolve(&self, caller_token: &str) -> Result<Principal> {
        let malformed = || Error::MalformedIdentity(caller_token.to_string());

        let caps = self.token_regex.captures(caller_token.trim()).ok_or_else(malformed)?;
        let subject = &caps["subject"];
        let issuer = &caps["issuer"];

        let common_name = Self::attribute(&self.cn_regex, subject).ok_or_else(malformed)?;
        let name = common_name
            .split_once('@')
            .map_or(common_name, |(name, _)| name)
            .trim();

        let organization = match Self::attribute(&self.org_regex, issuer) {
            Some(org) => org,
            None => {
                let ca = Self::attribute(&self.cn_regex, issuer).ok_or_else(malformed)?;
                ca.strip_prefix("ca.").unwrap_or(ca)
            }
        };

        if name.is_empty() || organization.is_empty() || organization.contains('@') {
            return Err(malformed());
        }

        Ok(Principal::new(name, organization))
    }

    fn attribute<'t>(regex: &Regex, dn: &'t str) -> Option<&'t str> {
        regex
            .captures(dn)
            .and_then(|caps| caps.name("value"))
            .map(|m| m.as_str().trim())
            .filter(|value| !value.is_empty())
    }
}
