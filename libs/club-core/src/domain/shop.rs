use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Suffix every canonical shop domain carries.
pub const SHOPIFY_DOMAIN_SUFFIX: &str = ".myshopify.com";

/// Marker recorded in the settings blob of shops created by the resolver.
pub const CREATED_VIA_AUTO_ISOLATION: &str = "auto-isolation";

// --- Shop domain ---

/// Canonical shop domain: lowercase `<slug>.myshopify.com`.
///
/// The only way to build one is [`ShopDomain::parse`], so every value in the
/// system has already been normalized. Deserialization goes through the same
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    #[error("shop domain is empty")]
    Empty,
    #[error("invalid character {ch:?} in shop domain {value:?}")]
    InvalidCharacter { value: String, ch: char },
    #[error("shop domain {0:?} may not start or end with a hyphen")]
    MisplacedHyphen(String),
}

impl ShopDomain {
    /// Normalize a raw signal value into a canonical domain.
    ///
    /// Accepts either a bare slug (`collective-club`) or a full domain
    /// (`Collective-Club.myshopify.com`). Whitespace is trimmed and ASCII is
    /// lowercased before validation.
    pub fn parse(raw: &str) -> Result<Self, ShopDomainError> {
        let lowered = raw.trim().to_ascii_lowercase();
        let slug = lowered
            .strip_suffix(SHOPIFY_DOMAIN_SUFFIX)
            .unwrap_or(&lowered);
        validate_slug(slug)?;
        Ok(Self(format!("{slug}{SHOPIFY_DOMAIN_SUFFIX}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The domain without the `.myshopify.com` suffix.
    pub fn slug(&self) -> &str {
        self.0
            .strip_suffix(SHOPIFY_DOMAIN_SUFFIX)
            .unwrap_or(&self.0)
    }

    /// `collective-club.myshopify.com` -> `Collective Club`.
    pub fn display_name(&self) -> String {
        self.slug()
            .split('-')
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn validate_slug(slug: &str) -> Result<(), ShopDomainError> {
    if slug.is_empty() {
        return Err(ShopDomainError::Empty);
    }
    if let Some(ch) = slug
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(ShopDomainError::InvalidCharacter {
            value: slug.to_string(),
            ch,
        });
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ShopDomainError::MisplacedHyphen(slug.to_string()));
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

// --- Shop ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShopEnvironment {
    Development,
    Production,
}

impl ShopEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShopEnvironment::Development => "development",
            ShopEnvironment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: String,
    pub shop_domain: ShopDomain,
    pub shop_name: String,
    pub owner_id: String,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Set once the default categories and admin exist.
    #[serde(default)]
    pub provisioned_at: Option<DateTime<Utc>>,
}

impl Shop {
    pub fn handle(&self) -> ShopHandle {
        ShopHandle {
            shop_id: self.id.clone(),
            shop_domain: self.shop_domain.clone(),
            shop_name: self.shop_name.clone(),
        }
    }

    /// True for shops provisioned as development tenants (the fallback shop).
    pub fn is_development(&self) -> bool {
        self.settings
            .get("environment")
            .and_then(|v| v.as_str())
            == Some(ShopEnvironment::Development.as_str())
    }

    pub fn is_provisioned(&self) -> bool {
        self.provisioned_at.is_some()
    }
}

/// Insert payload for a shop that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShop {
    pub id: String,
    pub shop_domain: ShopDomain,
    pub shop_name: String,
    pub owner_id: String,
    pub settings: serde_json::Value,
}

impl NewShop {
    /// Shop record as the resolver creates it on first contact. The owner id is a
    /// placeholder until the OAuth callback binds a real owner.
    pub fn for_domain(shop_domain: ShopDomain, environment: ShopEnvironment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            shop_name: shop_domain.display_name(),
            shop_domain,
            owner_id: format!("owner-{}", Utc::now().timestamp_millis()),
            settings: json!({
                "environment": environment.as_str(),
                "created_via": CREATED_VIA_AUTO_ISOLATION,
            }),
        }
    }

    pub fn into_shop(self, created_at: DateTime<Utc>) -> Shop {
        Shop {
            id: self.id,
            shop_domain: self.shop_domain,
            shop_name: self.shop_name,
            owner_id: self.owner_id,
            settings: self.settings,
            created_at,
            provisioned_at: None,
        }
    }
}

/// What request handlers thread through every tenant-scoped query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopHandle {
    pub shop_id: String,
    pub shop_domain: ShopDomain,
    pub shop_name: String,
}

/// Payload of the `ShopProvisioned` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopProvisioned {
    pub shop_id: String,
    pub shop_domain: ShopDomain,
    pub shop_name: String,
    pub development: bool,
    pub provisioned_at: DateTime<Utc>,
}

impl ShopProvisioned {
    pub const EVENT_TYPE: &'static str = "ShopProvisioned";

    pub fn from_shop(shop: &Shop) -> Self {
        Self {
            shop_id: shop.id.clone(),
            shop_domain: shop.shop_domain.clone(),
            shop_name: shop.shop_name.clone(),
            development: shop.is_development(),
            provisioned_at: Utc::now(),
        }
    }
}
