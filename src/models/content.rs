//! Marketing copy: the hero/about sections and the services list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

/// Singleton sections of the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionSlug {
    Hero,
    About,
}

impl SectionSlug {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionSlug::Hero => "hero",
            SectionSlug::About => "about",
        }
    }
}

impl fmt::Display for SectionSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hero" => Ok(SectionSlug::Hero),
            "about" => Ok(SectionSlug::About),
            other => Err(format!("unknown section `{}`", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Section {
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct SectionFields {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: Option<String>,
}

/// A service offered by the business.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ServiceFields {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}
