// 🌱 Fixtures - seed collections for the three stores

use crate::entities::{Contact, Deal, SalesRep};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub const CONTACTS_FILE: &str = "contacts.json";
pub const DEALS_FILE: &str = "deals.json";
pub const SALES_REPS_FILE: &str = "sales_reps.json";

const EMBEDDED_CONTACTS: &str = include_str!("../fixtures/contacts.json");
const EMBEDDED_DEALS: &str = include_str!("../fixtures/deals.json");
const EMBEDDED_SALES_REPS: &str = include_str!("../fixtures/sales_reps.json");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixtures {
    pub contacts: Vec<Contact>,
    pub deals: Vec<Deal>,
    pub sales_reps: Vec<SalesRep>,
}

impl Fixtures {
    /// Data compiled into the binary
    pub fn embedded() -> Result<Self> {
        Ok(Fixtures {
            contacts: parse(EMBEDDED_CONTACTS, CONTACTS_FILE)?,
            deals: parse(EMBEDDED_DEALS, DEALS_FILE)?,
            sales_reps: parse(EMBEDDED_SALES_REPS, SALES_REPS_FILE)?,
        })
    }

    /// Load `contacts.json`, `deals.json` and `sales_reps.json` from `dir`
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Fixtures {
            contacts: read(&dir.join(CONTACTS_FILE))?,
            deals: read(&dir.join(DEALS_FILE))?,
            sales_reps: read(&dir.join(SALES_REPS_FILE))?,
        })
    }

    /// Directory when given, embedded data otherwise
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::embedded(),
        }
    }
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture file: {:?}", path))?;
    parse(&content, &path.display().to_string())
}

fn parse<T: DeserializeOwned>(content: &str, origin: &str) -> Result<Vec<T>> {
    serde_json::from_str(content).with_context(|| format!("Failed to parse fixture JSON: {}", origin))
}
