use serde::Deserialize;

use crate::cookie::DEFAULT_CATEGORY;
use crate::errors::ModelError;

const SAVE_OP: &str = "saveCookie";
const REMOVE_OP: &str = "removeCookie";

/// Tag carried in the `operation` field of a POST body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Save,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Save => SAVE_OP,
            Operation::Remove => REMOVE_OP,
        }
    }

    /// Read only the `operation` field of a body, leaving the rest for the
    /// operation-specific parser.
    pub fn peek(body: &[u8]) -> Result<Self, ModelError> {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default)]
            operation: Option<String>,
        }

        let probe: Probe = serde_json::from_slice(body)
            .map_err(|e| ModelError::InvalidJson(e.to_string()))?;
        match probe.operation.as_deref() {
            Some(SAVE_OP) => Ok(Operation::Save),
            Some(REMOVE_OP) => Ok(Operation::Remove),
            other => Err(ModelError::UnknownOperation(other.unwrap_or_default().to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveDetails {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cookie: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveCookieRequest {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub details: SaveDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveDetails {
    #[serde(default)]
    pub cookie: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveCookieRequest {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub details: RemoveDetails,
}

/// A validated save: non-empty value, category defaulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCookie {
    pub value: String,
    pub category: String,
}

impl SaveCookieRequest {
    pub fn parse(body: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(body).map_err(|e| ModelError::InvalidJson(e.to_string()))
    }

    pub fn validate(self) -> Result<NewCookie, ModelError> {
        check_operation(&self.operation, Operation::Save)?;
        let value = non_empty(self.details.cookie)?;
        let category = self
            .details
            .category
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        Ok(NewCookie { value, category })
    }
}

impl RemoveCookieRequest {
    pub fn parse(body: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(body).map_err(|e| ModelError::InvalidJson(e.to_string()))
    }

    /// Returns the cookie value to remove.
    pub fn validate(self) -> Result<String, ModelError> {
        check_operation(&self.operation, Operation::Remove)?;
        non_empty(self.details.cookie)
    }
}

fn check_operation(found: &str, expected: Operation) -> Result<(), ModelError> {
    if found != expected.as_str() {
        return Err(ModelError::OperationMismatch { expected: expected.as_str(), found: found.to_string() });
    }
    Ok(())
}

fn non_empty(cookie: Option<String>) -> Result<String, ModelError> {
    match cookie {
        Some(c) if !c.is_empty() => Ok(c),
        _ => Err(ModelError::EmptyCookie),
    }
}

/// Raw list query string; every field is optional text.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub qty: Option<String>,
    pub random: Option<String>,
    pub category: Option<String>,
}

/// Validated listing options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub category: Option<String>,
    pub qty: Option<usize>,
    pub random: bool,
}

impl ListQuery {
    /// Build from decoded query pairs; the first occurrence of a name wins
    /// and unknown names are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = ListQuery::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "qty" => &mut query.qty,
                "random" => &mut query.random,
                "category" => &mut query.category,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }

    pub fn validate(self) -> Result<ListOptions, ModelError> {
        let qty = match self.qty.as_deref() {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n > 0 => Some(usize::try_from(n).unwrap_or(usize::MAX)),
                _ => return Err(ModelError::InvalidQty(raw.to_string())),
            },
        };
        Ok(ListOptions {
            category: self.category.filter(|c| !c.is_empty()),
            qty,
            random: self.random.as_deref() == Some("true"),
        })
    }
}
