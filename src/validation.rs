use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Field-level error messages keyed by a closed set of field names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors<F: Ord> {
    errors: BTreeMap<F, String>,
}

impl<F: Ord> Default for FieldErrors<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Ord> FieldErrors<F> {
    pub fn new() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, field: F, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn remove(&mut self, field: &F) -> Option<String> {
        self.errors.remove(field)
    }

    pub fn get(&self, field: &F) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &F) -> bool {
        self.errors.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&F, &str)> {
        self.errors.iter().map(|(f, m)| (f, m.as_str()))
    }

    /// `Ok(())` when no errors were collected, otherwise the collected map
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl<F: Ord + fmt::Debug> fmt::Display for FieldErrors<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, message)| format!("{field:?}: {message}"))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Shape checks for contact details entered during verification
#[derive(Debug, Clone)]
pub struct InputRules {
    email: Regex,
    mobile: Regex,
}

impl InputRules {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // local-part @ domain . tld, no whitespace anywhere
            email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?,
            // Indian mobile numbers: leading 6-9 followed by nine digits
            mobile: Regex::new(r"^[6-9][0-9]{9}$")?,
        })
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email.is_match(email)
    }

    pub fn is_valid_mobile(&self, mobile: &str) -> bool {
        self.mobile.is_match(mobile)
    }
}
