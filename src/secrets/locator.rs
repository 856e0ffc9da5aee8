//! Store locators: "<path>/<field>"

use crate::secrets::FetchCause;

/// A locator split into the store location and the field inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator<'a> {
    pub location: &'a str,
    pub field: &'a str,
}

impl<'a> Locator<'a> {
    /// Split on the last `/`
    pub fn parse(raw: &'a str) -> Result<Self, FetchCause> {
        let (location, field) = raw
            .rsplit_once('/')
            .ok_or_else(|| FetchCause::MalformedLocator(raw.to_string()))?;
        Ok(Self { location, field })
    }
}
