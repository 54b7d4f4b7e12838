use serde::Deserialize;

pub const RESTRICTED_SCHEMES: [&str; 5] = [
    "chrome:",
    "chrome-extension:",
    "moz-extension:",
    "edge:",
    "about:",
];

const UNTITLED: &str = "Untitled page";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PageLinkError {
    #[error("cannot read the current tab")]
    NoActiveTab,
    #[error("links to browser pages are not allowed: {0}")]
    Restricted(String),
}

pub fn page_link(page: Option<&PageInfo>) -> Result<String, PageLinkError> {
    let page = page
        .filter(|page| !page.url.is_empty())
        .ok_or(PageLinkError::NoActiveTab)?;
    let lowered = page.url.to_ascii_lowercase();
    if RESTRICTED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return Err(PageLinkError::Restricted(page.url.clone()));
    }
    let title = match page.title.trim() {
        "" => UNTITLED,
        title => title,
    };
    Ok(format!("[{title}]({})", page.url))
}
