//! Utility functions for common operations.
//!
//! - **URL validation**: scheme and address checks before a feed is fetched
//! - **URL lists**: parsing the comma-separated default feed list
//!
//! # Examples
//!
//! ```
//! use feedroom::util::{split_urls, validate_url};
//!
//! let urls = split_urls("https://example.com/feed.xml, https://example.org/rss");
//! assert_eq!(urls.len(), 2);
//! assert!(validate_url(&urls[0], false).is_ok());
//! ```

mod url_validator;
mod urls;

pub use url_validator::{validate_url, UrlValidationError};
pub use urls::split_urls;
