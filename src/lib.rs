//! feedroom: subscribe to RSS/Atom feeds and read them through a browser.
//!
//! The [`storage::Registry`] keeps subscription metadata in memory behind one
//! reader/writer lock, [`storage::FeedStore`] mirrors it to a JSON file, and
//! every read of a feed's content goes back to the network through a
//! [`feed::Fetcher`]. [`app::App`] ties them together for the HTTP layer in
//! [`server`].

pub mod app;
pub mod config;
pub mod feed;
pub mod server;
pub mod storage;
pub mod util;
