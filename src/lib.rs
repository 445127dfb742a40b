//! Translate bot — an ActivityPub actor that replies to mentions with a
//! translation of the mentioning post.

pub mod activitypub;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod translate;
