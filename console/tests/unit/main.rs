//! Integration tests against a scripted remote

mod fixtures;
mod mock;
mod test_blob_store;
mod test_server;
mod test_session;
