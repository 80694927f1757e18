//! Integration tests for overcloud-dropbox
//!
//! Uses wiremock to simulate the Dropbox API v2 and verifies end-to-end
//! behavior of the DropboxClient, the RemoteStore provider and the OAuth
//! connector. The client is blocking, so every call runs on a
//! `spawn_blocking` thread while the mock server runs on the test runtime.

mod common;

mod test_auth;
mod test_client;
mod test_provider;
