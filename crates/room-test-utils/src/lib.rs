//! # Room Service Test Utilities
//!
//! Shared test utilities for the room service.
//!
//! This crate provides:
//! - Server test harness (`TestRoomServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_test_utils::TestRoomServer;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestRoomServer::spawn(Arc::new(MemoryStorage::new())).await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .get(format!("{}/health", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
