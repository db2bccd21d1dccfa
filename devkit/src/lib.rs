/*!
# Thecus DevKit - Stubs and utilities for development

Library for developing and testing the check engine without a device:
- Mock HTTP transport with scripted replies
- JSON fixtures of device answers
- Test harness wiring session client, store and resolver
*/

pub mod fixtures;
pub mod test_utils;
pub mod transport_stub;

pub use anyhow;
pub use fixtures::DeviceFixtures;
pub use test_utils::TestHarness;
pub use transport_stub::{MockReply, MockTransport};
