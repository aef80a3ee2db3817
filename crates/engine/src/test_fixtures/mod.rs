//! Test fixtures and common test helpers.

pub mod llm_mocks;
