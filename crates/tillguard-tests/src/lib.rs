//! Integration tests for Tillguard live under `tests/`.
