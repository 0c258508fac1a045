//! Integration-test member; see `tests/` for the actual tests.
