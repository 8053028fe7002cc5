//! End-to-end tests: EQL compiled against the Northwind configuration and run on SQLite.
