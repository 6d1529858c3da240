/// Integration tests running the tracker against SQLite
mod common;
mod basic_integration;
