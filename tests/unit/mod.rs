/// Unit tests against the public engine API
mod basic_tests;
